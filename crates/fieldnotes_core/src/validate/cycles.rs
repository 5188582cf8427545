//! Circular reference detection.
//!
//! # Invariants
//! - Graph nodes are addresses; edges come from inline refs to known uids.
//!   Self-loops are dropped.
//! - DFS is iterative with white/gray/black marking; a gray target closes
//!   a cycle made of the current path from that target onward.
//! - Cycles with the same member set are reported once.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{Issue, IssueCode};
use crate::model::corpus::Corpus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    White,
    Gray,
    Black,
}

type Graph<'a> = BTreeMap<&'a str, BTreeSet<&'a str>>;

fn build_graph(corpus: &Corpus) -> Graph<'_> {
    let mut graph: Graph<'_> = BTreeMap::new();
    for note in corpus.notes() {
        let edges = graph.entry(note.address()).or_default();
        for target in note
            .references
            .iter()
            .filter_map(|uid| corpus.get(uid))
            .map(|target| target.address())
            .filter(|target| *target != note.address())
        {
            edges.insert(target);
        }
    }
    graph
}

/// Every unique cycle, each rotated to start at its smallest address.
pub fn find_cycles(corpus: &Corpus) -> Vec<Vec<String>> {
    let graph = build_graph(corpus);
    let mut marks: HashMap<&str, Mark> = graph.keys().map(|node| (*node, Mark::White)).collect();
    let mut seen: BTreeSet<Vec<&str>> = BTreeSet::new();
    let mut cycles = Vec::new();
    let empty = BTreeSet::new();

    for start in graph.keys().copied() {
        if marks.get(start) != Some(&Mark::White) {
            continue;
        }
        let mut path: Vec<&str> = vec![start];
        let mut stack = vec![(start, graph.get(start).unwrap_or(&empty).iter())];
        marks.insert(start, Mark::Gray);

        loop {
            let Some((node, edges)) = stack.last_mut() else {
                break;
            };
            let node = *node;
            let Some(next) = edges.next().copied() else {
                marks.insert(node, Mark::Black);
                path.pop();
                stack.pop();
                continue;
            };
            match marks.get(next).copied().unwrap_or(Mark::White) {
                Mark::White => {
                    marks.insert(next, Mark::Gray);
                    path.push(next);
                    stack.push((next, graph.get(next).unwrap_or(&empty).iter()));
                }
                Mark::Gray => {
                    let Some(from) = path.iter().position(|member| *member == next) else {
                        continue;
                    };
                    let members = &path[from..];
                    let mut key = members.to_vec();
                    key.sort_unstable();
                    if seen.insert(key) {
                        cycles.push(canonical_rotation(members));
                    }
                }
                Mark::Black => {}
            }
        }
    }
    cycles
}

fn canonical_rotation(members: &[&str]) -> Vec<String> {
    let pivot = members
        .iter()
        .enumerate()
        .min_by_key(|(_, member)| **member)
        .map(|(index, _)| index)
        .unwrap_or(0);
    members[pivot..]
        .iter()
        .chain(members[..pivot].iter())
        .map(|member| member.to_string())
        .collect()
}

/// One `CIRCULAR_REF` warning per unique cycle.
pub fn check_cycles(corpus: &Corpus) -> Vec<Issue> {
    find_cycles(corpus)
        .into_iter()
        .map(|cycle| {
            let mut route = cycle.join(" -> ");
            if let Some(first) = cycle.first() {
                route.push_str(&format!(" -> {first}"));
            }
            let mut issue = Issue::new(IssueCode::CircularRef).with_detail(route);
            if let Some(first) = cycle.first() {
                issue = issue.with_address(first.clone());
                if let Some(note) = corpus.by_address(first) {
                    issue = issue.with_uid(note.uid());
                }
            }
            issue.with_related(cycle)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{canonical_rotation, find_cycles};
    use crate::model::corpus::Corpus;
    use crate::parser::parse_note;

    fn note(uid: &str, address: &str, body: &str) -> crate::model::note::Note {
        parse_note(&format!(
            "---\nuid: {uid}\naddress: {address}\ndate: 2024-01-01\n---\n{body}\n"
        ))
        .unwrap()
    }

    #[test]
    fn rotation_starts_at_smallest_member() {
        assert_eq!(canonical_rotation(&["C", "A", "B"]), vec!["A", "B", "C"]);
    }

    #[test]
    fn two_cycles_sharing_a_node_are_both_found() {
        let corpus = Corpus::new(vec![
            note("a", "A", "See [[b]] and [[c]]."),
            note("b", "B", "Back to [[a]]."),
            note("c", "C", "Also [[a]]."),
        ]);
        let cycles = find_cycles(&corpus);
        assert_eq!(cycles, vec![vec!["A", "B"], vec!["A", "C"]]);
    }

    #[test]
    fn self_references_are_not_cycles() {
        let corpus = Corpus::new(vec![note("a", "A", "Myself: [[a]].")]);
        assert!(find_cycles(&corpus).is_empty());
    }
}
