//! Segment-name and alias collision heuristics.
//!
//! # Responsibility
//! - Flag the same segment word used under different parents.
//! - Flag aliases that clash with segment names or with other aliases.
//!
//! # Invariants
//! - Superseded addresses are excluded from every check.
//! - `distinct` suppression is a set of unordered address pairs; marking
//!   from either side suppresses the pair.
//! - A segment collision needs two or more distinct parents among the
//!   occurrences that still have an unsuppressed partner.
//! - Segment and alias checks run independently and may both fire for the
//!   same address.

use std::collections::{BTreeMap, BTreeSet};

use super::{CollisionTier, Issue, IssueCode};
use crate::model::address;
use crate::model::corpus::Corpus;
use crate::model::note::Note;

/// Generic words never reported as collisions.
pub const EXCLUDED_SEGMENTS: &[&str] = &[
    "overview",
    "intro",
    "introduction",
    "notes",
    "summary",
    "index",
    "misc",
    "general",
    "examples",
    "basics",
    "references",
    "resources",
];

/// One place a segment name appears in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// Address ending at this segment.
    pub location: String,
    /// Address above the segment; empty for root segments.
    pub parent: String,
    /// Whether a note lives exactly at `location`.
    pub is_leaf: bool,
    pub is_root: bool,
}

type Registry = BTreeMap<String, Vec<Occurrence>>;
type PairSet = BTreeSet<(String, String)>;

fn is_excluded(segment: &str) -> bool {
    EXCLUDED_SEGMENTS.contains(&segment)
}

fn pair_key(left: &str, right: &str) -> (String, String) {
    if left <= right {
        (left.to_string(), right.to_string())
    } else {
        (right.to_string(), left.to_string())
    }
}

fn active_notes(corpus: &Corpus) -> Vec<&Note> {
    let superseded: BTreeSet<&str> = corpus
        .notes()
        .iter()
        .filter_map(|note| note.frontmatter.supersedes.as_deref())
        .collect();
    corpus
        .notes()
        .iter()
        .filter(|note| !superseded.contains(note.address()))
        .collect()
}

/// Lower-cased segment name -> occurrences, one per location.
pub fn build_registry(notes: &[&Note]) -> Registry {
    let mut registry: Registry = BTreeMap::new();
    for note in notes {
        let segments = address::parse(note.address());
        for (index, segment) in segments.iter().enumerate() {
            let key = segment.to_lowercase();
            if key.is_empty() || is_excluded(&key) {
                continue;
            }
            let location = address::join(&segments[..=index]);
            let is_leaf = index + 1 == segments.len();
            let occurrences = registry.entry(key).or_default();
            match occurrences.iter_mut().find(|o| o.location == location) {
                Some(existing) => existing.is_leaf |= is_leaf,
                None => occurrences.push(Occurrence {
                    parent: address::join(&segments[..index]),
                    location,
                    is_leaf,
                    is_root: index == 0,
                }),
            }
        }
    }
    registry
}

fn distinct_pairs(notes: &[&Note]) -> PairSet {
    notes
        .iter()
        .flat_map(|note| {
            note.frontmatter
                .distinct
                .iter()
                .map(move |other| pair_key(note.address(), other))
        })
        .collect()
}

fn tier_for(occurrences: &[&Occurrence]) -> CollisionTier {
    let leaves = occurrences.iter().filter(|o| o.is_leaf).count();
    if leaves >= 2 {
        CollisionTier::High
    } else if leaves == 1 || occurrences.iter().any(|o| o.is_root) {
        CollisionTier::Med
    } else {
        CollisionTier::Low
    }
}

/// Same segment word under two or more distinct parents.
pub fn check_segment_collisions(corpus: &Corpus) -> Vec<Issue> {
    let notes = active_notes(corpus);
    let registry = build_registry(&notes);
    let suppressed = distinct_pairs(&notes);

    let mut issues = Vec::new();
    for (segment, occurrences) in &registry {
        let active: Vec<&Occurrence> = occurrences
            .iter()
            .filter(|occurrence| {
                occurrences.iter().any(|partner| {
                    partner.parent != occurrence.parent
                        && !suppressed.contains(&pair_key(&occurrence.location, &partner.location))
                })
            })
            .collect();
        let parents: BTreeSet<&str> = active.iter().map(|o| o.parent.as_str()).collect();
        if parents.len() < 2 {
            continue;
        }
        let locations: Vec<&str> = active.iter().map(|o| o.location.as_str()).collect();
        issues.push(
            Issue::new(IssueCode::SegmentCollision)
                .with_tier(tier_for(&active))
                .with_detail(format!(
                    "segment `{segment}` appears under {} parents: {}",
                    parents.len(),
                    locations.join(", ")
                ))
                .with_related(locations),
        );
    }
    issues
}

/// Aliases shared by several notes, and aliases equal to a segment name
/// elsewhere in the hierarchy.
pub fn check_alias_collisions(corpus: &Corpus) -> Vec<Issue> {
    let notes = active_notes(corpus);
    let registry = build_registry(&notes);

    let mut owners: BTreeMap<String, Vec<&Note>> = BTreeMap::new();
    for note in &notes {
        let aliases: BTreeSet<String> = note
            .frontmatter
            .aliases
            .iter()
            .map(|alias| alias.trim().to_lowercase())
            .filter(|alias| !alias.is_empty() && !is_excluded(alias))
            .collect();
        for alias in aliases {
            owners.entry(alias).or_default().push(*note);
        }
    }

    let mut issues = Vec::new();
    for (alias, declared_by) in &owners {
        if declared_by.len() >= 2 {
            let addresses: Vec<&str> = declared_by.iter().map(|note| note.address()).collect();
            issues.push(
                Issue::new(IssueCode::DuplicateAlias)
                    .with_tier(CollisionTier::High)
                    .with_detail(format!(
                        "alias `{alias}` declared by {}",
                        addresses.join(", ")
                    ))
                    .with_related(addresses),
            );
        }

        let Some(occurrences) = registry.get(alias) else {
            continue;
        };
        for owner in declared_by {
            for occurrence in occurrences.iter().filter(|occurrence| {
                occurrence.location != owner.address()
                    && !address::is_descendant_of(owner.address(), &occurrence.location)
            }) {
                issues.push(
                    Issue::new(IssueCode::AliasCollision)
                        .with_uid(owner.uid())
                        .with_address(owner.address())
                        .with_tier(CollisionTier::High)
                        .with_related([occurrence.location.as_str()])
                        .with_detail(format!(
                            "alias `{alias}` matches segment at `{}`",
                            occurrence.location
                        )),
                );
            }
        }
    }
    issues
}

pub fn check_collisions(corpus: &Corpus) -> Vec<Issue> {
    let mut issues = check_segment_collisions(corpus);
    issues.extend(check_alias_collisions(corpus));
    issues
}

#[cfg(test)]
mod tests {
    use super::{build_registry, check_segment_collisions};
    use crate::model::corpus::Corpus;
    use crate::parser::parse_note;
    use crate::validate::CollisionTier;

    fn note(uid: &str, address: &str, extra: &str) -> crate::model::note::Note {
        parse_note(&format!(
            "---\nuid: {uid}\naddress: {address}\ndate: 2024-01-01\n{extra}---\nbody\n"
        ))
        .unwrap()
    }

    #[test]
    fn registry_merges_shared_locations() {
        let a = note("a", "Hardware//CPU", "");
        let b = note("b", "Hardware//CPU//cache", "");
        let registry = build_registry(&[&a, &b]);
        let cpu = &registry["cpu"];
        assert_eq!(cpu.len(), 1);
        assert!(cpu[0].is_leaf);
        assert_eq!(cpu[0].parent, "Hardware");
        assert!(registry["hardware"][0].is_root);
    }

    #[test]
    fn partial_suppression_keeps_collision() {
        let corpus = Corpus::new(vec![
            note("a", "A//cache", "distinct: [\"B//cache\"]\n"),
            note("b", "B//cache", ""),
            note("c", "C//cache", ""),
        ]);
        let issues = check_segment_collisions(&corpus);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].tier, Some(CollisionTier::High));
        assert_eq!(issues[0].related.len(), 3);
    }

    #[test]
    fn superseded_addresses_are_ignored() {
        let corpus = Corpus::new(vec![
            note("a", "A//cache", "supersedes: \"B//cache\"\n"),
            note("b", "B//cache", ""),
        ]);
        assert!(check_segment_collisions(&corpus).is_empty());
    }
}
