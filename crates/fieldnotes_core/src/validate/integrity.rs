//! Structural checks: uniqueness, referential integrity, trailing-ref
//! discipline, parent hierarchy and isolation.

use std::collections::{BTreeMap, BTreeSet};

use super::{Issue, IssueCode};
use crate::model::address;
use crate::model::corpus::Corpus;

/// Duplicate uids, duplicate addresses and empty address segments.
pub fn check_uniqueness(corpus: &Corpus) -> Vec<Issue> {
    let mut by_uid: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut by_address: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for note in corpus.notes() {
        by_uid.entry(note.uid()).or_default().push(note.address());
        by_address.entry(note.address()).or_default().push(note.uid());
    }

    let mut issues = Vec::new();
    for (uid, addresses) in by_uid.into_iter().filter(|(_, list)| list.len() > 1) {
        issues.push(
            Issue::new(IssueCode::DuplicateUid)
                .with_uid(uid)
                .with_detail(format!("uid declared by {} files", addresses.len()))
                .with_related(addresses),
        );
    }
    for (address, uids) in by_address.into_iter().filter(|(_, list)| list.len() > 1) {
        issues.push(
            Issue::new(IssueCode::DuplicateAddress)
                .with_address(address)
                .with_detail(format!("address used by {} notes", uids.len()))
                .with_related(uids),
        );
    }
    for note in corpus.notes() {
        if address::has_empty_segment(note.address()) {
            issues.push(
                Issue::new(IssueCode::EmptySegment)
                    .with_uid(note.uid())
                    .with_address(note.address())
                    .with_detail("address has an empty segment"),
            );
        }
    }
    issues
}

/// Inline and trailing refs must resolve to known uids.
pub fn check_referential_integrity(corpus: &Corpus) -> Vec<Issue> {
    let mut issues = Vec::new();
    for note in corpus.notes() {
        for target in note.references.iter().filter(|uid| !corpus.contains_uid(uid)) {
            issues.push(
                Issue::new(IssueCode::BrokenRef)
                    .with_uid(note.uid())
                    .with_address(note.address())
                    .with_related([target.as_str()])
                    .with_detail(format!("[[{target}]] does not resolve")),
            );
        }
        for trailing in note
            .trailing_refs
            .iter()
            .filter(|trailing| !corpus.contains_uid(&trailing.uid))
        {
            issues.push(
                Issue::new(IssueCode::BrokenTrailingRef)
                    .with_uid(note.uid())
                    .with_address(note.address())
                    .with_related([trailing.uid.as_str()])
                    .with_detail(format!("trailing [[{}]] does not resolve", trailing.uid)),
            );
        }
    }
    issues
}

/// A trailing ref pointing at its own note.
pub fn check_self_references(corpus: &Corpus) -> Vec<Issue> {
    corpus
        .notes()
        .iter()
        .flat_map(|note| {
            note.trailing_refs
                .iter()
                .filter(move |trailing| trailing.uid == note.uid())
                .map(move |_| {
                    Issue::new(IssueCode::SelfTrailingRef)
                        .with_uid(note.uid())
                        .with_address(note.address())
                        .with_detail("trailing ref points at its own note")
                })
        })
        .collect()
}

/// Every trailing ref needs a non-empty annotation.
pub fn check_bare_trailing_refs(corpus: &Corpus) -> Vec<Issue> {
    corpus
        .notes()
        .iter()
        .flat_map(|note| {
            note.trailing_refs
                .iter()
                .filter(|trailing| trailing.is_bare())
                .map(move |trailing| {
                    Issue::new(IssueCode::BareTrailingRef)
                        .with_uid(note.uid())
                        .with_address(note.address())
                        .with_related([trailing.uid.as_str()])
                        .with_detail(format!("[[{}]] needs an annotation", trailing.uid))
                })
        })
        .collect()
}

/// Ancestor addresses without a note, reported once per missing ancestor.
pub fn check_parent_hierarchy(corpus: &Corpus) -> Vec<Issue> {
    let mut missing: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
    for note in corpus.notes() {
        for ancestor in address::ancestors(note.address()) {
            if !corpus.contains_address(&ancestor) {
                missing.entry(ancestor).or_default().insert(note.uid());
            }
        }
    }
    missing
        .into_iter()
        .map(|(ancestor, descendants)| {
            Issue::new(IssueCode::MissingParent)
                .with_detail(format!(
                    "no note at `{ancestor}` ({} descendant(s))",
                    descendants.len()
                ))
                .with_address(ancestor)
                .with_related(descendants)
        })
        .collect()
}

/// Notes with neither outgoing nor incoming references.
pub fn check_isolation(corpus: &Corpus) -> Vec<Issue> {
    let incoming: BTreeSet<&str> = corpus
        .notes()
        .iter()
        .flat_map(|note| note.outgoing())
        .collect();
    corpus
        .notes()
        .iter()
        .filter(|note| note.outgoing().is_empty() && !incoming.contains(note.uid()))
        .map(|note| {
            Issue::new(IssueCode::IsolatedNote)
                .with_uid(note.uid())
                .with_address(note.address())
                .with_detail("no references in or out")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{check_parent_hierarchy, check_uniqueness};
    use crate::model::corpus::Corpus;
    use crate::parser::parse_note;
    use crate::validate::IssueCode;

    fn note(uid: &str, address: &str) -> crate::model::note::Note {
        parse_note(&format!(
            "---\nuid: {uid}\naddress: \"{address}\"\ndate: 2024-01-01\n---\nbody\n"
        ))
        .unwrap()
    }

    #[test]
    fn missing_ancestors_are_reported_once() {
        let corpus = Corpus::new(vec![note("aaa", "A//B//C"), note("bbb", "A//B//D")]);
        let issues = check_parent_hierarchy(&corpus);
        let addresses: Vec<_> = issues.iter().map(|i| i.address.clone().unwrap()).collect();
        assert_eq!(addresses, vec!["A".to_string(), "A//B".to_string()]);
        assert_eq!(issues[1].related, vec!["aaa".to_string(), "bbb".to_string()]);
    }

    #[test]
    fn duplicates_are_errors() {
        let corpus = Corpus::new(vec![note("aaa", "X"), note("aaa", "Y"), note("ccc", "Y")]);
        let codes: Vec<_> = check_uniqueness(&corpus).iter().map(|i| i.code).collect();
        assert_eq!(codes, vec![IssueCode::DuplicateUid, IssueCode::DuplicateAddress]);
    }
}
