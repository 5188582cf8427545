//! Fieldnote domain model.
//!
//! # Responsibility
//! - Define the parsed record for one markdown note file.
//! - Provide uid allocation and trailing-ref helpers.
//!
//! # Invariants
//! - `uid` is stable and never rewritten by author-facing operations.
//! - `address` is unique across the corpus (checked by the validator).
//! - `body` never contains frontmatter or the trailing-ref block.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::address;

/// Opaque note identifier, 8 lowercase alphanumeric chars when generated.
pub type NoteUid = String;

/// Length of generated uids.
pub const UID_LEN: usize = 8;

/// Frontmatter fields persisted at the top of every note file.
///
/// Field order here is the on-disk order produced by the serializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frontmatter {
    pub uid: NoteUid,
    pub address: String,
    pub name: String,
    pub date: NaiveDate,
    /// Alternate names, consulted only by collision analysis.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Address this note replaces; that address is excluded from collision analysis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<String>,
    /// Addresses whose segment collision with this note is intentional.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub distinct: Vec<String>,
}

/// One annotated interaction declared at the end of a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailingRef {
    pub uid: NoteUid,
    /// Trimmed annotation text; empty for bare refs.
    pub annotation: String,
}

impl TrailingRef {
    pub fn new(uid: impl Into<String>, annotation: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            annotation: annotation.into().trim().to_string(),
        }
    }

    /// True when no usable annotation is present (`""` and `''` count as empty).
    pub fn is_bare(&self) -> bool {
        let trimmed = self.annotation.trim();
        let unquoted = trimmed
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .or_else(|| {
                trimmed
                    .strip_prefix('\'')
                    .and_then(|rest| rest.strip_suffix('\''))
            })
            .unwrap_or(trimmed);
        unquoted.trim().is_empty()
    }
}

/// Parsed note: frontmatter plus derived body data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub frontmatter: Frontmatter,
    /// Markdown body without frontmatter and trailing refs.
    pub body: String,
    /// Uids referenced inline through `[[uid]]` / `[[uid|display]]`.
    pub references: BTreeSet<NoteUid>,
    /// Trailing refs in document order.
    pub trailing_refs: Vec<TrailingRef>,
}

impl Note {
    pub fn uid(&self) -> &str {
        &self.frontmatter.uid
    }

    pub fn address(&self) -> &str {
        &self.frontmatter.address
    }

    pub fn name(&self) -> &str {
        &self.frontmatter.name
    }

    pub fn date(&self) -> NaiveDate {
        self.frontmatter.date
    }

    /// Parent address, if the note is not root-level.
    pub fn parent_address(&self) -> Option<String> {
        address::parent(self.address())
    }

    /// Uids this note points at, inline or trailing, excluding itself.
    pub fn outgoing(&self) -> BTreeSet<&str> {
        self.references
            .iter()
            .map(String::as_str)
            .chain(self.trailing_refs.iter().map(|r| r.uid.as_str()))
            .filter(|uid| *uid != self.uid())
            .collect()
    }

    /// Whether this note references `uid` inline or in its trailing block.
    pub fn mentions(&self, uid: &str) -> bool {
        self.references.contains(uid) || self.trailing_refs.iter().any(|r| r.uid == uid)
    }
}

/// Allocates a fresh uid that `is_taken` does not report as used.
pub fn generate_uid(is_taken: impl Fn(&str) -> bool) -> NoteUid {
    loop {
        let candidate: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(UID_LEN)
            .collect();
        if !is_taken(candidate.as_str()) {
            return candidate;
        }
    }
}

/// Whether `value` is safe to use as a uid and file stem.
pub fn is_valid_uid(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::{generate_uid, is_valid_uid, TrailingRef, UID_LEN};

    #[test]
    fn generated_uid_is_alphanumeric_and_avoids_taken_values() {
        let uid = generate_uid(|candidate| candidate.starts_with('0'));
        assert_eq!(uid.len(), UID_LEN);
        assert!(uid.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(!uid.starts_with('0'));
        assert!(is_valid_uid(&uid));
    }

    #[test]
    fn quoted_empty_annotation_is_bare() {
        assert!(TrailingRef::new("a", "").is_bare());
        assert!(TrailingRef::new("a", "  \"\" ").is_bare());
        assert!(TrailingRef::new("a", "''").is_bare());
        assert!(!TrailingRef::new("a", "\"why\"").is_bare());
    }

    #[test]
    fn invalid_uids_are_rejected() {
        assert!(!is_valid_uid(""));
        assert!(!is_valid_uid("../etc"));
        assert!(!is_valid_uid("a b"));
    }
}
