//! Immutable corpus snapshot.
//!
//! # Responsibility
//! - Hold the full parsed note set for one rebuild or validation pass.
//! - Answer uid/address lookups and build the link target map.
//!
//! # Invariants
//! - A snapshot is never patched in place; `with_note` returns a new one.
//! - Duplicate uids/addresses are kept in `notes()` so the validator can
//!   report them; lookups resolve to the first occurrence.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::note::Note;

/// Link metadata for one uid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkTarget {
    pub address: String,
    pub name: String,
}

/// `uid -> {address, name}` map consumed by the link resolver.
pub type LinkMap = BTreeMap<String, LinkTarget>;

/// Snapshot of every parsed note.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    notes: Vec<Note>,
    by_uid: HashMap<String, usize>,
    by_address: HashMap<String, usize>,
}

impl Corpus {
    pub fn new(notes: Vec<Note>) -> Self {
        let mut by_uid = HashMap::new();
        let mut by_address = HashMap::new();
        for (index, note) in notes.iter().enumerate() {
            by_uid.entry(note.uid().to_string()).or_insert(index);
            by_address.entry(note.address().to_string()).or_insert(index);
        }
        Self {
            notes,
            by_uid,
            by_address,
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn get(&self, uid: &str) -> Option<&Note> {
        self.by_uid.get(uid).map(|index| &self.notes[*index])
    }

    pub fn by_address(&self, address: &str) -> Option<&Note> {
        self.by_address.get(address).map(|index| &self.notes[*index])
    }

    pub fn contains_uid(&self, uid: &str) -> bool {
        self.by_uid.contains_key(uid)
    }

    pub fn contains_address(&self, address: &str) -> bool {
        self.by_address.contains_key(address)
    }

    /// Builds the uid metadata map used for link resolution.
    pub fn link_map(&self) -> LinkMap {
        let mut map = LinkMap::new();
        for note in &self.notes {
            map.entry(note.uid().to_string())
                .or_insert_with(|| LinkTarget {
                    address: note.address().to_string(),
                    name: note.name().to_string(),
                });
        }
        map
    }

    /// Returns a new snapshot with `note` replacing the note sharing its uid,
    /// or appended when the uid is new.
    pub fn with_note(&self, note: Note) -> Corpus {
        let mut notes = self.notes.clone();
        match notes.iter().position(|existing| existing.uid() == note.uid()) {
            Some(index) => notes[index] = note,
            None => notes.push(note),
        }
        Corpus::new(notes)
    }

    /// Returns a new snapshot without the note carrying `uid`.
    pub fn without(&self, uid: &str) -> Corpus {
        Corpus::new(
            self.notes
                .iter()
                .filter(|note| note.uid() != uid)
                .cloned()
                .collect(),
        )
    }
}
