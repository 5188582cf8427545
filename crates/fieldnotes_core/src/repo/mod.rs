//! Persistence layer for raw note files.
//!
//! # Responsibility
//! - Define the note store contract used by services.
//! - Keep filesystem details out of parsing and validation.
//!
//! # Invariants
//! - The store deals in raw text only; parsing happens in services.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`) in
//!   addition to I/O failures.

pub mod note_repo;

pub use note_repo::{FsNoteRepository, NoteRepository, RawNoteFile, RepoError, RepoResult};
