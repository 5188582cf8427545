//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls, parsing, validation and compilation into
//!   use-case level APIs.
//! - Keep the CLI decoupled from storage details.

pub mod note_service;
pub mod rebuild_service;

pub use note_service::{
    load_corpus, CreateNote, DeleteOptions, DeleteReport, ImpactReport, LoadedCorpus,
    NoteService, NoteServiceError, NoteSummary, SaveOutcome, SkippedNote,
};
pub use rebuild_service::{
    IndexEntry, NoteContent, PersistStats, RebuildError, RebuildOutput, RebuildService,
    ResolvedTrailingRef,
};
