//! Core library for fieldnotes: a hierarchical, cross-referenced note corpus
//! compiled to HTML and checked for graph integrity.
//! This crate is the single source of truth for note invariants.

pub mod compiler;
pub mod config;
pub mod logging;
pub mod model;
pub mod parser;
pub mod repo;
pub mod service;
pub mod validate;

pub use compiler::{CodeHighlighter, LexicalHighlighter, LinkError, LinkResolver, MarkdownCompiler};
pub use config::{ConfigError, FieldnotesConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::corpus::{Corpus, LinkMap, LinkTarget};
pub use model::note::{Frontmatter, Note, NoteUid, TrailingRef};
pub use parser::{parse_note, rewrite_content, serialize, serialize_note, ParseError};
pub use repo::{FsNoteRepository, NoteRepository, RepoError, RepoResult};
pub use service::{
    CreateNote, DeleteOptions, DeleteReport, ImpactReport, NoteService, NoteServiceError,
    RebuildError, RebuildOutput, RebuildService, SaveOutcome,
};
pub use validate::{
    validate_corpus, validate_draft, Issue, IssueCode, Severity, ValidationMode,
    ValidationReport,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
