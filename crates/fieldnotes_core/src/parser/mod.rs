//! Note file parsing and serialization.
//!
//! # Responsibility
//! - Turn one raw note file into a `Note` (frontmatter, body, refs).
//! - Write a `Note` back to its on-disk text form.
//!
//! # Invariants
//! - Missing or malformed frontmatter is a hard parse error.
//! - `parse_note(serialize_note(note))` yields an equal logical note.

use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::model::note::Note;

pub mod frontmatter;
pub mod refs;
pub mod serialize;

pub use frontmatter::{normalize_date, split_frontmatter};
pub use refs::{
    description, parse_trailing_refs, references, strip_trailing_refs, TrailingBlock,
};
pub use serialize::{rewrite_content, serialize, serialize_note};

/// Parse/format failure for a single note file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// File does not start with a `---` delimited frontmatter block.
    MissingFrontmatter,
    /// Frontmatter is not valid YAML or not a mapping.
    InvalidYaml(String),
    /// Required frontmatter field is absent or blank.
    MissingField(&'static str),
    /// Frontmatter field is present but unusable.
    InvalidField {
        field: &'static str,
        message: String,
    },
    /// Frontmatter could not be rendered back to YAML.
    Serialize(String),
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingFrontmatter => write!(f, "missing `---` delimited frontmatter"),
            Self::InvalidYaml(message) => write!(f, "invalid frontmatter yaml: {message}"),
            Self::MissingField(field) => write!(f, "missing required frontmatter field `{field}`"),
            Self::InvalidField { field, message } => {
                write!(f, "invalid frontmatter field `{field}`: {message}")
            }
            Self::Serialize(message) => write!(f, "failed to serialize frontmatter: {message}"),
        }
    }
}

impl Error for ParseError {}

/// Parses one raw note file.
pub fn parse_note(raw: &str) -> Result<Note, ParseError> {
    let (yaml, rest) = split_frontmatter(raw)?;
    let frontmatter = frontmatter::parse_frontmatter(yaml)?;

    let block = parse_trailing_refs(rest);
    let body = match block.start_line {
        Some(start) => strip_trailing_refs(rest, start),
        None => rest.trim().to_string(),
    };
    let references = references(&body);

    Ok(Note {
        frontmatter,
        body,
        references,
        trailing_refs: block.refs,
    })
}
