//! Note authoring use-cases.
//!
//! # Responsibility
//! - Load the corpus snapshot from the store.
//! - Provide read/validate/save/create/delete/stub/impact operations.
//!
//! # Invariants
//! - A note's uid is never changed by `save`; edits to it are reverted
//!   before anything is written.
//! - `save` writes whenever the text parses, whatever the validation result.
//! - `create` fails on an existing address instead of reusing it.
//! - Every operation re-reads the store; there is no cached corpus.

use chrono::{Local, NaiveDate};
use log::{info, warn};
use once_cell::sync::Lazy;
use rand::RngExt;
use regex::Regex;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::compiler::protect::protect_markdown_code;
use crate::model::address;
use crate::model::corpus::Corpus;
use crate::model::note::{generate_uid, Frontmatter, Note, NoteUid, TrailingRef};
use crate::parser::{
    parse_note, parse_trailing_refs, rewrite_content, serialize, split_frontmatter, ParseError,
};
use crate::repo::{NoteRepository, RepoError, RepoResult};
use crate::validate::{validate_draft, Issue, IssueCode};

static UID_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^uid[ \t]*:[ \t]*(.*?)[ \t]*$").expect("valid uid line regex"));

/// Placeholder bodies for stubs and freshly created notes.
pub const STUB_PLACEHOLDERS: &[&str] = &[
    "This note is a stub. Its content has not been written yet.",
    "Placeholder: the details for this note are still to come.",
    "Nothing here yet. This stub keeps the address and its connections alive.",
    "Stub note. Expand it when the idea has matured.",
    "This space is reserved; the write-up is pending.",
];

/// Service error for note use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    /// No note file backs the uid.
    NotFound(String),
    /// Another note already occupies the address.
    Conflict { address: String },
    /// Address is empty or has empty segments.
    InvalidAddress(String),
    /// A new body ends in lines that would be read back as trailing refs.
    TrailingRefsInBody { uids: Vec<String> },
    Parse(ParseError),
    Repo(RepoError),
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(uid) => write!(f, "note not found: {uid}"),
            Self::Conflict { address } => write!(f, "address already exists: `{address}`"),
            Self::InvalidAddress(address) => write!(f, "invalid address: `{address}`"),
            Self::TrailingRefsInBody { uids } => write!(
                f,
                "body ends with a trailing-ref block ({}); move those refs out of the body",
                uids.join(", ")
            ),
            Self::Parse(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for NoteServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(uid) => Self::NotFound(uid),
            other => Self::Repo(other),
        }
    }
}

impl From<ParseError> for NoteServiceError {
    fn from(value: ParseError) -> Self {
        Self::Parse(value)
    }
}

/// A file left out of the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedNote {
    /// File stem (or uid) of the offending note.
    pub uid: String,
    pub reason: String,
}

/// Corpus snapshot plus the files that could not join it.
#[derive(Debug, Clone, Default)]
pub struct LoadedCorpus {
    pub corpus: Corpus,
    pub skipped: Vec<SkippedNote>,
}

/// Result of `save`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    pub issues: Vec<Issue>,
    pub persisted: bool,
    /// True when the submitted text changed or dropped the uid.
    pub uid_restored: bool,
}

/// Input for `create`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateNote {
    pub address: String,
    pub name: Option<String>,
    pub date: Option<NaiveDate>,
    pub body: Option<String>,
}

impl CreateNote {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }
}

/// Cleanup applied to other notes when deleting one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Drop trailing refs that point at the deleted note.
    pub cleanup_trailing_refs: bool,
    /// Restrict cleanup to these notes; empty means every note.
    pub target_uids: Vec<String>,
    /// Replace inline `[[uid]]` tokens with plain text.
    pub unlink_body_refs: bool,
}

/// What `delete_note` touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub deleted: String,
    /// Uids of notes rewritten during cleanup.
    pub rewritten: Vec<String>,
}

/// Summary of one note as seen from an impact report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteSummary {
    pub uid: String,
    pub address: String,
    pub name: String,
}

impl From<&Note> for NoteSummary {
    fn from(note: &Note) -> Self {
        Self {
            uid: note.uid().to_string(),
            address: note.address().to_string(),
            name: note.name().to_string(),
        }
    }
}

/// Pre-deletion impact of removing one note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImpactReport {
    pub uid: String,
    pub address: String,
    /// Notes linking to the target inline.
    pub body_refs: Vec<NoteSummary>,
    /// Notes listing the target in their trailing block.
    pub trailing_refs: Vec<NoteSummary>,
    /// The target's own trailing refs.
    pub own_trailing_refs: Vec<TrailingRef>,
    /// Notes addressed below the target.
    pub children: Vec<NoteSummary>,
}

/// Note service facade over a note store.
pub struct NoteService<R: NoteRepository> {
    repo: R,
}

impl<R: NoteRepository> NoteService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Parses every stored file into a fresh snapshot.
    pub fn load_corpus(&self) -> Result<LoadedCorpus, NoteServiceError> {
        Ok(load_corpus(&self.repo)?)
    }

    pub fn read_raw(&self, uid: &str) -> Result<String, NoteServiceError> {
        Ok(self.repo.read_raw(uid)?)
    }

    /// Validates unsaved text against the current store. No side effects.
    pub fn validate(&self, raw: &str) -> Result<Vec<Issue>, NoteServiceError> {
        let loaded = self.load_corpus()?;
        Ok(validate_draft(raw, &loaded.corpus))
    }

    /// Rewrites the file for `uid` with `raw`.
    ///
    /// The uid field is forced back to `uid`. Text that does not parse is
    /// not written and comes back as a single `PARSE_FAILURE` issue.
    pub fn save(&self, uid: &str, raw: &str) -> Result<SaveOutcome, NoteServiceError> {
        if !self.repo.exists(uid)? {
            return Err(NoteServiceError::NotFound(uid.to_string()));
        }
        let (text, uid_restored) = restore_uid(raw, uid);
        if uid_restored {
            warn!("event=note_save module=note_service status=uid_restored uid={uid}");
        }
        if let Err(err) = parse_note(&text) {
            warn!("event=note_save module=note_service status=rejected uid={uid} error={err}");
            return Ok(SaveOutcome {
                issues: vec![Issue::new(IssueCode::ParseFailure)
                    .with_uid(uid)
                    .with_detail(err.to_string())],
                persisted: false,
                uid_restored,
            });
        }

        self.repo.write_raw(uid, &text)?;
        let loaded = self.load_corpus()?;
        let issues = validate_draft(&text, &loaded.corpus);
        info!(
            "event=note_save module=note_service status=ok uid={uid} issues={}",
            issues.len()
        );
        Ok(SaveOutcome {
            issues,
            persisted: true,
            uid_restored,
        })
    }

    /// Creates a new note file and returns its uid.
    pub fn create(&self, input: CreateNote) -> Result<NoteUid, NoteServiceError> {
        let address = address::normalize(&input.address);
        if address.is_empty() || address::has_empty_segment(&address) {
            return Err(NoteServiceError::InvalidAddress(input.address));
        }
        let loaded = self.load_corpus()?;
        if loaded.corpus.contains_address(&address) {
            return Err(NoteServiceError::Conflict { address });
        }

        let uid = generate_uid(|candidate| {
            loaded.corpus.contains_uid(candidate) || self.repo.exists(candidate).unwrap_or(true)
        });
        let name = input
            .name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| address::leaf(&address));
        let frontmatter = Frontmatter {
            uid: uid.clone(),
            address,
            name,
            date: input.date.unwrap_or_else(|| Local::now().date_naive()),
            aliases: Vec::new(),
            supersedes: None,
            distinct: Vec::new(),
        };
        let body = input
            .body
            .filter(|body| !body.trim().is_empty())
            .unwrap_or_else(stub_placeholder);
        let tail = parse_trailing_refs(&body);
        if tail.start_line.is_some() {
            return Err(NoteServiceError::TrailingRefsInBody {
                uids: tail.refs.into_iter().map(|trailing| trailing.uid).collect(),
            });
        }

        let raw = serialize(&frontmatter, &body, &[])?;
        self.repo.create_raw(&uid, &raw)?;
        info!(
            "event=note_create module=note_service status=ok uid={uid} address={}",
            frontmatter.address
        );
        Ok(uid)
    }

    /// Deletes a note after optionally cleaning references to it elsewhere.
    ///
    /// Cleanup rewrites happen before the file is removed. A failure midway
    /// leaves earlier rewrites in place.
    pub fn delete_note(
        &self,
        uid: &str,
        options: &DeleteOptions,
    ) -> Result<DeleteReport, NoteServiceError> {
        if !self.repo.exists(uid)? {
            return Err(NoteServiceError::NotFound(uid.to_string()));
        }
        let loaded = self.load_corpus()?;
        let name = loaded
            .corpus
            .get(uid)
            .map(|note| note.name().to_string())
            .unwrap_or_else(|| uid.to_string());

        let mut rewritten = Vec::new();
        if options.cleanup_trailing_refs || options.unlink_body_refs {
            for other in loaded.corpus.notes().iter().filter(|note| {
                note.uid() != uid
                    && (options.target_uids.is_empty()
                        || options.target_uids.iter().any(|target| target == note.uid()))
            }) {
                let mut trailing = other.trailing_refs.clone();
                if options.cleanup_trailing_refs {
                    trailing.retain(|trailing| trailing.uid != uid);
                }
                let body = if options.unlink_body_refs {
                    unlink_refs(&other.body, uid, &name)
                } else {
                    other.body.clone()
                };
                if trailing.len() == other.trailing_refs.len() && body == other.body {
                    continue;
                }
                let current = self.repo.read_raw(other.uid())?;
                let raw = rewrite_content(&current, &body, &trailing)?;
                self.repo.write_raw(other.uid(), &raw)?;
                rewritten.push(other.uid().to_string());
            }
        }

        self.repo.delete(uid)?;
        info!(
            "event=note_delete module=note_service status=ok uid={uid} rewritten={}",
            rewritten.len()
        );
        Ok(DeleteReport {
            deleted: uid.to_string(),
            rewritten,
        })
    }

    /// Replaces the body with a placeholder, keeping the frontmatter text
    /// and trailing refs.
    pub fn convert_to_stub(&self, uid: &str) -> Result<(), NoteServiceError> {
        let raw = self.repo.read_raw(uid)?;
        let note = parse_note(&raw)?;
        let stub = rewrite_content(&raw, &stub_placeholder(), &note.trailing_refs)?;
        self.repo.write_raw(uid, &stub)?;
        info!("event=note_stub module=note_service status=ok uid={uid}");
        Ok(())
    }

    /// Lists everything that points at or hangs below `uid`.
    pub fn analyze_impact(&self, uid: &str) -> Result<ImpactReport, NoteServiceError> {
        let loaded = self.load_corpus()?;
        let corpus = &loaded.corpus;
        let target = corpus
            .get(uid)
            .ok_or_else(|| NoteServiceError::NotFound(uid.to_string()))?;
        let others = move || corpus.notes().iter().filter(move |note| note.uid() != uid);

        Ok(ImpactReport {
            uid: uid.to_string(),
            address: target.address().to_string(),
            body_refs: others()
                .filter(|note| note.references.contains(uid))
                .map(NoteSummary::from)
                .collect(),
            trailing_refs: others()
                .filter(|note| note.trailing_refs.iter().any(|r| r.uid == uid))
                .map(NoteSummary::from)
                .collect(),
            own_trailing_refs: target.trailing_refs.clone(),
            children: others()
                .filter(|note| address::is_descendant_of(note.address(), target.address()))
                .map(NoteSummary::from)
                .collect(),
        })
    }
}

/// Parses every stored file into a fresh snapshot.
///
/// Files that fail to parse, or whose frontmatter uid differs from the file
/// name, are logged and listed in `skipped`.
pub fn load_corpus<R: NoteRepository + ?Sized>(repo: &R) -> RepoResult<LoadedCorpus> {
    let mut notes = Vec::new();
    let mut skipped = Vec::new();
    for file in repo.list_raw()? {
        match parse_note(&file.raw) {
            Ok(note) if note.uid() != file.stem => {
                warn!(
                    "event=corpus_load module=note_service status=uid_mismatch file={} uid={}",
                    file.stem,
                    note.uid()
                );
                skipped.push(SkippedNote {
                    reason: format!("frontmatter uid `{}` does not match file name", note.uid()),
                    uid: file.stem,
                });
            }
            Ok(note) => notes.push(note),
            Err(err) => {
                warn!(
                    "event=corpus_load module=note_service status=skipped file={} error={err}",
                    file.stem
                );
                skipped.push(SkippedNote {
                    uid: file.stem,
                    reason: err.to_string(),
                });
            }
        }
    }
    Ok(LoadedCorpus {
        corpus: Corpus::new(notes),
        skipped,
    })
}

/// Picks a random non-empty placeholder body.
pub fn stub_placeholder() -> String {
    let index = rand::rng().random_range(0..STUB_PLACEHOLDERS.len());
    STUB_PLACEHOLDERS[index].to_string()
}

/// Forces the frontmatter `uid` field back to `uid`.
///
/// Returns the (possibly rewritten) text and whether a change was needed.
/// Text without a frontmatter block is returned untouched.
pub fn restore_uid(raw: &str, uid: &str) -> (String, bool) {
    let Ok((yaml, rest)) = split_frontmatter(raw) else {
        return (raw.to_string(), false);
    };
    let current = UID_LINE_RE
        .captures(yaml)
        .and_then(|caps| caps.get(1))
        .map(|value| value.as_str().trim_matches(|c| c == '"' || c == '\''));
    if current == Some(uid) {
        return (raw.to_string(), false);
    }

    let uid_line = format!("uid: {uid}");
    let yaml = if UID_LINE_RE.is_match(yaml) {
        UID_LINE_RE
            .replacen(yaml, 1, regex::NoExpand(&uid_line))
            .into_owned()
    } else {
        format!("{uid_line}\n{yaml}")
    };
    let separator = if yaml.ends_with('\n') { "" } else { "\n" };
    (format!("---\n{yaml}{separator}---\n{rest}"), true)
}

/// Replaces `[[uid|text]]` with `text` and `[[uid]]` with `name`, outside code.
pub fn unlink_refs(body: &str, uid: &str, name: &str) -> String {
    let pattern = format!(r"\[\[\s*{}\s*(?:\|([^\[\]]*))?\]\]", regex::escape(uid));
    let Ok(token) = Regex::new(&pattern) else {
        return body.to_string();
    };
    let (protected, code) = protect_markdown_code(body);
    let replaced = token.replace_all(&protected, |caps: &regex::Captures| {
        caps.get(1)
            .map(|display| display.as_str().trim())
            .filter(|display| !display.is_empty())
            .unwrap_or(name)
            .to_string()
    });
    code.restore(&replaced)
}

#[cfg(test)]
mod tests {
    use super::{restore_uid, unlink_refs};

    #[test]
    fn changed_uid_is_reverted() {
        let (text, restored) = restore_uid("---\nuid: hacked\naddress: A\n---\nbody\n", "orig1234");
        assert!(restored);
        assert_eq!(text, "---\nuid: orig1234\naddress: A\n---\nbody\n");
    }

    #[test]
    fn removed_uid_is_reinserted() {
        let (text, restored) = restore_uid("---\naddress: A\n---\nbody\n", "orig1234");
        assert!(restored);
        assert!(text.starts_with("---\nuid: orig1234\naddress: A\n---\n"));
    }

    #[test]
    fn quoted_matching_uid_is_left_alone() {
        let raw = "---\nuid: \"orig1234\"\naddress: A\n---\nbody\n";
        assert_eq!(restore_uid(raw, "orig1234"), (raw.to_string(), false));
    }

    #[test]
    fn unlinking_keeps_display_text_and_code() {
        let body = "See [[dead1234|the old note]] and [[dead1234]]. `[[dead1234]]`";
        assert_eq!(
            unlink_refs(body, "dead1234", "Old"),
            "See the old note and Old. `[[dead1234]]`"
        );
    }
}
