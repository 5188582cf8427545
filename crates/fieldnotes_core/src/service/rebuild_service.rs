//! Full corpus rebuild.
//!
//! # Responsibility
//! - Load every note, compile bodies, resolve links across the corpus,
//!   validate the graph and persist derived JSON artifacts.
//!
//! # Invariants
//! - Every rebuild starts from a fresh snapshot of the store; a single-note
//!   edit still rebuilds everything.
//! - Per-note parse or link failures are logged and skipped, never fatal.
//! - Content files for uids that no longer exist are removed.
//!
//! # See also
//! - `compiler` for the per-note pipeline and link resolver.
//! - `validate` for the graph checks.

use chrono::NaiveDate;
use log::{info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::note_service::{load_corpus, LoadedCorpus, SkippedNote};
use crate::compiler::{LinkResolver, MarkdownCompiler};
use crate::model::corpus::Corpus;
use crate::model::note::TrailingRef;
use crate::parser::description;
use crate::repo::{NoteRepository, RepoError};
use crate::validate::{validate_corpus, ValidationMode, ValidationReport};

pub const INDEX_FILE: &str = "index.json";
pub const CONTENT_DIR: &str = "notes";

#[derive(Debug)]
pub enum RebuildError {
    Repo(RepoError),
    /// JSON encoding failed.
    Serialize(String),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Display for RebuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Serialize(message) => write!(f, "failed to encode artifact: {message}"),
            Self::Io { path, source } => write!(f, "io error at {}: {source}", path.display()),
        }
    }
}

impl Error for RebuildError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Serialize(_) => None,
        }
    }
}

impl From<RepoError> for RebuildError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Lightweight metadata for one note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub uid: String,
    pub address: String,
    pub name: String,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Inline reference targets.
    pub references: Vec<String>,
    /// Trailing ref targets in declaration order.
    pub trailing_refs: Vec<String>,
    /// Uids of notes pointing here, inline or trailing.
    pub backlinks: Vec<String>,
}

/// Trailing ref with its annotation compiled and linked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTrailingRef {
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub annotation_html: String,
}

/// Compiled content for one note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteContent {
    pub uid: String,
    pub address: String,
    pub name: String,
    pub date: NaiveDate,
    pub html: String,
    pub trailing_refs: Vec<ResolvedTrailingRef>,
}

/// Everything one rebuild produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RebuildOutput {
    pub index: Vec<IndexEntry>,
    pub contents: Vec<NoteContent>,
    pub report: ValidationReport,
    pub skipped: Vec<SkippedNote>,
}

/// Files touched while persisting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistStats {
    pub written: usize,
    pub pruned: usize,
}

/// Rebuild orchestration over a note store.
pub struct RebuildService<R: NoteRepository> {
    repo: R,
    compiler: MarkdownCompiler,
    link_base: String,
    output_dir: PathBuf,
}

impl<R: NoteRepository> RebuildService<R> {
    pub fn new(
        repo: R,
        compiler: MarkdownCompiler,
        link_base: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            repo,
            compiler,
            link_base: link_base.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Load, compile, resolve, validate and persist.
    pub fn rebuild_all(&self) -> Result<RebuildOutput, RebuildError> {
        let started_at = Instant::now();
        info!("event=rebuild module=rebuild status=start");

        let loaded = load_corpus(&self.repo)?;
        let output = self.compile_corpus(loaded);
        let stats = self.persist(&output)?;

        info!(
            "event=rebuild module=rebuild status=ok notes={} skipped={} issues={} written={} pruned={} duration_ms={}",
            output.index.len(),
            output.skipped.len(),
            output.report.issues.len(),
            stats.written,
            stats.pruned,
            started_at.elapsed().as_millis()
        );
        Ok(output)
    }

    /// Builds every artifact in memory without touching disk.
    pub fn compile_corpus(&self, loaded: LoadedCorpus) -> RebuildOutput {
        let LoadedCorpus {
            corpus,
            mut skipped,
        } = loaded;
        let link_map = corpus.link_map();
        let resolver = LinkResolver::new(&link_map, &self.link_base);
        let backlinks = backlinks(&corpus);

        let mut seen = HashSet::new();
        let mut index = Vec::with_capacity(corpus.len());
        let mut contents = Vec::with_capacity(corpus.len());
        for note in corpus.notes() {
            if !seen.insert(note.uid()) {
                warn!(
                    "event=rebuild module=rebuild status=duplicate_uid uid={} address={}",
                    note.uid(),
                    note.address()
                );
                continue;
            }

            index.push(IndexEntry {
                uid: note.uid().to_string(),
                address: note.address().to_string(),
                name: note.name().to_string(),
                date: note.date(),
                description: description(&note.body),
                aliases: note.frontmatter.aliases.clone(),
                references: note.references.iter().cloned().collect(),
                trailing_refs: note.trailing_refs.iter().map(|r| r.uid.clone()).collect(),
                backlinks: backlinks
                    .get(note.uid())
                    .map(|set| set.iter().map(|uid| uid.to_string()).collect())
                    .unwrap_or_default(),
            });

            let compiled = self.compiler.compile(&note.body, note.date());
            let resolved = resolver.resolve(&compiled).and_then(|html| {
                self.resolve_trailing(&resolver, &corpus, &note.trailing_refs)
                    .map(|trailing| (html, trailing))
            });
            match resolved {
                Ok((html, trailing_refs)) => contents.push(NoteContent {
                    uid: note.uid().to_string(),
                    address: note.address().to_string(),
                    name: note.name().to_string(),
                    date: note.date(),
                    html,
                    trailing_refs,
                }),
                Err(err) => {
                    warn!(
                        "event=rebuild module=rebuild status=link_error uid={} error={err}",
                        note.uid()
                    );
                    skipped.push(SkippedNote {
                        uid: note.uid().to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        let report = validate_corpus(&corpus, ValidationMode::Verbose);
        RebuildOutput {
            index,
            contents,
            report,
            skipped,
        }
    }

    fn resolve_trailing(
        &self,
        resolver: &LinkResolver<'_>,
        corpus: &Corpus,
        trailing_refs: &[TrailingRef],
    ) -> Result<Vec<ResolvedTrailingRef>, crate::compiler::LinkError> {
        trailing_refs
            .iter()
            .map(|trailing| {
                let target = corpus.get(&trailing.uid);
                Ok(ResolvedTrailingRef {
                    uid: trailing.uid.clone(),
                    address: target.map(|note| note.address().to_string()),
                    name: target.map(|note| note.name().to_string()),
                    annotation_html: resolver
                        .resolve(&self.compiler.compile_inline(&trailing.annotation))?,
                })
            })
            .collect()
    }

    /// Writes the index and per-note content files, pruning stale ones.
    pub fn persist(&self, output: &RebuildOutput) -> Result<PersistStats, RebuildError> {
        let content_dir = self.output_dir.join(CONTENT_DIR);
        fs::create_dir_all(&content_dir).map_err(|source| RebuildError::Io {
            path: content_dir.clone(),
            source,
        })?;

        let mut stats = PersistStats::default();
        write_json(&self.output_dir.join(INDEX_FILE), &output.index)?;
        stats.written += 1;

        let mut live = BTreeSet::new();
        for content in &output.contents {
            write_json(&content_dir.join(format!("{}.json", content.uid)), content)?;
            live.insert(content.uid.as_str());
            stats.written += 1;
        }
        stats.pruned = prune_stale(&content_dir, &live)?;
        Ok(stats)
    }
}

/// Target uid -> uids of other notes pointing at it.
fn backlinks(corpus: &Corpus) -> BTreeMap<&str, BTreeSet<&str>> {
    let mut map: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for note in corpus.notes() {
        for target in note.outgoing() {
            map.entry(target).or_default().insert(note.uid());
        }
    }
    map
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), RebuildError> {
    let bytes =
        serde_json::to_vec_pretty(value).map_err(|err| RebuildError::Serialize(err.to_string()))?;
    fs::write(path, bytes).map_err(|source| RebuildError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn prune_stale(content_dir: &Path, live: &BTreeSet<&str>) -> Result<usize, RebuildError> {
    let io_error = |source| RebuildError::Io {
        path: content_dir.to_path_buf(),
        source,
    };
    let mut pruned = 0;
    for entry in fs::read_dir(content_dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        if live.contains(stem) {
            continue;
        }
        fs::remove_file(&path).map_err(|source| RebuildError::Io {
            path: path.clone(),
            source,
        })?;
        info!("event=rebuild module=rebuild status=pruned uid={stem}");
        pruned += 1;
    }
    Ok(pruned)
}
