//! Reference graph validation.
//!
//! # Responsibility
//! - Run every graph check over one full corpus snapshot.
//! - Produce typed, structured issues; rendering text is layered on top.
//! - Validate a single draft against the snapshot it would join.
//!
//! # Invariants
//! - Checks always see the whole corpus; there is no partial mode.
//! - Checks are independent: each one adds issues, none filters another's.
//! - Issue order is deterministic for a given corpus.
//!
//! # See also
//! - `integrity`, `cycles`, `collisions` for the individual phases.

pub mod collisions;
pub mod cycles;
pub mod integrity;

use log::{error, info, warn};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::time::Instant;

use crate::model::corpus::Corpus;
use crate::parser::parse_note;

/// Issue severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Error,
    Warn,
    Info,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
        };
        f.write_str(label)
    }
}

/// Stable issue codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    DuplicateUid,
    DuplicateAddress,
    EmptySegment,
    BrokenRef,
    BrokenTrailingRef,
    SelfTrailingRef,
    BareTrailingRef,
    MissingParent,
    CircularRef,
    SegmentCollision,
    AliasCollision,
    DuplicateAlias,
    IsolatedNote,
    ParseFailure,
}

impl IssueCode {
    pub const ALL: [IssueCode; 14] = [
        Self::DuplicateUid,
        Self::DuplicateAddress,
        Self::EmptySegment,
        Self::BrokenRef,
        Self::BrokenTrailingRef,
        Self::SelfTrailingRef,
        Self::BareTrailingRef,
        Self::MissingParent,
        Self::CircularRef,
        Self::SegmentCollision,
        Self::AliasCollision,
        Self::DuplicateAlias,
        Self::IsolatedNote,
        Self::ParseFailure,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateUid => "DUPLICATE_UID",
            Self::DuplicateAddress => "DUPLICATE_ADDRESS",
            Self::EmptySegment => "EMPTY_SEGMENT",
            Self::BrokenRef => "BROKEN_REF",
            Self::BrokenTrailingRef => "BROKEN_TRAILING_REF",
            Self::SelfTrailingRef => "SELF_TRAILING_REF",
            Self::BareTrailingRef => "BARE_TRAILING_REF",
            Self::MissingParent => "MISSING_PARENT",
            Self::CircularRef => "CIRCULAR_REF",
            Self::SegmentCollision => "SEGMENT_COLLISION",
            Self::AliasCollision => "ALIAS_COLLISION",
            Self::DuplicateAlias => "DUPLICATE_ALIAS",
            Self::IsolatedNote => "ISOLATED_NOTE",
            Self::ParseFailure => "PARSE_FAILURE",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            Self::DuplicateUid
            | Self::DuplicateAddress
            | Self::EmptySegment
            | Self::BrokenRef
            | Self::BrokenTrailingRef
            | Self::BareTrailingRef
            | Self::ParseFailure => Severity::Error,
            Self::SelfTrailingRef
            | Self::MissingParent
            | Self::CircularRef
            | Self::SegmentCollision
            | Self::AliasCollision
            | Self::DuplicateAlias => Severity::Warn,
            Self::IsolatedNote => Severity::Info,
        }
    }

    /// Whether a tool can offer a one-step fix for this issue.
    pub fn promptable(self) -> bool {
        matches!(
            self,
            Self::BrokenRef
                | Self::BrokenTrailingRef
                | Self::SelfTrailingRef
                | Self::BareTrailingRef
                | Self::MissingParent
                | Self::SegmentCollision
        )
    }

    /// Legend line explaining the code.
    pub fn describe(self) -> &'static str {
        match self {
            Self::DuplicateUid => "two files declare the same uid",
            Self::DuplicateAddress => "two notes share one address",
            Self::EmptySegment => "address contains an empty segment",
            Self::BrokenRef => "inline [[uid]] points at no known note",
            Self::BrokenTrailingRef => "trailing ref points at no known note",
            Self::SelfTrailingRef => "trailing ref points at its own note",
            Self::BareTrailingRef => "trailing ref has no `:: annotation`",
            Self::MissingParent => "ancestor address has no note (stub it)",
            Self::CircularRef => "inline references form a cycle",
            Self::SegmentCollision => "same segment name under different parents",
            Self::AliasCollision => "segment name matches another note's alias",
            Self::DuplicateAlias => "alias declared by more than one note",
            Self::IsolatedNote => "note has no outgoing or incoming refs",
            Self::ParseFailure => "file could not be parsed",
        }
    }
}

impl Display for IssueCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collision confidence tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollisionTier {
    High,
    Med,
    Low,
}

impl Display for CollisionTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::High => "HIGH",
            Self::Med => "MED",
            Self::Low => "LOW",
        };
        f.write_str(label)
    }
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub code: IssueCode,
    pub severity: Severity,
    /// Uid of the note the issue is about, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Other uids or addresses involved (targets, cycle members, partners).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<CollisionTier>,
    pub promptable: bool,
    pub detail: String,
}

impl Issue {
    pub fn new(code: IssueCode) -> Self {
        Self {
            code,
            severity: code.severity(),
            uid: None,
            address: None,
            related: Vec::new(),
            tier: None,
            promptable: code.promptable(),
            detail: String::new(),
        }
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_related<I, S>(mut self, related: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.related = related.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tier(mut self, tier: CollisionTier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    /// Whether `uid` or `address` appears as subject or related party.
    pub fn involves(&self, uid: &str, address: &str) -> bool {
        self.uid.as_deref() == Some(uid)
            || self.address.as_deref() == Some(address)
            || self.related.iter().any(|item| item == uid || item == address)
    }
}

impl Display for Issue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.severity, self.code)?;
        if let Some(tier) = self.tier {
            write!(f, " ({tier})")?;
        }
        if let Some(address) = &self.address {
            write!(f, " {address}")?;
        }
        if let Some(uid) = &self.uid {
            write!(f, " <{uid}>")?;
        }
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

/// Reporting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Logs every issue and a summary.
    Verbose,
    /// Structured result only.
    Silent,
}

/// Ordered issue list for one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.severity == Severity::Error)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == severity)
            .count()
    }

    pub fn with_code(&self, code: IssueCode) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |issue| issue.code == code)
    }

    /// Human-readable report followed by a legend of the codes present.
    pub fn render(&self) -> String {
        if self.issues.is_empty() {
            return "fieldnotes: no issues\n".to_string();
        }
        let mut out = format!(
            "fieldnotes: {} issue(s) ({} error, {} warn, {} info)\n",
            self.issues.len(),
            self.count(Severity::Error),
            self.count(Severity::Warn),
            self.count(Severity::Info)
        );
        for issue in &self.issues {
            out.push_str(&format!("  {issue}\n"));
        }
        out.push_str("\nLegend:\n");
        for code in IssueCode::ALL {
            if self.with_code(code).next().is_some() {
                let marker = if code.promptable() { " [fixable]" } else { "" };
                out.push_str(&format!(
                    "  {:<20} {}{marker}\n",
                    code.as_str(),
                    code.describe()
                ));
            }
        }
        out
    }
}

/// Runs every check over the full corpus.
pub fn validate_corpus(corpus: &Corpus, mode: ValidationMode) -> ValidationReport {
    let started_at = Instant::now();
    let mut issues = Vec::new();
    issues.extend(integrity::check_uniqueness(corpus));
    issues.extend(integrity::check_referential_integrity(corpus));
    issues.extend(integrity::check_self_references(corpus));
    issues.extend(integrity::check_bare_trailing_refs(corpus));
    issues.extend(integrity::check_parent_hierarchy(corpus));
    issues.extend(cycles::check_cycles(corpus));
    issues.extend(collisions::check_collisions(corpus));
    issues.extend(integrity::check_isolation(corpus));

    let report = ValidationReport { issues };
    if mode == ValidationMode::Verbose {
        log_report(&report);
        info!(
            "event=validate_corpus module=validate status=ok notes={} issues={} errors={} duration_ms={}",
            corpus.len(),
            report.issues.len(),
            report.count(Severity::Error),
            started_at.elapsed().as_millis()
        );
    }
    report
}

/// Validates an unsaved draft as if it replaced its note in `corpus`.
///
/// Only issues involving the draft (by uid or address) are returned. A
/// draft that does not parse yields a single `PARSE_FAILURE`.
pub fn validate_draft(raw: &str, corpus: &Corpus) -> Vec<Issue> {
    let note = match parse_note(raw) {
        Ok(note) => note,
        Err(err) => {
            return vec![Issue::new(IssueCode::ParseFailure).with_detail(err.to_string())];
        }
    };
    let uid = note.uid().to_string();
    let address = note.address().to_string();
    let snapshot = corpus.with_note(note);
    validate_corpus(&snapshot, ValidationMode::Silent)
        .issues
        .into_iter()
        .filter(|issue| issue.involves(&uid, &address))
        .collect()
}

fn log_report(report: &ValidationReport) {
    for issue in &report.issues {
        let uid = issue.uid.as_deref().unwrap_or("-");
        let address = issue.address.as_deref().unwrap_or("-");
        match issue.severity {
            Severity::Error => error!(
                "event=validation_issue module=validate code={} uid={uid} address={address} detail={}",
                issue.code, issue.detail
            ),
            Severity::Warn => warn!(
                "event=validation_issue module=validate code={} uid={uid} address={address} detail={}",
                issue.code, issue.detail
            ),
            Severity::Info => info!(
                "event=validation_issue module=validate code={} uid={uid} address={address} detail={}",
                issue.code, issue.detail
            ),
        }
    }
}
