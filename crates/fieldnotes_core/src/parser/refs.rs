//! Reference scanning over note bodies.
//!
//! # Responsibility
//! - Collect inline `[[uid]]` references.
//! - Detect and strip the trailing-ref block at the end of a body.
//! - Derive a plain-text description line.
//!
//! # Invariants
//! - Trailing-ref detection scans backward from the last line; blank lines
//!   are skipped, the first non-ref content line stops the scan.
//! - Tokens containing `/` (cross-category docs, URLs) are never uids.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

use crate::model::note::{NoteUid, TrailingRef};

static WIKI_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\[([^\[\]|]+)(?:\|([^\[\]]*))?\]\]").expect("valid wiki token regex")
});
static ANNOTATED_REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\[\[([^\[\]|/]+)(?:\|[^\[\]]*)?\]\]\s*::(.*)$")
        .expect("valid annotated ref regex")
});
static BARE_REF_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:\[\[[^\[\]/]+\]\]\s*)+$").expect("valid bare ref line regex")
});
static FENCED_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?ms)^[ \t]*(```|~~~).*?^[ \t]*(```|~~~)[ \t]*$").expect("valid fence regex")
});
static INLINE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"``[^\n]+?``|`[^`\n]+`").expect("valid inline code regex"));

/// Trailing-ref block detected at the end of a body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrailingBlock {
    /// Refs in document order.
    pub refs: Vec<TrailingRef>,
    /// Zero-based line index of the first consumed ref line.
    pub start_line: Option<usize>,
}

/// Collects the set of uids referenced inline, ignoring code spans.
pub fn references(body: &str) -> BTreeSet<NoteUid> {
    let without_fences = FENCED_CODE_RE.replace_all(body, "");
    let without_code = INLINE_CODE_RE.replace_all(&without_fences, "");
    WIKI_TOKEN_RE
        .captures_iter(&without_code)
        .filter_map(|caps| caps.get(1))
        .map(|target| target.as_str().trim())
        .filter(|target| is_uid_token(target))
        .map(str::to_string)
        .collect()
}

/// Scans backward for the contiguous trailing-ref block.
pub fn parse_trailing_refs(body: &str) -> TrailingBlock {
    let lines: Vec<&str> = body.lines().collect();
    let mut collected: Vec<Vec<TrailingRef>> = Vec::new();
    let mut start_line = None;

    for (index, line) in lines.iter().enumerate().rev() {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(caps) = ANNOTATED_REF_RE.captures(line) {
            let uid = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let annotation = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            collected.push(vec![TrailingRef::new(uid.trim(), annotation)]);
            start_line = Some(index);
            continue;
        }
        if BARE_REF_LINE_RE.is_match(line) {
            let refs = WIKI_TOKEN_RE
                .captures_iter(line)
                .filter_map(|caps| caps.get(1))
                .map(|target| TrailingRef::new(target.as_str().trim(), ""))
                .collect();
            collected.push(refs);
            start_line = Some(index);
            continue;
        }
        break;
    }

    collected.reverse();
    TrailingBlock {
        refs: collected.into_iter().flatten().collect(),
        start_line,
    }
}

/// Returns body content before the trailing block, dropping the `---`
/// separator and blank lines that precede the block.
pub fn strip_trailing_refs(body: &str, start_line: usize) -> String {
    let mut kept: Vec<&str> = body.lines().take(start_line).collect();
    pop_blank_lines(&mut kept);
    if kept.last().map(|line| line.trim()) == Some("---") {
        kept.pop();
        pop_blank_lines(&mut kept);
    }
    kept.join("\n").trim().to_string()
}

/// First meaningful body line rendered as plain text.
pub fn description(body: &str) -> Option<String> {
    let line = body.lines().map(str::trim).find(|line| {
        !line.is_empty() && !line.starts_with('#') && !line.starts_with("![")
    })?;
    let plain = WIKI_TOKEN_RE.replace_all(line, |caps: &regex::Captures| {
        match caps.get(2).map(|m| m.as_str().trim()).filter(|s| !s.is_empty()) {
            Some(display) => display.to_string(),
            None => caps[1].trim().to_string(),
        }
    });
    Some(plain.trim().to_string())
}

/// Whether a wiki token target names a note uid.
pub(crate) fn is_uid_token(target: &str) -> bool {
    !target.is_empty() && !target.contains('/') && !target.contains(':')
}

fn pop_blank_lines(lines: &mut Vec<&str>) {
    while lines.last().map(|line| line.trim().is_empty()) == Some(true) {
        lines.pop();
    }
}
