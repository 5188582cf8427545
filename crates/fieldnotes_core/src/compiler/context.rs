//! Context annotation runs: `>> YY.MM.DD - text`.
//!
//! Each entry shows how far its date sits from the note's publication date.

use chrono::{Datelike, Months, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use super::lists::push_block;
use super::protect::fenced_line_mask;
use super::render_inline;

static CONTEXT_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*>>\s*(\d{2})\.(\d{2})\.(\d{2})\s*-\s*(.*)$").expect("valid context regex")
});

/// Calendar distance between two dates with borrowed components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateOffset {
    pub years: i32,
    pub months: u32,
    pub days: u32,
    /// True when the entry date precedes the reference date.
    pub earlier: bool,
}

impl DateOffset {
    pub fn is_zero(&self) -> bool {
        self.years == 0 && self.months == 0 && self.days == 0
    }
}

/// Computes `entry - reference` as years/months/days without negative parts.
///
/// Whole months are counted by stepping forward from the earlier date, with
/// day overflow clamped to the end of the target month. The remainder up to
/// the later date is the day count.
pub fn date_offset(reference: NaiveDate, entry: NaiveDate) -> DateOffset {
    let earlier = entry < reference;
    let (from, to) = if earlier {
        (entry, reference)
    } else {
        (reference, entry)
    };

    let span = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    let mut months = span.max(0) as u32;
    let mut anchor = add_months(from, months);
    while months > 0 && anchor > to {
        months -= 1;
        anchor = add_months(from, months);
    }
    let days = (to - anchor).num_days().max(0) as u32;

    DateOffset {
        years: (months / 12) as i32,
        months: months % 12,
        days,
        earlier,
    }
}

/// Human-readable offset, e.g. `1 year, 2 days later` or `(day zero)`.
pub fn describe_offset(offset: &DateOffset) -> String {
    if offset.is_zero() {
        return "(day zero)".to_string();
    }
    let mut parts = Vec::new();
    if offset.years > 0 {
        parts.push(plural(offset.years as u32, "year"));
    }
    if offset.months > 0 {
        parts.push(plural(offset.months, "month"));
    }
    if offset.days > 0 {
        parts.push(plural(offset.days, "day"));
    }
    let direction = if offset.earlier { "earlier" } else { "later" };
    format!("{} {direction}", parts.join(", "))
}

/// Replaces runs of context lines with a timestamped annotation block.
pub fn expand_context_annotations(text: &str, published: NaiveDate) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mask = fenced_line_mask(&lines);
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut index = 0;

    while index < lines.len() {
        let mut entries = Vec::new();
        while index + entries.len() < lines.len() && !mask[index + entries.len()] {
            match parse_context_line(lines[index + entries.len()]) {
                Some(entry) => entries.push(entry),
                None => break,
            }
        }
        if entries.is_empty() {
            out.push(lines[index].to_string());
            index += 1;
            continue;
        }
        index += entries.len();
        push_block(&mut out, render_context_block(&entries, published));
    }
    out.join("\n")
}

fn parse_context_line(line: &str) -> Option<(NaiveDate, String)> {
    let caps = CONTEXT_LINE_RE.captures(line)?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(2000 + year, month, day)?;
    Some((date, caps[4].trim().to_string()))
}

fn render_context_block(entries: &[(NaiveDate, String)], published: NaiveDate) -> String {
    let mut html = String::from(r#"<div class="context-annotations">"#);
    for (date, text) in entries {
        let offset = describe_offset(&date_offset(published, *date));
        html.push_str(&format!(
            r#"<div class="context-entry"><time class="context-date" datetime="{}">{}</time><span class="context-offset">{}</span><span class="context-text">{}</span></div>"#,
            date.format("%Y-%m-%d"),
            date.format("%y.%m.%d"),
            offset,
            render_inline(text),
        ));
    }
    html.push_str("</div>");
    html
}

fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months)).unwrap_or(NaiveDate::MAX)
}

fn plural(count: u32, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}
