//! Definition, alphabetical and numbered list expansion.
//!
//! Generic markdown would render `- term:: text` as a bullet and `a. item`
//! as plain paragraph text, so these runs become HTML blocks first.

use once_cell::sync::Lazy;
use regex::Regex;

use super::protect::fenced_line_mask;
use super::render_inline;

static DEFINITION_ITEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[-*]\s+(.+?)\s*::\s*(.*)$").expect("valid definition item regex")
});
static ALPHA_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([A-Za-z])\.\s+(.+)$").expect("valid alpha item regex"));
static NUMBERED_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{1,9})\.\s+(.+)$").expect("valid numbered item regex"));

/// Parses `- term:: description`.
pub fn definition_item(line: &str) -> Option<(String, String)> {
    let caps = DEFINITION_ITEM_RE.captures(line)?;
    let term = caps.get(1)?.as_str().trim();
    if term.is_empty() {
        return None;
    }
    Some((term.to_string(), caps.get(2)?.as_str().trim().to_string()))
}

/// Parses `a. item` / `B. item`.
pub fn alpha_item(line: &str) -> Option<(char, String)> {
    let caps = ALPHA_ITEM_RE.captures(line)?;
    let letter = caps.get(1)?.as_str().chars().next()?;
    Some((letter, caps.get(2)?.as_str().trim().to_string()))
}

/// Parses `1. item`.
pub fn numbered_item(line: &str) -> Option<(u64, String)> {
    let caps = NUMBERED_ITEM_RE.captures(line)?;
    let number = caps.get(1)?.as_str().parse().ok()?;
    Some((number, caps.get(2)?.as_str().trim().to_string()))
}

/// Length of the strictly sequential `a., b., c.` run at the head of `lines`.
///
/// The run must start at `a` or `A`, keep one case, and hold two or more
/// items; anything shorter returns 0.
pub fn alpha_run_len(lines: &[&str]) -> usize {
    let mut expected: Option<char> = None;
    let mut len = 0;
    for line in lines {
        let Some((letter, _)) = alpha_item(line) else {
            break;
        };
        let ok = match expected {
            None => letter == 'a' || letter == 'A',
            Some(next) => letter == next,
        };
        if !ok {
            break;
        }
        len += 1;
        expected = char::from_u32(letter as u32 + 1).filter(|c| c.is_ascii_alphabetic());
        if expected.is_none() {
            break;
        }
    }
    if len >= 2 {
        len
    } else {
        0
    }
}

pub fn render_definition_list(items: &[(String, String)]) -> String {
    let mut html = String::from(r#"<dl class="definition-list">"#);
    for (term, description) in items {
        html.push_str(&format!(
            "<dt>{}</dt><dd>{}</dd>",
            render_inline(term),
            render_inline(description)
        ));
    }
    html.push_str("</dl>");
    html
}

pub fn render_alpha_list(items: &[(char, String)]) -> String {
    let upper = items
        .first()
        .map(|(letter, _)| letter.is_ascii_uppercase())
        .unwrap_or(false);
    let mut html = format!(
        r#"<ol class="alpha-list" type="{}">"#,
        if upper { "A" } else { "a" }
    );
    for (_, text) in items {
        html.push_str(&format!("<li>{}</li>", render_inline(text)));
    }
    html.push_str("</ol>");
    html
}

pub fn render_numbered_list(items: &[(u64, String)]) -> String {
    let start = items.first().map(|(number, _)| *number).unwrap_or(1);
    let mut html = if start == 1 {
        String::from("<ol>")
    } else {
        format!(r#"<ol start="{start}">"#)
    };
    for (_, text) in items {
        html.push_str(&format!("<li>{}</li>", render_inline(text)));
    }
    html.push_str("</ol>");
    html
}

/// Replaces `- term:: description` runs with `<dl>` blocks.
pub fn expand_definition_lists(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mask = fenced_line_mask(&lines);
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut index = 0;
    while index < lines.len() {
        let mut items = Vec::new();
        let mut cursor = index;
        while cursor < lines.len() && !mask[cursor] {
            match definition_item(lines[cursor]) {
                Some(item) => items.push(item),
                None => break,
            }
            cursor += 1;
        }
        if items.is_empty() {
            out.push(lines[index].to_string());
            index += 1;
            continue;
        }
        push_block(&mut out, render_definition_list(&items));
        index = cursor;
    }
    out.join("\n")
}

/// Replaces strictly sequential `a.`/`A.` runs with lettered `<ol>` blocks.
pub fn expand_alpha_lists(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mask = fenced_line_mask(&lines);
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut index = 0;
    while index < lines.len() {
        let unmasked = mask[index..].iter().take_while(|inside| !**inside).count();
        let run = alpha_run_len(&lines[index..index + unmasked]);
        if run == 0 {
            out.push(lines[index].to_string());
            index += 1;
            continue;
        }
        let items: Vec<(char, String)> = lines[index..index + run]
            .iter()
            .filter_map(|line| alpha_item(line))
            .collect();
        push_block(&mut out, render_alpha_list(&items));
        index += run;
    }
    out.join("\n")
}

/// Pushes an HTML block surrounded by blank lines so markdown treats it raw.
pub(crate) fn push_block(out: &mut Vec<String>, html: String) {
    if out.last().map(|line| !line.trim().is_empty()) == Some(true) {
        out.push(String::new());
    }
    out.push(html);
    out.push(String::new());
}
