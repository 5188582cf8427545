//! Side-by-side image + text blocks.
//!
//! An image line whose title carries a position hint (`"left"`,
//! `"right|40%"`) and is immediately followed by text lines in the same
//! paragraph becomes one flex block.

use once_cell::sync::Lazy;
use regex::Regex;

use super::lists::push_block;
use super::protect::fenced_line_mask;
use super::{compact_html, escape_html, render_markdown};

static IMAGE_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*!\[([^\]]*)\]\(\s*([^)\s]+)(?:\s+"([^"]*)")?\s*\)\s*$"#)
        .expect("valid image line regex")
});
static WIDTH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+(?:\.\d+)?(?:%|px|rem|em|ch)$").expect("valid width regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Position hint decoded from an image title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementHint {
    pub side: Side,
    pub width: Option<String>,
}

/// Parses `left`, `right`, `left|40%` or `right 300px`.
pub fn parse_hint(title: &str) -> Option<PlacementHint> {
    let mut parts = title
        .split(|c: char| c == '|' || c.is_whitespace())
        .filter(|part| !part.is_empty());
    let side = match parts.next()?.to_ascii_lowercase().as_str() {
        "left" => Side::Left,
        "right" => Side::Right,
        _ => return None,
    };
    let width = match parts.next() {
        Some(value) if WIDTH_RE.is_match(value) => Some(value.to_string()),
        Some(_) => return None,
        None => None,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(PlacementHint { side, width })
}

/// Rewrites qualifying image + text paragraphs into side-by-side blocks.
pub fn expand_side_images(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mask = fenced_line_mask(&lines);
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut index = 0;

    while index < lines.len() {
        let candidate = if mask[index] {
            None
        } else {
            IMAGE_LINE_RE.captures(lines[index]).and_then(|caps| {
                let hint = parse_hint(caps.get(3)?.as_str())?;
                Some((
                    caps[1].to_string(),
                    caps[2].to_string(),
                    hint,
                ))
            })
        };

        let Some((alt, src, hint)) = candidate else {
            out.push(lines[index].to_string());
            index += 1;
            continue;
        };

        let text_end = (index + 1..lines.len())
            .find(|cursor| mask[*cursor] || lines[*cursor].trim().is_empty())
            .unwrap_or(lines.len());
        if text_end == index + 1 {
            out.push(lines[index].to_string());
            index += 1;
            continue;
        }

        let body = lines[index + 1..text_end].join("\n");
        push_block(&mut out, render_side_block(&alt, &src, &hint, &body));
        index = text_end;
    }
    out.join("\n")
}

fn render_side_block(alt: &str, src: &str, hint: &PlacementHint, body: &str) -> String {
    let side = match hint.side {
        Side::Left => "left",
        Side::Right => "right",
    };
    let style = hint
        .width
        .as_ref()
        .map(|width| format!(r#" style="flex: 0 0 {width}""#))
        .unwrap_or_default();
    format!(
        r#"<div class="side-by-side side-{side}"><figure class="side-image"{style}><img src="{}" alt="{}"></figure><div class="side-text">{}</div></div>"#,
        escape_html(src),
        escape_html(alt),
        compact_html(&render_markdown(body)),
    )
}
