//! Heading cleanup, numbering and anchor ids.
//!
//! Runs on rendered HTML. Headings end up as plain text so their slugs stay
//! predictable across edits to inline styling.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::inline::strip_inline_markers;
use super::unescape_html;

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<h([1-6])>(.*?)</h([1-6])>").expect("valid heading regex"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));

/// Removes markup from heading content, leaving escaped text only.
pub fn strip_heading_markup(html: &str) -> String {
    HEADING_RE
        .replace_all(html, |caps: &regex::Captures| {
            if caps[1] != caps[3] {
                return caps[0].to_string();
            }
            let text = strip_inline_markers(&TAG_RE.replace_all(&caps[2], ""));
            format!("<h{level}>{}</h{level}>", text.trim(), level = &caps[1])
        })
        .into_owned()
}

/// Prefixes `1.`, `2.`, ... to the shallowest heading level present and
/// gives every heading an `id`.
pub fn number_headings(html: &str) -> String {
    let top_level = HEADING_RE
        .captures_iter(html)
        .filter(|caps| caps[1] == caps[3])
        .filter_map(|caps| caps[1].parse::<u8>().ok())
        .min();
    let Some(top_level) = top_level else {
        return html.to_string();
    };

    let mut counter = 0;
    let mut slugs = SlugSet::default();
    HEADING_RE
        .replace_all(html, |caps: &regex::Captures| {
            if caps[1] != caps[3] {
                return caps[0].to_string();
            }
            let level: u8 = caps[1].parse().unwrap_or(6);
            let text = caps[2].trim();
            let id = slugs.claim(&slugify(&unescape_html(text)));
            if level == top_level {
                counter += 1;
                format!(r#"<h{level} id="{id}">{counter}. {text}</h{level}>"#)
            } else {
                format!(r#"<h{level} id="{id}">{text}</h{level}>"#)
            }
        })
        .into_owned()
}

/// Lowercase ascii-alphanumeric slug with single dashes.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("section");
    }
    slug
}

#[derive(Default)]
struct SlugSet {
    seen: HashMap<String, usize>,
}

impl SlugSet {
    fn claim(&mut self, base: &str) -> String {
        let count = self.seen.entry(base.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            base.to_string()
        } else {
            format!("{base}-{count}")
        }
    }
}
