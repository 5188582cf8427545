//! Typed block-quotes: `{bkqt/TYPE|Attribution}` ... `{/bkqt}`.
//!
//! The inner content runs its own small pipeline (definition, lettered and
//! numbered lists, paragraphs) and is emitted as one HTML block without blank
//! lines, so the outer markdown pass keeps it intact.

use once_cell::sync::Lazy;
use regex::Regex;

use super::lists::{
    alpha_item, alpha_run_len, definition_item, numbered_item, render_alpha_list,
    render_definition_list, render_numbered_list,
};
use super::protect::Vault;
use super::{compact_html, escape_html, render_markdown};

static BLOCKQUOTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?ms)^[ \t]*\{bkqt/([A-Za-z]+)(?:\|([^}\n]*))?\}[ \t]*\n(.*?)^[ \t]*\{/bkqt\}[ \t]*$")
        .expect("valid blockquote regex")
});

/// Supported block-quote kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteKind {
    Note,
    Tip,
    Warning,
    Danger,
    KeyConcept,
    Quote,
    PullQuote,
}

impl QuoteKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "note" => Some(Self::Note),
            "tip" => Some(Self::Tip),
            "warning" => Some(Self::Warning),
            "danger" => Some(Self::Danger),
            "keyconcept" => Some(Self::KeyConcept),
            "quote" => Some(Self::Quote),
            "pullquote" => Some(Self::PullQuote),
            _ => None,
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Tip => "tip",
            Self::Warning => "warning",
            Self::Danger => "danger",
            Self::KeyConcept => "keyconcept",
            Self::Quote => "quote",
            Self::PullQuote => "pullquote",
        }
    }

    /// Heading label; quotes carry none.
    pub fn label(self) -> Option<&'static str> {
        match self {
            Self::Note => Some("Note"),
            Self::Tip => Some("Tip"),
            Self::Warning => Some("Warning"),
            Self::Danger => Some("Danger"),
            Self::KeyConcept => Some("Key concept"),
            Self::Quote | Self::PullQuote => None,
        }
    }
}

/// Expands every typed block-quote. Unknown kinds are left as written.
///
/// `code` holds markdown code protected earlier in the pipeline; inner
/// content is restored from it before rendering.
pub fn expand_blockquotes(text: &str, code: &Vault) -> String {
    BLOCKQUOTE_RE
        .replace_all(text, |caps: &regex::Captures| {
            let Some(kind) = QuoteKind::parse(&caps[1]) else {
                return caps[0].to_string();
            };
            let attribution = caps
                .get(2)
                .map(|m| m.as_str().trim())
                .filter(|value| !value.is_empty());
            let inner = caps.get(3).map(|m| m.as_str()).unwrap_or_default();
            format!("\n{}\n", render_blockquote(kind, inner, attribution, code))
        })
        .into_owned()
}

fn render_blockquote(
    kind: QuoteKind,
    inner: &str,
    attribution: Option<&str>,
    code: &Vault,
) -> String {
    let mut html = format!(r#"<div class="bkqt bkqt-{}">"#, kind.css_class());
    if let Some(label) = kind.label() {
        html.push_str(&format!(r#"<div class="bkqt-label">{label}</div>"#));
    }
    html.push_str(r#"<div class="bkqt-body">"#);
    html.push_str(&render_inner(inner, code));
    html.push_str("</div>");
    if let Some(attribution) = attribution {
        html.push_str(&format!(
            r#"<div class="bkqt-attribution">&mdash; {}</div>"#,
            escape_html(attribution)
        ));
    }
    html.push_str("</div>");
    html
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Blank,
    Definition,
    Numbered,
    Text,
}

fn classify(line: &str) -> LineKind {
    if line.trim().is_empty() {
        LineKind::Blank
    } else if definition_item(line).is_some() {
        LineKind::Definition
    } else if numbered_item(line).is_some() {
        LineKind::Numbered
    } else {
        LineKind::Text
    }
}

/// Mini-pipeline for block-quote content.
fn render_inner(inner: &str, code: &Vault) -> String {
    let lines: Vec<&str> = inner.lines().collect();
    let mut parts: Vec<String> = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut index = 0;

    while index < lines.len() {
        let alpha = alpha_run_len(&lines[index..]);
        if alpha > 0 {
            flush_paragraph(&mut paragraph, &mut parts, code);
            let items: Vec<(char, String)> = lines[index..index + alpha]
                .iter()
                .filter_map(|line| alpha_item(&code.restore(line)))
                .collect();
            parts.push(render_alpha_list(&items));
            index += alpha;
            continue;
        }

        match classify(lines[index]) {
            LineKind::Blank => {
                flush_paragraph(&mut paragraph, &mut parts, code);
                index += 1;
            }
            LineKind::Definition => {
                flush_paragraph(&mut paragraph, &mut parts, code);
                let mut items = Vec::new();
                while index < lines.len() && classify(lines[index]) == LineKind::Definition {
                    if let Some(item) = definition_item(&code.restore(lines[index])) {
                        items.push(item);
                    }
                    index += 1;
                }
                parts.push(render_definition_list(&items));
            }
            LineKind::Numbered => {
                flush_paragraph(&mut paragraph, &mut parts, code);
                let mut items = Vec::new();
                while index < lines.len() && classify(lines[index]) == LineKind::Numbered {
                    if let Some(item) = numbered_item(&code.restore(lines[index])) {
                        items.push(item);
                    }
                    index += 1;
                }
                parts.push(render_numbered_list(&items));
            }
            LineKind::Text => {
                paragraph.push(lines[index]);
                index += 1;
            }
        }
    }
    flush_paragraph(&mut paragraph, &mut parts, code);
    parts.concat()
}

fn flush_paragraph(paragraph: &mut Vec<&str>, parts: &mut Vec<String>, code: &Vault) {
    if paragraph.is_empty() {
        return;
    }
    let source = code.restore(&paragraph.join("\n"));
    parts.push(compact_html(&render_markdown(&source)));
    paragraph.clear();
}

#[cfg(test)]
mod tests {
    use super::{expand_blockquotes, QuoteKind};
    use crate::compiler::protect::protect_markdown_code;

    #[test]
    fn typed_quote_gets_label_body_and_attribution() {
        let (text, vault) = protect_markdown_code(
            "{bkqt/tip|Grace Hopper}\nFirst *para*\n\nSecond with `code`\n{/bkqt}",
        );
        let out = expand_blockquotes(&text, &vault);
        assert!(out.contains(r#"<div class="bkqt bkqt-tip"><div class="bkqt-label">Tip</div>"#));
        assert!(out.contains("<p>First <em>para</em></p>"));
        assert!(out.contains("<p>Second with <code>code</code></p>"));
        assert!(out.contains("&mdash; Grace Hopper"));
        assert!(!out.contains("\n\n<p>"));
    }

    #[test]
    fn inner_lists_are_expanded() {
        let (text, vault) = protect_markdown_code(
            "{bkqt/note}\n- CPU:: central unit\na. one\nb. two\n1. x\n2. y\n{/bkqt}",
        );
        let out = expand_blockquotes(&text, &vault);
        assert!(out.contains("<dt>CPU</dt><dd>central unit</dd>"));
        assert!(out.contains(r#"<ol class="alpha-list" type="a">"#));
        assert!(out.contains("<ol><li>x</li><li>y</li></ol>"));
    }

    #[test]
    fn unknown_kinds_are_left_alone() {
        let (text, vault) = protect_markdown_code("{bkqt/aside}\nhi\n{/bkqt}");
        assert_eq!(expand_blockquotes(&text, &vault), "{bkqt/aside}\nhi\n{/bkqt}");
        assert_eq!(QuoteKind::parse("PullQuote"), Some(QuoteKind::PullQuote));
    }
}
