//! Table-driven inline token substitution.
//!
//! Heading lines are stashed before the rules run and restored afterwards,
//! so heading text (and the anchors derived from it) never picks up markup.

use once_cell::sync::Lazy;
use regex::Regex;

/// One pattern -> replacement rule.
pub struct InlineRule {
    pub name: &'static str,
    pub pattern: Regex,
    /// Replacement producing HTML.
    pub html: &'static str,
    /// Replacement producing the bare text (used to clean headings).
    pub plain: &'static str,
}

fn rule(name: &'static str, pattern: &str, html: &'static str, plain: &'static str) -> InlineRule {
    InlineRule {
        name,
        pattern: Regex::new(pattern).expect("valid inline rule regex"),
        html,
        plain,
    }
}

pub static INLINE_RULES: Lazy<Vec<InlineRule>> = Lazy::new(|| {
    vec![
        rule(
            "color",
            r"\{color:([A-Za-z]+|#[0-9A-Fa-f]{3,8})\}(.+?)\{/color\}",
            r#"<span class="colored" style="color: ${1}">${2}</span>"#,
            "${2}",
        ),
        rule("underline", r"\{u\}(.+?)\{/u\}", "<u>${1}</u>", "${1}"),
        rule("highlight", r"\{hl\}(.+?)\{/hl\}", "<mark>${1}</mark>", "${1}"),
        rule("highlight_eq", r"==([^=\n]+?)==", "<mark>${1}</mark>", "${1}"),
        rule("superscript", r"\{sup\}(.+?)\{/sup\}", "<sup>${1}</sup>", "${1}"),
        rule("superscript_caret", r"\^\^([^\^\n]+?)\^\^", "<sup>${1}</sup>", "${1}"),
        rule("subscript", r"\{sub\}(.+?)\{/sub\}", "<sub>${1}</sub>", "${1}"),
        rule("subscript_comma", r",,([^,\n]+?),,", "<sub>${1}</sub>", "${1}"),
        rule("keyboard", r"\{kbd\}(.+?)\{/kbd\}", "<kbd>${1}</kbd>", "${1}"),
        rule(
            "small_caps",
            r"\{sc\}(.+?)\{/sc\}",
            r#"<span class="small-caps">${1}</span>"#,
            "${1}",
        ),
    ]
});

static HEADING_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ ]{0,3}#{1,6}(?:[ \t].*)?$").expect("valid heading regex"));

/// Applies every inline rule outside heading lines.
pub fn apply_inline_rules(text: &str) -> String {
    let mut headings: Vec<String> = Vec::new();
    let shielded = HEADING_LINE_RE.replace_all(text, |caps: &regex::Captures| {
        headings.push(caps[0].to_string());
        format!("\u{E002}{}\u{E003}", headings.len() - 1)
    });

    let mut out = shielded.into_owned();
    for rule in INLINE_RULES.iter() {
        out = rule.pattern.replace_all(&out, rule.html).into_owned();
    }

    for (index, heading) in headings.iter().enumerate() {
        out = out.replacen(&format!("\u{E002}{index}\u{E003}"), heading, 1);
    }
    out
}

/// Removes inline rule markers, keeping their text.
pub fn strip_inline_markers(text: &str) -> String {
    let mut out = text.to_string();
    for rule in INLINE_RULES.iter() {
        out = rule.pattern.replace_all(&out, rule.plain).into_owned();
    }
    out
}
