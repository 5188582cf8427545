//! Final HTML rewrites and inline annotation expansion.

use once_cell::sync::Lazy;
use regex::Regex;

use super::protect::protect_html_code;

/// One raw-HTML rewrite rule.
pub struct PostRule {
    pub name: &'static str,
    pub pattern: Regex,
    pub replacement: &'static str,
}

fn post_rule(name: &'static str, pattern: &str, replacement: &'static str) -> PostRule {
    PostRule {
        name,
        pattern: Regex::new(pattern).expect("valid post rule regex"),
        replacement,
    }
}

pub static POST_RULES: Lazy<Vec<PostRule>> = Lazy::new(|| {
    vec![
        post_rule("table_open", r"<table>", r#"<div class="table-scroll"><table>"#),
        post_rule("table_close", r"</table>", "</table></div>"),
        post_rule(
            "terminal_chrome",
            r#"<div class="code-block" data-lang="(bash|sh|shell|console|terminal|zsh)">"#,
            r#"<div class="code-block terminal" data-lang="${1}"><div class="terminal-chrome"><span class="terminal-dot"></span><span class="terminal-dot"></span><span class="terminal-dot"></span></div>"#,
        ),
        post_rule("lazy_images", r"<img src=", r#"<img loading="lazy" src="#),
    ]
});

static ANNOTATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{([^{}|]+)\|([^{}]*)\}\}").expect("valid annotation regex")
});

pub fn apply_post_rules(html: &str) -> String {
    let mut out = html.to_string();
    for rule in POST_RULES.iter() {
        out = rule.pattern.replace_all(&out, rule.replacement).into_owned();
    }
    out
}

/// Expands `{{reference|explanation}}` footnotes outside code regions.
///
/// The innermost tokens match first; each pass exposes the next enclosing
/// level, so the loop ends once no token is left to expand.
pub fn expand_annotations(html: &str) -> String {
    let (mut text, code) = protect_html_code(html);
    while ANNOTATION_RE.is_match(&text) {
        text = ANNOTATION_RE
            .replace_all(&text, |caps: &regex::Captures| {
                format!(
                    r#"<span class="annotation" tabindex="0"><span class="annotation-ref">{}</span><span class="annotation-body" role="note">{}</span></span>"#,
                    caps[1].trim(),
                    caps[2].trim()
                )
            })
            .into_owned();
    }
    code.restore(&text)
}
