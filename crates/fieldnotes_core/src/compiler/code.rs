//! Code block decoration.
//!
//! Every `<pre><code>` block gets a language label and a copy button. The
//! token coloring is delegated to an optional [`CodeHighlighter`]; without
//! one the block keeps the same wrapper shape and escaped plain content.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{escape_html, unescape_html};

static CODE_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<pre><code(?: class="language-([^"]+)")?>(.*?)</code></pre>"#)
        .expect("valid code block regex")
});

/// Pluggable syntax highlighter.
///
/// Receives the raw (unescaped) code and returns highlighted HTML for the
/// inside of `<code>`, or `None` to fall back to plain escaped text.
pub trait CodeHighlighter: Send + Sync {
    fn highlight(&self, lang: &str, code: &str) -> Option<String>;
}

/// Wraps rendered code blocks in the labelled container.
pub fn decorate_code_blocks(html: &str, highlighter: Option<&dyn CodeHighlighter>) -> String {
    CODE_BLOCK_RE
        .replace_all(html, |caps: &regex::Captures| {
            let lang = caps
                .get(1)
                .map(|m| m.as_str())
                .filter(|lang| !lang.is_empty())
                .unwrap_or("text");
            let escaped = &caps[2];
            let inner = highlighter
                .and_then(|highlighter| highlighter.highlight(lang, &unescape_html(escaped)))
                .unwrap_or_else(|| escaped.to_string());
            let lang = escape_html(lang);
            format!(
                r#"<div class="code-block" data-lang="{lang}"><div class="code-header"><span class="code-lang">{lang}</span><button class="copy-button" type="button" aria-label="Copy code">Copy</button></div><pre><code class="language-{lang}">{inner}</code></pre></div>"#
            )
        })
        .into_owned()
}

/// Built-in lightweight highlighter: marks string literals and line comments.
///
/// Languages without a known comment marker fall back to plain text.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalHighlighter;

impl CodeHighlighter for LexicalHighlighter {
    fn highlight(&self, lang: &str, code: &str) -> Option<String> {
        let marker = comment_marker(lang)?;
        let mut out = String::with_capacity(code.len() + 64);
        for (index, line) in code.split('\n').enumerate() {
            if index > 0 {
                out.push('\n');
            }
            highlight_line(line, marker, &mut out);
        }
        Some(out)
    }
}

fn comment_marker(lang: &str) -> Option<&'static str> {
    match lang.to_ascii_lowercase().as_str() {
        "rust" | "rs" | "c" | "cpp" | "go" | "java" | "js" | "javascript" | "ts"
        | "typescript" | "swift" | "kotlin" => Some("//"),
        "python" | "py" | "bash" | "sh" | "shell" | "zsh" | "yaml" | "yml" | "toml"
        | "ruby" | "rb" => Some("#"),
        "sql" | "lua" | "haskell" => Some("--"),
        _ => None,
    }
}

fn highlight_line(line: &str, marker: &str, out: &mut String) {
    let mut rest = line;
    loop {
        let string_at = rest.find('"');
        let comment_at = rest.find(marker);
        match (string_at, comment_at) {
            (_, Some(comment)) if string_at.map_or(true, |string| comment < string) => {
                out.push_str(&escape_html(&rest[..comment]));
                out.push_str(&format!(
                    r#"<span class="tok-comment">{}</span>"#,
                    escape_html(&rest[comment..])
                ));
                return;
            }
            (Some(string), _) => {
                out.push_str(&escape_html(&rest[..string]));
                let after = &rest[string + 1..];
                let Some(end) = after.find('"') else {
                    out.push_str(&escape_html(&rest[string..]));
                    return;
                };
                out.push_str(&format!(
                    r#"<span class="tok-string">{}</span>"#,
                    escape_html(&rest[string..string + end + 2])
                ));
                rest = &after[end + 1..];
            }
            _ => {
                out.push_str(&escape_html(rest));
                return;
            }
        }
    }
}
