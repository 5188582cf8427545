//! Markdown to HTML compilation for note bodies.
//!
//! # Responsibility
//! - Run the fixed, order-significant pipeline that turns one body into
//!   HTML (custom inline and block syntax, generic markdown, post rules).
//! - Provide the link resolver used once the corpus link map is known.
//!
//! # Invariants
//! - Regex rewrites never touch code: markdown code is protected before
//!   custom syntax runs, rendered `<pre>`/`<code>` before post rules.
//! - Internal links are left as `[[...]]` tokens; resolving them needs the
//!   full corpus and happens in [`links::LinkResolver`].
//! - Output shape does not depend on whether a highlighter is installed.
//!
//! # See also
//! - `service::rebuild_service` for the corpus-wide orchestration.

pub mod blockquote;
pub mod code;
pub mod context;
pub mod headings;
pub mod images;
pub mod inline;
pub mod links;
pub mod lists;
pub mod post;
pub mod protect;

use chrono::NaiveDate;
use pulldown_cmark::{html, Options, Parser};

use blockquote::expand_blockquotes;
use code::decorate_code_blocks;
use context::expand_context_annotations;
use headings::{number_headings, strip_heading_markup};
use images::expand_side_images;
use inline::apply_inline_rules;
use links::external_links;
use lists::{expand_alpha_lists, expand_definition_lists};
use post::{apply_post_rules, expand_annotations};
use protect::protect_markdown_code;

pub use code::{CodeHighlighter, LexicalHighlighter};
pub use links::{LinkError, LinkResolver};

/// Per-note markdown compiler.
pub struct MarkdownCompiler {
    highlighter: Option<Box<dyn CodeHighlighter>>,
}

impl Default for MarkdownCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownCompiler {
    /// Compiler without syntax highlighting.
    pub fn new() -> Self {
        Self { highlighter: None }
    }

    pub fn with_highlighter(highlighter: Box<dyn CodeHighlighter>) -> Self {
        Self {
            highlighter: Some(highlighter),
        }
    }

    pub fn has_highlighter(&self) -> bool {
        self.highlighter.is_some()
    }

    /// Compiles a body published on `published` into unresolved HTML.
    pub fn compile(&self, body: &str, published: NaiveDate) -> String {
        let text = body.replace("\r\n", "\n").replace('\r', "\n");

        let (protected, code) = protect_markdown_code(&text);
        let styled = apply_inline_rules(&protected);
        let quoted = expand_blockquotes(&styled, &code);
        let restored = code.restore(&quoted);

        let linked = external_links(&restored);
        let imaged = expand_side_images(&linked);
        let listed = expand_alpha_lists(&expand_definition_lists(&imaged));
        let annotated = expand_context_annotations(&listed, published);

        let rendered = render_markdown(&annotated);
        let headings = number_headings(&strip_heading_markup(&rendered));
        let decorated = decorate_code_blocks(&headings, self.highlighter.as_deref());
        expand_annotations(&apply_post_rules(&decorated))
    }

    /// Compiles a one-line fragment (trailing-ref annotations) with inline
    /// syntax only.
    pub fn compile_inline(&self, text: &str) -> String {
        let (protected, code) = protect_markdown_code(text.trim());
        let styled = code.restore(&apply_inline_rules(&protected));
        expand_annotations(&render_inline(&external_links(&styled)))
    }
}

pub(crate) fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);
    options
}

/// Generic markdown rendering.
pub(crate) fn render_markdown(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, markdown_options());
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Renders a single line of markdown without its paragraph wrapper.
pub(crate) fn render_inline(markdown: &str) -> String {
    let rendered = render_markdown(markdown.trim());
    let trimmed = rendered.trim_end();
    match trimmed
        .strip_prefix("<p>")
        .and_then(|inner| inner.strip_suffix("</p>"))
    {
        Some(inner) if !inner.contains("<p>") => inner.to_string(),
        _ => trimmed.to_string(),
    }
}

/// Joins rendered HTML onto non-blank lines so it stays one raw HTML block.
pub(crate) fn compact_html(html: &str) -> String {
    html.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::{compact_html, escape_html, render_inline, unescape_html};

    #[test]
    fn inline_rendering_drops_paragraph_wrapper() {
        assert_eq!(render_inline("a *b*"), "a <em>b</em>");
    }

    #[test]
    fn compact_html_removes_blank_lines() {
        assert_eq!(compact_html("<p>a</p>\n\n<p>b</p>\n"), "<p>a</p>\n<p>b</p>");
    }

    #[test]
    fn escaping_round_trips() {
        let raw = r#"<a href="x">&'"#;
        assert_eq!(unescape_html(&escape_html(raw)), raw);
    }
}
