//! Wiki-link rewriting.
//!
//! # Responsibility
//! - Turn `[[https://..|label]]` tokens in markdown into external anchors.
//! - Resolve `[[uid]]`, `[[uid|display]]` and `[[category/slug|display]]`
//!   in compiled HTML once the corpus link map is known.
//!
//! # Invariants
//! - Rendered `<pre>`/`<code>` regions are never rewritten.
//! - Output depends only on the input HTML and the link map.
//! - A cross-category link without a display label is an error.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

use super::escape_html;
use super::protect::{protect_html_code, protect_markdown_code};
use crate::model::corpus::LinkMap;
use crate::parser::refs::is_uid_token;

static WIKI_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\[([^\[\]|]+)(?:\|([^\[\]]*))?\]\]").expect("valid wiki link regex")
});
static EXTERNAL_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\[(https?://[^\[\]|\s]+)(?:\|([^\[\]]*))?\]\]").expect("valid external link regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// `[[category/slug]]` written without a display label.
    MissingDisplay { target: String },
}

impl Display for LinkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDisplay { target } => {
                write!(f, "cross-category link `{target}` requires a display label")
            }
        }
    }
}

impl Error for LinkError {}

/// Rewrites external URL tokens in markdown source, outside code.
pub fn external_links(markdown: &str) -> String {
    let (protected, code) = protect_markdown_code(markdown);
    let replaced = EXTERNAL_LINK_RE.replace_all(&protected, |caps: &regex::Captures| {
        let url = &caps[1];
        let label = display_label(caps.get(2)).unwrap_or(url);
        external_anchor(url, &escape_html(label))
    });
    code.restore(&replaced)
}

/// Resolves wiki-links in compiled HTML against a link map.
pub struct LinkResolver<'a> {
    targets: &'a LinkMap,
    base: String,
}

impl<'a> LinkResolver<'a> {
    /// `base` is the href prefix for note anchors, e.g. `/fieldnotes`.
    pub fn new(targets: &'a LinkMap, base: &str) -> Self {
        Self {
            targets,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn resolve(&self, html: &str) -> Result<String, LinkError> {
        let (protected, code) = protect_html_code(html);
        let mut out = String::with_capacity(protected.len());
        let mut last = 0;
        for caps in WIKI_LINK_RE.captures_iter(&protected) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            out.push_str(&protected[last..whole.start()]);
            let target = caps[1].trim();
            let display = display_label(caps.get(2));
            match self.rewrite(target, display)? {
                Some(anchor) => out.push_str(&anchor),
                None => out.push_str(whole.as_str()),
            }
            last = whole.end();
        }
        out.push_str(&protected[last..]);
        Ok(code.restore(&out))
    }

    fn rewrite(&self, target: &str, display: Option<&str>) -> Result<Option<String>, LinkError> {
        if target.starts_with("http://") || target.starts_with("https://") {
            return Ok(Some(external_anchor(target, display.unwrap_or(target))));
        }
        if let Some((category, slug)) = target.split_once('/') {
            let Some(display) = display else {
                return Err(LinkError::MissingDisplay {
                    target: target.to_string(),
                });
            };
            return Ok(Some(format!(
                r#"<a class="doc-link" href="/{}/{}">{display}</a>"#,
                escape_html(category.trim()),
                escape_html(slug.trim()),
            )));
        }
        if !is_uid_token(target) {
            return Ok(None);
        }
        let anchor = match self.targets.get(target) {
            Some(link) => format!(
                r#"<a class="fieldnote-link" href="{}/{target}" data-address="{}">{}</a>"#,
                self.base,
                escape_html(&link.address),
                display
                    .map(str::to_string)
                    .unwrap_or_else(|| escape_html(&link.name)),
            ),
            None => format!(
                r#"<span class="fieldnote-link broken" data-uid="{target}">{}</span>"#,
                display.unwrap_or(target)
            ),
        };
        Ok(Some(anchor))
    }
}

fn display_label<'t>(capture: Option<regex::Match<'t>>) -> Option<&'t str> {
    capture
        .map(|m| m.as_str().trim())
        .filter(|label| !label.is_empty())
}

fn external_anchor(url: &str, label: &str) -> String {
    format!(
        r#"<a class="external-link" href="{url}" target="_blank" rel="noopener noreferrer">{label}</a>"#
    )
}

#[cfg(test)]
mod tests {
    use super::{external_links, LinkError, LinkResolver};
    use crate::model::corpus::{LinkMap, LinkTarget};

    fn targets() -> LinkMap {
        let mut map = LinkMap::new();
        map.insert(
            "a1b2c3d4".to_string(),
            LinkTarget {
                address: "Hardware//CPU".to_string(),
                name: "CPU".to_string(),
            },
        );
        map
    }

    #[test]
    fn uid_links_use_current_name_unless_overridden() {
        let map = targets();
        let resolver = LinkResolver::new(&map, "/fieldnotes/");
        let out = resolver
            .resolve("<p>[[a1b2c3d4]] and [[a1b2c3d4|the chip]]</p>")
            .unwrap();
        assert_eq!(
            out,
            r#"<p><a class="fieldnote-link" href="/fieldnotes/a1b2c3d4" data-address="Hardware//CPU">CPU</a> and <a class="fieldnote-link" href="/fieldnotes/a1b2c3d4" data-address="Hardware//CPU">the chip</a></p>"#
        );
    }

    #[test]
    fn unknown_uids_render_as_broken() {
        let map = targets();
        let out = LinkResolver::new(&map, "/fieldnotes")
            .resolve("[[zzzz9999]]")
            .unwrap();
        assert!(out.contains(r#"class="fieldnote-link broken" data-uid="zzzz9999""#));
    }

    #[test]
    fn cross_category_links_need_display() {
        let map = targets();
        let resolver = LinkResolver::new(&map, "/fieldnotes");
        assert_eq!(
            resolver.resolve("[[projects/site|Site]]").unwrap(),
            r#"<a class="doc-link" href="/projects/site">Site</a>"#
        );
        assert_eq!(
            resolver.resolve("[[projects/site]]"),
            Err(LinkError::MissingDisplay {
                target: "projects/site".to_string()
            })
        );
    }

    #[test]
    fn code_regions_are_not_resolved() {
        let map = targets();
        let html = "<pre><code>[[a1b2c3d4]]</code></pre>";
        assert_eq!(
            LinkResolver::new(&map, "/fieldnotes").resolve(html).unwrap(),
            html
        );
    }

    #[test]
    fn external_tokens_skip_inline_code() {
        let out = external_links("[[https://example.com|Ex]] `[[https://x.io|X]]`");
        assert!(out.starts_with(r#"<a class="external-link" href="https://example.com""#));
        assert!(out.ends_with("`[[https://x.io|X]]`"));
    }
}
