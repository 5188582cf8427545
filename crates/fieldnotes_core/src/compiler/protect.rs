//! Placeholder vaults that shield regions from regex rewriting.
//!
//! Markdown code (fences and inline spans) is swapped out before custom
//! syntax runs; rendered `<pre>`/`<code>` regions are swapped out before
//! HTML post-processing. Placeholders use private-use code points that never
//! appear in author text.

use once_cell::sync::Lazy;
use regex::Regex;

static INLINE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"``[^\n]+?``|`[^`\n]+`").expect("valid inline code regex"));
static HTML_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<pre[\s>].*?</pre>|<code[\s>].*?</code>").expect("valid html code regex")
});

/// Ordered store of protected fragments.
#[derive(Debug, Clone)]
pub struct Vault {
    open: char,
    close: char,
    entries: Vec<String>,
}

impl Vault {
    fn new(open: char, close: char) -> Self {
        Self {
            open,
            close,
            entries: Vec::new(),
        }
    }

    /// Stores `fragment` and returns its placeholder token.
    pub fn stash(&mut self, fragment: impl Into<String>) -> String {
        self.entries.push(fragment.into());
        format!("{}{}{}", self.open, self.entries.len() - 1, self.close)
    }

    /// Replaces every placeholder of this vault found in `text`.
    pub fn restore(&self, text: &str) -> String {
        if self.entries.is_empty() || !text.contains(self.open) {
            return text.to_string();
        }
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find(self.open) {
            out.push_str(&rest[..start]);
            let after_open = &rest[start + self.open.len_utf8()..];
            let restored = after_open.find(self.close).and_then(|end| {
                after_open[..end]
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| self.entries.get(index))
                    .map(|entry| (entry, end))
            });
            match restored {
                Some((entry, end)) => {
                    out.push_str(entry);
                    rest = &after_open[end + self.close.len_utf8()..];
                }
                None => {
                    out.push(self.open);
                    rest = after_open;
                }
            }
        }
        out.push_str(rest);
        out
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Swaps fenced blocks and inline code spans in markdown for placeholders.
pub fn protect_markdown_code(text: &str) -> (String, Vault) {
    let mut vault = Vault::new('\u{E000}', '\u{E001}');
    let mut lines_out: Vec<String> = Vec::new();
    let mut fence: Option<(String, Vec<&str>)> = None;

    for line in text.split('\n') {
        if let Some((marker, buffer)) = fence.as_mut() {
            buffer.push(line);
            if is_closing_fence(line, marker) {
                let block = buffer.join("\n");
                lines_out.push(vault.stash(block));
                fence = None;
            }
            continue;
        }
        if let Some(marker) = opening_fence(line) {
            fence = Some((marker, vec![line]));
            continue;
        }
        lines_out.push(line.to_string());
    }
    // An unclosed fence runs to the end of the document.
    if let Some((_, buffer)) = fence {
        lines_out.push(vault.stash(buffer.join("\n")));
    }

    let joined = lines_out.join("\n");
    let protected = INLINE_CODE_RE
        .replace_all(&joined, |caps: &regex::Captures| vault.stash(&caps[0]))
        .into_owned();
    (protected, vault)
}

/// Swaps rendered `<pre>` and `<code>` regions for placeholders.
pub fn protect_html_code(html: &str) -> (String, Vault) {
    let mut vault = Vault::new('\u{E004}', '\u{E005}');
    let protected = HTML_CODE_RE
        .replace_all(html, |caps: &regex::Captures| vault.stash(&caps[0]))
        .into_owned();
    (protected, vault)
}

/// Marks lines that sit inside (or delimit) a fenced code block.
pub fn fenced_line_mask(lines: &[&str]) -> Vec<bool> {
    let mut mask = Vec::with_capacity(lines.len());
    let mut open: Option<String> = None;
    for line in lines {
        match open.as_ref() {
            Some(marker) => {
                mask.push(true);
                if is_closing_fence(line, marker) {
                    open = None;
                }
            }
            None => {
                if let Some(marker) = opening_fence(line) {
                    open = Some(marker);
                    mask.push(true);
                } else {
                    mask.push(false);
                }
            }
        }
    }
    mask
}

fn opening_fence(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    if line.len() - trimmed.len() > 3 {
        return None;
    }
    for marker_char in ['`', '~'] {
        let run = trimmed.chars().take_while(|c| *c == marker_char).count();
        if run >= 3 {
            return Some(marker_char.to_string().repeat(run));
        }
    }
    None
}

fn is_closing_fence(line: &str, marker: &str) -> bool {
    let trimmed = line.trim();
    let Some(first) = marker.chars().next() else {
        return false;
    };
    trimmed.len() >= marker.len() && trimmed.chars().all(|c| c == first)
}
