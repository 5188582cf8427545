//! Note file serialization.
//!
//! Layout: frontmatter block, blank line, body, then (when present) a `---`
//! separator followed by one trailing ref per line.

use super::frontmatter::split_frontmatter;
use super::ParseError;
use crate::model::note::{Frontmatter, Note, TrailingRef};

/// Renders frontmatter, body and trailing refs into note file text.
pub fn serialize(
    frontmatter: &Frontmatter,
    body: &str,
    trailing_refs: &[TrailingRef],
) -> Result<String, ParseError> {
    let yaml =
        serde_yaml::to_string(frontmatter).map_err(|err| ParseError::Serialize(err.to_string()))?;
    Ok(render(&yaml, body, trailing_refs))
}

/// Serializes a parsed note.
pub fn serialize_note(note: &Note) -> Result<String, ParseError> {
    serialize(&note.frontmatter, &note.body, &note.trailing_refs)
}

/// Replaces body and trailing refs of an existing note file.
///
/// The frontmatter block is copied verbatim, so keys the model does not
/// know about, comments and date spellings survive the rewrite.
pub fn rewrite_content(
    raw: &str,
    body: &str,
    trailing_refs: &[TrailingRef],
) -> Result<String, ParseError> {
    let (yaml, _) = split_frontmatter(raw)?;
    Ok(render(yaml, body, trailing_refs))
}

fn render(yaml: &str, body: &str, trailing_refs: &[TrailingRef]) -> String {
    let mut out = String::with_capacity(yaml.len() + body.len() + 64);
    out.push_str("---\n");
    out.push_str(yaml);
    if !yaml.is_empty() && !yaml.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("---\n\n");

    let body = body.trim();
    if !body.is_empty() {
        out.push_str(body);
        out.push('\n');
    }

    if !trailing_refs.is_empty() {
        out.push_str("\n---\n");
        for trailing in trailing_refs {
            out.push_str(&format_trailing_ref(trailing));
            out.push('\n');
        }
    }
    out
}

fn format_trailing_ref(trailing: &TrailingRef) -> String {
    if trailing.annotation.trim().is_empty() {
        format!("[[{}]]", trailing.uid)
    } else {
        format!("[[{}]] :: {}", trailing.uid, trailing.annotation.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::{rewrite_content, serialize};
    use crate::model::note::{Frontmatter, TrailingRef};
    use chrono::NaiveDate;

    #[test]
    fn optional_fields_are_omitted_and_refs_follow_separator() {
        let fm = Frontmatter {
            uid: "abcd1234".to_string(),
            address: "A//B".to_string(),
            name: "B".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            aliases: Vec::new(),
            supersedes: None,
            distinct: Vec::new(),
        };
        let text = serialize(
            &fm,
            "Body line",
            &[TrailingRef::new("x", "why"), TrailingRef::new("y", "")],
        )
        .unwrap();
        assert!(text.starts_with("---\nuid: abcd1234\naddress: A//B\nname: B\ndate: "));
        assert!(!text.contains("aliases"));
        assert!(text.ends_with("Body line\n\n---\n[[x]] :: why\n[[y]]\n"));
    }

    #[test]
    fn rewriting_content_keeps_frontmatter_text() {
        let raw = "---\nuid: abcd1234\n# owner note\naddress: A\ndate: 2024/01/02\ntags: [x, y]\n---\nOld body.\n";
        let text = rewrite_content(raw, "New body.", &[TrailingRef::new("x", "why")]).unwrap();
        assert_eq!(
            text,
            "---\nuid: abcd1234\n# owner note\naddress: A\ndate: 2024/01/02\ntags: [x, y]\n---\n\nNew body.\n\n---\n[[x]] :: why\n"
        );
    }
}
