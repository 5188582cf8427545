//! Frontmatter extraction and field decoding.

use chrono::{DateTime, NaiveDate};
use serde_yaml::{Mapping, Value};

use super::ParseError;
use crate::model::address;
use crate::model::note::Frontmatter;

const DELIMITER: &str = "---";

/// Splits `raw` into `(yaml, rest)` around the leading delimiter pair.
pub fn split_frontmatter(raw: &str) -> Result<(&str, &str), ParseError> {
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let first_break = text.find('\n').ok_or(ParseError::MissingFrontmatter)?;
    if text[..first_break].trim_end() != DELIMITER {
        return Err(ParseError::MissingFrontmatter);
    }

    let yaml_start = first_break + 1;
    let mut offset = yaml_start;
    for line in text[yaml_start..].split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            let yaml = &text[yaml_start..offset];
            let rest = &text[offset + line.len()..];
            return Ok((yaml, rest));
        }
        offset += line.len();
    }
    Err(ParseError::MissingFrontmatter)
}

/// Decodes the YAML block into typed frontmatter.
pub fn parse_frontmatter(yaml: &str) -> Result<Frontmatter, ParseError> {
    let value: Value =
        serde_yaml::from_str(yaml).map_err(|err| ParseError::InvalidYaml(err.to_string()))?;
    let mapping = match value {
        Value::Mapping(mapping) => mapping,
        Value::Null => Mapping::new(),
        _ => {
            return Err(ParseError::InvalidYaml(
                "frontmatter must be a mapping".to_string(),
            ))
        }
    };

    let uid = required_scalar(&mapping, "uid")?;
    let raw_address = required_scalar(&mapping, "address")?;
    let address = address::normalize(&raw_address);
    let name = optional_scalar(&mapping, "name")?
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| address::leaf(&address));
    let raw_date = required_scalar(&mapping, "date")?;
    let date = normalize_date(&raw_date).ok_or_else(|| ParseError::InvalidField {
        field: "date",
        message: format!("unrecognized date `{raw_date}`"),
    })?;

    Ok(Frontmatter {
        uid: uid.trim().to_string(),
        address,
        name: name.trim().to_string(),
        date,
        aliases: string_list(&mapping, "aliases")?,
        supersedes: optional_scalar(&mapping, "supersedes")?
            .map(|value| address::normalize(&value))
            .filter(|value| !value.is_empty()),
        distinct: string_list(&mapping, "distinct")?
            .into_iter()
            .map(|value| address::normalize(&value))
            .collect(),
    })
}

/// Normalizes the accepted date spellings to a calendar date.
pub fn normalize_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    for format in ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(datetime.date_naive());
    }
    trimmed
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn optional_scalar(mapping: &Mapping, field: &'static str) -> Result<Option<String>, ParseError> {
    match mapping.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_to_string(value)
            .map(Some)
            .ok_or_else(|| ParseError::InvalidField {
                field,
                message: "expected a scalar value".to_string(),
            }),
    }
}

fn required_scalar(mapping: &Mapping, field: &'static str) -> Result<String, ParseError> {
    optional_scalar(mapping, field)?
        .filter(|value| !value.trim().is_empty())
        .ok_or(ParseError::MissingField(field))
}

fn string_list(mapping: &Mapping, field: &'static str) -> Result<Vec<String>, ParseError> {
    match mapping.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Sequence(items)) => items
            .iter()
            .map(|item| {
                scalar_to_string(item).ok_or_else(|| ParseError::InvalidField {
                    field,
                    message: "list items must be scalars".to_string(),
                })
            })
            .filter(|item| !matches!(item, Ok(text) if text.trim().is_empty()))
            .map(|item| item.map(|text| text.trim().to_string()))
            .collect(),
        Some(value) => scalar_to_string(value)
            .map(|text| vec![text.trim().to_string()])
            .ok_or_else(|| ParseError::InvalidField {
                field,
                message: "expected a list".to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_date, parse_frontmatter, split_frontmatter};
    use crate::parser::ParseError;
    use chrono::NaiveDate;

    #[test]
    fn split_requires_leading_delimiter_pair() {
        assert_eq!(
            split_frontmatter("no frontmatter\n"),
            Err(ParseError::MissingFrontmatter)
        );
        assert_eq!(
            split_frontmatter("---\nuid: a\n"),
            Err(ParseError::MissingFrontmatter)
        );
        let (yaml, rest) = split_frontmatter("---\nuid: a\n---\nbody\n").unwrap();
        assert_eq!(yaml, "uid: a\n");
        assert_eq!(rest, "body\n");
    }

    #[test]
    fn dates_normalize_from_several_spellings() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(normalize_date("2024-03-05"), Some(expected));
        assert_eq!(normalize_date("2024/3/5"), Some(expected));
        assert_eq!(normalize_date("2024-03-05T10:00:00+02:00"), Some(expected));
        assert_eq!(normalize_date("yesterday"), None);
    }

    #[test]
    fn numeric_uid_and_missing_name_are_accepted() {
        let fm = parse_frontmatter("uid: 12345678\naddress: A // B\ndate: 2024-01-02\n").unwrap();
        assert_eq!(fm.uid, "12345678");
        assert_eq!(fm.address, "A//B");
        assert_eq!(fm.name, "B");
    }

    #[test]
    fn missing_required_fields_are_reported() {
        assert_eq!(
            parse_frontmatter("address: A\ndate: 2024-01-02\n"),
            Err(ParseError::MissingField("uid"))
        );
        assert_eq!(
            parse_frontmatter("uid: x\naddress: A\n"),
            Err(ParseError::MissingField("date"))
        );
    }
}
