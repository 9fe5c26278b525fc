//! The persisted library record format.
//!
//! One line per container:
//!
//! ```text
//! <locator>,<id1>,<id2>,...,<idN>
//! ```
//!
//! `%`, `,`, CR and LF inside a field are written as `%25`, `%2C`, `%0D` and
//! `%0A`. Every field is percent-decoded on the way in, so hand-written files
//! with plain fields load unchanged.

use crate::config::{MalformedRecordPolicy, StoreConfig};
use crate::locator::Locator;
use crate::{LibraryError, Result};
use tracing::warn;

/// One container and the publication identifiers it hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryRecord {
    pub locator: Locator,
    pub identifiers: Vec<String>,
}

/// Render records, one line each, with a trailing newline.
pub fn format_records(records: &[LibraryRecord]) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&escape_field(&record.locator.to_string()));
        for identifier in &record.identifiers {
            out.push(StoreConfig::FIELD_SEPARATOR);
            out.push_str(&escape_field(identifier));
        }
        out.push('\n');
    }
    out
}

/// Parse the contents of a library file.
///
/// Malformed records are dropped or rejected according to `policy`.
pub fn parse_records(contents: &str, policy: MalformedRecordPolicy) -> Result<Vec<LibraryRecord>> {
    let mut records = Vec::new();

    for (index, raw) in contents.lines().enumerate() {
        let line = index + 1;
        if raw.trim().is_empty() {
            continue;
        }

        match parse_record(raw) {
            Ok(record) => records.push(record),
            Err(reason) => match policy {
                MalformedRecordPolicy::Skip => {
                    warn!("Skipping malformed library record on line {}: {}", line, reason);
                }
                MalformedRecordPolicy::Fail => {
                    return Err(LibraryError::MalformedRecord { line, reason });
                }
            },
        }
    }

    Ok(records)
}

fn parse_record(line: &str) -> std::result::Result<LibraryRecord, String> {
    let line = line.trim_end_matches('\r');
    let (locator_field, rest) = line
        .split_once(StoreConfig::FIELD_SEPARATOR)
        .ok_or_else(|| "missing field separator".to_string())?;

    let locator = Locator::from(unescape_field(locator_field)?);
    if locator.is_null() {
        return Err("empty locator".to_string());
    }

    let identifiers = rest
        .split(StoreConfig::FIELD_SEPARATOR)
        .enumerate()
        .map(|(position, field)| {
            let identifier = unescape_field(field)?;
            if identifier.is_empty() {
                Err(format!("empty identifier at position {}", position + 1))
            } else {
                Ok(identifier)
            }
        })
        .collect::<std::result::Result<Vec<_>, String>>()?;

    Ok(LibraryRecord {
        locator,
        identifiers,
    })
}

fn escape_field(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for c in field.chars() {
        match c {
            '%' => out.push_str("%25"),
            ',' => out.push_str("%2C"),
            '\r' => out.push_str("%0D"),
            '\n' => out.push_str("%0A"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape_field(field: &str) -> std::result::Result<String, String> {
    urlencoding::decode(field)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| format!("field {:?} is not valid UTF-8 after decoding", field))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(locator: &str, identifiers: &[&str]) -> LibraryRecord {
        LibraryRecord {
            locator: Locator::from(locator),
            identifiers: identifiers.iter().map(|id| id.to_string()).collect(),
        }
    }

    #[test]
    fn test_parse_plain_line() {
        let records =
            parse_records("/books/a.epub,pub-a,pub-b\n", MalformedRecordPolicy::Fail).unwrap();
        assert_eq!(records, vec![record("/books/a.epub", &["pub-a", "pub-b"])]);
    }

    #[test]
    fn test_format_plain_records() {
        let text = format_records(&[
            record("/books/a.epub", &["pub-a", "pub-b"]),
            record("/books/c.epub", &["pub-c"]),
        ]);
        assert_eq!(text, "/books/a.epub,pub-a,pub-b\n/books/c.epub,pub-c\n");
    }

    #[test]
    fn test_delimiters_inside_fields_survive() {
        let original = vec![record("/books/a, b%.epub", &["urn:isbn:1,2", "line\nbreak"])];
        let text = format_records(&original);
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("/books/a%2C b%25.epub,"));

        let parsed = parse_records(&text, MalformedRecordPolicy::Fail).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_blank_lines_and_crlf_are_tolerated() {
        let records = parse_records(
            "\n/books/a.epub,pub-a\r\n   \n/books/b.epub,pub-b\r\n",
            MalformedRecordPolicy::Fail,
        )
        .unwrap();
        assert_eq!(
            records,
            vec![
                record("/books/a.epub", &["pub-a"]),
                record("/books/b.epub", &["pub-b"]),
            ]
        );
    }

    #[test]
    fn test_skip_policy_drops_malformed_records() {
        let text = "/books/a.epub\n/books/b.epub,\n,pub-x\n/books/c.epub,pub-c,,pub-d\n/books/e.epub,pub-e\n";
        let records = parse_records(text, MalformedRecordPolicy::Skip).unwrap();
        assert_eq!(records, vec![record("/books/e.epub", &["pub-e"])]);
    }

    #[test]
    fn test_fail_policy_reports_line() {
        let text = "/books/a.epub,pub-a\n\n/books/b.epub\n";
        match parse_records(text, MalformedRecordPolicy::Fail) {
            Err(LibraryError::MalformedRecord { line, reason }) => {
                assert_eq!(line, 3);
                assert_eq!(reason, "missing field separator");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
