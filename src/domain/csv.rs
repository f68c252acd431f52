//! Minimal RFC 4180 reading and writing for exports and bulk imports.

use std::collections::HashMap;
use std::fmt::Write;

/// Quotes a field when it contains a delimiter, quote or line break.
#[must_use]
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Accumulates rows into a comma-delimited document with `\n` line endings.
#[derive(Debug, Default)]
pub struct CsvWriter {
    buf: String,
}

impl CsvWriter {
    #[must_use]
    pub fn with_header(header: &[&str]) -> Self {
        let mut writer = Self::default();
        writer.write_row(header.iter().copied());
        writer
    }

    pub fn write_row<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for (i, field) in fields.into_iter().enumerate() {
            if i > 0 {
                self.buf.push(',');
            }
            let _ = write!(self.buf, "{}", escape_field(field.as_ref()));
        }
        self.buf.push('\n');
    }

    #[must_use]
    pub fn finish(self) -> String {
        self.buf
    }
}

/// Splits CSV text into records of fields. Quoted fields may span lines.
#[must_use]
pub fn parse_records(input: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    records
        .into_iter()
        .filter(|r| !(r.len() == 1 && r[0].trim().is_empty()))
        .collect()
}

/// Parses CSV with a header row into one map per data row, keyed by trimmed
/// lower-case header names. Missing trailing cells are absent from the map.
#[must_use]
pub fn parse_with_header(input: &str) -> Vec<HashMap<String, String>> {
    let mut records = parse_records(input).into_iter();
    let Some(header) = records.next() else {
        return Vec::new();
    };
    let header: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();

    records
        .map(|record| {
            header
                .iter()
                .cloned()
                .zip(record)
                .collect::<HashMap<String, String>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_only_when_needed() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn writer_emits_header_first() {
        let mut w = CsvWriter::with_header(&["ID", "Name"]);
        w.write_row(["1", "Laptop, 14\""]);
        assert_eq!(w.finish(), "ID,Name\n1,\"Laptop, 14\"\"\"\n");
    }

    #[test]
    fn parses_quoted_fields_and_crlf() {
        let records = parse_records("a,b\r\n\"x, y\",\"he said \"\"no\"\"\"\r\n");
        assert_eq!(
            records,
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["x, y".to_string(), "he said \"no\"".to_string()],
            ]
        );
    }

    #[test]
    fn header_maps_rows_and_skips_blank_lines() {
        let rows = parse_with_header("Name,Email,Role\nAna,ana@x.io,manager\n\nBo,bo@x.io\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "Ana");
        assert_eq!(rows[0]["role"], "manager");
        assert_eq!(rows[1]["email"], "bo@x.io");
        assert!(!rows[1].contains_key("role"));
    }

    #[test]
    fn last_line_without_newline() {
        let rows = parse_with_header("name,email\nCy,cy@x.io");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["email"], "cy@x.io");
    }
}
