//! Row parser: raw CSV bytes to ordered rows keyed by declared column.

use std::collections::HashMap;

use csv::{ReaderBuilder, Trim};

use crate::error::AppError;

/// UTF-8 BOM bytes.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// One data record from an import file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    line_number: u64,
    fields: HashMap<&'static str, String>,
}

impl Row {
    /// Builds a row directly from column/value pairs.
    pub fn new(line_number: u64, fields: &[(&'static str, &str)]) -> Self {
        Self {
            line_number,
            fields: fields
                .iter()
                .map(|(column, value)| (*column, value.trim().to_string()))
                .collect(),
        }
    }

    /// 1-based line in the source file where this record starts.
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Trimmed value for a declared column; empty when the column is absent.
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }
}

/// Parses CSV bytes into rows using the first line as headers.
///
/// Header names are matched to `columns` case-insensitively and undeclared
/// columns are dropped. Blank lines and records whose every raw field is
/// empty are skipped; a line with data in undeclared columns still yields a
/// row. Fails only when the input cannot be read as CSV at all:
/// invalid UTF-8, no header line, or a reader error.
pub fn parse_rows(bytes: &[u8], columns: &'static [&'static str]) -> Result<Vec<Row>, AppError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = std::str::from_utf8(bytes).map_err(|_| AppError::NotUtf8)?;

    if text.trim().is_empty() {
        return Err(AppError::CsvInvalid("File is empty".to_string()));
    }

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| AppError::CsvInvalid(format!("Failed to read header row: {e}")))?
        .clone();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(AppError::CsvInvalid("Header row is empty".to_string()));
    }

    // Header index -> declared column. First occurrence of a column wins.
    let mut header_map: Vec<(usize, &'static str)> = Vec::new();
    for (idx, header) in headers.iter().enumerate() {
        let declared = columns.iter().find(|c| c.eq_ignore_ascii_case(header));
        if let Some(&column) = declared {
            if !header_map.iter().any(|(_, c)| *c == column) {
                header_map.push((idx, column));
            }
        }
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| AppError::CsvInvalid(e.to_string()))?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let line_number = record
            .position()
            .map(|p| p.line() + skipped_blank_lines(text, p.byte()))
            .unwrap_or(0);

        let fields = header_map
            .iter()
            .map(|(idx, column)| (*column, record.get(*idx).unwrap_or("").to_string()))
            .collect();

        rows.push(Row {
            line_number,
            fields,
        });
    }

    Ok(rows)
}

/// Counts blank lines the reader skipped between `offset` and the next record.
fn skipped_blank_lines(text: &str, offset: u64) -> u64 {
    let rest = usize::try_from(offset)
        .ok()
        .and_then(|offset| text.get(offset..))
        .unwrap_or("");
    rest.bytes()
        .take_while(|b| *b == b'\n' || *b == b'\r')
        .filter(|b| *b == b'\n')
        .count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{CONTACT_COLUMNS, VENUE_COLUMNS};

    const VENUES_CSV: &str = "name,address,city,state,type,capacity,stage,status,dealValue,operatorName,notes\n\
        Test Arena,1 Main St,Springfield,IL,arena,1000,lead,prospect,50000,,n/a\n\
        Other Hall,2 Oak Ave,,IL,theater,,demo,client,,Acme,\n";

    #[test]
    fn parses_rows_with_header_offset_line_numbers() {
        let rows = parse_rows(VENUES_CSV.as_bytes(), VENUE_COLUMNS).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line_number(), 2);
        assert_eq!(rows[0].get("name"), "Test Arena");
        assert_eq!(rows[0].get("capacity"), "1000");
        assert_eq!(rows[1].line_number(), 3);
        assert_eq!(rows[1].get("city"), "");
        assert_eq!(rows[1].get("operatorName"), "Acme");
    }

    #[test]
    fn parsing_is_idempotent() {
        let first = parse_rows(VENUES_CSV.as_bytes(), VENUE_COLUMNS).unwrap();
        let second = parse_rows(VENUES_CSV.as_bytes(), VENUE_COLUMNS).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn trims_values_and_matches_headers_case_insensitively() {
        let csv = " Name , EMAIL ,Extra\n  Ann  ,  ann@example.com ,ignored\n";
        let rows = parse_rows(csv.as_bytes(), CONTACT_COLUMNS).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), "Ann");
        assert_eq!(rows[0].get("email"), "ann@example.com");
        assert_eq!(rows[0].get("Extra"), "");
        assert_eq!(rows[0].get("phone"), "");
    }

    #[test]
    fn skips_blank_lines_and_empty_records() {
        let csv = "name,email\nAnn,ann@example.com\n\n , \nBob,bob@example.com\n";
        let rows = parse_rows(csv.as_bytes(), CONTACT_COLUMNS).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line_number(), 2);
        assert_eq!(rows[1].line_number(), 5);
    }

    #[test]
    fn line_numbers_account_for_blank_lines() {
        let csv = "name,email\n\n\r\nAnn,ann@example.com\n";
        let rows = parse_rows(csv.as_bytes(), CONTACT_COLUMNS).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].line_number(), 4);
    }

    #[test]
    fn lines_with_only_undeclared_columns_are_kept() {
        let csv = "title,location\nArena,Chicago\nHall,Boston\n";
        let rows = parse_rows(csv.as_bytes(), VENUE_COLUMNS).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line_number(), 2);
        assert_eq!(rows[0].get("name"), "");
        assert_eq!(rows[1].line_number(), 3);
    }

    #[test]
    fn short_rows_surface_as_missing_fields() {
        let csv = "name,email,phone\nAnn\n";
        let rows = parse_rows(csv.as_bytes(), CONTACT_COLUMNS).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("email"), "");
    }

    #[test]
    fn quoted_fields_keep_commas_and_newlines() {
        let csv = "name,notes\n\"Arena, North\",\"line one\nline two\"\nNext,\n";
        let rows = parse_rows(csv.as_bytes(), VENUE_COLUMNS).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name"), "Arena, North");
        assert_eq!(rows[0].get("notes"), "line one\nline two");
        // The second record starts after the embedded newline.
        assert_eq!(rows[1].line_number(), 4);
    }

    #[test]
    fn strips_utf8_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"name,email\nAnn,ann@example.com\n");
        let rows = parse_rows(&bytes, CONTACT_COLUMNS).unwrap();
        assert_eq!(rows[0].get("name"), "Ann");
    }

    #[test]
    fn header_only_file_has_no_rows() {
        let rows = parse_rows(b"name,email\n", CONTACT_COLUMNS).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn invalid_utf8_is_fatal() {
        let err = parse_rows(&[0x6E, 0x61, 0xFF, 0xFE, 0x0A], CONTACT_COLUMNS).unwrap_err();
        assert!(matches!(err, AppError::NotUtf8));
    }

    #[test]
    fn empty_input_is_fatal() {
        for input in ["", "   \n\n"] {
            let err = parse_rows(input.as_bytes(), CONTACT_COLUMNS).unwrap_err();
            assert!(matches!(err, AppError::CsvInvalid(_)), "input {:?}", input);
        }
    }
}
