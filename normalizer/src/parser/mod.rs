//! CSV loader with encoding detection.
//!
//! Reads one exported statistics file into a raw [`Table`]. Columns and rows
//! are kept verbatim; the only interpretation is per-column type inference
//! (a column whose non-blank cells all parse as numbers becomes numeric) and
//! reading blank cells and NA markers such as `#N/A` as null.

use std::path::Path;

use serde_json::Value;

use crate::error::LoadError;
use crate::models::{is_na_text, parse_scalar, Table};

/// Format-specific options for reading a CSV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// Field delimiter.
    pub delimiter: u8,
    /// Encoding label (`utf-8`, `windows-1252`, ...). Detected when `None`.
    pub encoding: Option<String>,
    /// Lines to skip before the header row.
    pub skip_rows: usize,
    /// Trim whitespace around data fields. Header names are never trimmed.
    pub trim: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            encoding: None,
            skip_rows: 0,
            trim: true,
        }
    }
}

impl ReadOptions {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = skip_rows;
        self
    }
}

/// Parsed table with the settings actually used
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub table: Table,
    pub encoding: String,
    pub delimiter: u8,
}

/// Load `file_name` from `dir` into a raw table.
pub fn load_table(
    dir: impl AsRef<Path>,
    file_name: &str,
    options: &ReadOptions,
) -> Result<Table, LoadError> {
    load_file(dir.as_ref().join(file_name), options).map(|result| result.table)
}

/// Load a CSV file at `path`, returning detection metadata as well.
pub fn load_file(path: impl AsRef<Path>, options: &ReadOptions) -> Result<ParseResult, LoadError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => LoadError::NotFound {
            path: path.to_path_buf(),
        },
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    parse_bytes(&bytes, options)
}

/// Parse raw CSV bytes.
pub fn parse_bytes(bytes: &[u8], options: &ReadOptions) -> Result<ParseResult, LoadError> {
    let encoding = match &options.encoding {
        Some(enc) => enc.clone(),
        None => detect_encoding(bytes),
    };
    let content = decode_content(bytes, &encoding)?;
    let content = skip_lines(&content, options.skip_rows);

    let table = parse_table(content, options.delimiter, options.trim)?;
    Ok(ParseResult {
        table,
        encoding,
        delimiter: options.delimiter,
    })
}

/// Parse CSV text with an explicit delimiter and default trimming.
pub fn parse_str(content: &str, delimiter: u8) -> Result<Table, LoadError> {
    parse_table(content, delimiter, true)
}

/// Detect the encoding of raw bytes using chardet.
///
/// Always returns a label [`decode_content`] accepts; unrecognised guesses
/// fall back to windows-1252, which decodes any byte sequence.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0.to_lowercase();

    match charset.as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        other if encoding_rs::Encoding::for_label(other.as_bytes()).is_some() => other.to_string(),
        _ => "windows-1252".to_string(),
    }
}

/// Decode bytes to a string using the given encoding label.
pub fn decode_content(bytes: &[u8], encoding: &str) -> Result<String, LoadError> {
    let label = encoding.trim().to_lowercase();
    let text = match label.as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8(bytes.to_vec())
            .map_err(|e| LoadError::Encoding(format!("invalid UTF-8: {}", e)))?,
        other => {
            let enc = encoding_rs::Encoding::for_label(other.as_bytes())
                .ok_or_else(|| LoadError::Encoding(format!("unsupported encoding '{}'", encoding)))?;
            enc.decode(bytes).0.into_owned()
        }
    };
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

/// Detect the delimiter by counting occurrences in the first line.
pub fn detect_delimiter(content: &str) -> u8 {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [b',', b';', b'\t', b'|'];
    let mut best_sep = b',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep as char).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

fn skip_lines(content: &str, n: usize) -> &str {
    let mut rest = content;
    for _ in 0..n {
        match rest.find('\n') {
            Some(idx) => rest = &rest[idx + 1..],
            None => return "",
        }
    }
    rest
}

fn parse_table(content: &str, delimiter: u8, trim: bool) -> Result<Table, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(if trim { csv::Trim::Fields } else { csv::Trim::None })
        .from_reader(content.as_bytes());

    let headers = rdr.headers().map_err(csv_error)?.clone();
    if headers.is_empty() {
        return Err(LoadError::EmptyFile);
    }
    let columns = unique_headers(headers.iter());
    let width = columns.len();

    let mut cells: Vec<Vec<String>> = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(csv_error)?;
        if record.len() > width {
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            return Err(LoadError::Parse {
                line,
                message: format!("expected {} fields, saw {}", width, record.len()),
            });
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(width, String::new());
        cells.push(row);
    }

    let numeric: Vec<bool> = (0..width)
        .map(|col| {
            cells.iter().all(|row| {
                let raw = &row[col];
                is_na_text(raw) || parse_scalar(raw).is_number()
            })
        })
        .collect();

    let values: Vec<Vec<Value>> = cells
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&numeric)
                .map(|(raw, &is_numeric)| {
                    if is_na_text(&raw) {
                        Value::Null
                    } else if is_numeric {
                        parse_scalar(&raw)
                    } else {
                        Value::String(raw)
                    }
                })
                .collect::<Vec<Value>>()
        })
        .collect();

    Ok(Table::from_values(columns, values))
}

/// Make header names unique: later duplicates get `.1`, `.2`, ... and blank
/// names become `Unnamed: <index>`.
fn unique_headers<'a, I>(headers: I) -> Vec<String>
where
    I: Iterator<Item = &'a str>,
{
    let mut columns: Vec<String> = Vec::new();
    for (idx, raw) in headers.enumerate() {
        let base = if raw.trim().is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            raw.to_string()
        };
        let mut name = base.clone();
        let mut n = 1;
        while columns.contains(&name) {
            name = format!("{}.{}", base, n);
            n += 1;
        }
        columns.push(name);
    }
    columns
}

fn csv_error(err: csv::Error) -> LoadError {
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    LoadError::Parse {
        line,
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    #[test]
    fn test_simple_csv() {
        let table = parse_str("name,age\nAlice,30\nBob,25", b',').unwrap();

        assert_eq!(table.columns(), ["name", "age"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0]["name"], "Alice");
        assert_eq!(table.rows()[0]["age"], 30);
        assert_eq!(table.rows()[1]["age"], 25);
    }

    #[test]
    fn test_quoted_header_with_newline() {
        let csv = "code,\"Total recorded crime\n (excluding fraud)\"\nE001,1200\n";
        let table = parse_str(csv, b',').unwrap();

        assert_eq!(table.columns()[1], "Total recorded crime\n (excluding fraud)");
        assert_eq!(table.rows()[0]["Total recorded crime\n (excluding fraud)"], 1200);
    }

    #[test]
    fn test_header_trailing_space_kept() {
        let table = parse_str("Local authority code ,price\n E001 ,250000\n", b',').unwrap();

        assert_eq!(table.columns()[0], "Local authority code ");
        assert_eq!(table.rows()[0]["Local authority code "], "E001");
    }

    #[test]
    fn test_column_type_inference() {
        let csv = "code,count,median\nE001,10,650\nE002,12,..\n";
        let table = parse_str(csv, b',').unwrap();

        assert_eq!(table.rows()[0]["count"], 10);
        // one non-numeric cell keeps the whole column textual
        assert_eq!(table.rows()[0]["median"], "650");
        assert_eq!(table.rows()[1]["median"], "..");
    }

    #[test]
    fn test_missing_values_are_null() {
        let table = parse_str("a,b,c\n1,,3", b',').unwrap();

        assert_eq!(table.rows()[0]["a"], 1);
        assert_eq!(table.rows()[0]["b"], Value::Null);
        assert_eq!(table.rows()[0]["c"], 3);
    }

    #[test]
    fn test_na_markers_are_null_and_keep_column_numeric() {
        let table = parse_str("Code,2020\nE06000001,5.11\n#N/A,7.84\nE06000002,N/A", b',').unwrap();

        assert_eq!(table.rows()[0]["2020"], json!(5.11));
        assert_eq!(table.rows()[1]["Code"], Value::Null);
        assert_eq!(table.rows()[1]["2020"], json!(7.84));
        assert_eq!(table.rows()[2]["2020"], Value::Null);
    }

    #[test]
    fn test_short_rows_padded() {
        let table = parse_str("a,b,c\n1,2", b',').unwrap();
        assert_eq!(table.rows()[0]["c"], Value::Null);
    }

    #[test]
    fn test_long_row_is_parse_error() {
        let result = parse_str("a,b\n1,2\n1,2,3,4", b',');
        match result {
            Err(LoadError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_lines_skipped() {
        let table = parse_str("a,b\n1,2\n\n3,4\n", b',').unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(parse_str("", b','), Err(LoadError::EmptyFile)));
    }

    #[test]
    fn test_duplicate_headers_renamed() {
        let table = parse_str("Code,Code,Code\nE001,a,b\n", b',').unwrap();
        assert_eq!(table.columns(), ["Code", "Code.1", "Code.2"]);
        assert_eq!(table.rows()[0]["Code.1"], "a");
    }

    #[test]
    fn test_blank_header_named() {
        let table = parse_str(",value\nx,1\n", b',').unwrap();
        assert_eq!(table.columns(), ["Unnamed: 0", "value"]);
    }

    #[test]
    fn test_skip_rows() {
        let content = "Table 2.7: private rents\nSource: ONS\nArea Code1,Median\nE001,650\n";
        let options = ReadOptions::default().with_skip_rows(2);
        let result = parse_bytes(content.as_bytes(), &options).unwrap();

        assert_eq!(result.table.columns(), ["Area Code1", "Median"]);
        assert_eq!(result.table.rows()[0]["Median"], 650);
    }

    #[test]
    fn test_semicolon_delimiter() {
        let options = ReadOptions::default().with_delimiter(b';');
        let result = parse_bytes(b"a;b\n1;x", &options).unwrap();
        assert_eq!(result.table.rows()[0]["b"], "x");
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), b';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), b',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), b'\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), b'|');
        assert_eq!(detect_delimiter("single"), b',');
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_invalid_utf8_is_encoding_error() {
        let bytes: &[u8] = &[0x61, 0xff, 0x62];
        assert!(matches!(
            decode_content(bytes, "utf-8"),
            Err(LoadError::Encoding(_))
        ));
    }

    #[test]
    fn test_bom_stripped() {
        let bytes = b"\xef\xbb\xbfCode,2020\nE001,8.5\n";
        let result = parse_bytes(bytes, &ReadOptions::default().with_encoding("utf-8")).unwrap();
        assert_eq!(result.table.columns(), ["Code", "2020"]);
        assert_eq!(result.table.rows()[0]["2020"], json!(8.5));
    }

    #[test]
    fn test_load_table_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_table(dir.path(), "rental.csv", &ReadOptions::default());
        match result {
            Err(LoadError::NotFound { path }) => assert!(path.ends_with("rental.csv")),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_load_table_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("crime.csv"), "Local Authority code,x\nE001,1\n").unwrap();

        let table = load_table(dir.path(), "crime.csv", &ReadOptions::default()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0]["Local Authority code"], "E001");
    }
}
