//! CSV loading and writing with encoding and delimiter auto-detection.
//!
//! Loading never rejects a row: short rows are padded with nulls, surplus
//! fields are dropped and empty cells become `Null`. Only an unreadable or
//! header-less file is an error.

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde_json::Value;
use std::io::Write;
use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::models::{cell, cell_to_string, Dataset};

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub dataset: Dataset,
    /// Detected encoding
    pub encoding: String,
    /// Detected delimiter
    pub delimiter: char,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" | "utf-8-sig" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes using the named encoding. Unknown labels fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let text = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8_lossy(bytes).into_owned(),
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        label => match encoding_rs::Encoding::for_label(label.as_bytes()) {
            Some(enc) => enc.decode(bytes).0.into_owned(),
            None => String::from_utf8_lossy(bytes).into_owned(),
        },
    };
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Make repeated header names unique the way spreadsheet exports expect:
/// the second `Status` becomes `Status.1`.
fn unique_headers(raw: &StringRecord) -> Vec<String> {
    let mut headers: Vec<String> = Vec::with_capacity(raw.len());
    for field in raw.iter() {
        let base = field.trim().to_string();
        let mut name = base.clone();
        let mut n = 1;
        while headers.contains(&name) {
            name = format!("{}.{}", base, n);
            n += 1;
        }
        headers.push(name);
    }
    headers
}

/// Parse CSV text with an explicit delimiter.
pub fn parse_str(content: &str, delimiter: char) -> CsvResult<Dataset> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let header_record = reader.headers()?.clone();
    if header_record.iter().all(|h| h.trim().is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let mut dataset = Dataset::new(unique_headers(&header_record));
    for row in reader.records() {
        let row = row?;
        if row.iter().all(|f| f.is_empty()) {
            continue;
        }
        dataset.push_row(row.iter().map(|field| {
            if field.is_empty() {
                Value::Null
            } else {
                Value::String(field.to_string())
            }
        }));
    }

    Ok(dataset)
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    if bytes.is_empty() {
        return Err(CsvError::EmptyFile);
    }
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    let dataset = parse_str(&content, delimiter)?;

    Ok(ParseResult { dataset, encoding, delimiter })
}

/// Parse a CSV file with auto-detection of encoding and delimiter.
///
/// # Example
/// ```ignore
/// let result = parse_csv_file_auto("data/raw/spill_incidents_raw.csv")?;
/// println!("{} rows, delimiter '{}'", result.dataset.len(), result.delimiter);
/// ```
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

/// Write a dataset as comma-separated UTF-8, header first, nulls as empty cells.
pub fn write_csv<W: Write>(dataset: &Dataset, writer: W) -> CsvResult<()> {
    let mut out = WriterBuilder::new().from_writer(writer);
    out.write_record(&dataset.columns)?;
    for record in &dataset.records {
        out.write_record(dataset.columns.iter().map(|c| cell_to_string(cell(record, c))))?;
    }
    out.flush()?;
    Ok(())
}

/// Write a dataset to a file, creating parent directories.
pub fn write_csv_file<P: AsRef<Path>>(dataset: &Dataset, path: P) -> CsvResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_csv(dataset, std::io::BufWriter::new(file))
}
