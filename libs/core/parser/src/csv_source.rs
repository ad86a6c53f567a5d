use crate::{batch_from_raw_rows, ParseError, ParsedBatch};
use catalog_core_schema::validate_headers;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Reads the whole file once to settle encoding (UTF-8, falling back to
/// Windows-1252/Latin-1 on the first invalid byte sequence), then hands a
/// `csv::Reader` over the decoded text to an iterator that still emits rows
/// one record at a time and only materializes `chunk_size` of them at once.
pub fn parse_csv<'a>(
    file_path: &'a Path,
    chunk_size: usize,
    skip_rows: usize,
) -> Result<Box<dyn Iterator<Item = Result<ParsedBatch, ParseError>> + Send + 'a>, ParseError> {
    let bytes = fs::read(file_path).map_err(|e| ParseError::Unreadable(e.to_string()))?;
    let text = decode_text(&bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(std::io::Cursor::new(text));

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ParseError::Unreadable(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    validate_headers(&headers).map_err(ParseError::MissingHeaders)?;

    Ok(Box::new(CsvBatchIter {
        reader,
        headers,
        chunk_size,
        skip_remaining: skip_rows,
        done: false,
    }))
}

/// Attempts strict UTF-8 first; falls back to Windows-1252 (a practical
/// superset covering Latin-1's printable range) on the first invalid byte.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

struct CsvBatchIter {
    reader: csv::Reader<std::io::Cursor<String>>,
    headers: Vec<String>,
    chunk_size: usize,
    skip_remaining: usize,
    done: bool,
}

impl Iterator for CsvBatchIter {
    type Item = Result<ParsedBatch, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut raw_rows: Vec<HashMap<String, Value>> = Vec::with_capacity(self.chunk_size);
        let mut record = csv::StringRecord::new();

        loop {
            match self.reader.read_record(&mut record) {
                Ok(true) => {
                    if self.skip_remaining > 0 {
                        self.skip_remaining -= 1;
                        continue;
                    }
                    let mut raw = HashMap::with_capacity(self.headers.len());
                    for (idx, header) in self.headers.iter().enumerate() {
                        let value = record
                            .get(idx)
                            .map(|v| Value::String(v.to_string()))
                            .unwrap_or(Value::Null);
                        raw.insert(header.clone(), value);
                    }
                    raw_rows.push(raw);
                    if raw_rows.len() >= self.chunk_size {
                        return Some(Ok(batch_from_raw_rows(raw_rows)));
                    }
                }
                Ok(false) => {
                    self.done = true;
                    break;
                }
                Err(e) => return Some(Err(ParseError::MalformedRow(e.to_string()))),
            }
        }

        if raw_rows.is_empty() {
            None
        } else {
            Some(Ok(batch_from_raw_rows(raw_rows)))
        }
    }
}
