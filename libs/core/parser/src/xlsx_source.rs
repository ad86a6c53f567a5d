use crate::{batch_from_raw_rows, ParseError, ParsedBatch, HEADER_SCAN_ROWS};
use calamine::{open_workbook_auto, Data, Reader, Sheets};
use catalog_core_schema::{validate_headers, CANONICAL_HEADERS};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Streams every sheet in order, auto-locating the header within the first
/// [`HEADER_SCAN_ROWS`] rows of each sheet and skipping sheets whose header
/// never validates. `skip_rows` counts data rows already persisted across
/// all sheets combined, matching the CSV path's resumption contract.
///
/// calamine materializes each worksheet's `Range` once per sheet rather than
/// truly streaming XML events, so one sheet's rows sit in memory the same
/// way the CSV path holds its whole decoded text; what this does avoid is
/// accumulating every sheet's batches ahead of the first one returned to the
/// caller. [`XlsxBatchIter`] yields one `chunk_size` group of rows at a time,
/// across sheet boundaries, mirroring `CsvBatchIter`.
pub fn parse_xlsx(
    file_path: &Path,
    chunk_size: usize,
    skip_rows: usize,
) -> Result<Box<dyn Iterator<Item = Result<ParsedBatch, ParseError>> + Send>, ParseError> {
    let workbook = open_workbook_auto(file_path).map_err(|e| ParseError::Unreadable(e.to_string()))?;
    let sheet_names = workbook.sheet_names().to_vec();

    Ok(Box::new(XlsxBatchIter {
        workbook,
        sheet_names,
        next_sheet_idx: 0,
        current_rows: None,
        keep_indices: Vec::new(),
        header_list: Vec::new(),
        chunk_size,
        skip_remaining: skip_rows,
        any_sheet_matched: false,
        exhausted: false,
        reported_no_match: false,
    }))
}

struct XlsxBatchIter {
    workbook: Sheets<BufReader<File>>,
    sheet_names: Vec<String>,
    next_sheet_idx: usize,
    current_rows: Option<std::vec::IntoIter<Vec<Data>>>,
    keep_indices: Vec<usize>,
    header_list: Vec<String>,
    chunk_size: usize,
    skip_remaining: usize,
    any_sheet_matched: bool,
    exhausted: bool,
    reported_no_match: bool,
}

impl XlsxBatchIter {
    /// Advances past sheets with no validating header, materializing the
    /// first matching sheet's data rows (after its header row) as an owned,
    /// non-borrowing iterator. Returns `false` once every sheet is exhausted.
    fn load_next_matching_sheet(&mut self) -> bool {
        while self.next_sheet_idx < self.sheet_names.len() {
            let sheet_name = self.sheet_names[self.next_sheet_idx].clone();
            self.next_sheet_idx += 1;

            let range = match self.workbook.worksheet_range(&sheet_name) {
                Ok(range) => range,
                Err(_) => continue,
            };

            let (header_row_idx, header_list) = match locate_header(range.rows().enumerate()) {
                Some(found) => found,
                None => continue,
            };

            self.any_sheet_matched = true;
            self.keep_indices = header_list
                .iter()
                .enumerate()
                .filter(|(_, h)| CANONICAL_HEADERS.contains(&h.as_str()))
                .map(|(idx, _)| idx)
                .collect();
            self.header_list = header_list;

            let owned_rows: Vec<Vec<Data>> =
                range.rows().skip(header_row_idx + 1).map(|row| row.to_vec()).collect();
            self.current_rows = Some(owned_rows.into_iter());
            return true;
        }
        false
    }
}

impl Iterator for XlsxBatchIter {
    type Item = Result<ParsedBatch, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }

        let mut pending: Vec<HashMap<String, Value>> = Vec::with_capacity(self.chunk_size);

        loop {
            if self.current_rows.is_none() && !self.load_next_matching_sheet() {
                self.exhausted = true;
                break;
            }

            let rows_iter = self.current_rows.as_mut().expect("just loaded a sheet");
            let mut chunk_filled = false;

            for row in rows_iter.by_ref() {
                if self.skip_remaining > 0 {
                    self.skip_remaining -= 1;
                    continue;
                }
                let mut raw = HashMap::with_capacity(self.keep_indices.len());
                for &col_idx in &self.keep_indices {
                    let header = &self.header_list[col_idx];
                    let value = row.get(col_idx).map(cell_to_json).unwrap_or(Value::Null);
                    raw.insert(header.clone(), value);
                }
                pending.push(raw);
                if pending.len() >= self.chunk_size {
                    chunk_filled = true;
                    break;
                }
            }

            if chunk_filled {
                break;
            }
            self.current_rows = None;
        }

        if self.exhausted && !self.any_sheet_matched && !self.reported_no_match {
            self.reported_no_match = true;
            return Some(Err(ParseError::NoMatchingSheet));
        }

        if pending.is_empty() {
            None
        } else {
            Some(Ok(batch_from_raw_rows(pending)))
        }
    }
}

/// Scans the first [`HEADER_SCAN_ROWS`] rows for the one whose cells satisfy
/// [`validate_headers`], returning its row index and the trimmed header
/// strings at that row.
fn locate_header<'a, I>(rows: std::iter::Enumerate<I>) -> Option<(usize, Vec<String>)>
where
    I: Iterator<Item = &'a [Data]>,
{
    for (idx, row) in rows.take(HEADER_SCAN_ROWS) {
        let header_list: Vec<String> = row.iter().map(cell_to_header_string).collect();
        if validate_headers(&header_list).is_ok() {
            return Some((idx, header_list));
        }
    }
    None
}

fn cell_to_header_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

fn cell_to_json(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Float(f) => serde_json::Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        Data::Int(i) => Value::Number((*i).into()),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => Value::String(dt.to_string()),
        Data::DateTimeIso(s) => Value::String(s.clone()),
        Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(_) => Value::Null,
    }
}
