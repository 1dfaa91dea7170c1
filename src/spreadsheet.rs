//! Query rows read from the first worksheet of an XLSX workbook.
//!
//! Row 1 holds the headers (any order, case-insensitive); every following
//! row that is not blank must carry a whole-number id.

use crate::query::QueryRequest;
use calamine::{Data, Range, Reader, open_workbook_auto_from_rs};
use serde::Serialize;
use std::{collections::HashMap, io::Cursor};
use thiserror::Error;

pub const REQUIRED_HEADERS: [&str; 6] =
    ["id", "and_keywords", "and_exact_phrases", "or_keywords", "or_exact_phrases", "time_range"];

#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("Failed to open spreadsheet: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Spreadsheet has no worksheets.")]
    NoWorksheets,

    #[error("Spreadsheet missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<&'static str>),

    #[error("Missing or invalid id in row {0}. All rows must have a valid numeric id.")]
    InvalidId(u32),
}

/// One saved search from the query spreadsheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryRow {
    pub id: i64,
    #[serde(flatten)]
    pub request: QueryRequest,
}

/// Read the query rows of an XLSX (or other calamine-supported) workbook.
pub fn read_query_rows(bytes: Vec<u8>) -> Result<Vec<QueryRow>, SpreadsheetError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook.worksheet_range_at(0).ok_or(SpreadsheetError::NoWorksheets)??;
    query_rows(&range)
}

/// Text of a cell: strings trimmed, whole numbers without a fraction.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string().trim().to_string(),
    }
}

pub fn query_rows(range: &Range<Data>) -> Result<Vec<QueryRow>, SpreadsheetError> {
    let (first_row, _) = range.start().unwrap_or((0, 0));
    let mut rows = range.rows();

    // Headers must be on the first sheet row
    let headers: HashMap<String, usize> = match rows.next() {
        Some(header_row) if first_row == 0 => header_row
            .iter()
            .enumerate()
            .map(|(column, cell)| (cell_text(cell).to_lowercase(), column))
            .filter(|(header, _)| !header.is_empty())
            .collect(),
        _ => HashMap::new(),
    };

    let missing: Vec<&'static str> =
        REQUIRED_HEADERS.into_iter().filter(|h| !headers.contains_key(*h)).collect();
    if !missing.is_empty() {
        return Err(SpreadsheetError::MissingColumns(missing));
    }

    let mut query_rows = Vec::new();
    for (offset, row) in rows.enumerate() {
        let text = |header: &str| {
            headers.get(header).and_then(|&column| row.get(column)).map(cell_text).unwrap_or_default()
        };
        let values: Vec<String> = REQUIRED_HEADERS.into_iter().map(|h| text(h)).collect();
        if values.iter().all(String::is_empty) {
            continue;
        }

        // 1-based sheet row; the header occupies row 1
        let row_number = u32::try_from(offset).unwrap_or(u32::MAX).saturating_add(2);
        let id = values[0].parse::<i64>().map_err(|_| SpreadsheetError::InvalidId(row_number))?;

        let field = |index: usize| Some(values[index].clone()).filter(|v| !v.is_empty());
        query_rows.push(QueryRow {
            id,
            request: QueryRequest {
                and_keywords: field(1),
                and_exact_phrases: field(2),
                or_keywords: field(3),
                or_exact_phrases: field(4),
                time_range: field(5),
            },
        });
    }

    Ok(query_rows)
}
