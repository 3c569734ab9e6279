//! Fetch tabular data: spreadsheet files as JSON row records.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use calamine::{open_workbook_auto, Data, Reader};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error_handling::CapabilityFailure;
use crate::tool_definitions::FETCH_TABULAR_DATA;
use crate::tools::executor::ToolContext;
use crate::ui_writer::UiWriter;

/// One row, keyed by the header row
pub type Record = Map<String, Value>;

#[async_trait]
pub trait SpreadsheetReader: Send + Sync {
    async fn read(&self, path: &Path) -> Result<Vec<Record>>;
}

/// Reads workbooks through calamine and CSV files directly.
pub struct WorkbookReader;

#[async_trait]
impl SpreadsheetReader for WorkbookReader {
    async fn read(&self, path: &Path) -> Result<Vec<Record>> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => {
                let content = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                Ok(parse_csv(&content))
            }
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => {
                let path = path.to_path_buf();
                tokio::task::spawn_blocking(move || read_workbook(&path))
                    .await
                    .context("Spreadsheet reader task panicked")?
            }
            other => anyhow::bail!(
                "Unsupported spreadsheet format '{}' for {}",
                other,
                path.display()
            ),
        }
    }
}

/// First worksheet; first row is the header.
fn read_workbook(path: &Path) -> Result<Vec<Record>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook {}", path.display()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow::anyhow!("Workbook {} has no worksheets", path.display()))?
        .with_context(|| format!("Failed to read first worksheet of {}", path.display()))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Vec::new());
    };
    let headers = normalize_headers(header_row.iter().map(cell_to_string));

    let records = rows
        .filter(|row| row.iter().any(|cell| !matches!(cell, Data::Empty)))
        .map(|row| {
            headers
                .iter()
                .enumerate()
                .map(|(idx, key)| (key.clone(), row.get(idx).map(cell_to_json).unwrap_or(Value::Null)))
                .collect()
        })
        .collect();

    Ok(records)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn cell_to_json(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Bool(b) => Value::Bool(*b),
        Data::Int(i) => Value::from(*i),
        // Whole floats are what Excel stores for plain integers
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Value::from(*f as i64),
        Data::Float(f) => Value::from(*f),
        other => Value::String(other.to_string()),
    }
}

/// Blank header cells become `column_N` (1-based).
fn normalize_headers(raw: impl Iterator<Item = String>) -> Vec<String> {
    raw.enumerate()
        .map(|(idx, header)| {
            if header.is_empty() {
                format!("column_{}", idx + 1)
            } else {
                header
            }
        })
        .collect()
}

/// Comma-separated text with a header line; quoted fields may contain commas,
/// doubled quotes and line breaks.
pub fn parse_csv(content: &str) -> Vec<Record> {
    let mut records = csv_records(content.trim_start_matches('\u{feff}')).into_iter();
    let headers_line = records.next().unwrap_or_default();
    if headers_line.trim().is_empty() {
        return Vec::new();
    }

    let headers = normalize_headers(
        split_csv_line(&headers_line)
            .into_iter()
            .map(|h| h.trim().to_string()),
    );
    let mut rows = Vec::new();

    for record in records {
        if record.trim().is_empty() {
            continue;
        }
        let values = split_csv_line(&record);
        let mut row = Map::new();
        for (idx, key) in headers.iter().enumerate() {
            let value = values.get(idx).cloned().unwrap_or_default();
            row.insert(key.clone(), Value::String(value));
        }
        rows.push(row);
    }

    rows
}

/// Join physical lines into logical records; a record ends only where its
/// quote count is even.
fn csv_records(content: &str) -> Vec<String> {
    let mut records = Vec::new();
    let mut current = String::new();
    let mut open_quote = false;

    for line in content.lines() {
        if open_quote {
            current.push('\n');
        }
        current.push_str(line);
        if line.matches('"').count() % 2 == 1 {
            open_quote = !open_quote;
        }
        if !open_quote {
            records.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        records.push(current);
    }

    records
}

fn split_csv_line(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => result.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    result.push(current);
    result
}

/// Execute the `get_excel_data` tool.
pub async fn execute_fetch_tabular_data<W: UiWriter>(
    file_path: &str,
    ctx: &ToolContext<'_, W>,
) -> Result<String, CapabilityFailure> {
    let expanded = shellexpand::tilde(file_path).to_string();
    info!("Reading tabular data from {}", expanded);

    let records = ctx
        .collaborators
        .spreadsheet_reader
        .read(Path::new(&expanded))
        .await
        .map_err(|e| CapabilityFailure::from_error(FETCH_TABULAR_DATA, &e))?;

    debug!("Read {} rows from {}", records.len(), expanded);

    serde_json::to_string(&records)
        .map_err(|e| CapabilityFailure::new(FETCH_TABULAR_DATA, format!("Failed to encode rows: {}", e)))
}
