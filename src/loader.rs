use calamine::{Data, Reader, Xlsx};
use chrono::NaiveDate;
use std::error::Error;
use std::io::Cursor;

use crate::tag;

/// Column positions in the database upload file: device id in column D,
/// production date in column Y.
pub const DB_ID_COLUMN: usize = 3;
pub const DB_DATE_COLUMN: usize = 24;

/// Tag ids in the check upload sit in column C.
pub const CHECK_ID_COLUMN: usize = 2;

/// One parsed cell from an uploaded sheet.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Empty,
}

impl CellValue {
    /// Cell content as a trimmed display string, or `None` for a blank
    /// cell. Integral numbers print without a decimal point because
    /// spreadsheet readers hand numeric ids back as floats.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    Some(format!("{:.0}", n))
                } else {
                    Some(n.to_string())
                }
            }
            CellValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            CellValue::Empty => None,
        }
    }

    /// Cell content as a calendar date, if it holds one.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            CellValue::Text(s) => tag::parse_production_date(s),
            _ => None,
        }
    }
}

/// A parsed upload: rows of typed cells, header included.
pub struct SheetTable {
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetTable {
    /// Widest row in the table.
    pub fn width(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }
}

/// Parse uploaded bytes into a [`SheetTable`].
///
/// `.csv` uploads go through the CSV parser; everything else is treated
/// as an Excel workbook, matching the lenient intake of the upload form.
pub fn parse_sheet(data: &[u8], filename: &str) -> Result<SheetTable, Box<dyn Error>> {
    if filename.to_lowercase().ends_with(".csv") {
        parse_csv(data)
    } else {
        parse_xlsx(data)
    }
}

fn parse_xlsx(data: &[u8]) -> Result<SheetTable, Box<dyn Error>> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(data))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .ok_or("No sheets found in the uploaded file")?
        .to_owned();
    let range = workbook.worksheet_range(&sheet_name)?;

    let mut rows = Vec::with_capacity(range.height());
    for row in range.rows() {
        rows.push(row.iter().map(convert_cell).collect());
    }

    Ok(SheetTable { rows })
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(dt) => CellValue::Date(dt.date()),
            None => CellValue::Empty,
        },
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        _ => CellValue::Empty,
    }
}

fn parse_csv(data: &[u8]) -> Result<SheetTable, Box<dyn Error>> {
    let text = String::from_utf8_lossy(data);
    let mut rows = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let fields = parse_csv_row(line);
        rows.push(
            fields
                .into_iter()
                .map(|field| {
                    if field.trim().is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(field)
                    }
                })
                .collect(),
        );
    }

    Ok(SheetTable { rows })
}

// Quote-aware CSV field splitter; doubled quotes inside a quoted field
// collapse to a single quote.
fn parse_csv_row(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if let Some(&next) = chars.peek() {
                    if next == '"' && in_quotes {
                        current_field.push('"');
                        chars.next();
                    } else {
                        in_quotes = !in_quotes;
                    }
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                result.push(current_field);
                current_field = String::new();
            }
            _ => {
                current_field.push(c);
            }
        }
    }

    result.push(current_field);
    result
}

/// Rows of the database upload as `(device_id, production_date)` pairs.
/// Rows missing either value are dropped, as are rows whose date cannot
/// be read as a calendar date.
pub fn database_rows(table: &SheetTable) -> Vec<(String, NaiveDate)> {
    let mut out = Vec::new();
    for row in &table.rows {
        let id = row.get(DB_ID_COLUMN).and_then(|c| c.as_text());
        let date = row.get(DB_DATE_COLUMN).and_then(|c| c.as_date());
        if let (Some(id), Some(date)) = (id, date) {
            out.push((id, date));
        }
    }
    out
}

/// Device ids from the check upload's id column; blank cells are dropped.
pub fn check_ids(table: &SheetTable) -> Vec<String> {
    table
        .rows
        .iter()
        .filter_map(|row| row.get(CHECK_ID_COLUMN).and_then(|c| c.as_text()))
        .collect()
}
