use std::error::Error;

use crate::tag::TagRecord;

/// Column headers of the exported table, in order.
pub const EXPORT_COLUMNS: [&str; 2] = ["device_id", "production_date"];

/// Serialize the normalized table to an XLSX workbook in memory.
///
/// Every record is included regardless of chart segment visibility.
///
/// # Arguments
/// * `tags` - The normalized table to serialize
///
/// # Returns
/// * `Result<Vec<u8>, Box<dyn Error>>` - XLSX file content as bytes or an error
///
/// # Examples
/// ```no_run
/// use tagboard::exporter::to_xlsx;
/// use tagboard::tag::TagRecord;
///
/// let tags = vec![TagRecord {
///     device_id: "12345".to_string(),
///     production_date: "2020-03".to_string(),
/// }];
/// let bytes = to_xlsx(&tags).unwrap();
/// assert!(!bytes.is_empty());
/// ```
pub fn to_xlsx(tags: &[TagRecord]) -> Result<Vec<u8>, Box<dyn Error>> {
    use rust_xlsxwriter::{Workbook, Worksheet};

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name("Tags")?;

    for (col, header) in EXPORT_COLUMNS.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }
    for (row, tag) in tags.iter().enumerate() {
        let row = row as u32 + 1;
        worksheet.write_string(row, 0, tag.device_id.as_str())?;
        worksheet.write_string(row, 1, tag.production_date.as_str())?;
    }

    workbook.push_worksheet(worksheet);
    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}

/// Serialize the normalized table to CSV text with a header row.
pub fn to_csv(tags: &[TagRecord]) -> String {
    let mut csv = String::new();
    csv.push_str(&EXPORT_COLUMNS.join(","));
    csv.push('\n');

    for tag in tags {
        csv.push_str(&escape_field(&tag.device_id));
        csv.push(',');
        csv.push_str(&escape_field(&tag.production_date));
        csv.push('\n');
    }

    csv
}

// Escape commas, quotes and newlines so the value survives a generic
// tabular reader.
fn escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
