use tagboard::exporter::{EXPORT_COLUMNS, to_csv, to_xlsx};
use tagboard::loader::{self, CellValue};
use tagboard::tag::{TagRecord, UNKNOWN_DATE};

fn record(device_id: &str, production_date: &str) -> TagRecord {
    TagRecord {
        device_id: device_id.to_string(),
        production_date: production_date.to_string(),
    }
}

fn sample_table() -> Vec<TagRecord> {
    vec![
        record("12345", "2020-03"),
        record("67890", "2021-11"),
        record("424242", UNKNOWN_DATE),
    ]
}

fn test_xlsx_round_trip() {
    println!("\n====== Testing XLSX round trip ======");

    let tags = sample_table();
    let bytes = to_xlsx(&tags).unwrap();
    assert!(!bytes.is_empty());
    println!("✓ Workbook serializes to {} bytes", bytes.len());

    // Read the workbook back with the generic spreadsheet reader.
    let table = loader::parse_sheet(&bytes, "tags_export.xlsx").unwrap();
    assert_eq!(table.rows.len(), tags.len() + 1);

    let headers: Vec<String> = table.rows[0]
        .iter()
        .map(|c| c.as_text().unwrap())
        .collect();
    assert_eq!(headers, EXPORT_COLUMNS);
    println!("✓ Header row survives");

    for (tag, row) in tags.iter().zip(&table.rows[1..]) {
        assert_eq!(row[0].as_text().as_deref(), Some(tag.device_id.as_str()));
        assert_eq!(
            row[1].as_text().as_deref(),
            Some(tag.production_date.as_str())
        );
    }
    println!("✓ Every device_id/production_date pair reads back in order");
}

fn test_csv_output() {
    println!("\n====== Testing CSV output ======");

    let csv = to_csv(&sample_table());
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "device_id,production_date");
    assert_eq!(lines[1], "12345,2020-03");
    assert_eq!(lines[3], "424242,Unknown");
    println!("✓ CSV rows match the table");

    let tricky = vec![record("123", "odd,\"value\"")];
    let csv = to_csv(&tricky);
    assert_eq!(csv.lines().nth(1).unwrap(), "123,\"odd,\"\"value\"\"\"");
    println!("✓ Fields with commas and quotes are escaped");
}

fn test_csv_parsing() {
    println!("\n====== Testing CSV parsing ======");

    let data = b"a,b,c,123456,x\n\"quoted,field\",b,789,456,y\n";
    let table = loader::parse_sheet(data, "upload.csv").unwrap();
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.width(), 5);

    assert_eq!(table.rows[1][0], CellValue::Text("quoted,field".to_string()));
    println!("✓ Quoted fields keep their commas");

    assert_eq!(table.rows[0][3].as_text().as_deref(), Some("123456"));
    println!("✓ Column positions line up");

    let ids = loader::check_ids(&table);
    assert_eq!(ids, vec!["c".to_string(), "789".to_string()]);
    println!("✓ Check-id extraction reads column C");
}

fn test_export_independent_of_order() {
    println!("\n====== Testing export preserves table order ======");

    // The exporter writes records exactly as given, unknowns included.
    let tags = vec![
        record("3", UNKNOWN_DATE),
        record("1", "2019-01"),
        record("2", "2020-06"),
    ];
    let bytes = to_xlsx(&tags).unwrap();
    let table = loader::parse_sheet(&bytes, "tags_export.xlsx").unwrap();

    let ids: Vec<String> = table.rows[1..]
        .iter()
        .map(|row| row[0].as_text().unwrap())
        .collect();
    assert_eq!(ids, vec!["3", "1", "2"]);
    println!("✓ Row order is untouched by the exporter");
}

fn main() {
    println!("=== Exporter Test Suite ===");

    test_xlsx_round_trip();
    test_csv_output();
    test_csv_parsing();
    test_export_independent_of_order();

    println!("\nAll export tests passed!");
}
