use chrono::NaiveDate;

use tagboard::store::{TagStore, expected_date, extract_series};
use tagboard::tag::UNKNOWN_DATE;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn row(id: &str, d: NaiveDate) -> (String, NaiveDate) {
    (id.to_string(), d)
}

fn test_series_extraction() {
    println!("\n====== Testing series extraction ======");

    assert_eq!(extract_series("1234"), "12");
    assert_eq!(extract_series("12345"), "12");
    println!("✓ Short ids map to a two-character series");

    assert_eq!(extract_series("123456"), "123");
    assert_eq!(extract_series("9876543210"), "987");
    println!("✓ Longer ids map to a three-character series");

    assert_eq!(extract_series("  12345  "), "12");
    println!("✓ Surrounding whitespace is ignored");
}

fn test_expected_date() {
    println!("\n====== Testing expected-date median ======");

    let dates: Vec<NaiveDate> = (1..=10).map(|d| date(2020, 1, d)).collect();
    // Trimming 10% off both ends of ten dates leaves indices 1..9;
    // the middle of those eight is index 5 overall.
    assert_eq!(expected_date(&dates), Some(date(2020, 1, 6)));
    println!("✓ Ten dates trim to the sixth");

    let few = vec![date(2021, 3, 1), date(2021, 3, 2), date(2021, 3, 3)];
    assert_eq!(expected_date(&few), Some(date(2021, 3, 2)));
    println!("✓ Small lists fall back to the plain middle element");

    assert_eq!(expected_date(&[]), None);
    println!("✓ No dates, no expectation");
}

fn test_upload_and_duplicates() {
    println!("\n====== Testing database upload ======");

    let mut store = TagStore::open_in_memory().unwrap();
    let rows = vec![
        row("123456", date(2020, 3, 15)),
        row("123457", date(2020, 4, 1)),
        row("987654", date(2021, 1, 10)),
    ];

    let outcome = store.upload_database(&rows).unwrap();
    assert_eq!(outcome.inserted, 3);
    assert_eq!(outcome.skipped, 0);
    assert_eq!(store.tag_count().unwrap(), 3);
    assert_eq!(
        outcome.message(),
        "Database updated with 3 new rows. 0 duplicates skipped."
    );
    println!("✓ Fresh rows are inserted");

    let outcome = store.upload_database(&rows).unwrap();
    assert_eq!(outcome.inserted, 0);
    assert_eq!(outcome.skipped, 3);
    assert_eq!(store.tag_count().unwrap(), 3);
    assert_eq!(outcome.message(), "No new tags added. 3 duplicate tags skipped.");
    println!("✓ Re-uploading the same file adds nothing");

    let mixed = vec![row("123456", date(2020, 3, 15)), row("555555", date(2022, 7, 1))];
    let outcome = store.upload_database(&mixed).unwrap();
    assert_eq!(outcome.inserted, 1);
    assert_eq!(outcome.skipped, 1);
    println!("✓ Mixed uploads keep only the new ids");

    let (removed, remaining) = store.clean_duplicates().unwrap();
    assert_eq!(removed, 0);
    assert_eq!(remaining, 4);
    println!("✓ Primary key keeps the table duplicate-free");
}

fn test_series_stats() {
    println!("\n====== Testing series statistics ======");

    let mut store = TagStore::open_in_memory().unwrap();
    let rows: Vec<(String, NaiveDate)> = (0..10)
        .map(|i| row(&format!("12345{i}"), date(2020, 1, i + 1)))
        .collect();
    store.upload_database(&rows).unwrap();

    let stats = store.series_stats().unwrap();
    assert_eq!(stats.len(), 1);
    let series = &stats[0];
    assert_eq!(series.series, "123");
    assert_eq!(series.count, 10);
    assert_eq!(series.min_date.as_deref(), Some("2020-01-01"));
    assert_eq!(series.max_date.as_deref(), Some("2020-01-10"));
    assert_eq!(series.expected_date.as_deref(), Some("2020-01-06"));
    println!("✓ Count, min, max and expected date line up");
}

fn test_check_tags() {
    println!("\n====== Testing tag checking ======");

    let mut store = TagStore::open_in_memory().unwrap();
    let rows: Vec<(String, NaiveDate)> = (0..5)
        .map(|i| row(&format!("77000{i}"), date(2019, 6, i + 10)))
        .collect();
    store.upload_database(&rows).unwrap();

    let checked = store
        .check_tags(&["770009".to_string(), "880001".to_string()])
        .unwrap();
    assert_eq!(checked.len(), 2);

    assert_eq!(checked[0].series, "770");
    assert_eq!(checked[0].production_date, "2019-06");
    assert_eq!(checked[0].status, "Known series");
    assert!(checked[0].is_known());
    println!("✓ Known series resolve to the expected month");

    assert_eq!(checked[1].series, "880");
    assert_eq!(checked[1].production_date, UNKNOWN_DATE);
    assert_eq!(checked[1].status, "Unknown series");
    assert!(!checked[1].is_known());
    println!("✓ Unknown series stay unresolved");
}

fn test_update_series() {
    println!("\n====== Testing series correction ======");

    let mut store = TagStore::open_in_memory().unwrap();
    store
        .upload_database(&[row("123456", date(2020, 1, 1))])
        .unwrap();

    let touched = store
        .update_series(&[row("123456", date(2020, 1, 1)), row("999999", date(2020, 1, 1))])
        .unwrap();
    assert_eq!(touched, 1);
    println!("✓ Only stored ids are touched by a correction file");

    let tags = store.all_tags().unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].series, "123");
    println!("✓ Series stay consistent after the update");
}

fn test_yearly_distribution() {
    println!("\n====== Testing whole-store distribution ======");

    let mut store = TagStore::open_in_memory().unwrap();
    store
        .upload_database(&[
            row("100001", date(2020, 2, 1)),
            row("100002", date(2020, 9, 9)),
            row("200001", date(2021, 5, 5)),
        ])
        .unwrap();

    let buckets = store.yearly_distribution().unwrap();
    let total: u32 = buckets.iter().map(|b| b.count).sum();
    assert_eq!(total, 3);

    let year_2020 = buckets.iter().find(|b| b.year == "2020").unwrap();
    assert_eq!(year_2020.count, 2);
    let year_2021 = buckets.iter().find(|b| b.year == "2021").unwrap();
    assert_eq!(year_2021.count, 1);
    println!("✓ Store rows bucket by production year");
}

fn test_persistence() {
    println!("\n====== Testing on-disk persistence ======");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tags.db");

    {
        let mut store = TagStore::open(&path).unwrap();
        store
            .upload_database(&[row("123456", date(2020, 1, 1))])
            .unwrap();
    }

    let store = TagStore::open(&path).unwrap();
    assert_eq!(store.tag_count().unwrap(), 1);
    assert_eq!(store.series_stats().unwrap().len(), 1);
    println!("✓ Tags and statistics survive a reopen");
}

fn main() {
    println!("=== Tag Store Test Suite ===");

    test_series_extraction();
    test_expected_date();
    test_upload_and_duplicates();
    test_series_stats();
    test_check_tags();
    test_update_series();
    test_yearly_distribution();
    test_persistence();

    println!("\nAll store tests passed!");
}
