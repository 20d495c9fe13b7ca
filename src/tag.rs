use chrono::{NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sentinel used wherever a production date could not be resolved.
pub const UNKNOWN_DATE: &str = "Unknown";

// Ids carrying these substrings are header rows or vendor artifacts, not
// real tags. Matching runs on the lower-cased id.
const REJECTED_SUBSTRINGS: [&str; 2] = ["allflex", "מספר תג"];

lazy_static! {
    static ref DIGITS_RE: Regex = Regex::new(r"^[0-9]+$").unwrap();
    static ref YEAR_MONTH_RE: Regex = Regex::new(r"^\d{4}-\d{2}$").unwrap();
}

// Accepted date shapes, tried in order. Day-first forms come before
// month-first ones because the source spreadsheets are day-first.
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M:%S"];
const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
];

/// A tag row as it arrives from spreadsheet parsing, before validation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawTag {
    pub device_id: String,
    #[serde(default)]
    pub production_date: Option<String>,
}

/// A validated, display-ready tag row.
///
/// Every retained record has a non-empty, digits-only `device_id`, and a
/// `production_date` that is either zero-padded `YYYY-MM` or
/// [`UNKNOWN_DATE`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub device_id: String,
    pub production_date: String,
}

impl TagRecord {
    /// The year component used for bucketing, or [`UNKNOWN_DATE`].
    pub fn year(&self) -> &str {
        if self.production_date == UNKNOWN_DATE {
            UNKNOWN_DATE
        } else {
            self.production_date
                .split('-')
                .next()
                .unwrap_or(UNKNOWN_DATE)
        }
    }
}

/// Filter predicate for tag ids: non-empty, free of the rejected
/// substrings, decimal digits only.
pub fn is_valid_device_id(device_id: &str) -> bool {
    let id = device_id.to_lowercase();
    !id.is_empty()
        && !REJECTED_SUBSTRINGS.iter().any(|s| id.contains(s))
        && DIGITS_RE.is_match(&id)
}

/// Parse an arbitrary date-like string as a calendar date.
pub fn parse_production_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(value, fmt) {
            return Some(d);
        }
    }
    None
}

/// Normalize a date-like input to zero-padded `YYYY-MM`, or
/// [`UNKNOWN_DATE`] when the value is absent or cannot be read as a
/// calendar date.
///
/// # Examples
/// ```
/// use tagboard::tag::normalize_date;
///
/// assert_eq!(normalize_date(Some("2020-03-15")), "2020-03");
/// assert_eq!(normalize_date(Some("garbage")), "Unknown");
/// assert_eq!(normalize_date(None), "Unknown");
/// ```
pub fn normalize_date(value: Option<&str>) -> String {
    let Some(value) = value else {
        return UNKNOWN_DATE.to_string();
    };
    let value = value.trim();
    if YEAR_MONTH_RE.is_match(value) {
        return value.to_string();
    }
    match parse_production_date(value) {
        Some(date) => date.format("%Y-%m").to_string(),
        None => UNKNOWN_DATE.to_string(),
    }
}

/// Orders normalized production dates ascending with [`UNKNOWN_DATE`]
/// always placed last.
///
/// Both sides of the comparison report `Unknown` as "after", so this is
/// not antisymmetric when both values are `Unknown`. Combined with a
/// stable sort it yields the intended always-last placement; do not
/// "repair" it into a strict total order.
pub fn compare_production_dates(a: &str, b: &str) -> Ordering {
    if a == UNKNOWN_DATE {
        return Ordering::Greater;
    }
    if b == UNKNOWN_DATE {
        return Ordering::Less;
    }
    a.cmp(b)
}

/// Run the full pipeline over raw rows: filter invalid ids, normalize the
/// dates, sort ascending with unknowns last.
///
/// Malformed rows are dropped silently; the only caller-visible signal for
/// a fully-malformed input is an empty result.
pub fn normalize_tags(raw: Vec<RawTag>) -> Vec<TagRecord> {
    let mut tags: Vec<TagRecord> = raw
        .into_iter()
        .filter(|t| is_valid_device_id(&t.device_id))
        .map(|t| TagRecord {
            device_id: t.device_id,
            production_date: normalize_date(t.production_date.as_deref()),
        })
        .collect();
    tags.sort_by(|a, b| compare_production_dates(&a.production_date, &b.production_date));
    tags
}
