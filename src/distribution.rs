use serde::{Deserialize, Serialize};

use crate::tag::TagRecord;

/// Aggregated count of tags whose normalized production date falls in a
/// given year, or in the `Unknown` bucket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearBucket {
    pub year: String,
    pub count: u32,
}

/// Aggregate normalized records into per-year buckets.
///
/// Bucket order is first-encounter order during the scan, not
/// chronological order.
pub fn aggregate(tags: &[TagRecord]) -> Vec<YearBucket> {
    aggregate_years(tags.iter().map(|t| t.year().to_string()))
}

/// Count occurrences of each year value, preserving first-encounter order.
pub fn aggregate_years(years: impl IntoIterator<Item = String>) -> Vec<YearBucket> {
    let mut buckets: Vec<YearBucket> = Vec::new();
    for year in years {
        match buckets.iter_mut().find(|b| b.year == year) {
            Some(bucket) => bucket.count += 1,
            None => buckets.push(YearBucket { year, count: 1 }),
        }
    }
    buckets
}
