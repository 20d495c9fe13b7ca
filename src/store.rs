use chrono::NaiveDate;
use rusqlite::{Connection, params};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use crate::distribution::{self, YearBucket};
use crate::tag::{self, UNKNOWN_DATE};

/// A row of the `tags` table.
#[derive(Clone, Debug, Serialize)]
pub struct StoredTag {
    pub series: String,
    pub device_id: String,
    pub production_date: String,
}

/// Per-series statistics derived from the `tags` table.
#[derive(Clone, Debug, Serialize)]
pub struct SeriesStats {
    pub series: String,
    pub count: u32,
    pub min_date: Option<String>,
    pub max_date: Option<String>,
    pub expected_date: Option<String>,
}

/// Counts reported back after a database upload.
#[derive(Clone, Copy, Debug, Default)]
pub struct UploadOutcome {
    pub inserted: usize,
    pub skipped: usize,
}

impl UploadOutcome {
    /// Human-readable status for the dashboard status area.
    pub fn message(&self) -> String {
        if self.inserted == 0 {
            format!("No new tags added. {} duplicate tags skipped.", self.skipped)
        } else {
            format!(
                "Database updated with {} new rows. {} duplicates skipped.",
                self.inserted, self.skipped
            )
        }
    }
}

/// Result of checking one uploaded tag id against the series statistics.
#[derive(Clone, Debug, Serialize)]
pub struct CheckedTag {
    pub device_id: String,
    pub series: String,
    /// `YYYY-MM` for a known series, [`UNKNOWN_DATE`] otherwise.
    pub production_date: String,
    pub status: String,
}

impl CheckedTag {
    pub fn is_known(&self) -> bool {
        self.production_date != UNKNOWN_DATE
    }
}

/// Series key of a device id: the first two characters for short ids
/// (length five or less), the first three otherwise.
///
/// # Examples
/// ```
/// use tagboard::store::extract_series;
///
/// assert_eq!(extract_series("12345"), "12");
/// assert_eq!(extract_series("123456"), "123");
/// ```
pub fn extract_series(device_id: &str) -> String {
    let id = device_id.trim();
    let take = if id.chars().count() <= 5 { 2 } else { 3 };
    id.chars().take(take).collect()
}

/// Middle element of an ascending date list after trimming 10% off both
/// ends; the plain middle element when the trim would empty the list.
pub fn expected_date(sorted: &[NaiveDate]) -> Option<NaiveDate> {
    if sorted.is_empty() {
        return None;
    }
    let lower = sorted.len() / 10;
    let upper = sorted.len() * 9 / 10;
    let trimmed = if upper > lower {
        &sorted[lower..upper]
    } else {
        sorted
    };
    Some(trimmed[trimmed.len() / 2])
}

/// SQLite-backed tag database with derived per-series statistics.
pub struct TagStore {
    conn: Connection,
}

impl TagStore {
    pub fn open(path: impl AsRef<Path>) -> rusqlite::Result<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> rusqlite::Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tags (
                series TEXT,
                device_id TEXT PRIMARY KEY,
                production_date TEXT
            );
            CREATE TABLE IF NOT EXISTS series_stats (
                series TEXT PRIMARY KEY,
                count INTEGER,
                min_date TEXT,
                max_date TEXT,
                expected_date TEXT
            );",
        )?;
        Ok(Self { conn })
    }

    /// Append uploaded rows, skipping device ids already present (in the
    /// store or earlier in the same upload), then refresh the statistics.
    pub fn upload_database(
        &mut self,
        rows: &[(String, NaiveDate)],
    ) -> rusqlite::Result<UploadOutcome> {
        let mut seen: HashSet<String> = {
            let mut stmt = self.conn.prepare("SELECT device_id FROM tags")?;
            let ids = stmt.query_map([], |row| row.get::<_, String>(0))?;
            ids.collect::<rusqlite::Result<_>>()?
        };

        let mut outcome = UploadOutcome::default();
        let tx = self.conn.transaction()?;
        for (device_id, date) in rows {
            if !seen.insert(device_id.clone()) {
                outcome.skipped += 1;
                continue;
            }
            tx.execute(
                "INSERT INTO tags (series, device_id, production_date) VALUES (?1, ?2, ?3)",
                params![
                    extract_series(device_id),
                    device_id,
                    date.format("%Y-%m-%d").to_string()
                ],
            )?;
            outcome.inserted += 1;
        }
        tx.commit()?;

        self.update_series_stats()?;
        Ok(outcome)
    }

    /// Recompute `series_stats` from scratch: per-series count, min/max,
    /// and the trimmed-median expected date. An empty store clears the
    /// table.
    pub fn update_series_stats(&mut self) -> rusqlite::Result<()> {
        let rows: Vec<(String, String)> = {
            let mut stmt = self
                .conn
                .prepare("SELECT series, production_date FROM tags")?;
            let mapped = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            mapped.collect::<rusqlite::Result<_>>()?
        };

        let mut by_series: BTreeMap<String, Vec<NaiveDate>> = BTreeMap::new();
        for (series, date) in rows {
            if let Some(parsed) = tag::parse_production_date(&date) {
                by_series.entry(series).or_default().push(parsed);
            }
        }

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM series_stats", [])?;
        for (series, mut dates) in by_series {
            dates.sort();
            let expected = expected_date(&dates);
            tx.execute(
                "INSERT INTO series_stats (series, count, min_date, max_date, expected_date)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    series,
                    dates.len() as i64,
                    dates.first().map(|d| d.format("%Y-%m-%d").to_string()),
                    dates.last().map(|d| d.format("%Y-%m-%d").to_string()),
                    expected.map(|d| d.format("%Y-%m-%d").to_string()),
                ],
            )?;
        }
        tx.commit()
    }

    /// Match uploaded ids to their series' expected production date.
    pub fn check_tags(&self, device_ids: &[String]) -> rusqlite::Result<Vec<CheckedTag>> {
        let stats: HashMap<String, Option<String>> = {
            let mut stmt = self
                .conn
                .prepare("SELECT series, expected_date FROM series_stats")?;
            let mapped = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            mapped.collect::<rusqlite::Result<_>>()?
        };

        Ok(device_ids
            .iter()
            .map(|id| {
                let series = extract_series(id);
                let expected = stats
                    .get(&series)
                    .cloned()
                    .flatten()
                    .and_then(|s| tag::parse_production_date(&s));
                match expected {
                    Some(date) => CheckedTag {
                        device_id: id.clone(),
                        series,
                        production_date: date.format("%Y-%m").to_string(),
                        status: "Known series".to_string(),
                    },
                    None => CheckedTag {
                        device_id: id.clone(),
                        series,
                        production_date: UNKNOWN_DATE.to_string(),
                        status: "Unknown series".to_string(),
                    },
                }
            })
            .collect())
    }

    /// Keep the first row per device id, drop the rest. Returns
    /// `(removed, remaining)`.
    pub fn clean_duplicates(&mut self) -> rusqlite::Result<(usize, usize)> {
        let removed = self.conn.execute(
            "DELETE FROM tags WHERE rowid NOT IN
             (SELECT MIN(rowid) FROM tags GROUP BY device_id)",
            [],
        )?;
        let remaining = self.tag_count()?;
        self.update_series_stats()?;
        Ok((removed, remaining))
    }

    /// Re-derive the series of already-stored tags from a correction
    /// file's ids. Returns the number of rows touched.
    pub fn update_series(&mut self, rows: &[(String, NaiveDate)]) -> rusqlite::Result<usize> {
        let mut updated = 0;
        let tx = self.conn.transaction()?;
        for (device_id, _) in rows {
            updated += tx.execute(
                "UPDATE tags SET series = ?1 WHERE device_id = ?2",
                params![extract_series(device_id), device_id],
            )?;
        }
        tx.commit()?;

        self.update_series_stats()?;
        Ok(updated)
    }

    pub fn tag_count(&self) -> rusqlite::Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn all_tags(&self) -> rusqlite::Result<Vec<StoredTag>> {
        let mut stmt = self
            .conn
            .prepare("SELECT series, device_id, production_date FROM tags")?;
        let mapped = stmt.query_map([], |row| {
            Ok(StoredTag {
                series: row.get(0)?,
                device_id: row.get(1)?,
                production_date: row.get(2)?,
            })
        })?;
        mapped.collect()
    }

    pub fn series_stats(&self) -> rusqlite::Result<Vec<SeriesStats>> {
        let mut stmt = self.conn.prepare(
            "SELECT series, count, min_date, max_date, expected_date
             FROM series_stats ORDER BY series",
        )?;
        let mapped = stmt.query_map([], |row| {
            Ok(SeriesStats {
                series: row.get(0)?,
                count: row.get::<_, i64>(1)? as u32,
                min_date: row.get(2)?,
                max_date: row.get(3)?,
                expected_date: row.get(4)?,
            })
        })?;
        mapped.collect()
    }

    /// Whole-store distribution by production year, with unparseable
    /// dates in the `Unknown` bucket.
    pub fn yearly_distribution(&self) -> rusqlite::Result<Vec<YearBucket>> {
        let dates: Vec<String> = {
            let mut stmt = self.conn.prepare("SELECT production_date FROM tags")?;
            let mapped = stmt.query_map([], |row| row.get(0))?;
            mapped.collect::<rusqlite::Result<_>>()?
        };

        Ok(distribution::aggregate_years(dates.into_iter().map(
            |date| match tag::parse_production_date(&date) {
                Some(d) => d.format("%Y").to_string(),
                None => UNKNOWN_DATE.to_string(),
            },
        )))
    }
}
