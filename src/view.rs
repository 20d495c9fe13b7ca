use std::error::Error;

use crate::chart::{ChartOptions, ChartState, ChartView};
use crate::distribution::{YearBucket, aggregate};
use crate::exporter;
use crate::tag::{RawTag, TagRecord, normalize_tags};

/// Status messages carrying this marker are kept out of the visible
/// status area. A display rule, not an error path.
pub const WARNING_MARKER: &str = "⚠️";

/// All mutable dashboard state, with one method per user-visible event.
///
/// Nothing here is persisted; the view is rebuilt from scratch by the
/// next check upload.
#[derive(Default)]
pub struct DashboardView {
    message: String,
    table: Vec<TagRecord>,
    chart: Option<ChartView>,
}

impl DashboardView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry point: a database upload finished with a status message.
    pub fn upload_complete(&mut self, message: String) {
        self.message = message;
    }

    /// Entry point: a check-tags result arrived. Runs the normalization
    /// pipeline and rebuilds the table, the distribution, and the chart.
    pub fn check_complete(&mut self, raw: Vec<RawTag>) {
        self.table = normalize_tags(raw);
        if self.table.is_empty() {
            self.message = "No valid tags found in the uploaded file.".to_string();
            self.chart = None;
        } else {
            self.message = format!("Checked {} tags", self.table.len());
            self.chart = Some(ChartView::new(aggregate(&self.table)));
        }
    }

    /// Entry point: a legend entry was clicked. Returns the updated
    /// visible total, or `None` when there is no chart or the index is
    /// out of range.
    pub fn legend_click(&mut self, index: usize) -> Option<u64> {
        let chart = self.chart.as_mut()?;
        chart.toggle(index)?;
        Some(chart.visible_total())
    }

    /// Entry point: table export was requested. Includes every record
    /// regardless of segment visibility.
    pub fn export_xlsx(&self) -> Result<Vec<u8>, Box<dyn Error>> {
        exporter::to_xlsx(&self.table)
    }

    pub fn export_csv(&self) -> String {
        exporter::to_csv(&self.table)
    }

    /// Entry point: chart download was requested. Errors when no chart
    /// has been produced yet.
    pub fn chart_png(&self, options: &ChartOptions) -> Result<Vec<u8>, Box<dyn Error>> {
        match &self.chart {
            Some(chart) => chart.render_png(options),
            None => Err("Chart not available yet.".into()),
        }
    }

    pub fn table(&self) -> &[TagRecord] {
        &self.table
    }

    pub fn distribution(&self) -> Vec<YearBucket> {
        self.chart
            .as_ref()
            .map(|c| c.buckets().to_vec())
            .unwrap_or_default()
    }

    pub fn visible_total(&self) -> u64 {
        self.chart.as_ref().map(|c| c.visible_total()).unwrap_or(0)
    }

    pub fn chart_state(&self) -> Option<ChartState> {
        self.chart.as_ref().map(|c| c.state())
    }

    pub fn status_message(&self) -> &str {
        &self.message
    }

    /// The status line shown on the page. Empty messages and messages
    /// carrying [`WARNING_MARKER`] are suppressed.
    pub fn visible_status(&self) -> Option<&str> {
        if self.message.is_empty() || self.message.contains(WARNING_MARKER) {
            None
        } else {
            Some(&self.message)
        }
    }
}
