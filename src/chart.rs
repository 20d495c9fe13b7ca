use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde::Serialize;
use std::error::Error;

use crate::distribution::YearBucket;

/// Segments whose share of the visible total falls below this percentage
/// get no on-segment label.
pub const MIN_LABEL_SHARE: f64 = 5.0;

/// Rendering options for the distribution pie.
#[derive(Clone, Debug)]
pub struct ChartOptions {
    /// Title displayed at the top of the chart
    pub title: String,

    /// Width of the image in pixels
    pub width: u32,

    /// Height of the image in pixels
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: "Yearly Distribution".to_string(),
            width: 640,
            height: 640,
        }
    }
}

/// One legend/segment entry as exposed to the dashboard page.
#[derive(Clone, Debug, Serialize)]
pub struct SegmentState {
    pub year: String,
    pub count: u32,
    pub hidden: bool,
    pub color: String,
    pub legend: String,
    pub tooltip: Option<String>,
    pub label: Option<String>,
}

/// Serializable snapshot of the whole chart.
#[derive(Clone, Debug, Serialize)]
pub struct ChartState {
    pub segments: Vec<SegmentState>,
    pub visible_total: u64,
}

/// The interactive pie chart: one segment per year bucket plus a
/// per-segment hidden flag, mutated only by legend clicks.
///
/// The hidden flags live here and nowhere else; they are never persisted.
pub struct ChartView {
    buckets: Vec<YearBucket>,
    hidden: Vec<bool>,
}

impl ChartView {
    pub fn new(buckets: Vec<YearBucket>) -> Self {
        let hidden = vec![false; buckets.len()];
        Self { buckets, hidden }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn buckets(&self) -> &[YearBucket] {
        &self.buckets
    }

    pub fn is_hidden(&self, index: usize) -> bool {
        self.hidden.get(index).copied().unwrap_or(false)
    }

    /// Flip a segment's hidden flag. Returns the new flag, or `None` when
    /// the index is out of range.
    pub fn toggle(&mut self, index: usize) -> Option<bool> {
        let flag = self.hidden.get_mut(index)?;
        *flag = !*flag;
        Some(*flag)
    }

    /// Sum of counts over the segments not currently hidden.
    pub fn visible_total(&self) -> u64 {
        self.buckets
            .iter()
            .zip(&self.hidden)
            .filter(|(_, hidden)| !**hidden)
            .map(|(bucket, _)| bucket.count as u64)
            .sum()
    }

    /// Evenly spaced hue for segment `index`, in degrees.
    pub fn hue(&self, index: usize) -> f64 {
        index as f64 * 360.0 / self.buckets.len().max(1) as f64
    }

    /// CSS color for segment `index`: fixed saturation and lightness, hue
    /// rotated across the full wheel.
    pub fn color_css(&self, index: usize) -> String {
        format!("hsl({:.0}, 70%, 60%)", self.hue(index))
    }

    fn fill_color(&self, index: usize) -> HSLColor {
        HSLColor(self.hue(index) / 360.0, 0.70, 0.60)
    }

    /// Share of the visible total, in percent. `None` for an out-of-range
    /// index, a hidden segment, or when everything is hidden.
    pub fn share_of_visible(&self, index: usize) -> Option<f64> {
        if index >= self.buckets.len() || self.hidden[index] {
            return None;
        }
        let total = self.visible_total();
        if total == 0 {
            return None;
        }
        Some(self.buckets[index].count as f64 * 100.0 / total as f64)
    }

    /// Tooltip text: percentage of the visible total, one decimal place.
    /// Hidden segments have no tooltip.
    pub fn tooltip_label(&self, index: usize) -> Option<String> {
        let share = self.share_of_visible(index)?;
        let bucket = &self.buckets[index];
        Some(format!(
            "{}: {} tags ({:.1}%)",
            bucket.year, bucket.count, share
        ))
    }

    /// On-segment label, suppressed when the segment is hidden or its
    /// share of the visible total is below [`MIN_LABEL_SHARE`].
    pub fn segment_label(&self, index: usize) -> Option<String> {
        let share = self.share_of_visible(index)?;
        if share < MIN_LABEL_SHARE {
            return None;
        }
        let bucket = &self.buckets[index];
        Some(format!("{}\n{} tags", bucket.year, bucket.count))
    }

    /// Legend entry text as shown on the page.
    pub fn legend_label(&self, index: usize) -> String {
        let bucket = &self.buckets[index];
        let mark = if self.is_hidden(index) { "❌" } else { "✅" };
        format!("{} {}: {} tags", mark, bucket.year, bucket.count)
    }

    /// Snapshot of the full chart state for the dashboard page.
    pub fn state(&self) -> ChartState {
        ChartState {
            segments: (0..self.buckets.len())
                .map(|i| SegmentState {
                    year: self.buckets[i].year.clone(),
                    count: self.buckets[i].count,
                    hidden: self.hidden[i],
                    color: self.color_css(i),
                    legend: self.legend_label(i),
                    tooltip: self.tooltip_label(i),
                    label: self.segment_label(i),
                })
                .collect(),
            visible_total: self.visible_total(),
        }
    }

    /// Render the pie to PNG bytes on an opaque white background.
    ///
    /// Hidden segments are left out of the pie entirely (the remaining
    /// segments expand to fill the circle) but stay in the legend, marked
    /// as hidden. Renders through a temporary file that is removed once
    /// the bytes are read back.
    pub fn render_png(&self, options: &ChartOptions) -> Result<Vec<u8>, Box<dyn Error>> {
        let tmp = tempfile::Builder::new()
            .prefix("yearly_distribution")
            .suffix(".png")
            .tempfile()?;
        let path = tmp.path().to_path_buf();
        {
            let root =
                BitMapBackend::new(&path, (options.width, options.height)).into_drawing_area();
            root.fill(&WHITE)?;

            let width = options.width as i32;
            let height = options.height as i32;
            let legend_height = 24 * self.buckets.len() as i32 + 10;

            let title_style = ("sans-serif", 28)
                .into_font()
                .color(&BLACK)
                .pos(Pos::new(HPos::Center, VPos::Top));
            root.draw(&Text::new(options.title.clone(), (width / 2, 12), title_style))?;

            let subtitle_style = ("sans-serif", 18)
                .into_font()
                .color(&BLACK)
                .pos(Pos::new(HPos::Center, VPos::Top));
            root.draw(&Text::new(
                format!("Visible tags in chart: {}", self.visible_total()),
                (width / 2, 46),
                subtitle_style,
            ))?;

            let center = (width / 2, (height - legend_height + 70) / 2);
            let radius = ((width.min(height - legend_height) / 2) - 80).max(40) as f64;
            let label_style = ("sans-serif", 16)
                .into_font()
                .color(&BLACK)
                .pos(Pos::new(HPos::Center, VPos::Center));

            let total = self.visible_total();
            if total > 0 {
                let mut acc = 0.0;
                for (i, bucket) in self.buckets.iter().enumerate() {
                    if self.hidden[i] {
                        continue;
                    }
                    let fraction = bucket.count as f64 / total as f64;
                    // Start at twelve o'clock and sweep clockwise.
                    let start = -90.0 + acc * 360.0;
                    let sweep = fraction * 360.0;

                    let steps = (sweep.ceil() as usize).max(2);
                    let mut points = Vec::with_capacity(steps + 2);
                    points.push(center);
                    for k in 0..=steps {
                        let deg = start + sweep * (k as f64) / (steps as f64);
                        let rad = deg.to_radians();
                        points.push((
                            center.0 + (radius * rad.cos()).round() as i32,
                            center.1 + (radius * rad.sin()).round() as i32,
                        ));
                    }
                    root.draw(&Polygon::new(points, self.fill_color(i).filled()))?;

                    if let Some(label) = self.segment_label(i) {
                        let mid = (start + sweep / 2.0).to_radians();
                        let lx = center.0 + (radius * 0.55 * mid.cos()).round() as i32;
                        let ly = center.1 + (radius * 0.55 * mid.sin()).round() as i32;
                        let lines: Vec<&str> = label.lines().collect();
                        for (j, line) in lines.iter().enumerate() {
                            let offset = (j as i32 * 18) - ((lines.len() as i32 - 1) * 9);
                            root.draw(&Text::new(
                                line.to_string(),
                                (lx, ly + offset),
                                label_style.clone(),
                            ))?;
                        }
                    }
                    acc += fraction;
                }
            }

            let legend_style = ("sans-serif", 16).into_font().color(&BLACK);
            let legend_top = height - legend_height;
            for (i, bucket) in self.buckets.iter().enumerate() {
                let y = legend_top + i as i32 * 24;
                root.draw(&Rectangle::new(
                    [(20, y), (34, y + 14)],
                    self.fill_color(i).filled(),
                ))?;
                let suffix = if self.hidden[i] { " (hidden)" } else { "" };
                root.draw(&Text::new(
                    format!("{}: {} tags{}", bucket.year, bucket.count, suffix),
                    (42, y + 1),
                    legend_style.clone(),
                ))?;
            }

            root.present()?;
        }

        let bytes = std::fs::read(&path)?;
        Ok(bytes)
    }
}
