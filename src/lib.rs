/*!
# Tag Production Dashboard

A browser dashboard for device tag databases, built in Rust.

## Overview

The application maintains a database of device tags (id plus production
date), lets the user upload a spreadsheet of tag ids to check against it,
and visualizes the resulting year-of-production distribution as an
interactive pie chart. The checked table can be exported back to
spreadsheet form, and the chart downloaded as a PNG.

## Architecture

One axum web server owns everything:

### Data pipeline
- **Spreadsheet intake** - XLSX (calamine) and CSV parsing of uploaded
  files, with fixed column positions for the two upload kinds
- **Tag store** - SQLite table of tags plus derived per-series statistics
  (count, min/max, trimmed-median expected date)
- **Normalizer** - id filtering (digits-only, vendor artifacts dropped),
  date canonicalization to `YYYY-MM`/`Unknown`, unknown-last sorting
- **Aggregator** - per-year buckets in first-encounter order

### Presentation
- **Chart view** - pie segments with per-segment hidden flags, a visible
  total, hue-rotated colors, and plotters PNG rendering on a white
  background
- **Dashboard page** - embedded static HTML talking to the JSON API
- **Exports** - XLSX/CSV table export and PNG chart download

## Modules

- **tag**: tag records, filtering, date normalization, sorting
- **distribution**: year bucket aggregation
- **chart**: interactive pie chart state and rendering
- **exporter**: XLSX/CSV serialization of the checked table
- **loader**: uploaded spreadsheet parsing and column extraction
- **store**: SQLite tag database and series statistics
- **view**: dashboard view-model (status line, table, chart)
- **app**: routing and handlers

## REST API Endpoints

- `POST /api/upload-db` - merge a database spreadsheet into the store
- `POST /api/check-tags` - check a spreadsheet of tag ids
- `GET /api/chart` / `POST /api/chart/toggle` - chart state and legend
  toggling
- `GET /api/chart.png` - chart PNG download
- `GET /api/export` - checked table as XLSX (or CSV)
- `GET /api/all-tags`, `/api/series-stats`, `/api/yearly-distribution`,
  `/api/clean-duplicates`, `POST /api/update-series` - store maintenance
*/

// Re-export all modules so they appear in the documentation
pub mod app;
pub mod chart;
pub mod distribution;
pub mod exporter;
pub mod loader;
pub mod store;
pub mod tag;
pub mod view;

/// Re-export the core types to make them easier to use
pub use chart::*;
pub use distribution::*;
pub use exporter::*;
pub use loader::*;
pub use store::*;
pub use tag::*;
pub use view::*;
