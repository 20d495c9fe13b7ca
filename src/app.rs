use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use log::{error, info, warn};
use serde::Deserialize;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::chart::ChartOptions;
use crate::loader;
use crate::store::TagStore;
use crate::tag::RawTag;
use crate::view::DashboardView;

pub struct AppState {
    store: Mutex<TagStore>,
    view: Mutex<DashboardView>,
}

#[derive(Deserialize)]
struct ToggleRequest {
    index: usize,
}

#[derive(Deserialize)]
struct ExportQuery {
    format: Option<String>,
}

pub async fn run(addr: &str, db_path: &str) -> Result<(), Box<dyn Error>> {
    let store = TagStore::open(db_path)?;

    // Setup app state
    let app_state = Arc::new(AppState {
        store: Mutex::new(store),
        view: Mutex::new(DashboardView::new()),
    });

    // Build router
    let app = Router::new()
        .route("/", get(serve_dashboard))
        .route("/api/upload-db", post(upload_db))
        .route("/api/check-tags", post(check_tags))
        .route("/api/chart", get(chart_state))
        .route("/api/chart/toggle", post(toggle_segment))
        .route("/api/chart.png", get(download_chart))
        .route("/api/export", get(export_tags))
        .route("/api/all-tags", get(all_tags))
        .route("/api/series-stats", get(series_stats))
        .route("/api/yearly-distribution", get(yearly_distribution))
        .route("/api/clean-duplicates", get(clean_duplicates))
        .route("/api/update-series", post(update_series))
        .layer(DefaultBodyLimit::max(32 * 1024 * 1024))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state);

    // Start server
    let listener = TcpListener::bind(addr).await?;
    info!("listening on http://{addr}");
    println!("Listening on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_dashboard() -> Html<&'static str> {
    Html(include_str!("./static/dashboard.html"))
}

// Pull the "file" field out of the multipart form.
async fn read_upload(multipart: &mut Multipart) -> Option<(String, Vec<u8>)> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.unwrap_or(None) {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("upload.xlsx").to_string();
            let data = field.bytes().await.unwrap_or_default().to_vec();
            upload = Some((filename, data));
        }
    }

    upload.filter(|(_, data)| !data.is_empty())
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

fn attachment_response(content_type: &str, filename: &str, body: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

async fn upload_db(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let Some((filename, data)) = read_upload(&mut multipart).await else {
        return error_response(StatusCode::BAD_REQUEST, "No file data received".to_string());
    };

    let table = match loader::parse_sheet(&data, &filename) {
        Ok(table) => table,
        Err(e) => {
            warn!("database upload rejected: {e}");
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Failed to read file: {e}. Please ensure it is a valid Excel or CSV file."),
            );
        }
    };
    if table.width() <= loader::DB_DATE_COLUMN {
        return error_response(
            StatusCode::BAD_REQUEST,
            "File does not contain enough columns (need D and Y columns)".to_string(),
        );
    }

    let rows = loader::database_rows(&table);
    let outcome = match state.store.lock().unwrap().upload_database(&rows) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("database update failed: {e}");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {e}"),
            );
        }
    };

    let message = outcome.message();
    info!(
        "database upload: {} inserted, {} skipped",
        outcome.inserted, outcome.skipped
    );
    state
        .view
        .lock()
        .unwrap()
        .upload_complete(message.clone());

    Json(serde_json::json!({ "message": message })).into_response()
}

async fn check_tags(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let Some((filename, data)) = read_upload(&mut multipart).await else {
        return error_response(StatusCode::BAD_REQUEST, "No file data received".to_string());
    };

    let table = match loader::parse_sheet(&data, &filename) {
        Ok(table) => table,
        Err(e) => {
            warn!("check upload rejected: {e}");
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Failed to read file. Please ensure it is an Excel file: {e}"),
            );
        }
    };

    let ids = loader::check_ids(&table);
    let checked = match state.store.lock().unwrap().check_tags(&ids) {
        Ok(checked) => checked,
        Err(e) => {
            error!("check-tags query failed: {e}");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {e}"),
            );
        }
    };

    let known = checked.iter().filter(|t| t.is_known()).count();
    info!(
        "checked {} ids: {} known series, {} unknown",
        checked.len(),
        known,
        checked.len() - known
    );

    let raw: Vec<RawTag> = checked
        .into_iter()
        .map(|t| RawTag {
            device_id: t.device_id,
            production_date: Some(t.production_date),
        })
        .collect();

    let mut view = state.view.lock().unwrap();
    view.check_complete(raw);

    Json(serde_json::json!({
        "message": view.status_message(),
        "tags": view.table(),
        "tags_count": view.table().len(),
        "yearly_distribution": view.distribution(),
        "visible_total": view.visible_total(),
    }))
    .into_response()
}

async fn chart_state(State(state): State<Arc<AppState>>) -> Response {
    let view = state.view.lock().unwrap();
    match view.chart_state() {
        Some(chart) => Json(chart).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            "No distribution to chart yet.".to_string(),
        ),
    }
}

async fn toggle_segment(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ToggleRequest>,
) -> Response {
    let mut view = state.view.lock().unwrap();
    if view.legend_click(payload.index).is_none() {
        return error_response(StatusCode::BAD_REQUEST, "No such chart segment.".to_string());
    }
    match view.chart_state() {
        Some(chart) => Json(chart).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            "No distribution to chart yet.".to_string(),
        ),
    }
}

async fn download_chart(State(state): State<Arc<AppState>>) -> Response {
    let view = state.view.lock().unwrap();
    match view.chart_png(&ChartOptions::default()) {
        Ok(png) => attachment_response("image/png", "yearly_distribution.png", png),
        Err(e) => {
            warn!("chart download refused: {e}");
            error_response(StatusCode::CONFLICT, e.to_string())
        }
    }
}

async fn export_tags(
    Query(params): Query<ExportQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let view = state.view.lock().unwrap();
    if view.table().is_empty() {
        return error_response(StatusCode::NOT_FOUND, "No data to export.".to_string());
    }

    match params.format.as_deref() {
        Some("csv") => {
            attachment_response("text/csv", "tags_export.csv", view.export_csv().into_bytes())
        }
        _ => match view.export_xlsx() {
            Ok(bytes) => attachment_response(
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                "tags_export.xlsx",
                bytes,
            ),
            Err(e) => {
                error!("export failed: {e}");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Export failed: {e}"),
                )
            }
        },
    }
}

async fn all_tags(State(state): State<Arc<AppState>>) -> Response {
    let store = state.store.lock().unwrap();
    match store.all_tags() {
        Ok(tags) if tags.is_empty() => {
            Json(serde_json::json!({ "message": "Database is empty." })).into_response()
        }
        Ok(tags) => Json(tags).into_response(),
        Err(e) => {
            error!("all-tags query failed: {e}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {e}"),
            )
        }
    }
}

async fn series_stats(State(state): State<Arc<AppState>>) -> Response {
    let store = state.store.lock().unwrap();
    match store.series_stats() {
        Ok(stats) if stats.is_empty() => {
            Json(serde_json::json!({ "message": "No series statistics available." }))
                .into_response()
        }
        Ok(stats) => Json(stats).into_response(),
        Err(e) => {
            error!("series-stats query failed: {e}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {e}"),
            )
        }
    }
}

async fn yearly_distribution(State(state): State<Arc<AppState>>) -> Response {
    let store = state.store.lock().unwrap();
    match store.yearly_distribution() {
        Ok(buckets) if buckets.is_empty() => {
            error_response(StatusCode::NOT_FOUND, "No tags in database.".to_string())
        }
        Ok(buckets) => {
            Json(serde_json::json!({ "yearly_distribution": buckets })).into_response()
        }
        Err(e) => {
            error!("yearly-distribution query failed: {e}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {e}"),
            )
        }
    }
}

async fn clean_duplicates(State(state): State<Arc<AppState>>) -> Response {
    let mut store = state.store.lock().unwrap();
    match store.tag_count() {
        Ok(0) => {
            return Json(serde_json::json!({ "message": "Database is empty, nothing to clean." }))
                .into_response();
        }
        Ok(_) => {}
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {e}"),
            );
        }
    }
    match store.clean_duplicates() {
        Ok((removed, remaining)) => Json(serde_json::json!({
            "duplicates_removed": removed,
            "remaining_tags": remaining,
        }))
        .into_response(),
        Err(e) => {
            error!("clean-duplicates failed: {e}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {e}"),
            )
        }
    }
}

async fn update_series(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let Some((filename, data)) = read_upload(&mut multipart).await else {
        return error_response(StatusCode::BAD_REQUEST, "No file data received".to_string());
    };

    let table = match loader::parse_sheet(&data, &filename) {
        Ok(table) => table,
        Err(e) => {
            warn!("series update rejected: {e}");
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Failed to read Excel file: {e}"),
            );
        }
    };

    let rows = loader::database_rows(&table);
    match state.store.lock().unwrap().update_series(&rows) {
        Ok(updated) => {
            info!("series update touched {updated} tags");
            Json(serde_json::json!({
                "message": "Series updated successfully according to new file."
            }))
            .into_response()
        }
        Err(e) => {
            error!("series update failed: {e}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {e}"),
            )
        }
    }
}
