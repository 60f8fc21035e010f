// src/routes/analysis.rs
//! Analysis job endpoints for the sensor analysis service.
//!
//! This module owns the full job lifecycle surface: batch upload, progress
//! polling, and retrieval of results and the dashboard summary. It is a
//! sibling module in the `routes` directory and follows the Explicit Module
//! Boundary Pattern (EMBP):
//! - Internal to this file: endpoint handlers, request/response DTOs
//! - Exports to the gateway (`mod.rs`): a subrouter with the `/api/analysis`
//!   routes
//!
//! Uploads are accepted and queued; analysis itself happens on the background
//! worker, so every handler here returns without blocking on computation.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::jobs::JobStatus;
use crate::models::{AnalysisResult, DashboardSummary, SensorReading};
use crate::pipeline;
use crate::routes::AppState;

// ---

/// Uploads up to this size are accepted; roughly 100k readings of JSON.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/analysis/upload", post(upload))
        .route("/api/analysis/{job_id}/progress", get(progress))
        .route("/api/analysis/{job_id}/results", get(results))
        .route("/api/analysis/{job_id}/summary", get(summary))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

// ---

/// Body of a `202 Accepted` upload response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartAnalysisResponse {
    job_id: Uuid,
    message: String,
}

/// Body of a progress poll. `completedAt` and `errorMessage` are omitted
/// until they exist.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobProgressResponse {
    // ---
    job_id: Uuid,
    status: JobStatus,
    total_samples: usize,
    processed_samples: usize,
    progress_percent: f64,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

/// Body of a completed-results fetch.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobResultsResponse {
    job_id: Uuid,
    summary: Option<DashboardSummary>,
    results: Vec<AnalysisResult>,
}

/// Optional filters on the results endpoint.
#[derive(Debug, Deserialize)]
struct ResultsQuery {
    /// Case-insensitive reading-type tag, e.g. `?type=indoor`.
    #[serde(rename = "type")]
    reading_type: Option<String>,
}

// ---

/// Handle `POST /api/analysis/upload`.
///
/// Accepts a multipart form with a single `file` part holding a JSON array
/// of sensor readings. Validation failures come back as 400 with an error
/// body; an accepted batch comes back as 202 with the job id to poll.
async fn upload(
    State((store, queue)): State<AppState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    // ---
    info!("POST /api/analysis/upload");

    // Step 1: pull the `file` part out of the form
    let mut file: Option<(String, Bytes)> = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => {
                let name = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => {
                        file = Some((name, bytes));
                        break;
                    }
                    Err(e) => {
                        warn!("Failed to read uploaded file part: {e}");
                        return bad_request("No file provided or file is empty.");
                    }
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => {
                warn!("Malformed multipart upload: {e}");
                return bad_request("No file provided or file is empty.");
            }
        }
    }

    let Some((file_name, bytes)) = file else {
        return bad_request("No file provided or file is empty.");
    };
    if bytes.is_empty() {
        return bad_request("No file provided or file is empty.");
    }
    if !file_name.to_ascii_lowercase().ends_with(".json") {
        return bad_request("Only .json files are accepted.");
    }

    // Step 2: parse the batch
    let readings: Vec<SensorReading> = match serde_json::from_slice(&bytes) {
        Ok(readings) => readings,
        Err(e) => {
            warn!(file = %file_name, "Rejected upload with invalid JSON: {e}");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid JSON format.", "detail": e.to_string() })),
            )
                .into_response();
        }
    };

    if readings.is_empty() {
        return bad_request("JSON file contains no samples.");
    }

    // Step 3: register the job and enqueue the batch
    let count = readings.len();
    let job_id = pipeline::submit(&store, &queue, readings);
    info!(job_id = %job_id, samples = count, file = %file_name, "Analysis job accepted");

    (
        StatusCode::ACCEPTED,
        Json(StartAnalysisResponse {
            job_id,
            message: format!("Analysis started for {count} samples."),
        }),
    )
        .into_response()
}

/// Handle `GET /api/analysis/{job_id}/progress`.
async fn progress(
    State((store, _)): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> impl IntoResponse {
    // ---
    let Some(job) = store.get(job_id) else {
        return job_not_found(job_id);
    };

    Json(JobProgressResponse {
        job_id: job.id,
        status: job.status,
        total_samples: job.total_samples,
        processed_samples: job.processed_samples,
        progress_percent: job.progress_percent(),
        created_at: job.created_at,
        completed_at: job.completed_at,
        error_message: job.error_message,
    })
    .into_response()
}

/// Handle `GET /api/analysis/{job_id}/results`.
///
/// Only completed jobs have results; anything earlier (or failed) comes back
/// as 409 with the current status so clients know to keep polling.
async fn results(
    State((store, _)): State<AppState>,
    Path(job_id): Path<Uuid>,
    Query(params): Query<ResultsQuery>,
) -> impl IntoResponse {
    // ---
    let Some(job) = store.get(job_id) else {
        return job_not_found(job_id);
    };

    if job.status != JobStatus::Completed {
        return (
            StatusCode::CONFLICT,
            Json(json!({
                "error": "Job has not completed yet.",
                "status": job.status,
                "progress": job.progress_percent(),
            })),
        )
            .into_response();
    }

    let results = match params.reading_type.as_deref().filter(|t| !t.trim().is_empty()) {
        Some(tag) => job
            .results
            .into_iter()
            .filter(|r| r.reading_type.eq_ignore_ascii_case(tag))
            .collect(),
        None => job.results,
    };

    info!(job_id = %job_id, count = results.len(), "Returning analysis results");
    Json(JobResultsResponse { job_id: job.id, summary: job.summary, results }).into_response()
}

/// Handle `GET /api/analysis/{job_id}/summary`.
async fn summary(
    State((store, _)): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> impl IntoResponse {
    // ---
    let Some(job) = store.get(job_id) else {
        return job_not_found(job_id);
    };

    if job.status != JobStatus::Completed {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "error": "Job has not completed yet.", "status": job.status })),
        )
            .into_response();
    }

    Json(job.summary).into_response()
}

// ---

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

fn job_not_found(job_id: Uuid) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("Job '{job_id}' not found.") })),
    )
        .into_response()
}
