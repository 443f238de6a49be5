//! Library ingest API handlers
//!
//! One route mirrors the host plugin's analyze-library trigger: a control
//! value of 1 ingests a single preset (the audio buffer follows on the UDP
//! channel), a control value of 2 closes the transaction and flushes the
//! library to the cache file.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Ingest-start control value: receive + encode + store one preset.
const CONTROL_INGEST: u32 = 1;

/// Ingest-end control value: flush the library to disk.
const CONTROL_FLUSH: u32 = 2;

/// POST /library/analyze request
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub value: u32,
    pub path: Option<String>,
    pub descriptors: Option<String>,
}

/// POST /library/analyze response
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presets: Option<usize>,
}

/// POST /library/analyze
///
/// Control value 1: the host is about to stream one preset's audio buffer;
/// receive it, encode it, and store the record. Control value 2: the batch
/// is complete; persist the library.
pub async fn analyze_library(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<Json<AnalyzeResponse>> {
    match request.value {
        CONTROL_INGEST => {
            let path = request
                .path
                .ok_or_else(|| ApiError::BadRequest("missing preset path".to_string()))?;
            let descriptors = request
                .descriptors
                .ok_or_else(|| ApiError::BadRequest("missing descriptors".to_string()))?;

            tracing::info!(path = %path, "Ingesting preset");
            state.service.ingest_preset(&path, &descriptors).await?;

            Ok(Json(AnalyzeResponse {
                status: "ok".to_string(),
                presets: None,
            }))
        }
        CONTROL_FLUSH => {
            let presets = state.service.finish_ingest().await?;
            tracing::info!(presets, "Library flushed");

            Ok(Json(AnalyzeResponse {
                status: "saved".to_string(),
                presets: Some(presets),
            }))
        }
        other => Err(ApiError::BadRequest(format!(
            "unknown analyze control value {}",
            other
        ))),
    }
}

/// Build library ingest routes
pub fn library_routes() -> Router<AppState> {
    Router::new().route("/library/analyze", post(analyze_library))
}
