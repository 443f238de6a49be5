//! Retrieval API handlers
//!
//! Each route triggers one query transaction. Buffer-based queries block on
//! the UDP channel until the host has streamed the query audio; keyword
//! queries carry their tag string in the request body.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::services::retrieval::DEFAULT_RESULT_COUNT;
use crate::AppState;

/// Request carrying an optional result count (buffer-based queries)
#[derive(Debug, Default, Deserialize)]
pub struct SimilarRequest {
    pub count: Option<usize>,
}

/// Request carrying a tag string and optional result count
#[derive(Debug, Deserialize)]
pub struct TagQueryRequest {
    pub tags: String,
    pub count: Option<usize>,
}

/// Request updating one preset's descriptors
#[derive(Debug, Deserialize)]
pub struct ChangeDescriptorsRequest {
    pub path: String,
    pub tags: String,
}

/// Response carrying an ordered list of preset paths
#[derive(Debug, Serialize)]
pub struct PathsResponse {
    pub paths: Vec<String>,
}

/// Response carrying inferred tags
#[derive(Debug, Serialize)]
pub struct TagsResponse {
    pub tags: Vec<String>,
}

/// POST /presets/descriptors response
#[derive(Debug, Serialize)]
pub struct ChangeDescriptorsResponse {
    pub status: String,
    pub descriptors: Vec<String>,
}

/// POST /presets/similar
///
/// Receive a query buffer over the UDP channel, encode it, and return the
/// nearest presets by feature distance.
pub async fn similar_by_buffer(
    State(state): State<AppState>,
    Json(request): Json<SimilarRequest>,
) -> ApiResult<Json<PathsResponse>> {
    let k = request.count.unwrap_or(DEFAULT_RESULT_COUNT);
    let paths = state.service.similar_by_buffer(k).await?;

    tracing::debug!(results = paths.len(), "Similar-by-buffer query complete");
    Ok(Json(PathsResponse { paths }))
}

/// POST /presets/by-tags
///
/// Embedding-weighted stochastic retrieval. Results are drawn with
/// replacement from a weight distribution over the library, so repeated
/// queries may differ and a response may repeat a path.
pub async fn similar_by_keywords(
    State(state): State<AppState>,
    Json(request): Json<TagQueryRequest>,
) -> ApiResult<Json<PathsResponse>> {
    let k = request.count.unwrap_or(DEFAULT_RESULT_COUNT);
    let paths = state.service.similar_by_keywords(&request.tags, k).await?;

    tracing::debug!(results = paths.len(), "Keyword query complete");
    Ok(Json(PathsResponse { paths }))
}

/// POST /presets/filter
///
/// Deterministic filter: presets whose descriptor set contains every
/// queried tag.
pub async fn filter_by_tags(
    State(state): State<AppState>,
    Json(request): Json<TagQueryRequest>,
) -> ApiResult<Json<PathsResponse>> {
    let paths = state.service.filter_by_tags(&request.tags).await?;
    Ok(Json(PathsResponse { paths }))
}

/// POST /presets/auto-tag
///
/// Receive a query buffer and infer descriptor tags from its nearest
/// neighbors in the library.
pub async fn auto_tag(State(state): State<AppState>) -> ApiResult<Json<TagsResponse>> {
    let tags = state.service.auto_tag_from_buffer().await?;

    tracing::debug!(?tags, "Auto-tag query complete");
    Ok(Json(TagsResponse { tags }))
}

/// POST /presets/descriptors
///
/// Replace one preset's descriptors and persist the library.
pub async fn change_descriptors(
    State(state): State<AppState>,
    Json(request): Json<ChangeDescriptorsRequest>,
) -> ApiResult<Json<ChangeDescriptorsResponse>> {
    let descriptors = state
        .service
        .change_descriptors(&request.path, &request.tags)
        .await?;

    Ok(Json(ChangeDescriptorsResponse {
        status: "updated".to_string(),
        descriptors,
    }))
}

/// Build retrieval routes
pub fn retrieval_routes() -> Router<AppState> {
    Router::new()
        .route("/presets/similar", post(similar_by_buffer))
        .route("/presets/by-tags", post(similar_by_keywords))
        .route("/presets/filter", post(filter_by_tags))
        .route("/presets/auto-tag", post(auto_tag))
        .route("/presets/descriptors", post(change_descriptors))
}
