//! timbre-engine library interface
//!
//! Exposes the matching-engine services and the HTTP transport adapter for
//! integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;
use std::time::Instant;

use axum::Router;

use crate::services::PresetService;

/// Application state shared across handlers
#[derive(Debug, Clone)]
pub struct AppState {
    /// The injected matching-engine service object
    pub service: Arc<PresetService>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: Instant,
}

impl AppState {
    pub fn new(service: Arc<PresetService>) -> Self {
        Self {
            service,
            startup_time: Instant::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::library_routes())
        .merge(api::retrieval_routes())
        .merge(api::health_routes())
        .with_state(state)
}
