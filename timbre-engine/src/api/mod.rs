//! HTTP API handlers for timbre-engine

pub mod health;
pub mod library;
pub mod retrieval;

pub use health::health_routes;
pub use library::library_routes;
pub use retrieval::retrieval_routes;
