//! timbre-engine - Audio preset matching engine
//!
//! Ingests raw audio buffers paired with descriptor tags, encodes them into
//! latent feature vectors, and answers retrieval queries over the preset
//! library (nearest-by-vector, keyword-weighted, exact filter, auto-tag).
//!
//! Control traffic arrives over HTTP; audio buffers stream in as chunked
//! datagrams on a dedicated UDP channel.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use timbre_engine::config::{Args, EngineConfig};
use timbre_engine::services::{
    BufferReceiver, LibraryStore, PresetService, SegmentRmsEncoder, WordEmbeddingIndex,
};
use timbre_engine::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting timbre-engine (preset matching)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = EngineConfig::resolve(&args)?;
    info!("Root folder: {}", config.root_folder.display());

    // Preset library, loaded from the cache file when present
    let store = LibraryStore::open(&config.cache_path)?;
    info!("Preset library: {} presets", store.len());

    // Word embeddings are optional; without them only the keyword-weighted
    // query is unavailable
    let embeddings = match &config.embeddings_path {
        Some(path) => match WordEmbeddingIndex::load(path) {
            Ok(index) => Some(Arc::new(index)),
            Err(e) => {
                warn!("Embedding index unavailable, keyword retrieval disabled: {}", e);
                None
            }
        },
        None => {
            warn!("No embedding table configured, keyword retrieval disabled");
            None
        }
    };

    let encoder = Arc::new(SegmentRmsEncoder::new(config.feature_dimension));
    let receiver = BufferReceiver::bind(&config.buffer_addr, config.receive_window).await?;

    let service = Arc::new(PresetService::new(store, receiver, encoder, embeddings));
    let state = AppState::new(service);
    let app = timbre_engine::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!("Listening on http://{}", config.http_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
