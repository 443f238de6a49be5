//! Engine configuration
//!
//! Settings resolve in priority order: command-line flag, environment
//! variable, `engine.toml` in the root folder, compiled default. The root
//! folder itself resolves through `timbre_common::config`.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

use timbre_common::Result;

/// Command-line arguments for timbre-engine
#[derive(Debug, Parser)]
#[command(name = "timbre-engine", about = "Audio preset matching engine")]
pub struct Args {
    /// Root data folder (cache + configuration)
    #[arg(long, env = "TIMBRE_ROOT")]
    pub root_folder: Option<String>,

    /// HTTP listen address
    #[arg(long, env = "TIMBRE_HTTP_ADDR")]
    pub http_addr: Option<String>,

    /// UDP listen address for audio buffer transfer
    #[arg(long, env = "TIMBRE_BUFFER_ADDR")]
    pub buffer_addr: Option<String>,

    /// Word embedding table (GloVe-style text file)
    #[arg(long, env = "TIMBRE_EMBEDDINGS")]
    pub embeddings_path: Option<PathBuf>,
}

/// Optional settings file (`engine.toml` in the root folder)
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    http_addr: Option<String>,
    buffer_addr: Option<String>,
    embeddings_path: Option<PathBuf>,
    receive_window_ms: Option<u64>,
    feature_dimension: Option<usize>,
}

/// Resolved engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub root_folder: PathBuf,
    pub http_addr: String,
    pub buffer_addr: String,
    pub cache_path: PathBuf,
    pub embeddings_path: Option<PathBuf>,
    pub receive_window: Duration,
    pub feature_dimension: usize,
}

impl EngineConfig {
    pub const DEFAULT_HTTP_ADDR: &'static str = "127.0.0.1:5741";
    pub const DEFAULT_BUFFER_ADDR: &'static str = "127.0.0.1:5742";
    pub const DEFAULT_RECEIVE_WINDOW_MS: u64 = 5000;

    /// Resolve the full configuration from CLI arguments, the environment,
    /// and the optional settings file.
    pub fn resolve(args: &Args) -> Result<Self> {
        let root_folder =
            timbre_common::config::resolve_root_folder(args.root_folder.as_deref(), "TIMBRE_ROOT");
        timbre_common::config::ensure_root_folder(&root_folder)?;

        let file = Self::load_file_config(&root_folder)?;

        Ok(Self {
            cache_path: root_folder.join("cache").join("preset_lib.json"),
            http_addr: args
                .http_addr
                .clone()
                .or(file.http_addr)
                .unwrap_or_else(|| Self::DEFAULT_HTTP_ADDR.to_string()),
            buffer_addr: args
                .buffer_addr
                .clone()
                .or(file.buffer_addr)
                .unwrap_or_else(|| Self::DEFAULT_BUFFER_ADDR.to_string()),
            embeddings_path: args.embeddings_path.clone().or(file.embeddings_path),
            receive_window: Duration::from_millis(
                file.receive_window_ms
                    .unwrap_or(Self::DEFAULT_RECEIVE_WINDOW_MS),
            ),
            feature_dimension: file
                .feature_dimension
                .unwrap_or(crate::services::SegmentRmsEncoder::DEFAULT_DIMENSION),
            root_folder,
        })
    }

    fn load_file_config(root_folder: &std::path::Path) -> Result<FileConfig> {
        let path = root_folder.join("engine.toml");
        if !path.is_file() {
            return Ok(FileConfig::default());
        }
        let content = std::fs::read_to_string(&path)?;
        toml::from_str(&content).map_err(|e| {
            timbre_common::Error::Config(format!("bad settings file {}: {}", path.display(), e))
        })
    }
}
