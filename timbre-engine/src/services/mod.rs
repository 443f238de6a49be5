//! Domain services for the preset matching engine

pub mod buffer_receiver;
pub mod embedding_index;
pub mod encoder;
pub mod library_store;
pub mod preset_service;
pub mod retrieval;

pub use buffer_receiver::BufferReceiver;
pub use embedding_index::WordEmbeddingIndex;
pub use encoder::{FeatureEncoder, SegmentRmsEncoder};
pub use library_store::{LibraryStore, PresetRecord};
pub use preset_service::PresetService;
