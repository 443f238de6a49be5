//! Preset matching service
//!
//! The single service object composing the buffer receiver, feature
//! encoder, library store, and word-embedding index. Transport handlers
//! hold an `Arc<PresetService>` and call these operations; nothing here
//! knows about HTTP.
//!
//! Locking discipline: the receiver mutex serializes buffer transfers (the
//! wire protocol carries no transaction identity, so only one transfer may
//! be in flight), and the store lock keeps the feature matrix and path list
//! consistent during queries while serializing mutations and cache writes.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use timbre_common::{tags, Error, Result};

use super::buffer_receiver::BufferReceiver;
use super::embedding_index::WordEmbeddingIndex;
use super::encoder::FeatureEncoder;
use super::library_store::LibraryStore;
use super::retrieval;

/// Composed matching-engine service.
pub struct PresetService {
    store: RwLock<LibraryStore>,
    receiver: Mutex<BufferReceiver>,
    encoder: Arc<dyn FeatureEncoder>,
    embeddings: Option<Arc<WordEmbeddingIndex>>,
}

impl PresetService {
    pub fn new(
        store: LibraryStore,
        receiver: BufferReceiver,
        encoder: Arc<dyn FeatureEncoder>,
        embeddings: Option<Arc<WordEmbeddingIndex>>,
    ) -> Self {
        Self {
            store: RwLock::new(store),
            receiver: Mutex::new(receiver),
            encoder,
            embeddings,
        }
    }

    /// Number of presets currently in the library.
    pub async fn preset_count(&self) -> usize {
        self.store.read().await.len()
    }

    /// Whether keyword-weighted retrieval is available.
    pub fn embeddings_loaded(&self) -> bool {
        self.embeddings.is_some()
    }

    /// Ingest one preset: receive its audio buffer, encode it, and store
    /// the record under `path` with descriptors tokenized from
    /// `tag_string`. Overwrites any existing record for the same path.
    pub async fn ingest_preset(&self, path: &str, tag_string: &str) -> Result<()> {
        let buffer = self.receive_buffer().await?;
        let feature = self.encoder.encode(&buffer);
        let descriptors = tags::tokenize(tag_string);

        let mut store = self.store.write().await;
        store.add_record(path, &descriptors, feature)
    }

    /// Ingest transaction boundary: persist the library to the cache file.
    ///
    /// Takes the write lock: all cache writers share one temp path, so
    /// saves must be exclusive with each other and with mutations.
    pub async fn finish_ingest(&self) -> Result<usize> {
        let store = self.store.write().await;
        store.save()?;
        Ok(store.len())
    }

    /// Receive + encode a query buffer, then return the `k` nearest preset
    /// paths by feature distance.
    pub async fn similar_by_buffer(&self, k: usize) -> Result<Vec<String>> {
        let buffer = self.receive_buffer().await?;
        let query = self.encoder.encode(&buffer);

        let store = self.store.read().await;
        retrieval::by_feature_vector(&store, &query, k)
    }

    /// Stochastic keyword retrieval over the tokenized tag string. Fails
    /// with `Resource` when the embedding index was not loaded at startup.
    pub async fn similar_by_keywords(&self, tag_string: &str, k: usize) -> Result<Vec<String>> {
        let index = self.embeddings.as_ref().ok_or_else(|| {
            Error::Resource("word embedding index not loaded; keyword retrieval unavailable".to_string())
        })?;
        let keywords = tags::tokenize(tag_string);

        let store = self.store.read().await;
        let mut rng = rand::thread_rng();
        Ok(retrieval::by_keywords(&store, index, &keywords, k, &mut rng))
    }

    /// Deterministic exact-descriptor filter over the tokenized tag string.
    pub async fn filter_by_tags(&self, tag_string: &str) -> Result<Vec<String>> {
        let keywords = tags::tokenize(tag_string);
        let store = self.store.read().await;
        Ok(retrieval::filter_by_exact_keywords(&store, &keywords))
    }

    /// Receive + encode a query buffer, then infer tags from the nearest
    /// neighbors' descriptors.
    pub async fn auto_tag_from_buffer(&self) -> Result<Vec<String>> {
        let buffer = self.receive_buffer().await?;
        let query = self.encoder.encode(&buffer);

        let store = self.store.read().await;
        retrieval::auto_tag(
            &store,
            &query,
            retrieval::AUTO_TAG_NEIGHBORS,
            retrieval::AUTO_TAG_COUNT,
        )
    }

    /// Replace the descriptors of an existing preset and persist the
    /// library immediately.
    pub async fn change_descriptors(&self, path: &str, tag_string: &str) -> Result<Vec<String>> {
        let words = tags::tokenize(tag_string);
        let mut store = self.store.write().await;
        store.change_descriptors(path, &words)
    }

    /// One blocking buffer transfer. The mutex enforces the
    /// single-transaction discipline of the wire protocol.
    async fn receive_buffer(&self) -> Result<Vec<f32>> {
        let mut receiver = self.receiver.lock().await;
        receiver.receive().await
    }
}

impl std::fmt::Debug for PresetService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresetService")
            .field("encoder_dimension", &self.encoder.dimension())
            .field("embeddings_loaded", &self.embeddings.is_some())
            .finish()
    }
}
