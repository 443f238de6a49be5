//! Preset library store
//!
//! Owns the preset records (path → descriptors + feature vector) together
//! with a denormalized row-major feature matrix used for vectorized
//! distance scans. The matrix, path list, and descriptor list are kept in
//! insertion order and must stay index-aligned; the matrix is a derived
//! cache that is always rebuildable from the records.
//!
//! Persistence is a single JSON cache file rewritten wholesale on every
//! flush or descriptor change, replaced atomically so a crash mid-write
//! cannot corrupt the previous snapshot.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use timbre_common::{tags, Error, Result};

/// Cache file format tag, checked on load.
const CACHE_FORMAT: &str = "timbre-preset-cache";

/// Cache file schema version.
const CACHE_VERSION: u32 = 1;

/// One preset entry as serialized in the cache file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetRecord {
    pub path: String,
    pub descriptors: Vec<String>,
    pub feature: Vec<f32>,
}

/// On-disk cache container with a format/version/dimension header.
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    format: String,
    version: u32,
    dimension: usize,
    presets: Vec<PresetRecord>,
}

/// In-memory preset library with file persistence.
#[derive(Debug)]
pub struct LibraryStore {
    cache_path: PathBuf,
    paths: Vec<String>,
    descriptors: Vec<Vec<String>>,
    // Row-major feature matrix; row i belongs to paths[i]
    features: Vec<f32>,
    dimension: Option<usize>,
    index: HashMap<String, usize>,
}

impl LibraryStore {
    /// Open the store, loading the cache file if it exists. A missing file
    /// is not an error; the store starts empty.
    pub fn open(cache_path: impl Into<PathBuf>) -> Result<Self> {
        let mut store = Self {
            cache_path: cache_path.into(),
            paths: Vec::new(),
            descriptors: Vec::new(),
            features: Vec::new(),
            dimension: None,
            index: HashMap::new(),
        };
        store.load()?;
        Ok(store)
    }

    /// Number of presets in the library.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Feature dimension, once the first record has fixed it.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Preset paths in insertion order.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Path of the record at row `row`.
    pub fn path_at(&self, row: usize) -> &str {
        &self.paths[row]
    }

    /// Descriptors of the record at row `row`.
    pub fn descriptors_at(&self, row: usize) -> &[String] {
        &self.descriptors[row]
    }

    /// Feature vector of the record at row `row`.
    pub fn feature_row(&self, row: usize) -> &[f32] {
        let dim = self.dimension.unwrap_or(0);
        &self.features[row * dim..(row + 1) * dim]
    }

    /// Insert or overwrite the record for `path`.
    ///
    /// Descriptors are capitalized on storage. A feature vector whose
    /// dimension disagrees with the existing matrix is rejected before any
    /// mutation. Re-ingesting an existing path overwrites its row in place
    /// and never appends a duplicate.
    pub fn add_record(&mut self, path: &str, descriptors: &[String], feature: Vec<f32>) -> Result<()> {
        match self.dimension {
            Some(dim) if feature.len() != dim => {
                return Err(Error::Config(format!(
                    "feature dimension mismatch for '{}': expected {}, got {}",
                    path,
                    dim,
                    feature.len()
                )));
            }
            None => {
                if feature.is_empty() {
                    return Err(Error::Config(format!("empty feature vector for '{}'", path)));
                }
                self.dimension = Some(feature.len());
            }
            _ => {}
        }

        let normalized: Vec<String> = descriptors.iter().map(|d| tags::capitalize(d)).collect();
        tracing::debug!(path, descriptors = ?normalized, "Adding preset record");

        match self.index.get(path) {
            Some(&row) => {
                let dim = feature.len();
                self.descriptors[row] = normalized;
                self.features[row * dim..(row + 1) * dim].copy_from_slice(&feature);
            }
            None => {
                self.index.insert(path.to_string(), self.paths.len());
                self.paths.push(path.to_string());
                self.descriptors.push(normalized);
                self.features.extend_from_slice(&feature);
            }
        }
        Ok(())
    }

    /// Replace the descriptors of an existing preset and persist
    /// immediately. Fails with `NotFound` (cache file untouched) when the
    /// path is unknown.
    pub fn change_descriptors(&mut self, path: &str, words: &[String]) -> Result<Vec<String>> {
        let row = *self
            .index
            .get(path)
            .ok_or_else(|| Error::NotFound(format!("preset '{}'", path)))?;

        let normalized: Vec<String> = words.iter().map(|w| tags::capitalize(w)).collect();
        tracing::info!(path, descriptors = ?normalized, "Descriptors changed");
        self.descriptors[row] = normalized.clone();
        self.save()?;
        Ok(normalized)
    }

    /// Serialize the full record set to the cache file, atomically.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.cache_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let cache = CacheFile {
            format: CACHE_FORMAT.to_string(),
            version: CACHE_VERSION,
            dimension: self.dimension.unwrap_or(0),
            presets: self.records(),
        };
        let body = serde_json::to_vec_pretty(&cache)?;

        // Write-then-rename so a crash mid-write leaves the old snapshot
        let tmp_path = self.cache_path.with_extension("tmp");
        std::fs::write(&tmp_path, body)?;
        std::fs::rename(&tmp_path, &self.cache_path)?;

        tracing::info!(
            presets = self.paths.len(),
            cache = %self.cache_path.display(),
            "Preset library saved"
        );
        Ok(())
    }

    /// Rebuild records and feature matrix from the cache file, if present.
    fn load(&mut self) -> Result<()> {
        if !self.cache_path.is_file() {
            tracing::info!(
                cache = %self.cache_path.display(),
                "No preset cache found, starting empty"
            );
            return Ok(());
        }

        let body = std::fs::read(&self.cache_path)?;
        let cache: CacheFile = serde_json::from_slice(&body).map_err(|e| {
            Error::Resource(format!(
                "unreadable preset cache {}: {}",
                self.cache_path.display(),
                e
            ))
        })?;

        if cache.format != CACHE_FORMAT {
            return Err(Error::Resource(format!(
                "unexpected cache format tag '{}'",
                cache.format
            )));
        }
        if cache.version != CACHE_VERSION {
            return Err(Error::Resource(format!(
                "unsupported cache version {}",
                cache.version
            )));
        }

        for record in cache.presets {
            if record.feature.len() != cache.dimension {
                return Err(Error::Config(format!(
                    "cached preset '{}' has dimension {}, header says {}",
                    record.path,
                    record.feature.len(),
                    cache.dimension
                )));
            }
            self.add_record(&record.path, &record.descriptors, record.feature)?;
        }

        tracing::info!(presets = self.paths.len(), "Preset library loaded");
        Ok(())
    }

    /// Current records in insertion order.
    pub fn records(&self) -> Vec<PresetRecord> {
        (0..self.len())
            .map(|row| PresetRecord {
                path: self.paths[row].clone(),
                descriptors: self.descriptors[row].clone(),
                feature: self.feature_row(row).to_vec(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, LibraryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LibraryStore::open(dir.path().join("cache").join("preset_lib.json")).unwrap();
        (dir, store)
    }

    fn strs(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_add_record_capitalizes_descriptors() {
        let (_dir, mut store) = temp_store();
        store
            .add_record("p1", &strs(&["bright", "WARM"]), vec![0.0, 1.0])
            .unwrap();
        assert_eq!(store.descriptors_at(0), &["Bright", "Warm"]);
    }

    #[test]
    fn test_add_record_overwrites_in_place() {
        let (_dir, mut store) = temp_store();
        store.add_record("p1", &strs(&["bright"]), vec![0.0, 0.0]).unwrap();
        store.add_record("p2", &strs(&["dark"]), vec![1.0, 1.0]).unwrap();
        store.add_record("p1", &strs(&["pad"]), vec![2.0, 2.0]).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.paths(), &["p1", "p2"]);
        assert_eq!(store.feature_row(0), &[2.0, 2.0]);
        assert_eq!(store.descriptors_at(0), &["Pad"]);
    }

    #[test]
    fn test_dimension_mismatch_rejected_without_mutation() {
        let (_dir, mut store) = temp_store();
        store.add_record("p1", &strs(&["bright"]), vec![0.0, 0.0]).unwrap();

        let err = store
            .add_record("p2", &strs(&["dark"]), vec![1.0, 2.0, 3.0])
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("preset_lib.json");

        let mut store = LibraryStore::open(&cache).unwrap();
        store
            .add_record("a.fxp", &strs(&["bright", "pad"]), vec![0.25, -1.5, 3.0])
            .unwrap();
        store
            .add_record("b.fxp", &strs(&["dark"]), vec![1.0, 2.0, 4.5])
            .unwrap();
        store.save().unwrap();

        let reloaded = LibraryStore::open(&cache).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.paths(), store.paths());
        assert_eq!(reloaded.descriptors_at(0), store.descriptors_at(0));
        assert_eq!(reloaded.feature_row(1), store.feature_row(1));
        assert_eq!(reloaded.dimension(), Some(3));
    }

    #[test]
    fn test_missing_cache_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LibraryStore::open(dir.path().join("absent.json")).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.dimension(), None);
    }

    #[test]
    fn test_change_descriptors_persists() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("preset_lib.json");

        let mut store = LibraryStore::open(&cache).unwrap();
        store.add_record("p1", &strs(&["bright"]), vec![0.0]).unwrap();
        store.change_descriptors("p1", &strs(&["mellow", "thin"])).unwrap();

        let reloaded = LibraryStore::open(&cache).unwrap();
        assert_eq!(reloaded.descriptors_at(0), &["Mellow", "Thin"]);
    }

    #[test]
    fn test_change_descriptors_unknown_path_leaves_cache_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("preset_lib.json");

        let mut store = LibraryStore::open(&cache).unwrap();
        store.add_record("p1", &strs(&["bright"]), vec![0.0]).unwrap();
        store.save().unwrap();
        let before = std::fs::read(&cache).unwrap();

        let err = store
            .change_descriptors("nope", &strs(&["warm"]))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(std::fs::read(&cache).unwrap(), before);
    }

    #[test]
    fn test_corrupt_cache_is_resource_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("preset_lib.json");
        std::fs::write(&cache, b"not json at all").unwrap();

        let err = LibraryStore::open(&cache).unwrap_err();
        assert!(matches!(err, Error::Resource(_)));
    }

    #[test]
    fn test_wrong_format_tag_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("preset_lib.json");
        std::fs::write(
            &cache,
            br#"{"format":"other","version":1,"dimension":1,"presets":[]}"#,
        )
        .unwrap();

        let err = LibraryStore::open(&cache).unwrap_err();
        assert!(matches!(err, Error::Resource(_)));
    }
}
