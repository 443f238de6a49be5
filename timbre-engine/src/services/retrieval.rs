//! Retrieval queries over the preset library
//!
//! Four query operations: nearest-by-vector, embedding-weighted stochastic
//! keyword retrieval, exact keyword filtering, and frequency-based
//! auto-tagging. All operate on a consistent snapshot of the store; the
//! caller holds the store lock for the duration of a query.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use timbre_common::{Error, Result};

use super::embedding_index::{distance_similarity, WordEmbeddingIndex};
use super::library_store::LibraryStore;

/// Default result count for nearest-neighbor and keyword queries.
pub const DEFAULT_RESULT_COUNT: usize = 5;

/// Neighborhood size for auto-tagging.
pub const AUTO_TAG_NEIGHBORS: usize = 10;

/// Number of tags returned by auto-tagging.
pub const AUTO_TAG_COUNT: usize = 3;

/// Weight spreads below this get a contrast boost before sampling. Spreads
/// this compressed are typical when the query words are near-synonymous or
/// out of vocabulary.
const CONTRAST_SPREAD_THRESHOLD: f32 = 1.0;

/// Return the `min(k, N)` stored paths closest to `query` by Euclidean
/// distance, in non-decreasing distance order. Ties keep insertion order.
/// An empty store yields an empty list.
pub fn by_feature_vector(store: &LibraryStore, query: &[f32], k: usize) -> Result<Vec<String>> {
    let rows = nearest_rows(store, query, k)?;
    Ok(rows.into_iter().map(|r| store.path_at(r).to_string()).collect())
}

/// Embedding-weighted stochastic retrieval.
///
/// Each record is weighted by how close its descriptors sit to the query
/// keywords in embedding space, then `k` records are drawn **with
/// replacement** from the normalized weight distribution. Results are
/// intentionally non-deterministic and may contain duplicate paths; two
/// identical queries may return different sets.
pub fn by_keywords<R: Rng>(
    store: &LibraryStore,
    index: &WordEmbeddingIndex,
    keywords: &[String],
    k: usize,
    rng: &mut R,
) -> Vec<String> {
    if store.is_empty() || keywords.is_empty() || k == 0 {
        return Vec::new();
    }

    let keyword_vectors: Vec<&[f32]> = keywords.iter().map(|w| index.lookup(w).vector()).collect();

    // For each record, match every query keyword to its best descriptor
    // and sum the per-keyword maxima.
    let mut weights: Vec<f32> = Vec::with_capacity(store.len());
    for row in 0..store.len() {
        let mut weight = 0.0f32;
        for query_vector in &keyword_vectors {
            let best = store
                .descriptors_at(row)
                .iter()
                .map(|d| distance_similarity(query_vector, index.lookup(d).vector()))
                .fold(0.0f32, f32::max);
            weight += best;
        }
        weights.push(weight);
    }

    let max = weights.iter().copied().fold(f32::MIN, f32::max);
    let min = weights.iter().copied().fold(f32::MAX, f32::min);

    // Compressed spreads normalize to a near-uniform distribution, so boost
    // the contrast non-linearly first.
    if max - min < CONTRAST_SPREAD_THRESHOLD {
        for w in &mut weights {
            *w = w.powi(5);
        }
    }

    let min = weights.iter().copied().fold(f32::MAX, f32::min);
    for w in &mut weights {
        *w -= min;
    }

    match WeightedIndex::new(&weights) {
        Ok(dist) => (0..k)
            .map(|_| store.path_at(dist.sample(rng)).to_string())
            .collect(),
        // All weights equal (sum zero after shifting): draw uniformly
        Err(_) => (0..k)
            .map(|_| store.path_at(rng.gen_range(0..store.len())).to_string())
            .collect(),
    }
}

/// Deterministic filter: every path whose descriptor set contains all of
/// `keywords` (case-insensitive). Unbounded result size.
pub fn filter_by_exact_keywords(store: &LibraryStore, keywords: &[String]) -> Vec<String> {
    let wanted: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

    (0..store.len())
        .filter(|&row| {
            let have: Vec<String> = store
                .descriptors_at(row)
                .iter()
                .map(|d| d.to_lowercase())
                .collect();
            wanted.iter().all(|w| have.contains(w))
        })
        .map(|row| store.path_at(row).to_string())
        .collect()
}

/// Frequency-based tag inference over the `k` nearest records.
///
/// Flattens the neighbors' descriptor lists into one multiset and ranks
/// distinct descriptors by occurrence count, ties broken by first
/// occurrence in the flattened list. Returns up to `top` tags.
pub fn auto_tag(store: &LibraryStore, query: &[f32], k: usize, top: usize) -> Result<Vec<String>> {
    let rows = nearest_rows(store, query, k)?;

    // Count in first-occurrence order so the later stable sort breaks
    // frequency ties the same way.
    let mut counts: Vec<(String, usize)> = Vec::new();
    for row in rows {
        for descriptor in store.descriptors_at(row) {
            match counts.iter_mut().find(|(d, _)| d == descriptor) {
                Some((_, n)) => *n += 1,
                None => counts.push((descriptor.clone(), 1)),
            }
        }
    }

    counts.sort_by_key(|&(_, n)| std::cmp::Reverse(n));
    Ok(counts.into_iter().take(top).map(|(d, _)| d).collect())
}

/// Rows of the `min(k, N)` records nearest to `query`, stable-sorted by
/// Euclidean distance so equidistant records keep insertion order.
fn nearest_rows(store: &LibraryStore, query: &[f32], k: usize) -> Result<Vec<usize>> {
    if store.is_empty() {
        return Ok(Vec::new());
    }
    if let Some(dim) = store.dimension() {
        if query.len() != dim {
            return Err(Error::Config(format!(
                "query dimension mismatch: expected {}, got {}",
                dim,
                query.len()
            )));
        }
    }

    let mut by_distance: Vec<(usize, f32)> = (0..store.len())
        .map(|row| (row, euclidean_distance(query, store.feature_row(row))))
        .collect();
    by_distance.sort_by(|a, b| a.1.total_cmp(&b.1));
    by_distance.truncate(k);
    Ok(by_distance.into_iter().map(|(row, _)| row).collect())
}

fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write;

    fn strs(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn store_with(records: &[(&str, &[&str], &[f32])]) -> (tempfile::TempDir, LibraryStore) {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LibraryStore::open(dir.path().join("cache.json")).unwrap();
        for (path, descriptors, feature) in records {
            store.add_record(path, &strs(descriptors), feature.to_vec()).unwrap();
        }
        (dir, store)
    }

    fn tiny_embedding_index() -> (tempfile::NamedTempFile, WordEmbeddingIndex) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"bright 5.0 0.0\nwarm 0.0 5.0\nsunny 4.8 0.1\ndark -5.0 -5.0\n",
        )
        .unwrap();
        file.flush().unwrap();
        let index = WordEmbeddingIndex::load(file.path()).unwrap();
        (file, index)
    }

    #[test]
    fn test_by_feature_vector_worked_example() {
        let (_dir, store) = store_with(&[
            ("p1", &["bright"], &[0.0, 0.0]),
            ("p2", &["dark"], &[3.0, 4.0]),
        ]);

        assert_eq!(by_feature_vector(&store, &[0.0, 0.0], 1).unwrap(), vec!["p1"]);
        assert_eq!(
            by_feature_vector(&store, &[3.0, 4.0], 2).unwrap(),
            vec!["p2", "p1"]
        );
    }

    #[test]
    fn test_by_feature_vector_returns_min_k_n() {
        let (_dir, store) = store_with(&[
            ("p1", &["a"], &[0.0]),
            ("p2", &["b"], &[1.0]),
            ("p3", &["c"], &[2.0]),
        ]);

        assert_eq!(by_feature_vector(&store, &[0.0], 10).unwrap().len(), 3);
        assert_eq!(by_feature_vector(&store, &[0.0], 2).unwrap().len(), 2);
    }

    #[test]
    fn test_by_feature_vector_ties_keep_insertion_order() {
        let (_dir, store) = store_with(&[
            ("p1", &["a"], &[1.0, 0.0]),
            ("p2", &["b"], &[-1.0, 0.0]),
            ("p3", &["c"], &[0.0, 1.0]),
        ]);

        // All three are exactly distance 1 from the origin
        assert_eq!(
            by_feature_vector(&store, &[0.0, 0.0], 3).unwrap(),
            vec!["p1", "p2", "p3"]
        );
    }

    #[test]
    fn test_by_feature_vector_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = LibraryStore::open(dir.path().join("cache.json")).unwrap();
        assert!(by_feature_vector(&store, &[0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_by_feature_vector_dimension_mismatch() {
        let (_dir, store) = store_with(&[("p1", &["a"], &[0.0, 0.0])]);
        let err = by_feature_vector(&store, &[0.0, 0.0, 0.0], 5).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_by_keywords_empty_store_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LibraryStore::open(dir.path().join("cache.json")).unwrap();
        let (_file, index) = tiny_embedding_index();
        let mut rng = StdRng::seed_from_u64(7);

        let paths = by_keywords(&store, &index, &strs(&["bright"]), 5, &mut rng);
        assert!(paths.is_empty());
    }

    #[test]
    fn test_by_keywords_returns_k_with_replacement() {
        let (_dir, store) = store_with(&[
            ("p1", &["Bright"], &[0.0]),
            ("p2", &["Dark"], &[1.0]),
        ]);
        let (_file, index) = tiny_embedding_index();
        let mut rng = StdRng::seed_from_u64(7);

        let paths = by_keywords(&store, &index, &strs(&["bright"]), 5, &mut rng);
        assert_eq!(paths.len(), 5);
        // Sampling with replacement from two records must repeat one
        assert!(paths.iter().any(|p| p == paths.first().unwrap()));
    }

    #[test]
    fn test_by_keywords_prefers_matching_descriptors() {
        // "sunny" sits right next to "bright" in the toy embedding space,
        // far from "dark", so p1 should dominate the draws.
        let (_dir, store) = store_with(&[
            ("p1", &["Bright"], &[0.0]),
            ("p2", &["Dark"], &[1.0]),
        ]);
        let (_file, index) = tiny_embedding_index();
        let mut rng = StdRng::seed_from_u64(42);

        let paths = by_keywords(&store, &index, &strs(&["sunny"]), 50, &mut rng);
        let p1_hits = paths.iter().filter(|p| *p == "p1").count();
        assert!(p1_hits > 40, "expected p1 to dominate, got {}", p1_hits);
    }

    #[test]
    fn test_by_keywords_all_out_of_vocabulary_does_not_panic() {
        // Every lookup hits the fallback vector, so all weights are equal
        // and the contrast boost + uniform fallback path is exercised.
        let (_dir, store) = store_with(&[
            ("p1", &["Zzyzx"], &[0.0]),
            ("p2", &["Qwfp"], &[1.0]),
        ]);
        let (_file, index) = tiny_embedding_index();
        let mut rng = StdRng::seed_from_u64(1);

        let paths = by_keywords(&store, &index, &strs(&["xylophonic"]), 4, &mut rng);
        assert_eq!(paths.len(), 4);
    }

    #[test]
    fn test_filter_by_exact_keywords_superset_semantics() {
        let (_dir, store) = store_with(&[
            ("p1", &["Bright", "Warm", "Pad"], &[0.0]),
            ("p2", &["Bright"], &[1.0]),
        ]);

        assert_eq!(
            filter_by_exact_keywords(&store, &strs(&["Bright", "Warm"])),
            vec!["p1"]
        );
        assert_eq!(
            filter_by_exact_keywords(&store, &strs(&["bright"])),
            vec!["p1", "p2"]
        );
        assert!(filter_by_exact_keywords(&store, &strs(&["Metallic"])).is_empty());
    }

    #[test]
    fn test_auto_tag_frequency_and_tie_break() {
        // Flattened descriptor multiset: Bright, Warm, Bright, Dark
        // Frequencies: Bright 2, Warm 1, Dark 1; Warm precedes Dark.
        let (_dir, store) = store_with(&[
            ("p1", &["Bright", "Warm"], &[0.0]),
            ("p2", &["Bright", "Dark"], &[0.1]),
        ]);

        let tags = auto_tag(&store, &[0.0], 10, 3).unwrap();
        assert_eq!(tags, vec!["Bright", "Warm", "Dark"]);
    }

    #[test]
    fn test_auto_tag_fewer_than_top_distinct() {
        let (_dir, store) = store_with(&[("p1", &["Bright"], &[0.0])]);
        let tags = auto_tag(&store, &[0.0], 10, 3).unwrap();
        assert_eq!(tags, vec!["Bright"]);
    }

    #[test]
    fn test_auto_tag_only_considers_k_nearest() {
        let (_dir, store) = store_with(&[
            ("near1", &["Warm"], &[0.0]),
            ("near2", &["Warm"], &[0.1]),
            ("far", &["Metallic"], &[100.0]),
        ]);

        let tags = auto_tag(&store, &[0.0], 2, 3).unwrap();
        assert_eq!(tags, vec!["Warm"]);
    }
}
