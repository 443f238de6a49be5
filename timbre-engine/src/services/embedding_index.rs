//! Word-embedding index
//!
//! Read-only lookup from a normalized word to a fixed-dimension embedding
//! vector, loaded once at startup from a GloVe-style text file (one word and
//! its components per line). Unknown words resolve to a fixed fallback
//! vector rather than an error, and the two cases are distinguished at the
//! type level so callers can see when they are scoring out-of-vocabulary
//! input.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use timbre_common::{Error, Result};

/// Floor for the Euclidean distance in `distance_similarity`, preventing
/// division by zero for (near-)identical vectors.
const MIN_DISTANCE: f32 = 1e-5;

/// Result of a word lookup: either a real table entry or the fallback
/// vector used for out-of-vocabulary words.
#[derive(Debug, Clone, Copy)]
pub enum Lookup<'a> {
    /// The word is present in the embedding table.
    Found(&'a [f32]),
    /// The word is out of vocabulary; this is the constant fallback vector.
    Fallback(&'a [f32]),
}

impl<'a> Lookup<'a> {
    /// The embedding vector regardless of variant.
    pub fn vector(&self) -> &'a [f32] {
        match self {
            Lookup::Found(v) | Lookup::Fallback(v) => v,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Lookup::Fallback(_))
    }
}

/// Immutable word → embedding-vector table.
#[derive(Debug)]
pub struct WordEmbeddingIndex {
    dimension: usize,
    word_to_row: HashMap<String, usize>,
    // Row-major vector table, one row per word
    vectors: Vec<f32>,
    fallback: Vec<f32>,
}

impl WordEmbeddingIndex {
    /// Load the index from a GloVe-style text file.
    ///
    /// Each line holds a word followed by its vector components, separated
    /// by spaces. The dimension is inferred from the first line; any line
    /// with a different component count is a `Resource` error.
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            Error::Resource(format!("cannot open embedding file {}: {}", path.display(), e))
        })?;
        let reader = std::io::BufReader::new(file);

        let mut dimension = 0usize;
        let mut word_to_row = HashMap::new();
        let mut vectors = Vec::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let word = parts
                .next()
                .ok_or_else(|| Error::Resource(format!("empty line {} in embedding file", line_no + 1)))?
                .to_lowercase();

            let components: Vec<f32> = parts
                .map(|p| {
                    p.parse::<f32>().map_err(|e| {
                        Error::Resource(format!(
                            "bad component on line {} of embedding file: {}",
                            line_no + 1,
                            e
                        ))
                    })
                })
                .collect::<Result<_>>()?;

            if dimension == 0 {
                dimension = components.len();
                if dimension == 0 {
                    return Err(Error::Resource(format!(
                        "no vector components on line {} of embedding file",
                        line_no + 1
                    )));
                }
            } else if components.len() != dimension {
                return Err(Error::Resource(format!(
                    "embedding dimension mismatch on line {}: expected {}, got {}",
                    line_no + 1,
                    dimension,
                    components.len()
                )));
            }

            word_to_row.insert(word, vectors.len() / dimension);
            vectors.extend_from_slice(&components);
        }

        if dimension == 0 {
            return Err(Error::Resource("embedding file contains no entries".to_string()));
        }

        tracing::info!(
            words = word_to_row.len(),
            dimension,
            "Word embedding index loaded"
        );

        // Uniform nonzero fallback keeps cosine and distance well-defined
        let fallback = vec![(1.0 / dimension as f32).sqrt(); dimension];

        Ok(Self {
            dimension,
            word_to_row,
            vectors,
            fallback,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.word_to_row.len()
    }

    pub fn is_empty(&self) -> bool {
        self.word_to_row.is_empty()
    }

    /// Case-insensitive, total lookup. Unknown words resolve to the
    /// fallback vector, never an error.
    pub fn lookup(&self, word: &str) -> Lookup<'_> {
        match self.word_to_row.get(&word.to_lowercase()) {
            Some(&row) => {
                let start = row * self.dimension;
                Lookup::Found(&self.vectors[start..start + self.dimension])
            }
            None => Lookup::Fallback(&self.fallback),
        }
    }
}

/// `dot(a,b) / (|a| * |b|)`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot / (norm_a * norm_b)
}

/// Inverse Euclidean distance, floored at `MIN_DISTANCE` so that identical
/// word vectors score `1e5` instead of dividing by zero.
pub fn distance_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dist: f32 = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt();
    1.0 / dist.max(MIN_DISTANCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_embeddings(lines: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(lines.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_and_lookup() {
        let file = write_embeddings("bright 1.0 0.0 0.0\nwarm 0.0 1.0 0.0\n");
        let index = WordEmbeddingIndex::load(file.path()).unwrap();

        assert_eq!(index.dimension(), 3);
        assert_eq!(index.len(), 2);
        let hit = index.lookup("bright");
        assert!(!hit.is_fallback());
        assert_eq!(hit.vector(), &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let file = write_embeddings("bright 1.0 0.0\n");
        let index = WordEmbeddingIndex::load(file.path()).unwrap();
        assert_eq!(index.lookup("BRIGHT").vector(), &[1.0, 0.0]);
    }

    #[test]
    fn test_unknown_word_falls_back() {
        let file = write_embeddings("bright 1.0 0.0 0.0 0.0\n");
        let index = WordEmbeddingIndex::load(file.path()).unwrap();

        let miss = index.lookup("xylophonic");
        assert!(miss.is_fallback());
        let expected = (1.0f32 / 4.0).sqrt();
        assert_eq!(miss.vector(), &[expected; 4]);
    }

    #[test]
    fn test_dimension_mismatch_is_resource_error() {
        let file = write_embeddings("bright 1.0 0.0\nwarm 1.0\n");
        let err = WordEmbeddingIndex::load(file.path()).unwrap_err();
        assert!(matches!(err, timbre_common::Error::Resource(_)));
    }

    #[test]
    fn test_missing_file_is_resource_error() {
        let err = WordEmbeddingIndex::load(Path::new("/nonexistent/glove.txt")).unwrap_err();
        assert!(matches!(err, timbre_common::Error::Resource(_)));
    }

    #[test]
    fn test_cosine_similarity_parallel_vectors() {
        let sim = cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_distance_similarity_floors_at_epsilon() {
        let sim = distance_similarity(&[0.5, 0.5], &[0.5, 0.5]);
        assert!((sim - 1e5).abs() < 1.0);
    }

    #[test]
    fn test_distance_similarity_decreases_with_distance() {
        let near = distance_similarity(&[0.0, 0.0], &[0.1, 0.0]);
        let far = distance_similarity(&[0.0, 0.0], &[5.0, 0.0]);
        assert!(near > far);
    }
}
