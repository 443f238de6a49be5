//! Latent feature encoding
//!
//! The matching engine treats the encoder as a pure function from a raw
//! sample buffer to a fixed-length feature vector. The trait lets the
//! service swap in an external model later; `SegmentRmsEncoder` is the
//! built-in deterministic implementation.

/// Maps a raw audio buffer to a fixed-dimension latent feature vector.
///
/// Implementations must be pure and deterministic: the same buffer always
/// encodes to the same vector, with the dimension fixed for the lifetime of
/// the encoder.
pub trait FeatureEncoder: Send + Sync {
    /// Output vector dimension.
    fn dimension(&self) -> usize;

    /// Encode a sample buffer into a feature vector of `dimension()` floats.
    fn encode(&self, samples: &[f32]) -> Vec<f32>;
}

/// Default encoder: per-segment log-scaled RMS energy.
///
/// Splits the buffer into `dimension` near-equal segments and emits
/// `ln(1 + rms)` per segment, a coarse spectral-envelope-over-time summary
/// that is cheap, deterministic, and independent of buffer length.
pub struct SegmentRmsEncoder {
    dimension: usize,
}

impl SegmentRmsEncoder {
    /// Default feature dimension matching the preset cache format.
    pub const DEFAULT_DIMENSION: usize = 32;

    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn segment_rms(segment: &[f32]) -> f32 {
        if segment.is_empty() {
            return 0.0;
        }
        let sum_squares: f32 = segment.iter().map(|s| s * s).sum();
        (sum_squares / segment.len() as f32).sqrt()
    }
}

impl Default for SegmentRmsEncoder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSION)
    }
}

impl FeatureEncoder for SegmentRmsEncoder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, samples: &[f32]) -> Vec<f32> {
        if samples.is_empty() {
            return vec![0.0; self.dimension];
        }

        // Ceiling division so every sample lands in some segment
        let segment_len = samples.len().div_ceil(self.dimension);
        let mut features = Vec::with_capacity(self.dimension);
        for i in 0..self.dimension {
            let start = (i * segment_len).min(samples.len());
            let end = ((i + 1) * segment_len).min(samples.len());
            let rms = Self::segment_rms(&samples[start..end]);
            features.push((1.0 + rms).ln());
        }
        features
    }
}
