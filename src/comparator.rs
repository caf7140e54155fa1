use crate::encoding::Encoding;
use facegate_vision::embed::{euclidean_distance, EMBEDDING_LEN};
use serde::Serialize;

/// Verdict of one encoding-to-encoding comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComparisonResult {
    #[serde(rename = "match")]
    pub is_match: bool,
    pub confidence: f32,
    pub distance: f32,
}

impl ComparisonResult {
    /// Degraded verdict for comparisons that cannot be scored.
    fn worst() -> Self {
        Self {
            is_match: false,
            confidence: 0.0,
            distance: 1.0,
        }
    }
}

/// Scores encoding pairs under the metric matching the active encoder.
///
/// With a learned embedder in play, two full-length embeddings are scored in
/// the embedding space's own straight-line metric. Every other pairing falls
/// back to the angular metric, which tolerates mixed vector lengths.
#[derive(Debug, Clone, Copy)]
pub struct Comparator {
    native_embeddings: bool,
    tolerance: f32,
    match_threshold: f32,
}

impl Comparator {
    pub fn new(native_embeddings: bool, tolerance: f32, match_threshold: f32) -> Self {
        Self {
            native_embeddings,
            tolerance,
            match_threshold,
        }
    }

    pub fn native_embeddings(&self) -> bool {
        self.native_embeddings
    }

    /// Compare a stored encoding against a probe. Never fails; unscorable
    /// pairs come back as the degraded no-match verdict.
    pub fn compare(&self, known: &Encoding, probe: &Encoding) -> ComparisonResult {
        if self.native_embeddings
            && known.len() == EMBEDDING_LEN
            && probe.len() == EMBEDDING_LEN
        {
            self.compare_native(known, probe)
        } else {
            self.compare_angular(known, probe)
        }
    }

    fn compare_native(&self, known: &Encoding, probe: &Encoding) -> ComparisonResult {
        let distance = euclidean_distance(known.as_slice(), probe.as_slice());
        if !distance.is_finite() {
            return ComparisonResult::worst();
        }
        ComparisonResult {
            is_match: distance <= self.tolerance,
            confidence: (1.0 - distance).max(0.0),
            distance,
        }
    }

    fn compare_angular(&self, known: &Encoding, probe: &Encoding) -> ComparisonResult {
        let similarity = cosine_similarity(known.as_slice(), probe.as_slice());
        if !similarity.is_finite() {
            return ComparisonResult::worst();
        }
        // Norm rounding can nudge self-similarity a hair past one, which
        // would turn the distance negative.
        let similarity = similarity.min(1.0);
        ComparisonResult {
            is_match: similarity >= self.match_threshold,
            confidence: similarity.max(0.0),
            distance: 1.0 - similarity,
        }
    }
}

/// Cosine similarity over vectors of possibly different lengths. Zero-padding
/// the shorter vector changes neither the dot product nor either norm, so the
/// reconciled value falls straight out of the raw slices.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
