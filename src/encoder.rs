use crate::encoding::Encoding;
use facegate_vision::embed::EmbeddingBackend;
use facegate_vision::features::fallback_vector;
use facegate_vision::localize::{DetectorTuning, FaceLocalizer, FaceRegion};
use facegate_vision::patch;
use image::{imageops, GrayImage, RgbImage};
use log::{debug, warn};

/// What probing an image for a face produced.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeOutcome {
    Encoded(Encoding),
    NoFace,
}

/// How probe images turn into encodings.
pub enum EncodeStrategy {
    /// Learned embedder, one 128-value vector per face.
    Embedding(Box<dyn EmbeddingBackend>),
    /// Classical cascade plus hand-crafted features, 256 values.
    Fallback {
        localizer: Box<dyn FaceLocalizer>,
        tuning: DetectorTuning,
    },
}

/// Turns a probe image into the encoding of its most prominent face.
pub struct FaceEncoder {
    strategy: EncodeStrategy,
}

impl FaceEncoder {
    pub fn with_backend(backend: Box<dyn EmbeddingBackend>) -> Self {
        Self {
            strategy: EncodeStrategy::Embedding(backend),
        }
    }

    pub fn with_localizer(localizer: Box<dyn FaceLocalizer>, tuning: DetectorTuning) -> Self {
        Self {
            strategy: EncodeStrategy::Fallback { localizer, tuning },
        }
    }

    /// Whether encodings come from the learned embedding space.
    pub fn uses_embedding(&self) -> bool {
        matches!(self.strategy, EncodeStrategy::Embedding(_))
    }

    /// Encode the most prominent face. Internal failures are logged and
    /// reported as no face so one bad probe cannot take the caller down.
    pub fn encode(&mut self, img: &RgbImage) -> EncodeOutcome {
        match &mut self.strategy {
            EncodeStrategy::Embedding(backend) => match backend.embeddings(img) {
                Ok(mut embeddings) => {
                    if embeddings.is_empty() {
                        return EncodeOutcome::NoFace;
                    }
                    EncodeOutcome::Encoded(Encoding(embeddings.swap_remove(0)))
                }
                Err(e) => {
                    warn!("embedding backend failed: {:#}", e);
                    EncodeOutcome::NoFace
                }
            },
            EncodeStrategy::Fallback { localizer, tuning } => {
                let gray = imageops::grayscale(img);
                encode_fallback(localizer.as_mut(), &gray, tuning)
            }
        }
    }
}

fn encode_fallback(
    localizer: &mut dyn FaceLocalizer,
    gray: &GrayImage,
    tuning: &DetectorTuning,
) -> EncodeOutcome {
    let regions = match localizer.locate(gray, tuning) {
        Ok(regions) => regions,
        Err(e) => {
            warn!("face localizer failed: {:#}", e);
            return EncodeOutcome::NoFace;
        }
    };
    let best = match largest_region(&regions) {
        Some(best) => best,
        None => return EncodeOutcome::NoFace,
    };
    debug!(
        "largest of {} region(s): {}x{} at ({}, {})",
        regions.len(),
        best.width,
        best.height,
        best.x,
        best.y
    );

    let padded = best.padded(gray.width(), gray.height());
    let patch = match patch::prepare_patch(gray, &padded) {
        Ok(patch) => patch,
        Err(e) => {
            warn!("face patch preparation failed: {:#}", e);
            return EncodeOutcome::NoFace;
        }
    };
    EncodeOutcome::Encoded(Encoding(fallback_vector(&patch)))
}

// First maximal region wins ties, keeping detector order meaningful.
fn largest_region(regions: &[FaceRegion]) -> Option<FaceRegion> {
    let mut best: Option<FaceRegion> = None;
    for region in regions {
        match best {
            Some(current) if current.area() >= region.area() => {}
            _ => best = Some(*region),
        }
    }
    best
}
