use crate::comparator::{Comparator, ComparisonResult};
use crate::config::Config;
use crate::encoder::{EncodeOutcome, FaceEncoder};
use crate::encoding::{Encoding, Identity, KnownFace};
use image::RgbImage;
use log::{debug, info};
use serde::Serialize;

const NO_PROBE_FACE: &str = "No face detected in probe image";
const NO_KNOWN_FACES: &str = "No known faces to compare against";
const NO_MATCH: &str = "No matching face found";

/// Verdict for one probe image against the stored face set.
///
/// Precondition failures carry only an error, a completed scan that found
/// nobody carries `authenticated: false`, and an accepted probe carries the
/// winning identity with its scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthenticationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authenticated: Option<bool>,
    #[serde(rename = "user_id", skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuthenticationResult {
    fn accepted(identity: Identity, score: ComparisonResult) -> Self {
        Self {
            success: true,
            authenticated: Some(true),
            identity: Some(identity),
            confidence: Some(score.confidence),
            distance: Some(score.distance),
            error: None,
        }
    }

    fn rejected() -> Self {
        Self {
            success: true,
            authenticated: Some(false),
            identity: None,
            confidence: None,
            distance: None,
            error: Some(NO_MATCH.to_string()),
        }
    }

    fn failed(error: &str) -> Self {
        Self {
            success: false,
            authenticated: None,
            identity: None,
            confidence: None,
            distance: None,
            error: Some(error.to_string()),
        }
    }
}

/// End-to-end face authentication: encode a probe, score it against every
/// stored face, keep the most confident accepted identity.
pub struct Authenticator {
    encoder: FaceEncoder,
    comparator: Comparator,
}

impl Authenticator {
    /// Build with a comparator matched to the encoder, so encodings are
    /// always scored under the metric of the space they came from.
    pub fn new(cfg: &Config, encoder: FaceEncoder) -> Self {
        let native = encoder.uses_embedding();
        let threshold = if native {
            cfg.match_threshold
        } else {
            cfg.fallback_threshold
        };
        Self {
            encoder,
            comparator: Comparator::new(native, cfg.tolerance, threshold),
        }
    }

    pub fn encode(&mut self, img: &RgbImage) -> EncodeOutcome {
        self.encoder.encode(img)
    }

    pub fn compare(&self, known: &Encoding, probe: &Encoding) -> ComparisonResult {
        self.comparator.compare(known, probe)
    }

    pub fn comparator(&self) -> &Comparator {
        &self.comparator
    }

    pub fn authenticate(
        &mut self,
        img: &RgbImage,
        known_faces: &[KnownFace],
    ) -> AuthenticationResult {
        let probe = match self.encoder.encode(img) {
            EncodeOutcome::Encoded(encoding) => encoding,
            EncodeOutcome::NoFace => return AuthenticationResult::failed(NO_PROBE_FACE),
        };
        if known_faces.is_empty() {
            return AuthenticationResult::failed(NO_KNOWN_FACES);
        }

        let mut best: Option<(Identity, ComparisonResult)> = None;
        let mut best_confidence = 0.0f32;
        for known in known_faces {
            let (identity, encoding) = match (&known.identity, &known.encoding) {
                (Some(identity), Some(encoding)) => (identity, encoding),
                _ => {
                    debug!("skipping stored row with missing identity or encoding");
                    continue;
                }
            };
            let score = self.comparator.compare(encoding, &probe);
            if score.is_match && score.confidence > best_confidence {
                best_confidence = score.confidence;
                best = Some((identity.clone(), score));
            }
        }

        match best {
            Some((identity, score)) => {
                info!(
                    "probe accepted as {} (confidence {:.3}, distance {:.3})",
                    identity, score.confidence, score.distance
                );
                AuthenticationResult::accepted(identity, score)
            }
            None => AuthenticationResult::rejected(),
        }
    }
}
