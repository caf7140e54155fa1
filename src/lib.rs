pub mod authenticator;
pub mod comparator;
pub mod config;
pub mod encoder;
pub mod encoding;
pub mod error;

// Re-export vision types for convenience
pub use facegate_vision::{
    DetectorTuning, EmbeddingBackend, FaceLocalizer, FaceRegion, SeetaLocalizer, EMBEDDING_LEN,
    FALLBACK_LEN, PATCH_SIZE,
};

#[cfg(feature = "dlib")]
pub use facegate_vision::DlibEmbedder;

pub use authenticator::{AuthenticationResult, Authenticator};
pub use comparator::{Comparator, ComparisonResult};
pub use encoder::{EncodeOutcome, EncodeStrategy, FaceEncoder};
pub use encoding::{Encoding, Identity, KnownFace};
pub use error::EngineError;
