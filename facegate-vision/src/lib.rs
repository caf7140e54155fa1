pub mod embed;
pub mod features;
pub mod localize;
pub mod patch;

#[cfg(feature = "dlib")]
pub mod dlib;

// Re-export commonly used types
pub use embed::{EmbeddingBackend, EMBEDDING_LEN};
pub use features::{fallback_vector, FeatureBlock, FALLBACK_LEN};
pub use localize::{DetectorTuning, FaceLocalizer, FaceRegion, SeetaLocalizer};
pub use patch::{FacePatch, PATCH_SIZE};

#[cfg(feature = "dlib")]
pub use dlib::DlibEmbedder;
