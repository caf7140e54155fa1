use anyhow::{anyhow, Result};
use dlib_face_recognition::{
    FaceDetector, FaceDetectorTrait, FaceEncoderNetwork, FaceEncoderTrait, ImageMatrix,
    LandmarkPredictor, LandmarkPredictorTrait,
};
use image::RgbImage;
use log::debug;
use std::path::Path;

use crate::embed::EmbeddingBackend;

/// Learned embedder backed by the dlib HOG detector, 68-point landmark
/// predictor and ResNet encoder.
pub struct DlibEmbedder {
    detector: FaceDetector,
    landmarks: LandmarkPredictor,
    encoder: FaceEncoderNetwork,
}

impl DlibEmbedder {
    pub fn open(landmark_model: &Path, encoder_model: &Path) -> Result<Self> {
        debug!("loading landmark model {}", landmark_model.display());
        let landmarks = LandmarkPredictor::open(landmark_model)
            .map_err(|message| anyhow!("loading {}: {}", landmark_model.display(), message))?;
        debug!("loading encoder model {}", encoder_model.display());
        let encoder = FaceEncoderNetwork::open(encoder_model)
            .map_err(|message| anyhow!("loading {}: {}", encoder_model.display(), message))?;
        Ok(Self {
            detector: FaceDetector::new(),
            landmarks,
            encoder,
        })
    }
}

impl EmbeddingBackend for DlibEmbedder {
    fn embeddings(&mut self, img: &RgbImage) -> Result<Vec<Vec<f32>>> {
        let matrix = ImageMatrix::from_image(img);
        let locations = self.detector.face_locations(&matrix);
        debug!("dlib detector found {} face(s)", locations.len());

        let mut landmarks = Vec::with_capacity(locations.len());
        for rect in locations.iter() {
            landmarks.push(self.landmarks.face_landmarks(&matrix, rect));
        }

        let encodings = self.encoder.get_face_encodings(&matrix, &landmarks, 0);
        Ok(encodings
            .iter()
            .map(|e| e.as_ref().iter().map(|&v| v as f32).collect())
            .collect())
    }
}
