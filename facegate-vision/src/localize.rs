use anyhow::Result;
use image::GrayImage;
use log::debug;
use rustface::{Detector, ImageData};
use std::path::Path;

/// Axis-aligned face bounding box, clipped to the image it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRegion {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Grow the region by 20% of its shorter side on every edge, clipped to
    /// the image bounds. Cascade boxes hug the eyes and mouth; the feature
    /// passes want hairline and jaw context as well.
    pub fn padded(&self, img_w: u32, img_h: u32) -> FaceRegion {
        let pad = (0.2 * self.width.min(self.height) as f32) as u32;
        let x = self.x.saturating_sub(pad);
        let y = self.y.saturating_sub(pad);
        let width = (self.width + 2 * pad).min(img_w.saturating_sub(x));
        let height = (self.height + 2 * pad).min(img_h.saturating_sub(y));
        FaceRegion {
            x,
            y,
            width,
            height,
        }
    }
}

/// Knobs for a localizer sweep, in classical cascade terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorTuning {
    /// Relative growth of the scan window between pyramid levels (> 1.0).
    pub scale_step: f32,
    /// Vote count a candidate needs before it counts as a face.
    pub min_neighbors: u32,
    /// Smallest face side in pixels worth reporting.
    pub min_size: u32,
    /// Largest face side in pixels, unbounded when `None`.
    pub max_size: Option<u32>,
}

impl Default for DetectorTuning {
    fn default() -> Self {
        Self {
            scale_step: 1.05,
            min_neighbors: 5,
            min_size: 100,
            max_size: Some(500),
        }
    }
}

/// Finds face regions in a grayscale image.
pub trait FaceLocalizer {
    fn locate(&mut self, gray: &GrayImage, tuning: &DetectorTuning) -> Result<Vec<FaceRegion>>;
}

/// Funnel-cascade localizer backed by the SeetaFace frontal detector.
pub struct SeetaLocalizer {
    detector: Box<dyn Detector>,
}

impl SeetaLocalizer {
    pub fn open(model: &Path) -> Result<Self> {
        let detector = rustface::create_detector(&model.to_string_lossy())
            .map_err(|e| anyhow::anyhow!("loading detector model {}: {}", model.display(), e))?;
        Ok(Self { detector })
    }

    fn apply(&mut self, tuning: &DetectorTuning) {
        // The sliding-window minimum the cascade supports is 20 px.
        self.detector.set_min_face_size(tuning.min_size.max(20));
        self.detector
            .set_max_face_size(tuning.max_size.unwrap_or(u32::MAX));
        // The cascade shrinks the image per pyramid level where a Haar scan
        // grows the window, so the factor is the step's reciprocal.
        let factor = (1.0 / tuning.scale_step.max(1.0)).clamp(0.1, 0.99);
        self.detector.set_pyramid_scale_factor(factor);
        // Neighbor votes and the cascade score threshold trade precision for
        // recall the same way; reuse the value directly.
        self.detector
            .set_score_thresh(f64::from(tuning.min_neighbors.max(1)));
        self.detector.set_slide_window_step(4, 4);
    }
}

impl FaceLocalizer for SeetaLocalizer {
    fn locate(&mut self, gray: &GrayImage, tuning: &DetectorTuning) -> Result<Vec<FaceRegion>> {
        let (img_w, img_h) = gray.dimensions();
        if img_w == 0 || img_h == 0 {
            return Ok(vec![]);
        }

        self.apply(tuning);

        let mut data = ImageData::new(gray.as_raw(), img_w, img_h);
        let faces = self.detector.detect(&mut data);
        debug!("cascade reported {} candidate region(s)", faces.len());

        let mut regions = Vec::with_capacity(faces.len());
        for face in faces {
            let bbox = face.bbox();
            // The cascade may report boxes that poke past the frame.
            let x0 = bbox.x().clamp(0, img_w as i32);
            let y0 = bbox.y().clamp(0, img_h as i32);
            let x1 = (bbox.x() + bbox.width() as i32).clamp(0, img_w as i32);
            let y1 = (bbox.y() + bbox.height() as i32).clamp(0, img_h as i32);
            if x1 <= x0 || y1 <= y0 {
                continue;
            }
            regions.push(FaceRegion {
                x: x0 as u32,
                y: y0 as u32,
                width: (x1 - x0) as u32,
                height: (y1 - y0) as u32,
            });
        }
        Ok(regions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_grows_by_fifth_of_short_side() {
        let region = FaceRegion {
            x: 100,
            y: 100,
            width: 100,
            height: 150,
        };
        let padded = region.padded(1000, 1000);
        // 20% of the 100 px short side on every edge.
        assert_eq!(padded.x, 80);
        assert_eq!(padded.y, 80);
        assert_eq!(padded.width, 140);
        assert_eq!(padded.height, 190);
    }

    #[test]
    fn padding_clips_at_image_edges() {
        let region = FaceRegion {
            x: 5,
            y: 0,
            width: 100,
            height: 100,
        };
        let padded = region.padded(110, 90);
        assert_eq!(padded.x, 0);
        assert_eq!(padded.y, 0);
        assert_eq!(padded.width, 110);
        assert_eq!(padded.height, 90);
    }

    #[test]
    fn padding_of_degenerate_region_stays_degenerate() {
        let region = FaceRegion {
            x: 10,
            y: 10,
            width: 0,
            height: 40,
        };
        let padded = region.padded(100, 100);
        assert_eq!(padded.width, 0);
    }

    #[test]
    fn area_does_not_overflow_u32() {
        let region = FaceRegion {
            x: 0,
            y: 0,
            width: 100_000,
            height: 100_000,
        };
        assert_eq!(region.area(), 10_000_000_000);
    }

    #[test]
    fn default_tuning_targets_enrolment_sized_faces() {
        let tuning = DetectorTuning::default();
        assert_eq!(tuning.min_size, 100);
        assert_eq!(tuning.max_size, Some(500));
        assert_eq!(tuning.min_neighbors, 5);
        assert!((tuning.scale_step - 1.05).abs() < 1e-6);
    }
}
