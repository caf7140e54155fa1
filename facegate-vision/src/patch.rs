use crate::localize::FaceRegion;
use anyhow::Result;
use image::{imageops, GrayImage, Luma};
use ndarray::Array2;

/// Side length of the canonical face patch.
pub const PATCH_SIZE: usize = 128;

/// Equalized grayscale face crop, resampled to `PATCH_SIZE` squared.
/// Values keep the 0..=255 intensity range as `f32`.
#[derive(Debug, Clone)]
pub struct FacePatch {
    pub pixels: Array2<f32>,
}

impl FacePatch {
    pub fn from_gray(img: &GrayImage) -> Self {
        let resized = if img.width() as usize == PATCH_SIZE && img.height() as usize == PATCH_SIZE
        {
            img.clone()
        } else {
            imageops::resize(
                img,
                PATCH_SIZE as u32,
                PATCH_SIZE as u32,
                imageops::FilterType::Triangle,
            )
        };
        let mut pixels = Array2::zeros((PATCH_SIZE, PATCH_SIZE));
        for (x, y, p) in resized.enumerate_pixels() {
            pixels[[y as usize, x as usize]] = f32::from(p[0]);
        }
        FacePatch { pixels }
    }
}

/// Spread the intensity histogram across the full 0..=255 range.
///
/// Same cumulative-histogram remap the classical pipelines use: the first
/// occupied level anchors at zero and the running sum of the rest scales to
/// 255. A constant image maps to itself.
pub fn equalize(img: &GrayImage) -> GrayImage {
    let total = img.as_raw().len() as u64;
    if total == 0 {
        return img.clone();
    }

    let mut hist = [0u64; 256];
    for p in img.pixels() {
        hist[p[0] as usize] += 1;
    }
    let first = hist.iter().position(|&c| c != 0).unwrap_or(0);
    if hist[first] == total {
        return img.clone();
    }

    let scale = 255.0 / (total - hist[first]) as f64;
    let mut lut = [0u8; 256];
    let mut sum = 0u64;
    for (level, count) in hist.iter().enumerate().skip(first + 1) {
        sum += count;
        lut[level] = (sum as f64 * scale).round().min(255.0) as u8;
    }

    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        Luma([lut[img.get_pixel(x, y)[0] as usize]])
    })
}

/// Cut `region` out of `gray`, equalize it, and resample to the canonical
/// patch. Fails on a degenerate region so callers can treat it as no face.
pub fn prepare_patch(gray: &GrayImage, region: &FaceRegion) -> Result<FacePatch> {
    if region.width == 0 || region.height == 0 {
        anyhow::bail!(
            "degenerate face region {}x{} at ({}, {})",
            region.width,
            region.height,
            region.x,
            region.y
        );
    }
    let crop = imageops::crop_imm(gray, region.x, region.y, region.width, region.height).to_image();
    let crop = equalize(&crop);
    Ok(FacePatch::from_gray(&crop))
}
