use crate::patch::{FacePatch, PATCH_SIZE};
use ndarray::Array2;

/// Length of the hand-crafted fallback vector.
pub const FALLBACK_LEN: usize = 256;

const HIST_BINS: usize = 32;
const WINDOW: usize = 16;
const WINDOW_STRIDE: usize = 8;
const WINDOW_VALUES: usize = 64;

/// One family of measurements over the canonical patch. Blocks append their
/// values in a fixed order so the assembled vector is stable.
pub trait FeatureBlock {
    fn append(&self, patch: &FacePatch, out: &mut Vec<f32>);
}

/// 32-bin histogram of raw intensities, normalized to unit mass.
pub struct IntensityHistogram;

impl FeatureBlock for IntensityHistogram {
    fn append(&self, patch: &FacePatch, out: &mut Vec<f32>) {
        let mut bins = [0u32; HIST_BINS];
        for &v in patch.pixels.iter() {
            bins[bin_of(v)] += 1;
        }
        push_normalized(&bins, out);
    }
}

/// Mean, spread, min and max of the Sobel response, horizontal then
/// vertical. Eight values.
pub struct GradientStats;

impl FeatureBlock for GradientStats {
    fn append(&self, patch: &FacePatch, out: &mut Vec<f32>) {
        out.extend_from_slice(&summarize(&sobel(patch, true)));
        out.extend_from_slice(&summarize(&sobel(patch, false)));
    }
}

/// 32-bin histogram of 8-neighbor local binary pattern codes over the patch
/// interior, normalized to unit mass.
pub struct LbpHistogram;

// Clockwise from the upper-left neighbor; bit k follows the walk order.
const LBP_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
];

impl FeatureBlock for LbpHistogram {
    fn append(&self, patch: &FacePatch, out: &mut Vec<f32>) {
        let mut bins = [0u32; HIST_BINS];
        for r in 1..PATCH_SIZE - 1 {
            for c in 1..PATCH_SIZE - 1 {
                let center = patch.pixels[[r, c]];
                let mut code = 0usize;
                for (k, (dr, dc)) in LBP_OFFSETS.iter().enumerate() {
                    let v = patch.pixels[[(r as isize + dr) as usize, (c as isize + dc) as usize]];
                    if v > center {
                        code |= 1 << k;
                    }
                }
                bins[bin_of(code as f32)] += 1;
            }
        }
        push_normalized(&bins, out);
    }
}

/// Mean, spread, min and max of each complete 16x16 window at stride 8,
/// row-major, capped at 64 values.
pub struct PatchStats;

impl FeatureBlock for PatchStats {
    fn append(&self, patch: &FacePatch, out: &mut Vec<f32>) {
        let mut values = Vec::new();
        let mut r = 0;
        while r + WINDOW <= PATCH_SIZE {
            let mut c = 0;
            while c + WINDOW <= PATCH_SIZE {
                values.extend_from_slice(&window_stats(patch, r, c));
                c += WINDOW_STRIDE;
            }
            r += WINDOW_STRIDE;
        }
        values.truncate(WINDOW_VALUES);
        out.extend_from_slice(&values);
    }
}

/// Assemble the fallback vector: histogram, gradient, binary-pattern and
/// window blocks in order, padded with zeros or truncated to `FALLBACK_LEN`.
pub fn fallback_vector(patch: &FacePatch) -> Vec<f32> {
    let blocks: [&dyn FeatureBlock; 4] = [
        &IntensityHistogram,
        &GradientStats,
        &LbpHistogram,
        &PatchStats,
    ];
    let mut out = Vec::with_capacity(FALLBACK_LEN);
    for block in blocks {
        block.append(patch, &mut out);
    }
    out.resize(FALLBACK_LEN, 0.0);
    out
}

// Values stay in 0..=255, eight intensity levels per bin.
fn bin_of(v: f32) -> usize {
    ((v / 8.0) as usize).min(HIST_BINS - 1)
}

fn push_normalized(bins: &[u32; HIST_BINS], out: &mut Vec<f32>) {
    let total: u32 = bins.iter().sum();
    for &count in bins {
        out.push(count as f32 / (total as f32 + 1e-7));
    }
}

fn sobel(patch: &FacePatch, horizontal: bool) -> Array2<f64> {
    let n = PATCH_SIZE as isize;
    // Border samples replicate the nearest edge pixel.
    let at = |r: isize, c: isize| -> f64 {
        let r = r.clamp(0, n - 1) as usize;
        let c = c.clamp(0, n - 1) as usize;
        f64::from(patch.pixels[[r, c]])
    };
    let mut out = Array2::zeros((PATCH_SIZE, PATCH_SIZE));
    for r in 0..n {
        for c in 0..n {
            let v = if horizontal {
                at(r - 1, c + 1) + 2.0 * at(r, c + 1) + at(r + 1, c + 1)
                    - at(r - 1, c - 1)
                    - 2.0 * at(r, c - 1)
                    - at(r + 1, c - 1)
            } else {
                at(r + 1, c - 1) + 2.0 * at(r + 1, c) + at(r + 1, c + 1)
                    - at(r - 1, c - 1)
                    - 2.0 * at(r - 1, c)
                    - at(r - 1, c + 1)
            };
            out[[r as usize, c as usize]] = v;
        }
    }
    out
}

fn summarize(values: &Array2<f64>) -> [f32; 4] {
    let n = values.len() as f64;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values.iter() {
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }
    let mean = sum / n;
    let mut var = 0.0;
    for &v in values.iter() {
        let d = v - mean;
        var += d * d;
    }
    [mean as f32, (var / n).sqrt() as f32, min as f32, max as f32]
}

fn window_stats(patch: &FacePatch, r0: usize, c0: usize) -> [f32; 4] {
    let n = (WINDOW * WINDOW) as f64;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for r in r0..r0 + WINDOW {
        for c in c0..c0 + WINDOW {
            let v = f64::from(patch.pixels[[r, c]]);
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
    }
    let mean = sum / n;
    let mut var = 0.0;
    for r in r0..r0 + WINDOW {
        for c in c0..c0 + WINDOW {
            let d = f64::from(patch.pixels[[r, c]]) - mean;
            var += d * d;
        }
    }
    [mean as f32, (var / n).sqrt() as f32, min as f32, max as f32]
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn patch_of(f: impl Fn(u32, u32) -> u8) -> FacePatch {
        let img = GrayImage::from_fn(PATCH_SIZE as u32, PATCH_SIZE as u32, |x, y| Luma([f(x, y)]));
        FacePatch::from_gray(&img)
    }

    #[test]
    fn fallback_vector_is_always_256_long() {
        let flat = patch_of(|_, _| 128);
        let noisy = patch_of(|x, y| ((x * 31 + y * 17) % 256) as u8);
        assert_eq!(fallback_vector(&flat).len(), FALLBACK_LEN);
        assert_eq!(fallback_vector(&noisy).len(), FALLBACK_LEN);
    }

    #[test]
    fn real_features_stop_at_136() {
        // 32 histogram + 8 gradient + 32 pattern + 64 window values.
        let patch = patch_of(|x, y| (x ^ y) as u8);
        let vector = fallback_vector(&patch);
        assert!(vector[135] != 0.0 || vector[..136].iter().any(|&v| v != 0.0));
        assert!(vector[136..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn intensity_histogram_sums_to_one() {
        let patch = patch_of(|x, _| (x % 256) as u8);
        let mut out = Vec::new();
        IntensityHistogram.append(&patch, &mut out);
        assert_eq!(out.len(), 32);
        let sum: f32 = out.iter().sum();
        assert!((sum - 1.0).abs() < 1e-3);
    }

    #[test]
    fn constant_patch_lands_in_one_bin() {
        let patch = patch_of(|_, _| 77);
        let mut out = Vec::new();
        IntensityHistogram.append(&patch, &mut out);
        // 77 / 8 = bin 9 takes all the mass.
        assert!(out[9] > 0.99);
        for (i, &v) in out.iter().enumerate() {
            if i != 9 {
                assert_eq!(v, 0.0);
            }
        }
    }

    #[test]
    fn gradients_vanish_on_a_constant_patch() {
        let patch = patch_of(|_, _| 50);
        let mut out = Vec::new();
        GradientStats.append(&patch, &mut out);
        assert_eq!(out.len(), 8);
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn horizontal_ramp_only_excites_the_horizontal_direction() {
        let patch = patch_of(|x, _| x as u8);
        let mut out = Vec::new();
        GradientStats.append(&patch, &mut out);
        // Interior response to a unit ramp is 8 per column.
        assert!(out[0] > 1.0);
        // Vertical direction sees nothing.
        assert_eq!(out[4], 0.0);
        assert_eq!(out[5], 0.0);
    }

    #[test]
    fn lbp_on_constant_patch_is_all_zero_codes() {
        let patch = patch_of(|_, _| 200);
        let mut out = Vec::new();
        LbpHistogram.append(&patch, &mut out);
        assert_eq!(out.len(), 32);
        // Strict comparison never fires, every code is zero.
        assert!(out[0] > 0.99);
        assert!(out[1..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn lbp_walk_order_follows_the_clockwise_offsets() {
        // On a left-to-right ramp only the three right-hand neighbors
        // exceed each interior pixel. Under the upper-left start those
        // are bits 2, 3 and 4, so every code is 28 and bin 3 takes the
        // whole histogram.
        let patch = patch_of(|x, _| x as u8);
        let mut out = Vec::new();
        LbpHistogram.append(&patch, &mut out);
        assert!(out[3] > 0.99);
        for (i, &v) in out.iter().enumerate() {
            if i != 3 {
                assert_eq!(v, 0.0);
            }
        }
    }

    #[test]
    fn window_block_caps_at_64_values() {
        let patch = patch_of(|x, y| ((x + y) % 256) as u8);
        let mut out = Vec::new();
        PatchStats.append(&patch, &mut out);
        assert_eq!(out.len(), 64);
    }

    #[test]
    fn window_means_track_brightness() {
        let bright = patch_of(|_, _| 240);
        let dark = patch_of(|_, _| 10);
        let mut b = Vec::new();
        let mut d = Vec::new();
        PatchStats.append(&bright, &mut b);
        PatchStats.append(&dark, &mut d);
        assert!((b[0] - 240.0).abs() < 1e-3);
        assert!((d[0] - 10.0).abs() < 1e-3);
        // Flat windows have no spread.
        assert_eq!(b[1], 0.0);
        assert_eq!(b[2], 240.0);
        assert_eq!(b[3], 240.0);
    }

    #[test]
    fn windows_emit_mean_spread_min_and_max() {
        let patch = patch_of(|x, y| (x + y) as u8);
        let mut out = Vec::new();
        PatchStats.append(&patch, &mut out);
        // First window of the x + y ramp.
        assert_eq!(out[0], 15.0);
        assert_eq!(out[2], 0.0);
        assert_eq!(out[3], 30.0);
        // Second window sits eight columns to the right.
        assert_eq!(out[4], 23.0);
        assert_eq!(out[6], 8.0);
        assert_eq!(out[7], 38.0);
        // The cap admits sixteen windows: all fifteen of the top band,
        // then the first window of the band below it.
        assert_eq!(out[58], 112.0);
        assert_eq!(out[59], 142.0);
        assert_eq!(out[62], 8.0);
        assert_eq!(out[63], 38.0);
    }
}
