use anyhow::Result;
use image::RgbImage;

/// Vector length produced by the learned embedding capability.
pub const EMBEDDING_LEN: usize = 128;

/// Learned face embedder. One embedding per detected face, detection order.
pub trait EmbeddingBackend {
    fn embeddings(&mut self, img: &RgbImage) -> Result<Vec<Vec<f32>>>;
}

/// Straight-line distance, the native metric of the learned embedding space.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        let v = vec![0.25, -1.5, 3.0];
        assert_eq!(euclidean_distance(&v, &v), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![4.0, 6.0, 3.0];
        assert_eq!(euclidean_distance(&a, &b), euclidean_distance(&b, &a));
        assert!((euclidean_distance(&a, &b) - 5.0).abs() < 1e-6);
    }
}
