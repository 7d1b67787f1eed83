//! Window embedding aggregation.
//!
//! Each window's frames are embedded in one provider call; the per-frame
//! vectors are averaged and the mean is renormalised to unit length.

use tracing::debug;
use vpat_embed_client::EmbeddingProvider;
use vpat_media::Window;

use crate::error::{WorkerError, WorkerResult};

/// A unit-length window embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    pub fn norm(&self) -> f64 {
        l2_norm(&self.0)
    }
}

impl AsRef<[f32]> for Embedding {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

fn l2_norm(v: &[f32]) -> f64 {
    v.iter()
        .map(|&x| f64::from(x) * f64::from(x))
        .sum::<f64>()
        .sqrt()
}

/// Arithmetic mean of `vectors`, renormalised to unit L2 norm.
///
/// Fails on empty input, ragged dimensions, or a mean with zero or
/// non-finite norm.
pub fn mean_normalized(vectors: &[Vec<f32>]) -> WorkerResult<Embedding> {
    let first = vectors
        .first()
        .ok_or_else(|| WorkerError::embedding_failed("no frame vectors to aggregate"))?;
    let dimension = first.len();
    if dimension == 0 {
        return Err(WorkerError::embedding_failed("frame vectors are empty"));
    }

    let mut sum = vec![0.0f64; dimension];
    for vector in vectors {
        if vector.len() != dimension {
            return Err(WorkerError::embedding_failed(format!(
                "frame vectors disagree in dimension: {} vs {}",
                dimension,
                vector.len()
            )));
        }
        for (acc, &x) in sum.iter_mut().zip(vector) {
            *acc += f64::from(x);
        }
    }

    let count = vectors.len() as f64;
    let mean: Vec<f64> = sum.into_iter().map(|s| s / count).collect();
    let norm = mean.iter().map(|x| x * x).sum::<f64>().sqrt();
    if !norm.is_finite() || norm == 0.0 {
        return Err(WorkerError::embedding_failed(format!(
            "mean vector has degenerate norm {}",
            norm
        )));
    }

    Ok(Embedding(mean.into_iter().map(|x| (x / norm) as f32).collect()))
}

/// Embed every window, one provider call per window, preserving order.
///
/// The first failure aborts the whole set; all embeddings share one dimension.
pub async fn embed_windows(
    windows: &[Window],
    provider: &dyn EmbeddingProvider,
) -> WorkerResult<Vec<Embedding>> {
    let mut embeddings: Vec<Embedding> = Vec::with_capacity(windows.len());

    for (index, window) in windows.iter().enumerate() {
        let vectors = provider.embed_images(&window.frames).await?;
        if vectors.len() != window.frames.len() {
            return Err(WorkerError::embedding_failed(format!(
                "window {} has {} frames but provider returned {} vectors",
                index,
                window.frames.len(),
                vectors.len()
            )));
        }

        let embedding = mean_normalized(&vectors)?;
        if let Some(first) = embeddings.first() {
            if first.dimension() != embedding.dimension() {
                return Err(WorkerError::embedding_failed(format!(
                    "window {} embedding has dimension {}, expected {}",
                    index,
                    embedding.dimension(),
                    first.dimension()
                )));
            }
        }
        embeddings.push(embedding);
    }

    debug!(
        provider = provider.name(),
        windows = embeddings.len(),
        dimension = embeddings.first().map(Embedding::dimension).unwrap_or(0),
        "Embedded windows"
    );

    Ok(embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_unit(e: &Embedding) {
        assert!((e.norm() - 1.0).abs() < 1e-5, "norm was {}", e.norm());
    }

    #[test]
    fn test_unit_norm_for_one_two_three_frames() {
        let frames = vec![vec![3.0, 4.0, 0.0], vec![0.0, 1.0, 1.0], vec![2.0, 0.0, 5.0]];
        for n in 1..=3 {
            assert_unit(&mean_normalized(&frames[..n]).unwrap());
        }
    }

    #[test]
    fn test_mean_then_normalize() {
        let e = mean_normalized(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        let expected = std::f32::consts::FRAC_1_SQRT_2;
        assert!((e.as_slice()[0] - expected).abs() < 1e-6);
        assert!((e.as_slice()[1] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_ragged_vectors() {
        let result = mean_normalized(&[vec![1.0, 0.0], vec![1.0]]);
        assert!(matches!(result, Err(WorkerError::EmbeddingFailed(_))));
    }

    #[test]
    fn test_rejects_cancelling_vectors() {
        let result = mean_normalized(&[vec![1.0, -2.0], vec![-1.0, 2.0]]);
        assert!(matches!(result, Err(WorkerError::EmbeddingFailed(_))));
    }

    #[test]
    fn test_rejects_empty_input() {
        assert!(mean_normalized(&[]).is_err());
    }
}
