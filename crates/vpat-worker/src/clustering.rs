//! Seeded k-means clustering of window embeddings.
//!
//! k-means++ initialisation from a fixed seed followed by Lloyd iterations.
//! Identical input and seed always yield identical labels.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::{WorkerError, WorkerResult};

pub const MIN_CLUSTERS: usize = 4;
pub const MAX_CLUSTERS: usize = 12;
/// Windows per cluster before the cluster count grows.
pub const WINDOWS_PER_CLUSTER: usize = 8;

/// Cluster count for `window_count` windows: `clamp(n / 8, 4, 12)`.
pub fn choose_k(window_count: usize) -> usize {
    (window_count / WINDOWS_PER_CLUSTER).clamp(MIN_CLUSTERS, MAX_CLUSTERS)
}

#[derive(Debug, Clone, PartialEq)]
pub struct KMeansConfig {
    pub seed: u64,
    pub max_iterations: usize,
    /// Stop once no centroid moves further than this (squared distance)
    pub tolerance: f64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_iterations: 300,
            tolerance: 1e-8,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct KMeans {
    config: KMeansConfig,
}

impl KMeans {
    pub fn new(config: KMeansConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }

    /// Assign each point a label in `[0, k)`.
    ///
    /// Every label in `[0, k)` is used at least once.
    pub fn fit<P: AsRef<[f32]>>(&self, points: &[P], k: usize) -> WorkerResult<Vec<usize>> {
        let n = points.len();
        if k == 0 || n < k {
            return Err(WorkerError::InsufficientData {
                points: n,
                clusters: k,
            });
        }

        let data = to_f64(points)?;
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut centroids = init_plus_plus(&data, k, &mut rng);
        let mut labels = vec![usize::MAX; n];

        let mut iterations = 0;
        for _ in 0..self.config.max_iterations.max(1) {
            iterations += 1;
            let mut changed = assign(&data, &centroids, &mut labels);
            changed |= fill_empty_clusters(&data, &mut centroids, &mut labels);
            let shift = update_centroids(&data, &labels, &mut centroids);

            if !changed || shift <= self.config.tolerance {
                break;
            }
        }

        debug!(points = n, k, iterations, "k-means converged");
        Ok(labels)
    }
}

fn to_f64<P: AsRef<[f32]>>(points: &[P]) -> WorkerResult<Vec<Vec<f64>>> {
    let dimension = points.first().map(|p| p.as_ref().len()).unwrap_or(0);
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let p = p.as_ref();
            if p.len() != dimension {
                return Err(WorkerError::internal(format!(
                    "point {} has dimension {}, expected {}",
                    i,
                    p.len(),
                    dimension
                )));
            }
            Ok(p.iter().map(|&x| f64::from(x)).collect())
        })
        .collect()
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index of the nearest centroid; ties go to the lower index.
fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (c, centroid) in centroids.iter().enumerate() {
        let d = squared_distance(point, centroid);
        if d < best.1 {
            best = (c, d);
        }
    }
    best
}

/// k-means++: each new centroid is drawn with probability proportional to
/// its squared distance from the closest centroid chosen so far.
fn init_plus_plus(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = data.len();
    let mut chosen = vec![false; n];
    let first = rng.random_range(0..n);
    chosen[first] = true;

    let mut centroids = Vec::with_capacity(k);
    centroids.push(data[first].clone());
    let mut min_dist: Vec<f64> = data
        .iter()
        .map(|p| squared_distance(p, &data[first]))
        .collect();

    while centroids.len() < k {
        let total: f64 = min_dist.iter().sum();
        let next = if total > 0.0 {
            let target = rng.random::<f64>() * total;
            let mut acc = 0.0;
            let mut pick = None;
            for (i, &d) in min_dist.iter().enumerate() {
                if d <= 0.0 {
                    continue;
                }
                acc += d;
                pick = Some(i);
                if acc >= target {
                    break;
                }
            }
            pick
        } else {
            None
        };

        // All remaining points coincide with a centroid.
        let next = next
            .or_else(|| chosen.iter().position(|&c| !c))
            .unwrap_or(0);

        chosen[next] = true;
        let centroid = data[next].clone();
        for (d, p) in min_dist.iter_mut().zip(data) {
            *d = d.min(squared_distance(p, &centroid));
        }
        centroids.push(centroid);
    }

    centroids
}

fn assign(data: &[Vec<f64>], centroids: &[Vec<f64>], labels: &mut [usize]) -> bool {
    let mut changed = false;
    for (point, label) in data.iter().zip(labels.iter_mut()) {
        let (c, _) = nearest(point, centroids);
        if *label != c {
            *label = c;
            changed = true;
        }
    }
    changed
}

/// Re-seed each empty cluster with the point farthest from its own centroid,
/// taken from a cluster that can spare it.
fn fill_empty_clusters(
    data: &[Vec<f64>],
    centroids: &mut [Vec<f64>],
    labels: &mut [usize],
) -> bool {
    let k = centroids.len();
    let mut counts = vec![0usize; k];
    for &label in labels.iter() {
        counts[label] += 1;
    }

    let mut changed = false;
    for empty in 0..k {
        if counts[empty] > 0 {
            continue;
        }

        let mut donor: Option<(usize, f64)> = None;
        for (i, point) in data.iter().enumerate() {
            let current = labels[i];
            if counts[current] <= 1 {
                continue;
            }
            let d = squared_distance(point, &centroids[current]);
            if donor.map_or(true, |(_, best)| d > best) {
                donor = Some((i, d));
            }
        }

        // n >= k guarantees a donor while any cluster is empty.
        if let Some((i, _)) = donor {
            counts[labels[i]] -= 1;
            labels[i] = empty;
            counts[empty] = 1;
            centroids[empty] = data[i].clone();
            changed = true;
        }
    }
    changed
}

/// Move centroids to their members' mean; returns the largest squared shift.
fn update_centroids(data: &[Vec<f64>], labels: &[usize], centroids: &mut [Vec<f64>]) -> f64 {
    let k = centroids.len();
    let dimension = centroids.first().map(Vec::len).unwrap_or(0);
    let mut sums = vec![vec![0.0f64; dimension]; k];
    let mut counts = vec![0usize; k];

    for (point, &label) in data.iter().zip(labels) {
        counts[label] += 1;
        for (acc, x) in sums[label].iter_mut().zip(point) {
            *acc += x;
        }
    }

    let mut max_shift: f64 = 0.0;
    for ((centroid, sum), &count) in centroids.iter_mut().zip(sums).zip(&counts) {
        if count == 0 {
            continue;
        }
        let updated: Vec<f64> = sum.into_iter().map(|s| s / count as f64).collect();
        max_shift = max_shift.max(squared_distance(centroid, &updated));
        *centroid = updated;
    }
    max_shift
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn blobs() -> Vec<Vec<f32>> {
        let centers = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.6, 0.6, 0.5]];
        let mut points = Vec::new();
        for (c, center) in centers.iter().enumerate() {
            for j in 0..5 {
                let jitter = 0.01 * (j as f32 - 2.0) * (c as f32 + 1.0);
                points.push(vec![center[0] + jitter, center[1] - jitter, center[2]]);
            }
        }
        points
    }

    #[test]
    fn test_choose_k() {
        assert_eq!(choose_k(10), 4);
        assert_eq!(choose_k(32), 4);
        assert_eq!(choose_k(64), 8);
        assert_eq!(choose_k(96), 12);
        assert_eq!(choose_k(200), 12);
    }

    #[test]
    fn test_separates_well_spread_blobs() {
        let points = blobs();
        let labels = KMeans::default().fit(&points, 4).unwrap();

        assert_eq!(labels.len(), points.len());
        for blob in labels.chunks(5) {
            assert!(blob.iter().all(|&l| l == blob[0]));
        }
        let distinct: BTreeSet<_> = labels.iter().collect();
        assert_eq!(distinct.len(), 4);
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let points = blobs();
        let kmeans = KMeans::new(KMeansConfig {
            seed: 7,
            ..KMeansConfig::default()
        });
        let a = kmeans.fit(&points, 5).unwrap();
        let b = kmeans.fit(&points, 5).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_labels_in_range_and_all_used() {
        // Only two distinct locations but four clusters requested.
        let mut points = vec![vec![0.0f32, 0.0]; 6];
        points.extend(vec![vec![1.0f32, 1.0]; 6]);

        let labels = KMeans::default().fit(&points, 4).unwrap();
        assert!(labels.iter().all(|&l| l < 4));
        let distinct: BTreeSet<_> = labels.iter().collect();
        assert_eq!(distinct.len(), 4);
    }

    #[test]
    fn test_insufficient_data() {
        let points = vec![vec![0.0f32, 1.0]; 3];
        let err = KMeans::default().fit(&points, 4).unwrap_err();
        assert!(matches!(
            err,
            WorkerError::InsufficientData {
                points: 3,
                clusters: 4
            }
        ));
        assert!(KMeans::default().fit(&points, 0).is_err());
    }

    #[test]
    fn test_rejects_ragged_points() {
        let points = vec![vec![0.0f32, 1.0], vec![1.0f32]];
        assert!(matches!(
            KMeans::default().fit(&points, 1),
            Err(WorkerError::Internal(_))
        ));
    }
}
