//! K-Means++ seeding: distance-weighted sampling of initial centers

use crate::data::FeatureMatrix;
use crate::error::SeedError;
use clap::ValueEnum;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Fixed seed so that repeated runs over the same data pick the same centers.
pub const RANDOM_SEED: u64 = 0;

/// Fresh random source for one seeding run.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// How a point's nearest-center distance becomes its sampling weight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum DistanceWeighting {
    /// Weight by the plain Euclidean distance
    #[default]
    Linear,
    /// Weight by the squared distance, as in Arthur & Vassilvitskii
    Squared,
}

impl DistanceWeighting {
    fn weight(self, distance: f64) -> f64 {
        match self {
            DistanceWeighting::Linear => distance,
            DistanceWeighting::Squared => distance * distance,
        }
    }
}

/// Centers chosen by the seeder, in selection order
#[derive(Debug, Clone, PartialEq)]
pub struct CentroidSet {
    /// Original join key of the row each center was copied from
    pub keys: Vec<i64>,
    /// Row index of each center in the feature matrix
    pub rows: Vec<usize>,
    /// Center coordinates (k, d)
    pub centroids: Array2<f64>,
}

impl CentroidSet {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// K-means++ seeder configuration
#[derive(Debug, Clone, Copy)]
pub struct KMeansPlusPlus {
    n_clusters: usize,
    weighting: DistanceWeighting,
}

impl KMeansPlusPlus {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            weighting: DistanceWeighting::default(),
        }
    }

    pub fn weighting(mut self, weighting: DistanceWeighting) -> Self {
        self.weighting = weighting;
        self
    }

    /// Pick `n_clusters` distinct rows of `matrix`
    ///
    /// The first center is drawn uniformly; every further center is drawn
    /// with probability proportional to the weight of its distance to the
    /// nearest center chosen so far. Rows lying on a chosen center weigh zero
    /// and are never drawn again.
    ///
    /// # Errors
    /// * `InvalidClusterCount` unless `1 <= n_clusters <= n_points`
    /// * `DegenerateDistribution` when every remaining weight is zero, i.e.
    ///   the data holds fewer distinct points than `n_clusters`
    /// * `WeightOverflow` when the weights do not sum to a finite value
    pub fn seed<R: Rng>(
        &self,
        matrix: &FeatureMatrix,
        rng: &mut R,
    ) -> crate::Result<CentroidSet> {
        let n = matrix.n_points();
        let k = self.n_clusters;
        if k == 0 || k > n {
            return Err(SeedError::InvalidClusterCount { k, n });
        }

        let mut rows = Vec::with_capacity(k);
        let first = rng.gen_range(0..n);
        debug!(center = 0, row = first, key = matrix.keys[first], "chose uniform center");
        rows.push(first);

        while rows.len() < k {
            let weights = nearest_center_distances(matrix.features.view(), &rows)
                .mapv_into(|distance| self.weighting.weight(distance));

            let total: f64 = weights.sum();
            if !total.is_finite() {
                return Err(SeedError::WeightOverflow {
                    chosen: rows.len(),
                    requested: k,
                });
            }
            if total <= 0.0 {
                return Err(SeedError::DegenerateDistribution {
                    chosen: rows.len(),
                    requested: k,
                });
            }

            // rand panics on an infinite total, so this must follow the check above.
            let distribution = WeightedIndex::new(weights.iter()).map_err(|_| {
                SeedError::DegenerateDistribution {
                    chosen: rows.len(),
                    requested: k,
                }
            })?;
            let row = distribution.sample(rng);
            debug!(
                center = rows.len(),
                row,
                key = matrix.keys[row],
                probability = weights[row] / total,
                "chose weighted center"
            );
            rows.push(row);
        }

        let keys = rows.iter().map(|&row| matrix.keys[row]).collect();
        let centroids = matrix.features.select(ndarray::Axis(0), &rows);

        Ok(CentroidSet {
            keys,
            rows,
            centroids,
        })
    }
}

/// Distance from every point to its nearest chosen center.
///
/// Recomputed from scratch for each draw: O(N * |centers| * d).
pub fn nearest_center_distances(points: ArrayView2<f64>, centers: &[usize]) -> Array1<f64> {
    points
        .outer_iter()
        .map(|point| {
            centers
                .iter()
                .map(|&center| euclidean_distance(&point, &points.row(center)))
                .fold(f64::INFINITY, f64::min)
        })
        .collect()
}

/// Calculate Euclidean distance between two points
///
/// Differences are scaled by the largest one before squaring, so the result
/// stays finite whenever every coordinate difference is finite.
pub fn euclidean_distance(point1: &ArrayView1<f64>, point2: &ArrayView1<f64>) -> f64 {
    let scale = point1
        .iter()
        .zip(point2.iter())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max);
    if scale == 0.0 || !scale.is_finite() {
        return scale;
    }

    let sum_sq = point1
        .iter()
        .zip(point2.iter())
        .map(|(a, b)| ((a - b) / scale).powi(2))
        .sum::<f64>();
    scale * sum_sq.sqrt()
}
