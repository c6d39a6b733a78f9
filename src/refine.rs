//! Refinement engines that turn seeded centers into converged ones

use crate::error::SeedError;
use crate::seeding::{euclidean_distance, seeded_rng, RANDOM_SEED};
use linfa::prelude::*;
use linfa_clustering::{KMeans, KMeansInit};
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2, Axis};
use tracing::{debug, info};

/// Iterative refinement consuming the seeded centers.
///
/// Implementations return `initial.nrows()` centers of the same
/// dimensionality. The pipeline does not check convergence itself.
pub trait Refiner {
    fn refine(
        &self,
        points: &Array2<f64>,
        initial: &Array2<f64>,
        max_iter: usize,
        eps: f64,
    ) -> crate::Result<Array2<f64>>;
}

/// Plain Lloyd iterations: assign to the nearest center, move each center to
/// the mean of its points, stop once no center moves by `eps` or more.
#[derive(Debug, Clone, Copy, Default)]
pub struct LloydRefiner;

impl Refiner for LloydRefiner {
    fn refine(
        &self,
        points: &Array2<f64>,
        initial: &Array2<f64>,
        max_iter: usize,
        eps: f64,
    ) -> crate::Result<Array2<f64>> {
        check_shapes(points, initial)?;

        let mut centroids = initial.clone();
        let mut iterations = 0;
        let mut converged = false;

        while !converged && iterations < max_iter {
            iterations += 1;

            let labels = assign_labels(points, &centroids);
            let updated = update_centroids(points, &labels, &centroids);

            converged = centroids
                .outer_iter()
                .zip(updated.outer_iter())
                .all(|(old, new)| euclidean_distance(&old, &new) < eps);
            centroids = updated;
        }

        let inertia = compute_inertia(points, &assign_labels(points, &centroids), &centroids);
        info!(iterations, converged, inertia, "lloyd refinement finished");

        Ok(centroids)
    }
}

/// Delegates to linfa's K-Means, started from the seeded centers
#[derive(Debug, Clone, Copy, Default)]
pub struct LinfaRefiner;

impl Refiner for LinfaRefiner {
    fn refine(
        &self,
        points: &Array2<f64>,
        initial: &Array2<f64>,
        max_iter: usize,
        eps: f64,
    ) -> crate::Result<Array2<f64>> {
        check_shapes(points, initial)?;

        // Dummy targets for unsupervised learning
        let targets: Array1<usize> = Array1::zeros(points.nrows());
        let dataset = Dataset::new(points.clone(), targets);

        let model = KMeans::params_with(initial.nrows(), seeded_rng(RANDOM_SEED), L2Dist)
            .n_runs(1)
            .init_method(KMeansInit::Precomputed(initial.clone()))
            .max_n_iterations(max_iter as u64)
            .tolerance(eps)
            .fit(&dataset)
            .map_err(|err| SeedError::Refinement(err.to_string()))?;

        let centroids = model.centroids().clone();
        let inertia = compute_inertia(points, &assign_labels(points, &centroids), &centroids);
        info!(inertia, "linfa refinement finished");

        Ok(centroids)
    }
}

fn check_shapes(points: &Array2<f64>, initial: &Array2<f64>) -> crate::Result<()> {
    if initial.nrows() == 0 {
        return Err(SeedError::Refinement("no initial centers".into()));
    }
    if points.nrows() == 0 {
        return Err(SeedError::Refinement("no points to refine against".into()));
    }
    if initial.ncols() != points.ncols() {
        return Err(SeedError::Refinement(format!(
            "centers have dimension {}, points have dimension {}",
            initial.ncols(),
            points.ncols()
        )));
    }
    Ok(())
}

/// Index of the nearest center for every point; ties go to the lower index.
fn assign_labels(points: &Array2<f64>, centroids: &Array2<f64>) -> Array1<usize> {
    points
        .outer_iter()
        .map(|point| {
            let mut min_distance = f64::INFINITY;
            let mut closest_cluster = 0;

            for (cluster_idx, centroid) in centroids.outer_iter().enumerate() {
                let distance = euclidean_distance(&point, &centroid);
                if distance < min_distance {
                    min_distance = distance;
                    closest_cluster = cluster_idx;
                }
            }

            closest_cluster
        })
        .collect()
}

/// Mean of each cluster's points. An empty cluster keeps its previous center.
fn update_centroids(
    points: &Array2<f64>,
    labels: &Array1<usize>,
    previous: &Array2<f64>,
) -> Array2<f64> {
    let mut sums = Array2::<f64>::zeros(previous.raw_dim());
    let mut counts = vec![0usize; previous.nrows()];

    for (point, &label) in points.outer_iter().zip(labels.iter()) {
        let mut sum = sums.row_mut(label);
        sum += &point;
        counts[label] += 1;
    }

    for (cluster, (mut sum, &count)) in sums.axis_iter_mut(Axis(0)).zip(&counts).enumerate() {
        if count == 0 {
            debug!(cluster, "empty cluster keeps its previous center");
            sum.assign(&previous.row(cluster));
        } else {
            sum /= count as f64;
        }
    }

    sums
}

/// Compute within-cluster sum of squares (inertia)
fn compute_inertia(features: &Array2<f64>, labels: &Array1<usize>, centroids: &Array2<f64>) -> f64 {
    let mut inertia = 0.0;

    for (i, &cluster) in labels.iter().enumerate() {
        if cluster < centroids.nrows() {
            let point = features.row(i);
            let centroid = centroids.row(cluster);
            let distance_sq = point
                .iter()
                .zip(centroid.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>();
            inertia += distance_sq;
        }
    }

    inertia
}
