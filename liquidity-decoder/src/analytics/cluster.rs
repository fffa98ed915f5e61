//! One-dimensional k-means clustering of pivot prices into liquidity zones.
//!
//! Lloyd's algorithm seeded with k-means++ and restarted several times from a deterministic
//! [`StdRng`]; the restart with the lowest inertia (total within-cluster squared distance)
//! wins. The same input and seed always produce the same centroids.

use crate::{
    config::ScannerConfig,
    error::{Branch, ScanError},
    types::{LiquidityPool, Strength, ZoneType},
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::debug;

/// Result of a single k-means fit.
#[derive(Clone, Debug, PartialEq)]
pub struct Clustering {
    /// Cluster centroids in ascending price order.
    pub centroids: Vec<f64>,
    /// Total within-cluster squared distance to centroid.
    pub inertia: f64,
    /// Lloyd iterations used by the winning restart.
    pub iterations: usize,
}

/// Groups pivot prices into a fixed number of price zones.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterEngine {
    clusters: usize,
    restarts: usize,
    max_iterations: usize,
    seed: u64,
    min_points: usize,
}

impl Default for ClusterEngine {
    fn default() -> Self {
        Self::from_config(&ScannerConfig::default())
    }
}

impl ClusterEngine {
    pub fn new(
        clusters: usize,
        restarts: usize,
        max_iterations: usize,
        seed: u64,
        min_points: usize,
    ) -> Self {
        Self {
            clusters,
            restarts,
            max_iterations,
            seed,
            min_points,
        }
    }

    pub fn from_config(config: &ScannerConfig) -> Self {
        Self::new(
            config.cluster_count,
            config.cluster_restarts,
            config.cluster_max_iterations,
            config.cluster_seed,
            config.min_pivots,
        )
    }

    /// Cluster `prices` into liquidity pools classified against the current `bid`.
    ///
    /// Returns at most `clusters` pools sorted by price descending. Centroids that collapse
    /// onto the same price are reported once.
    pub fn liquidity_pools(
        &self,
        prices: &[f64],
        bid: f64,
    ) -> Result<Vec<LiquidityPool>, ScanError> {
        if prices.len() < self.min_points {
            return Err(ScanError::InsufficientSamples {
                branch: Branch::LiquidityPools,
                required: self.min_points,
                actual: prices.len(),
            });
        }

        let clustering = self.fit(prices)?;
        debug!(
            centroids = clustering.centroids.len(),
            inertia = clustering.inertia,
            iterations = clustering.iterations,
            "pivot clustering converged"
        );

        let mut pools: Vec<LiquidityPool> = clustering
            .centroids
            .into_iter()
            .rev()
            .map(|price| LiquidityPool {
                price,
                zone_type: ZoneType::classify(price, bid),
                strength: Strength::High,
            })
            .collect();
        pools.dedup_by(|a, b| a.price == b.price);

        Ok(pools)
    }

    /// Fit `clusters` centroids to `points`, keeping the best of `restarts` runs.
    pub fn fit(&self, points: &[f64]) -> Result<Clustering, ScanError> {
        if self.clusters == 0 {
            return Err(computation_failure("cluster count must be non-zero"));
        }
        if points.len() < self.clusters {
            return Err(ScanError::InsufficientSamples {
                branch: Branch::LiquidityPools,
                required: self.clusters,
                actual: points.len(),
            });
        }
        if points.iter().any(|point| !point.is_finite()) {
            return Err(computation_failure("non-finite pivot price"));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<Clustering> = None;

        for _ in 0..self.restarts.max(1) {
            let seeds = init_plus_plus(points, self.clusters, &mut rng);
            let candidate = lloyd(points, seeds, self.max_iterations);

            if best
                .as_ref()
                .is_none_or(|current| candidate.inertia < current.inertia)
            {
                best = Some(candidate);
            }
        }

        best.ok_or_else(|| computation_failure("no clustering restart completed"))
    }
}

fn computation_failure(reason: &str) -> ScanError {
    ScanError::ComputationFailure {
        branch: Branch::LiquidityPools,
        reason: reason.to_string(),
    }
}

/// k-means++ seeding: first centroid uniform, subsequent ones weighted by squared distance
/// to the closest centroid chosen so far.
fn init_plus_plus(points: &[f64], clusters: usize, rng: &mut StdRng) -> Vec<f64> {
    let mut centroids = Vec::with_capacity(clusters);
    centroids.push(points[rng.random_range(0..points.len())]);

    let mut distances: Vec<f64> = points
        .iter()
        .map(|point| (point - centroids[0]).powi(2))
        .collect();

    while centroids.len() < clusters {
        let total: f64 = distances.iter().sum();

        let next = if total > 0.0 {
            let target = rng.random::<f64>() * total;
            let mut cumulative = 0.0;
            distances
                .iter()
                .position(|distance| {
                    cumulative += distance;
                    cumulative > target
                })
                .unwrap_or(points.len() - 1)
        } else {
            // Every point already coincides with a centroid
            rng.random_range(0..points.len())
        };

        let centroid = points[next];
        centroids.push(centroid);
        for (distance, point) in distances.iter_mut().zip(points) {
            *distance = distance.min((point - centroid).powi(2));
        }
    }

    centroids
}

/// Lloyd iterations until no point changes cluster or `max_iterations` is reached.
fn lloyd(points: &[f64], mut centroids: Vec<f64>, max_iterations: usize) -> Clustering {
    let mut assignments = vec![usize::MAX; points.len()];
    let mut iterations = 0;

    while iterations < max_iterations.max(1) {
        iterations += 1;

        let mut changed = false;
        for (assignment, point) in assignments.iter_mut().zip(points) {
            let nearest = nearest_centroid(*point, &centroids);
            if *assignment != nearest {
                *assignment = nearest;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        let mut sums = vec![0.0; centroids.len()];
        let mut counts = vec![0usize; centroids.len()];
        for (assignment, point) in assignments.iter().zip(points) {
            sums[*assignment] += point;
            counts[*assignment] += 1;
        }

        // Empty clusters keep their previous centroid
        for ((centroid, sum), count) in centroids.iter_mut().zip(sums).zip(counts) {
            if count > 0 {
                *centroid = sum / count as f64;
            }
        }
    }

    let inertia = assignments
        .iter()
        .zip(points)
        .map(|(assignment, point)| (point - centroids[*assignment]).powi(2))
        .sum();

    centroids.sort_by(f64::total_cmp);

    Clustering {
        centroids,
        inertia,
        iterations,
    }
}

/// Index of the closest centroid, lowest index on ties.
fn nearest_centroid(point: f64, centroids: &[f64]) -> usize {
    centroids
        .iter()
        .enumerate()
        .fold((0, f64::INFINITY), |(best, best_distance), (index, centroid)| {
            let distance = (point - centroid).abs();
            if distance < best_distance {
                (index, distance)
            } else {
                (best, best_distance)
            }
        })
        .0
}
