//! Density-based clustering of lane-paint candidate points.
//!
//! DBSCAN over x/y/z with a k-d tree for the neighborhood queries. A point
//! with at least `min_points` neighbors within `eps` (itself included) is a
//! core point; clusters grow outward from core points, anything unreachable
//! is labeled noise. Neighbor lists are sorted by point index so repeated
//! runs over the same input produce identical labels.

use std::collections::VecDeque;

use kiddo::{KdTree, SquaredEuclidean};

use crate::core::types::PointCloud;
use crate::error::{MargaError, Result};

/// Label given to unreachable points.
pub const NOISE: i64 = -1;

const UNVISITED: i64 = -2;

/// DBSCAN cluster labels for every point of `cloud`.
///
/// Labels are `0..k` in order of cluster discovery, [`NOISE`] for
/// unreachable points. `min_points` counts the query point itself.
///
/// # Errors
/// `InvalidParameter` for `eps ≤ 0` or `min_points < 1`.
pub fn cluster_dbscan(cloud: &PointCloud, eps: f64, min_points: usize) -> Result<Vec<i64>> {
    if eps <= 0.0 {
        return Err(MargaError::InvalidParameter {
            name: "eps",
            reason: format!("must be positive, got {eps}"),
        });
    }
    if min_points < 1 {
        return Err(MargaError::InvalidParameter {
            name: "min_points",
            reason: "must be at least 1".to_string(),
        });
    }
    if cloud.is_empty() {
        return Ok(Vec::new());
    }

    let mut tree: KdTree<f64, 3> = KdTree::new();
    for i in 0..cloud.len() {
        tree.add(&cloud.xyz(i), i as u64);
    }

    // Neighborhoods include the query point; sorted for stable expansion.
    let eps_sq = eps * eps;
    let neighborhoods: Vec<Vec<usize>> = (0..cloud.len())
        .map(|i| {
            let mut neighbors: Vec<usize> = tree
                .within_unsorted::<SquaredEuclidean>(&cloud.xyz(i), eps_sq)
                .into_iter()
                .map(|n| n.item as usize)
                .collect();
            neighbors.sort_unstable();
            neighbors
        })
        .collect();

    let mut labels = vec![UNVISITED; cloud.len()];
    let mut cluster_id: i64 = 0;

    for i in 0..cloud.len() {
        if labels[i] != UNVISITED {
            continue;
        }
        if neighborhoods[i].len() < min_points {
            labels[i] = NOISE;
            continue;
        }

        labels[i] = cluster_id;
        let mut queue: VecDeque<usize> = neighborhoods[i].iter().copied().collect();
        while let Some(j) = queue.pop_front() {
            if labels[j] == NOISE {
                // Border point reached from a core point.
                labels[j] = cluster_id;
                continue;
            }
            if labels[j] != UNVISITED {
                continue;
            }
            labels[j] = cluster_id;
            if neighborhoods[j].len() >= min_points {
                queue.extend(neighborhoods[j].iter().copied());
            }
        }
        cluster_id += 1;
    }

    Ok(labels)
}

/// Split a labeled cloud into per-cluster clouds, noise dropped.
///
/// Cluster `c` ends up at index `c`; all four channels are carried.
pub fn split_clusters(cloud: &PointCloud, labels: &[i64]) -> Vec<PointCloud> {
    let cluster_count = labels.iter().copied().max().map_or(0, |m| (m + 1).max(0)) as usize;
    let mut clusters = vec![PointCloud::new(); cluster_count];
    for (i, &label) in labels.iter().enumerate() {
        if label >= 0 {
            clusters[label as usize].push(cloud.point_at(i));
        }
    }
    clusters
}
