//! Alpha-shape boundaries of planar point sets.
//!
//! The cluster is triangulated (Bowyer–Watson incremental Delaunay), then
//! every triangle whose circumradius reaches 1/alpha is discarded; the
//! boundary of the surviving triangles is the alpha shape. `alpha = 0`
//! keeps every triangle and degenerates to the convex hull; larger alpha
//! hugs the points tighter and may split the footprint into several loops.
//!
//! Failures here are per-cluster and recoverable; the lane extractor skips
//! the offending cluster and moves on.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

/// Why a cluster yields no boundary. Never fatal for the pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HullError {
    #[error("{0} distinct points, a boundary needs at least 3")]
    TooFewPoints(usize),

    #[error("points are collinear, no triangulation exists")]
    Collinear,

    #[error("alpha {0} filtered out every triangle")]
    AllTrianglesFiltered(f64),

    #[error("boundary edges do not close into loops")]
    OpenBoundary,
}

/// One boundary loop as an open ring; the closing vertex is appended only
/// when features are emitted.
pub type Hull = Vec<[f64; 2]>;

/// Compute the alpha-shape boundary loops of `points`.
///
/// Duplicate coordinates are collapsed first. Loops are returned with
/// counter-clockwise winding, in deterministic order for a given input.
pub fn alpha_shape(points: &[[f64; 2]], alpha: f64) -> Result<Vec<Hull>, HullError> {
    let distinct = dedup(points);
    if distinct.len() < 3 {
        return Err(HullError::TooFewPoints(distinct.len()));
    }

    let triangles = triangulate(&distinct);
    if triangles.is_empty() {
        return Err(HullError::Collinear);
    }

    let radius_limit_sq = if alpha > 0.0 {
        (1.0 / alpha) * (1.0 / alpha)
    } else {
        f64::INFINITY
    };
    let kept: Vec<&Triangle> = triangles
        .iter()
        .filter(|t| t.radius_sq < radius_limit_sq)
        .collect();
    if kept.is_empty() {
        return Err(HullError::AllTrianglesFiltered(alpha));
    }

    // An edge on the boundary belongs to exactly one kept triangle.
    let mut edge_count: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    for triangle in &kept {
        for edge in triangle.edges() {
            *edge_count.entry(edge).or_insert(0) += 1;
        }
    }
    let boundary: Vec<(usize, usize)> = edge_count
        .into_iter()
        .filter_map(|(edge, count)| (count == 1).then_some(edge))
        .collect();

    let loops = chain_loops(&boundary)?;
    Ok(loops
        .into_iter()
        .map(|ring| {
            let mut hull: Hull = ring.into_iter().map(|i| distinct[i]).collect();
            orient_ccw(&mut hull);
            hull
        })
        .collect())
}

/// Drop exact duplicate coordinates, keeping first occurrences in order.
fn dedup(points: &[[f64; 2]]) -> Vec<[f64; 2]> {
    let mut seen: BTreeSet<(u64, u64)> = BTreeSet::new();
    let mut distinct = Vec::with_capacity(points.len());
    for p in points {
        if seen.insert((p[0].to_bits(), p[1].to_bits())) {
            distinct.push(*p);
        }
    }
    distinct
}

#[derive(Debug, Clone, Copy)]
struct Triangle {
    v: [usize; 3],
    center: [f64; 2],
    radius_sq: f64,
}

impl Triangle {
    fn new(v: [usize; 3], vertices: &[[f64; 2]]) -> Self {
        let a = vertices[v[0]];
        let b = vertices[v[1]];
        let c = vertices[v[2]];
        let d = 2.0 * (a[0] * (b[1] - c[1]) + b[0] * (c[1] - a[1]) + c[0] * (a[1] - b[1]));
        if d.abs() < 1e-12 {
            // Collinear sliver: treat the circumcircle as infinite.
            return Self {
                v,
                center: [0.0, 0.0],
                radius_sq: f64::INFINITY,
            };
        }
        let a_sq = a[0] * a[0] + a[1] * a[1];
        let b_sq = b[0] * b[0] + b[1] * b[1];
        let c_sq = c[0] * c[0] + c[1] * c[1];
        let ux = (a_sq * (b[1] - c[1]) + b_sq * (c[1] - a[1]) + c_sq * (a[1] - b[1])) / d;
        let uy = (a_sq * (c[0] - b[0]) + b_sq * (a[0] - c[0]) + c_sq * (b[0] - a[0])) / d;
        let dx = a[0] - ux;
        let dy = a[1] - uy;
        Self {
            v,
            center: [ux, uy],
            radius_sq: dx * dx + dy * dy,
        }
    }

    #[inline]
    fn circumcircle_contains(&self, p: [f64; 2]) -> bool {
        if self.radius_sq.is_infinite() {
            return true;
        }
        let dx = p[0] - self.center[0];
        let dy = p[1] - self.center[1];
        dx * dx + dy * dy < self.radius_sq
    }

    /// Undirected edges with ordered endpoints.
    fn edges(&self) -> [(usize, usize); 3] {
        let e = |a: usize, b: usize| (self.v[a].min(self.v[b]), self.v[a].max(self.v[b]));
        [e(0, 1), e(1, 2), e(2, 0)]
    }
}

/// Incremental Delaunay triangulation over point indices.
///
/// A super-triangle far outside the bounding box hosts the first insertion;
/// triangles touching it are stripped at the end, so a fully collinear
/// input comes back empty.
fn triangulate(points: &[[f64; 2]]) -> Vec<Triangle> {
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in points {
        min_x = min_x.min(p[0]);
        min_y = min_y.min(p[1]);
        max_x = max_x.max(p[0]);
        max_y = max_y.max(p[1]);
    }
    let span = (max_x - min_x).max(max_y - min_y).max(1.0);
    let cx = (min_x + max_x) / 2.0;
    let cy = (min_y + max_y) / 2.0;

    let mut vertices: Vec<[f64; 2]> = points.to_vec();
    let base = vertices.len();
    vertices.push([cx - 20.0 * span, cy - 10.0 * span]);
    vertices.push([cx + 20.0 * span, cy - 10.0 * span]);
    vertices.push([cx, cy + 20.0 * span]);

    let mut triangles = vec![Triangle::new([base, base + 1, base + 2], &vertices)];

    for p in 0..base {
        let point = vertices[p];
        let mut bad = Vec::new();
        let mut kept = Vec::new();
        for triangle in triangles {
            if triangle.circumcircle_contains(point) {
                bad.push(triangle);
            } else {
                kept.push(triangle);
            }
        }

        // The cavity boundary: edges of bad triangles not shared by two of
        // them. Retriangulate the cavity as a fan around the new point.
        let mut cavity: BTreeMap<(usize, usize), usize> = BTreeMap::new();
        for triangle in &bad {
            for edge in triangle.edges() {
                *cavity.entry(edge).or_insert(0) += 1;
            }
        }
        triangles = kept;
        for ((a, b), count) in cavity {
            if count == 1 {
                triangles.push(Triangle::new([a, b, p], &vertices));
            }
        }
    }

    triangles.retain(|t| t.v.iter().all(|&v| v < base));
    triangles
}

/// Chain undirected boundary edges into closed loops.
fn chain_loops(edges: &[(usize, usize)]) -> Result<Vec<Vec<usize>>, HullError> {
    let mut adjacency: BTreeMap<usize, Vec<(usize, usize)>> = BTreeMap::new();
    for (index, &(a, b)) in edges.iter().enumerate() {
        adjacency.entry(a).or_default().push((b, index));
        adjacency.entry(b).or_default().push((a, index));
    }
    for list in adjacency.values_mut() {
        list.sort_unstable();
    }

    let mut used = vec![false; edges.len()];
    let mut loops = Vec::new();

    for start_edge in 0..edges.len() {
        if used[start_edge] {
            continue;
        }
        let (start, mut current) = edges[start_edge];
        used[start_edge] = true;
        let mut ring = vec![start];

        while current != start {
            ring.push(current);
            let next = adjacency
                .get(&current)
                .and_then(|list| list.iter().find(|&&(_, e)| !used[e]));
            match next {
                Some(&(neighbor, edge)) => {
                    used[edge] = true;
                    current = neighbor;
                }
                None => return Err(HullError::OpenBoundary),
            }
        }
        if ring.len() < 3 {
            return Err(HullError::OpenBoundary);
        }
        loops.push(ring);
    }
    Ok(loops)
}

/// Flip a ring to counter-clockwise winding if needed.
fn orient_ccw(hull: &mut Hull) {
    let mut area2 = 0.0;
    for i in 0..hull.len() {
        let a = hull[i];
        let b = hull[(i + 1) % hull.len()];
        area2 += a[0] * b[1] - b[0] * a[1];
    }
    if area2 < 0.0 {
        hull.reverse();
    }
}
