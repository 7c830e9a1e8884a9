//! Delaunay triangulation of scattered planar points
//!
//! Built incrementally with the Bowyer-Watson algorithm: every new point
//! removes the triangles whose circumcircle contains it and re-fans the
//! resulting cavity from the point. A large enclosing triangle seeds the
//! construction and is stripped at the end. Stripping can also drop real
//! triangles along nearly collinear stretches of the hull, whose circumcircles
//! reach the enclosing vertices; the pockets this leaves are closed by clipping
//! every inward-turning boundary vertex, so the union of the triangles covers
//! the convex hull of the input.
//!
//! Triangles are stored counter-clockwise. `neighbors[t][k]` is the triangle
//! sharing the edge opposite vertex `k` of triangle `t`, if any.
//!
//! # References
//!
//! - Bowyer, A. (1981). Computing Dirichlet tessellations. The Computer Journal, 24(2).
//! - Watson, D.F. (1981). Computing the n-dimensional Delaunay tessellation with
//!   application to Voronoi polytopes. The Computer Journal, 24(2).

use crate::core_types::Vec2;
use nalgebra::Matrix2;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

/// Margin (in units of the point-set extent) between the data and the seed triangle
const SUPER_TRIANGLE_SCALE: f64 = 1.0e3;

/// Barycentric slack accepted when testing whether a point lies in a triangle
const CONTAINMENT_EPS: f64 = 1.0e-10;

/// Triangles with area below this fraction of the squared extent are discarded
const DEGENERATE_AREA_EPS: f64 = 1.0e-12;

#[derive(Debug, Clone, Copy)]
struct Circumcircle {
    center: Vec2,
    radius_sq: f64,
}

impl Circumcircle {
    fn of(a: Vec2, b: Vec2, c: Vec2) -> Self {
        let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
        if d == 0.0 || !d.is_finite() {
            // Collinear: treat the circle as covering the whole plane so the
            // triangle is always replaced.
            return Self {
                center: (a + b + c) / 3.0,
                radius_sq: f64::INFINITY,
            };
        }
        let a2 = a.norm_squared();
        let b2 = b.norm_squared();
        let c2 = c.norm_squared();
        let center = Vec2::new(
            (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d,
            (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d,
        );
        Self {
            center,
            radius_sq: (a - center).norm_squared(),
        }
    }

    fn contains(&self, p: Vec2) -> bool {
        (p - self.center).norm_squared() < self.radius_sq
    }
}

/// Affine map from a point to the first two barycentric coordinates of a triangle
#[derive(Debug, Clone, Copy)]
struct BarycentricTransform {
    inverse: Matrix2<f64>,
    origin: Vec2,
    min: Vec2,
    max: Vec2,
}

impl BarycentricTransform {
    fn new(a: Vec2, b: Vec2, c: Vec2) -> Option<Self> {
        let edges = Matrix2::new(a.x - c.x, b.x - c.x, a.y - c.y, b.y - c.y);
        let inverse = edges.try_inverse()?;
        Some(Self {
            inverse,
            origin: c,
            min: Vec2::new(a.x.min(b.x).min(c.x), a.y.min(b.y).min(c.y)),
            max: Vec2::new(a.x.max(b.x).max(c.x), a.y.max(b.y).max(c.y)),
        })
    }

    fn apply(&self, p: Vec2) -> [f64; 3] {
        let l = self.inverse * (p - self.origin);
        [l.x, l.y, 1.0 - l.x - l.y]
    }

    fn may_contain(&self, p: Vec2) -> bool {
        let pad = CONTAINMENT_EPS * (1.0 + (self.max - self.min).amax());
        p.x >= self.min.x - pad
            && p.x <= self.max.x + pad
            && p.y >= self.min.y - pad
            && p.y <= self.max.y + pad
    }
}

/// Delaunay triangulation with adjacency and point location
#[derive(Debug, Clone)]
pub struct Triangulation {
    points: Vec<Vec2>,
    triangles: Vec<[usize; 3]>,
    neighbors: Vec<[Option<usize>; 3]>,
    transforms: Vec<BarycentricTransform>,
}

impl Triangulation {
    /// Triangulate a set of distinct points
    ///
    /// Fewer than three points, or points that are all collinear, produce a
    /// triangulation with no triangles.
    pub fn new(points: Vec<Vec2>) -> Self {
        let triangles = if points.len() < 3 {
            Vec::new()
        } else {
            bowyer_watson(&points)
        };

        let mut kept = Vec::with_capacity(triangles.len());
        let mut transforms = Vec::with_capacity(triangles.len());
        for tri in triangles {
            if let Some(transform) =
                BarycentricTransform::new(points[tri[0]], points[tri[1]], points[tri[2]])
            {
                kept.push(tri);
                transforms.push(transform);
            }
        }

        let neighbors = build_neighbors(&kept);
        Self {
            points,
            triangles: kept,
            neighbors,
            transforms,
        }
    }

    /// Input points, in input order
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Counter-clockwise vertex triples
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Neighbours of triangle `t`, indexed by the opposite vertex slot
    pub fn neighbors(&self, t: usize) -> [Option<usize>; 3] {
        self.neighbors[t]
    }

    /// True if no triangle could be formed
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Number of triangles
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// Barycentric coordinates of `p` with respect to triangle `t`
    pub fn barycentric(&self, t: usize, p: Vec2) -> [f64; 3] {
        self.transforms[t].apply(p)
    }

    /// Centroid of triangle `t`
    pub fn centroid(&self, t: usize) -> Vec2 {
        let [a, b, c] = self.triangles[t];
        (self.points[a] + self.points[b] + self.points[c]) / 3.0
    }

    /// First triangle (in storage order) containing `p`, with its barycentric coordinates
    pub fn locate(&self, p: Vec2) -> Option<(usize, [f64; 3])> {
        self.transforms
            .iter()
            .enumerate()
            .filter(|(_, transform)| transform.may_contain(p))
            .find_map(|(t, transform)| {
                let b = transform.apply(p);
                b.iter()
                    .all(|&w| w >= -CONTAINMENT_EPS)
                    .then_some((t, b))
            })
    }

    /// For every point, the sorted list of points it shares an edge with
    pub fn vertex_neighbors(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![Vec::new(); self.points.len()];
        for &[a, b, c] in &self.triangles {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                adjacency[u].push(v);
                adjacency[v].push(u);
            }
        }
        for list in &mut adjacency {
            list.sort_unstable();
            list.dedup();
        }
        adjacency
    }
}

fn bowyer_watson(points: &[Vec2]) -> Vec<[usize; 3]> {
    let n = points.len();
    let (mut min, mut max) = (points[0], points[0]);
    for p in points {
        min = min.inf(p);
        max = max.sup(p);
    }
    let extent = (max - min).amax().max(f64::MIN_POSITIVE);
    let mid = (min + max) / 2.0;
    let span = SUPER_TRIANGLE_SCALE * extent;

    let mut all = points.to_vec();
    all.push(Vec2::new(mid.x - span, mid.y - span));
    all.push(Vec2::new(mid.x + span, mid.y - span));
    all.push(Vec2::new(mid.x, mid.y + span));

    let mut triangles: Vec<([usize; 3], Circumcircle)> = vec![(
        [n, n + 1, n + 2],
        Circumcircle::of(all[n], all[n + 1], all[n + 2]),
    )];

    for (i, &p) in points.iter().enumerate() {
        let mut cavity_edges: FxHashMap<(usize, usize), usize> = FxHashMap::default();
        let mut boundary: Vec<(usize, usize)> = Vec::new();

        triangles.retain(|(tri, circle)| {
            if circle.contains(p) {
                for k in 0..3 {
                    boundary.push((tri[k], tri[(k + 1) % 3]));
                }
                false
            } else {
                true
            }
        });

        for &(a, b) in &boundary {
            *cavity_edges.entry((a.min(b), a.max(b))).or_insert(0) += 1;
        }

        for (a, b) in boundary {
            if cavity_edges[&(a.min(b), a.max(b))] == 1 {
                triangles.push(([a, b, i], Circumcircle::of(all[a], all[b], p)));
            }
        }
    }

    let area_floor = DEGENERATE_AREA_EPS * extent * extent;
    let mut kept: Vec<[usize; 3]> = triangles
        .into_iter()
        .map(|(tri, _)| tri)
        .filter(|tri| tri.iter().all(|&v| v < n))
        .filter(|tri| signed_area(points[tri[0]], points[tri[1]], points[tri[2]]) > area_floor)
        .collect();
    fill_hull_pockets(points, &mut kept, area_floor);
    kept
}

/// Clip reflex boundary vertices until the outer boundary is convex
///
/// The boundary runs counter-clockwise, so a vertex `v` between `u` and `w`
/// turns inward when `(u, w, v)` is a positive triangle. That triangle lies
/// outside the current union and is added unless another boundary vertex
/// falls inside it.
fn fill_hull_pockets(points: &[Vec2], triangles: &mut Vec<[usize; 3]>, area_floor: f64) {
    let directed: FxHashSet<(usize, usize)> = triangles
        .iter()
        .flat_map(|tri| (0..3).map(move |k| (tri[k], tri[(k + 1) % 3])))
        .collect();

    let mut next: FxHashMap<usize, usize> = FxHashMap::default();
    for &(a, b) in &directed {
        if !directed.contains(&(b, a)) && next.insert(a, b).is_some() {
            // Boundary touches itself; leave the triangulation as built
            return;
        }
    }
    let mut prev: FxHashMap<usize, usize> = next.iter().map(|(&a, &b)| (b, a)).collect();
    if prev.len() != next.len() {
        return;
    }

    let mut added = 0;
    loop {
        let mut pending: Vec<usize> = next.keys().copied().collect();
        pending.sort_unstable();
        let before = added;

        while let Some(v) = pending.pop() {
            let (Some(&u), Some(&w)) = (prev.get(&v), next.get(&v)) else {
                continue;
            };
            if u == w {
                continue;
            }
            let (pu, pv, pw) = (points[u], points[v], points[w]);
            if signed_area(pu, pw, pv) <= area_floor {
                continue;
            }
            let blocked = next.keys().any(|&q| {
                if q == u || q == v || q == w {
                    return false;
                }
                let pq = points[q];
                signed_area(pu, pw, pq) >= 0.0
                    && signed_area(pw, pv, pq) > 0.0
                    && signed_area(pv, pu, pq) > 0.0
            });
            if blocked {
                continue;
            }

            triangles.push([u, w, v]);
            next.remove(&v);
            prev.remove(&v);
            next.insert(u, w);
            prev.insert(w, u);
            pending.push(u);
            pending.push(w);
            added += 1;
        }

        // A clip can unblock a vertex elsewhere on the boundary
        if added == before {
            break;
        }
    }

    if added > 0 {
        debug!("Closed {} hull pocket triangles", added);
    }
}

fn signed_area(a: Vec2, b: Vec2, c: Vec2) -> f64 {
    0.5 * ((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y))
}

fn build_neighbors(triangles: &[[usize; 3]]) -> Vec<[Option<usize>; 3]> {
    let mut edge_owner: FxHashMap<(usize, usize), usize> = FxHashMap::default();
    for (t, tri) in triangles.iter().enumerate() {
        for k in 0..3 {
            edge_owner.insert((tri[(k + 1) % 3], tri[(k + 2) % 3]), t);
        }
    }

    triangles
        .iter()
        .map(|tri| {
            let mut adjacent = [None; 3];
            for (k, slot) in adjacent.iter_mut().enumerate() {
                let (a, b) = (tri[(k + 1) % 3], tri[(k + 2) % 3]);
                *slot = edge_owner.get(&(b, a)).copied();
            }
            adjacent
        })
        .collect()
}
