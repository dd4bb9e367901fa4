//! Quickhull in `D` dimensions
//!
//! Based on:
//! - Barber, C.B., Dobkin, D.P., and Huhdanpaa, H.T., "The Quickhull algorithm
//!   for convex hulls," ACM Trans. on Mathematical Software, 22(4):469-483, 1996.
//!
//! The same code builds the 3-D hull of ternary systems and the 4-D hull of
//! quaternary systems. Facets are `D`-vertex simplices; the horizon between
//! visible and hidden facets is made of ridges (`D - 1` vertices).
//!
//! Implementation notes:
//! - Parallel outside-set assignment with rayon above a threshold
//! - Faces are flagged as deleted and compacted lazily
//! - Furthest outside point cached per face
//! - Horizon ridges are sorted before new faces are created, so the output
//!   only depends on the input points

use crate::error::{PhaseHullError, Result};
use crate::geometry::{
    affine_residual, centroid, deduplicate_points, distance, dot, find_extreme_points,
    hyperplane_normal, relative_epsilon, scale, simplex_volume, sub, try_normalize,
};
use rayon::prelude::*;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Tuning knobs for hull construction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuickhullOptions {
    /// Base tolerance, scaled by the magnitude of the input
    pub epsilon: f64,
    /// Upper bound on the number of expansion steps
    pub max_iterations: usize,
    /// Use rayon for the initial assignment of outside points
    pub parallel: bool,
    /// Minimum number of points before parallel assignment kicks in
    pub parallel_threshold: usize,
}

impl Default for QuickhullOptions {
    fn default() -> Self {
        Self {
            epsilon: crate::EPSILON,
            max_iterations: 100_000,
            parallel: true,
            parallel_threshold: 100,
        }
    }
}

/// One facet of a full convex hull
#[derive(Debug, Clone, PartialEq)]
pub struct RawFacet<const D: usize> {
    /// Indices into [`ConvexHull::points`]
    pub vertices: [usize; D],
    /// Outward unit normal
    pub normal: [f64; D],
    /// Plane offset: `normal · x = offset` on the facet
    pub offset: f64,
}

impl<const D: usize> RawFacet<D> {
    /// Signed distance of a point to the facet plane (positive = outside)
    pub fn signed_distance(&self, point: &[f64; D]) -> f64 {
        dot(&self.normal, point) - self.offset
    }
}

/// Full convex hull of a point set
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexHull<const D: usize> {
    /// Deduplicated input points
    pub points: Vec<[f64; D]>,
    /// For each point in `points`, its index in the original input
    pub sources: Vec<usize>,
    /// Hull facets
    pub facets: Vec<RawFacet<D>>,
    /// Tolerance actually used (scale-aware)
    pub epsilon: f64,
}

impl<const D: usize> ConvexHull<D> {
    /// Number of facets
    pub fn num_facets(&self) -> usize {
        self.facets.len()
    }

    /// Enclosed `D`-volume, as a fan of simplices from the point centroid
    pub fn volume(&self) -> f64 {
        let center = centroid(&self.points);
        self.facets
            .iter()
            .map(|f| {
                let corners = std::array::from_fn(|i| self.points[f.vertices[i]]);
                simplex_volume(&center, &corners)
            })
            .sum()
    }
}

/// Internal representation of a face during hull construction
#[derive(Debug, Clone)]
struct HullFace<const D: usize> {
    vertices: [usize; D],
    normal: [f64; D],
    d: f64,
    outside_points: Vec<usize>,
    furthest_point: Option<usize>,
    furthest_distance: f64,
    deleted: bool,
}

impl<const D: usize> HullFace<D> {
    fn new(vertices: [usize; D], points: &[[f64; D]]) -> Self {
        let corners: [[f64; D]; D] = std::array::from_fn(|i| points[vertices[i]]);
        let normal = try_normalize(&hyperplane_normal(&corners)).unwrap_or_else(|| {
            let mut n = [0.0; D];
            n[D - 1] = 1.0;
            n
        });
        let d = dot(&normal, &corners[0]);

        Self {
            vertices,
            normal,
            d,
            outside_points: Vec::new(),
            furthest_point: None,
            furthest_distance: 0.0,
            deleted: false,
        }
    }

    /// Reverse orientation so the normal points the other way
    fn flip(&mut self) {
        self.vertices.swap(0, 1);
        self.normal = scale(&self.normal, -1.0);
        self.d = -self.d;
    }

    /// Make the normal point away from `interior`
    fn orient_away_from(&mut self, interior: &[f64; D]) {
        if dot(&self.normal, interior) - self.d > 0.0 {
            self.flip();
        }
    }

    #[inline]
    fn signed_distance(&self, point: &[f64; D]) -> f64 {
        dot(&self.normal, point) - self.d
    }

    #[inline]
    fn is_visible_from(&self, point: &[f64; D], epsilon: f64) -> bool {
        self.signed_distance(point) > epsilon
    }

    fn assign_point(&mut self, point_idx: usize, distance: f64) {
        self.outside_points.push(point_idx);
        if distance > self.furthest_distance {
            self.furthest_point = Some(point_idx);
            self.furthest_distance = distance;
        }
    }

    fn recompute_furthest(&mut self, points: &[[f64; D]]) {
        self.furthest_point = None;
        self.furthest_distance = 0.0;
        for &idx in &self.outside_points {
            let distance = dot(&self.normal, &points[idx]) - self.d;
            if distance > self.furthest_distance {
                self.furthest_distance = distance;
                self.furthest_point = Some(idx);
            }
        }
    }

    fn to_facet(&self) -> RawFacet<D> {
        RawFacet {
            vertices: self.vertices,
            normal: self.normal,
            offset: self.d,
        }
    }
}

/// Ridge key: the face's vertices with one slot replaced by `usize::MAX`, sorted
type Ridge<const D: usize> = [usize; D];

#[inline]
fn ridge<const D: usize>(vertices: &[usize; D], skip: usize) -> Ridge<D> {
    let mut r = *vertices;
    r[skip] = usize::MAX;
    r.sort_unstable();
    r
}

/// Scratch buffers to avoid allocations in the hot loop
struct ScratchBuffers<const D: usize> {
    visible_face_indices: Vec<usize>,
    orphaned_points: Vec<usize>,
    new_faces: Vec<HullFace<D>>,
    ridge_to_face: HashMap<Ridge<D>, usize>,
    horizon: Vec<Ridge<D>>,
}

impl<const D: usize> ScratchBuffers<D> {
    fn new() -> Self {
        Self {
            visible_face_indices: Vec::with_capacity(64),
            orphaned_points: Vec::with_capacity(256),
            new_faces: Vec::with_capacity(64),
            ridge_to_face: HashMap::with_capacity(128),
            horizon: Vec::with_capacity(64),
        }
    }

    fn clear(&mut self) {
        self.visible_face_indices.clear();
        self.orphaned_points.clear();
        self.new_faces.clear();
        self.ridge_to_face.clear();
        self.horizon.clear();
    }
}

/// Build the convex hull of `points` with the Quickhull algorithm
///
/// Fails with [`PhaseHullError::InsufficientPoints`] when fewer than `D + 1`
/// unique points remain and with [`PhaseHullError::DegenerateConfiguration`]
/// when the points do not span `D` dimensions.
pub fn quickhull<const D: usize>(
    points: &[[f64; D]],
    options: &QuickhullOptions,
) -> Result<ConvexHull<D>> {
    if points.iter().any(|p| p.iter().any(|v| !v.is_finite())) {
        return Err(PhaseHullError::DegenerateConfiguration);
    }

    let epsilon = relative_epsilon(points, options.epsilon);
    let (unique, sources) = deduplicate_points(points, epsilon);

    if unique.len() < D + 1 {
        return Err(PhaseHullError::InsufficientPoints {
            required: D + 1,
            got: unique.len(),
        });
    }

    let simplex = find_initial_simplex(&unique, epsilon)?;
    let simplex_points: Vec<[f64; D]> = simplex.iter().map(|&i| unique[i]).collect();
    // Strictly inside every face of the final hull
    let interior = centroid(&simplex_points);

    let mut hull_faces = create_initial_hull(&simplex, &unique, &interior);

    let mut in_simplex = vec![false; unique.len()];
    for &idx in &simplex {
        in_simplex[idx] = true;
    }
    let unprocessed: Vec<usize> = (0..unique.len()).filter(|&i| !in_simplex[i]).collect();

    if options.parallel && unprocessed.len() >= options.parallel_threshold {
        assign_points_parallel(&mut hull_faces, &unique, &unprocessed, epsilon);
    } else {
        assign_points_sequential(&mut hull_faces, &unique, &unprocessed, epsilon);
    }

    let mut scratch = ScratchBuffers::new();
    let mut iterations = 0;

    loop {
        iterations += 1;
        if iterations > options.max_iterations {
            log::error!(
                "quickhull: max iterations exceeded after {} iterations with {} faces",
                iterations,
                hull_faces.iter().filter(|f| !f.deleted).count()
            );
            let limit = options.max_iterations;
            return Err(PhaseHullError::MaxIterationsExceeded(limit));
        }

        let deleted_count = hull_faces.iter().filter(|f| f.deleted).count();
        if deleted_count * 10 > hull_faces.len() * 3 {
            compact_faces(&mut hull_faces);
            log::debug!(
                "quickhull {}D iteration {}: {} faces, {} outside points remaining",
                D,
                iterations,
                hull_faces.len(),
                hull_faces
                    .iter()
                    .map(|f| f.outside_points.len())
                    .sum::<usize>()
            );
        }

        let Some((face_idx, point_idx)) = find_face_with_furthest_point(&hull_faces) else {
            break;
        };
        let point = unique[point_idx];

        scratch.clear();
        for (i, face) in hull_faces.iter().enumerate() {
            if !face.deleted && face.is_visible_from(&point, epsilon) {
                scratch.visible_face_indices.push(i);
            }
        }

        if scratch.visible_face_indices.is_empty() {
            // Within tolerance of every face: treat the point as enclosed
            let face = &mut hull_faces[face_idx];
            face.outside_points.retain(|&p| p != point_idx);
            face.recompute_furthest(&unique);
            continue;
        }

        find_horizon(
            &hull_faces,
            &scratch.visible_face_indices,
            &mut scratch.ridge_to_face,
            &mut scratch.horizon,
        );

        for &visible in &scratch.visible_face_indices {
            scratch
                .orphaned_points
                .extend(hull_faces[visible].outside_points.iter().copied());
        }
        scratch.orphaned_points.retain(|&p| p != point_idx);

        for &visible in &scratch.visible_face_indices {
            let face = &mut hull_faces[visible];
            face.deleted = true;
            face.outside_points.clear();
        }

        for r in &scratch.horizon {
            let mut vertices = *r;
            // usize::MAX sorts last
            vertices[D - 1] = point_idx;
            let mut face = HullFace::new(vertices, &unique);
            face.orient_away_from(&interior);
            scratch.new_faces.push(face);
        }

        // Reassign orphaned points to new faces first, then existing faces
        for &orphan_idx in &scratch.orphaned_points {
            let orphan = &unique[orphan_idx];
            let mut assigned = false;

            for face in &mut scratch.new_faces {
                if face.is_visible_from(orphan, epsilon) {
                    let distance = face.signed_distance(orphan);
                    face.assign_point(orphan_idx, distance);
                    assigned = true;
                    break;
                }
            }

            if !assigned {
                for face in hull_faces.iter_mut().filter(|f| !f.deleted) {
                    if face.is_visible_from(orphan, epsilon) {
                        let distance = face.signed_distance(orphan);
                        face.assign_point(orphan_idx, distance);
                        break;
                    }
                }
            }
        }

        hull_faces.append(&mut scratch.new_faces);
    }

    compact_faces(&mut hull_faces);

    Ok(ConvexHull {
        points: unique,
        sources,
        facets: hull_faces.iter().map(HullFace::to_facet).collect(),
        epsilon,
    })
}

/// Assign points to faces in parallel
///
/// Visibility is computed with rayon; the assignment itself runs in input
/// order so the result matches the sequential path.
fn assign_points_parallel<const D: usize>(
    hull_faces: &mut [HullFace<D>],
    points: &[[f64; D]],
    unprocessed: &[usize],
    epsilon: f64,
) {
    let faces: &[HullFace<D>] = hull_faces;
    let assignments: Vec<Option<(usize, f64)>> = unprocessed
        .par_iter()
        .map(|&point_idx| {
            let point = &points[point_idx];
            faces.iter().enumerate().find_map(|(face_idx, face)| {
                let distance = face.signed_distance(point);
                (distance > epsilon).then_some((face_idx, distance))
            })
        })
        .collect();

    for (&point_idx, assignment) in unprocessed.iter().zip(assignments) {
        if let Some((face_idx, distance)) = assignment {
            hull_faces[face_idx].assign_point(point_idx, distance);
        }
    }
}

/// Assign points to faces sequentially
fn assign_points_sequential<const D: usize>(
    hull_faces: &mut [HullFace<D>],
    points: &[[f64; D]],
    unprocessed: &[usize],
    epsilon: f64,
) {
    for &point_idx in unprocessed {
        let point = &points[point_idx];
        for face in hull_faces.iter_mut() {
            if face.is_visible_from(point, epsilon) {
                let distance = face.signed_distance(point);
                face.assign_point(point_idx, distance);
                break;
            }
        }
    }
}

/// Find `D + 1` affinely independent points to seed the hull
///
/// Starts from the most distant pair of axis-extreme points and repeatedly
/// adds the point furthest from the affine span of the points chosen so far.
fn find_initial_simplex<const D: usize>(points: &[[f64; D]], epsilon: f64) -> Result<Vec<usize>> {
    let extremes = find_extreme_points(points);

    let mut max_distance = 0.0;
    let mut v0 = 0;
    let mut v1 = 0;
    for (a, &i) in extremes.iter().enumerate() {
        for &j in &extremes[a + 1..] {
            let dist = distance(&points[i], &points[j]);
            if dist > max_distance {
                max_distance = dist;
                v0 = i;
                v1 = j;
            }
        }
    }

    if max_distance < epsilon {
        return Err(PhaseHullError::DegenerateConfiguration);
    }

    let origin = points[v0];
    let mut simplex = vec![v0, v1];
    let mut basis = vec![scale(&sub(&points[v1], &origin), 1.0 / max_distance)];

    while simplex.len() < D + 1 {
        let mut best: Option<(usize, [f64; D], f64)> = None;
        for (i, point) in points.iter().enumerate() {
            if simplex.contains(&i) {
                continue;
            }
            let (residual, dist) = affine_residual(point, &origin, &basis);
            if best.as_ref().is_none_or(|(_, _, d)| dist > *d) {
                best = Some((i, residual, dist));
            }
        }

        match best {
            Some((idx, residual, dist)) if dist >= epsilon => {
                simplex.push(idx);
                basis.push(scale(&residual, 1.0 / dist));
            }
            _ => return Err(PhaseHullError::DegenerateConfiguration),
        }
    }

    Ok(simplex)
}

/// Create the `D + 1` faces of the initial simplex, oriented outward
fn create_initial_hull<const D: usize>(
    simplex: &[usize],
    points: &[[f64; D]],
    interior: &[f64; D],
) -> Vec<HullFace<D>> {
    (0..simplex.len())
        .map(|skip| {
            let mut others = simplex
                .iter()
                .enumerate()
                .filter(|(k, _)| *k != skip)
                .map(|(_, &v)| v);
            let vertices: [usize; D] = std::array::from_fn(|_| others.next().unwrap_or(0));
            let mut face = HullFace::new(vertices, points);
            face.orient_away_from(interior);
            face
        })
        .collect()
}

/// Find the face with the furthest outside point
fn find_face_with_furthest_point<const D: usize>(
    hull_faces: &[HullFace<D>],
) -> Option<(usize, usize)> {
    let mut max_distance = 0.0;
    let mut result = None;

    for (face_idx, face) in hull_faces.iter().enumerate() {
        if face.deleted {
            continue;
        }
        if let Some(point_idx) = face.furthest_point
            && face.furthest_distance > max_distance
        {
            max_distance = face.furthest_distance;
            result = Some((face_idx, point_idx));
        }
    }

    result
}

/// Ridges shared by exactly one visible face form the horizon
fn find_horizon<const D: usize>(
    hull_faces: &[HullFace<D>],
    visible_faces: &[usize],
    ridge_to_face: &mut HashMap<Ridge<D>, usize>,
    horizon: &mut Vec<Ridge<D>>,
) {
    ridge_to_face.clear();
    horizon.clear();

    for &face_idx in visible_faces {
        let face = &hull_faces[face_idx];
        for skip in 0..D {
            match ridge_to_face.entry(ridge(&face.vertices, skip)) {
                Entry::Vacant(e) => {
                    e.insert(face_idx);
                }
                Entry::Occupied(e) => {
                    // Shared by two visible faces: interior to the visible region
                    e.remove();
                }
            }
        }
    }

    horizon.extend(ridge_to_face.keys().copied());
    horizon.sort_unstable();
}

/// Remove deleted faces from the vector
fn compact_faces<const D: usize>(hull_faces: &mut Vec<HullFace<D>>) {
    hull_faces.retain(|f| !f.deleted);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_encloses<const D: usize>(hull: &ConvexHull<D>, points: &[[f64; D]]) {
        for facet in &hull.facets {
            for p in points {
                assert!(
                    facet.signed_distance(p) <= 1e-8,
                    "point {:?} outside facet {:?}",
                    p,
                    facet.vertices
                );
            }
        }
    }

    #[test]
    fn test_simple_tetrahedron() {
        let points = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ];
        let hull = quickhull(&points, &QuickhullOptions::default()).unwrap();
        assert_eq!(hull.facets.len(), 4);
        assert_eq!(hull.points.len(), 4);
        assert_encloses(&hull, &points);
    }

    #[test]
    fn test_cube() {
        let mut points = Vec::new();
        for i in 0..8 {
            points.push([
                (i & 1) as f64,
                ((i >> 1) & 1) as f64,
                ((i >> 2) & 1) as f64,
            ]);
        }
        points.push([0.5, 0.5, 0.5]);
        let hull = quickhull(&points, &QuickhullOptions::default()).unwrap();
        // 6 squares, 2 triangles each
        assert_eq!(hull.num_facets(), 12);
        assert_relative_eq!(hull.volume(), 1.0, epsilon = 1e-12);
        assert_encloses(&hull, &points);
        for facet in &hull.facets {
            assert!(!facet.vertices.contains(&8), "interior point on hull");
        }
    }

    #[test]
    fn test_4d_simplex_with_interior_points() {
        let points = vec![
            [0.0, 0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
            [0.1, 0.1, 0.1, 0.1],
            [0.2, 0.1, 0.3, 0.1],
        ];
        let hull = quickhull(&points, &QuickhullOptions::default()).unwrap();
        assert_eq!(hull.facets.len(), 5);
        assert_encloses(&hull, &points);
    }

    #[test]
    fn test_4d_cross_polytope() {
        let mut points = Vec::new();
        for axis in 0..4 {
            for sign in [-1.0, 1.0] {
                let mut p = [0.0; 4];
                p[axis] = sign;
                points.push(p);
            }
        }
        let hull = quickhull(&points, &QuickhullOptions::default()).unwrap();
        // 16-cell: 16 tetrahedral facets
        assert_eq!(hull.facets.len(), 16);
        assert_encloses(&hull, &points);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let points: Vec<[f64; 3]> = (0..300)
            .map(|i| {
                let u = i as f64;
                let t = u * 0.37;
                [t.sin(), t.cos() * (u * 0.11).sin(), (u * 0.05).cos()]
            })
            .collect();
        let sequential = QuickhullOptions {
            parallel: false,
            ..QuickhullOptions::default()
        };
        let parallel = QuickhullOptions {
            parallel_threshold: 10,
            ..QuickhullOptions::default()
        };
        let a = quickhull(&points, &sequential).unwrap();
        let b = quickhull(&points, &parallel).unwrap();
        assert_eq!(a, b);
        assert_encloses(&a, &points);
    }

    #[test]
    fn test_insufficient_points() {
        let points = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let err = quickhull(&points, &QuickhullOptions::default()).unwrap_err();
        let PhaseHullError::InsufficientPoints { required, got } = err else {
            panic!("expected InsufficientPoints, got {err}");
        };
        assert_eq!((required, got), (4, 3));
    }

    #[test]
    fn test_coplanar_points() {
        let points = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.5, 0.2, 0.0],
        ];
        let err = quickhull(&points, &QuickhullOptions::default()).unwrap_err();
        assert!(matches!(err, PhaseHullError::DegenerateConfiguration));
    }
}
