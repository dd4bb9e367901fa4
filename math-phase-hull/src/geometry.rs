//! Geometric utility functions on fixed-size points
//!
//! Points are `[f64; D]` arrays. The last coordinate of a hull point is
//! always the (formation) energy, the leading `D - 1` coordinates are the
//! embedded composition.

/// Pivot magnitude below which a linear system is treated as singular
const SINGULAR_EPS: f64 = 1e-14;

/// Vertices of the ternary composition triangle (A, B, C)
pub const TRIANGLE_VERTICES: [[f64; 2]; 3] =
    [[0.0, 0.0], [1.0, 0.0], [0.5, 0.866_025_403_784_438_6]];

/// Vertices of the regular quaternary composition tetrahedron (A, B, C, D)
///
/// Unit edge length, vertex A at the origin.
pub const TETRAHEDRON_VERTICES: [[f64; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [0.5, 0.866_025_403_784_438_6, 0.0],
    [0.5, 0.288_675_134_594_812_9, 0.816_496_580_927_726],
];

#[inline]
pub fn sub<const D: usize>(a: &[f64; D], b: &[f64; D]) -> [f64; D] {
    std::array::from_fn(|i| a[i] - b[i])
}

#[inline]
pub fn add<const D: usize>(a: &[f64; D], b: &[f64; D]) -> [f64; D] {
    std::array::from_fn(|i| a[i] + b[i])
}

#[inline]
pub fn scale<const D: usize>(a: &[f64; D], s: f64) -> [f64; D] {
    std::array::from_fn(|i| a[i] * s)
}

#[inline]
pub fn dot<const D: usize>(a: &[f64; D], b: &[f64; D]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[inline]
pub fn norm<const D: usize>(a: &[f64; D]) -> f64 {
    dot(a, a).sqrt()
}

#[inline]
pub fn distance<const D: usize>(a: &[f64; D], b: &[f64; D]) -> f64 {
    norm(&sub(a, b))
}

/// Normalize to unit length, `None` for a (near) zero vector
pub fn try_normalize<const D: usize>(a: &[f64; D]) -> Option<[f64; D]> {
    let n = norm(a);
    (n > 1e-300 && n.is_finite()).then(|| scale(a, 1.0 / n))
}

/// Mean of a set of points
pub fn centroid<const D: usize>(points: &[[f64; D]]) -> [f64; D] {
    let n = points.len().max(1) as f64;
    let sum = points.iter().fold([0.0; D], |acc, p| add(&acc, p));
    scale(&sum, 1.0 / n)
}

/// Determinant by Gaussian elimination with partial pivoting
pub fn determinant<const N: usize>(mut m: [[f64; N]; N]) -> f64 {
    let mut det = 1.0;
    for col in 0..N {
        let pivot = (col..N)
            .max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))
            .unwrap_or(col);
        if m[pivot][col] == 0.0 {
            return 0.0;
        }
        if pivot != col {
            m.swap(pivot, col);
            det = -det;
        }
        det *= m[col][col];
        for row in (col + 1)..N {
            let factor = m[row][col] / m[col][col];
            for k in col..N {
                m[row][k] -= factor * m[col][k];
            }
        }
    }
    det
}

/// Solve `a · x = b`, `None` if `a` is singular
pub fn solve<const N: usize>(mut a: [[f64; N]; N], mut b: [f64; N]) -> Option<[f64; N]> {
    for col in 0..N {
        let pivot = (col..N)
            .max_by(|&p, &q| a[p][col].abs().total_cmp(&a[q][col].abs()))?;
        if a[pivot][col].abs() < SINGULAR_EPS {
            return None;
        }
        a.swap(pivot, col);
        b.swap(pivot, col);
        for row in (col + 1)..N {
            let factor = a[row][col] / a[col][col];
            for k in col..N {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0; N];
    for row in (0..N).rev() {
        let mut s = b[row];
        for k in (row + 1)..N {
            s -= a[row][k] * x[k];
        }
        x[row] = s / a[row][row];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}

/// Normal of the hyperplane through `D` points (not normalized)
///
/// Component `k` is `det(p1 - p0, …, p(D-1) - p0, e_k)`, which reduces to
/// `(p1 - p0) × (p2 - p0)` in three dimensions.
pub fn hyperplane_normal<const D: usize>(points: &[[f64; D]; D]) -> [f64; D] {
    let mut edges = [[0.0; D]; D];
    for i in 1..D {
        edges[i - 1] = sub(&points[i], &points[0]);
    }
    std::array::from_fn(|k| {
        let mut m = edges;
        m[D - 1] = [0.0; D];
        m[D - 1][k] = 1.0;
        determinant(m)
    })
}

/// Barycentric weights of `query` in the composition projection of a facet
///
/// `vertices` are full hull points; only their leading `D - 1` coordinates
/// are used. `query` must hold `D - 1` coordinates. `None` when the
/// projected simplex is degenerate.
pub fn barycentric_weights<const D: usize>(
    vertices: &[[f64; D]; D],
    query: &[f64],
) -> Option<[f64; D]> {
    if query.len() + 1 != D {
        return None;
    }
    let mut a = [[1.0; D]; D];
    let mut b = [1.0; D];
    for k in 0..(D - 1) {
        for (j, vertex) in vertices.iter().enumerate() {
            a[k][j] = vertex[k];
        }
        b[k] = query[k];
    }
    solve(a, b)
}

/// Check that barycentric weights describe a point inside the simplex
pub fn weights_inside<const D: usize>(weights: &[f64; D], tolerance: f64) -> bool {
    let sum: f64 = weights.iter().sum();
    weights
        .iter()
        .all(|&w| w >= -tolerance && w <= 1.0 + tolerance)
        && (sum - 1.0).abs() <= tolerance.max(1e-9)
}

/// Map ternary fractions (A, B, C) into the composition triangle
pub fn barycentric_to_triangular(fractions: &[f64]) -> [f64; 2] {
    embed(&TRIANGLE_VERTICES, fractions)
}

/// Map quaternary fractions (A, B, C, D) into the composition tetrahedron
pub fn barycentric_to_tetrahedral(fractions: &[f64]) -> [f64; 3] {
    embed(&TETRAHEDRON_VERTICES, fractions)
}

fn embed<const V: usize, const D: usize>(corners: &[[f64; D]; V], fractions: &[f64]) -> [f64; D] {
    corners
        .iter()
        .zip(fractions.iter())
        .fold([0.0; D], |acc, (corner, &w)| add(&acc, &scale(corner, w)))
}

/// Find the extreme points (min/max in each dimension)
///
/// Returns `2 * D` indices: `[min_0, max_0, min_1, max_1, …]`.
pub fn find_extreme_points<const D: usize>(points: &[[f64; D]]) -> Vec<usize> {
    let mut extremes = vec![0usize; 2 * D];
    for (i, p) in points.iter().enumerate() {
        for axis in 0..D {
            if p[axis] < points[extremes[2 * axis]][axis] {
                extremes[2 * axis] = i;
            }
            if p[axis] > points[extremes[2 * axis + 1]][axis] {
                extremes[2 * axis + 1] = i;
            }
        }
    }
    extremes
}

/// Scale-aware tolerance: `base * max(1, largest |coordinate|)`
pub fn relative_epsilon<const D: usize>(points: &[[f64; D]], base: f64) -> f64 {
    let magnitude = points
        .iter()
        .flat_map(|p| p.iter())
        .fold(0.0_f64, |m, v| m.max(v.abs()));
    base * magnitude.max(1.0)
}

/// Remove points closer than `epsilon` (in every coordinate) to an earlier one
///
/// Returns the unique points in input order and, for each, the index of the
/// input point it came from.
pub fn deduplicate_points<const D: usize>(
    points: &[[f64; D]],
    epsilon: f64,
) -> (Vec<[f64; D]>, Vec<usize>) {
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| points[a][0].total_cmp(&points[b][0]).then(a.cmp(&b)));

    let mut duplicate = vec![false; points.len()];
    for (pos, &i) in order.iter().enumerate() {
        if duplicate[i] {
            continue;
        }
        for &j in &order[pos + 1..] {
            if points[j][0] - points[i][0] > epsilon {
                break;
            }
            if !duplicate[j]
                && points[i]
                    .iter()
                    .zip(points[j].iter())
                    .all(|(a, b)| (a - b).abs() <= epsilon)
            {
                duplicate[j] = true;
            }
        }
    }

    (0..points.len())
        .filter(|&i| !duplicate[i])
        .map(|i| (points[i], i))
        .unzip()
}

/// Distance from `point` to the affine span of `origin + span(basis)`
///
/// `basis` must be orthonormal. Also returns the residual direction.
pub fn affine_residual<const D: usize>(
    point: &[f64; D],
    origin: &[f64; D],
    basis: &[[f64; D]],
) -> ([f64; D], f64) {
    let mut r = sub(point, origin);
    for b in basis {
        let proj = dot(&r, b);
        r = sub(&r, &scale(b, proj));
    }
    let n = norm(&r);
    (r, n)
}

/// Volume of the simplex spanned by `D + 1` points in `D` dimensions
pub fn simplex_volume<const D: usize>(origin: &[f64; D], others: &[[f64; D]; D]) -> f64 {
    let mut m = [[0.0; D]; D];
    for (row, p) in m.iter_mut().zip(others.iter()) {
        *row = sub(p, origin);
    }
    let factorial: f64 = (1..=D).map(|k| k as f64).product();
    determinant(m).abs() / factorial
}
