//! Lower envelope of a `D`-dimensional hull
//!
//! The last coordinate of every point is the energy. Only facets whose
//! outward normal points towards lower energy are kept; the rest of the hull
//! lies above known ground states and carries no thermodynamic meaning.

use super::quickhull::{QuickhullOptions, quickhull};
use crate::geometry::{barycentric_weights, centroid, weights_inside};

/// Normal energy component below which a facet belongs to the lower hull
const LOWER_NORMAL_EPS: f64 = 1e-9;

/// Tolerance on barycentric weights during point location
const LOCATE_TOLERANCE: f64 = 1e-9;

/// A facet of the lower envelope
#[derive(Debug, Clone, PartialEq)]
pub struct LowerFacet<const D: usize> {
    /// Indices into [`LowerHull::points`]
    pub vertices: [usize; D],
    /// Outward unit normal, `normal[D - 1] < 0`
    pub normal: [f64; D],
    /// Mean of the facet vertices
    pub centroid: [f64; D],
}

/// Lower convex envelope over `(composition…, energy)` points
#[derive(Debug, Clone, PartialEq)]
pub struct LowerHull<const D: usize> {
    points: Vec<[f64; D]>,
    sources: Vec<usize>,
    facets: Vec<LowerFacet<D>>,
}

impl<const D: usize> Default for LowerHull<D> {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            sources: Vec::new(),
            facets: Vec::new(),
        }
    }
}

impl<const D: usize> LowerHull<D> {
    /// Build the lower envelope of `points`
    ///
    /// Degenerate inputs (too few points, all points in one hyperplane) give
    /// an empty envelope rather than an error.
    pub fn build(points: &[[f64; D]], options: &QuickhullOptions) -> Self {
        let hull = match quickhull(points, options) {
            Ok(hull) => hull,
            Err(err) => {
                log::debug!("{}D lower hull is empty: {}", D, err);
                return Self {
                    points: points.to_vec(),
                    sources: (0..points.len()).collect(),
                    facets: Vec::new(),
                };
            }
        };

        let facets: Vec<LowerFacet<D>> = hull
            .facets
            .iter()
            .filter(|f| f.normal[D - 1] < -LOWER_NORMAL_EPS)
            .map(|f| {
                let corners: Vec<[f64; D]> = f.vertices.iter().map(|&v| hull.points[v]).collect();
                LowerFacet {
                    vertices: f.vertices,
                    normal: f.normal,
                    centroid: centroid(&corners),
                }
            })
            .collect();

        log::debug!(
            "{}D hull: {} facets, {} on the lower envelope",
            D,
            hull.facets.len(),
            facets.len()
        );

        Self {
            points: hull.points,
            sources: hull.sources,
            facets,
        }
    }

    /// Rewrite source indices, e.g. after filtering the input
    pub(crate) fn remap_sources(&mut self, map: impl Fn(usize) -> usize) {
        for s in &mut self.sources {
            *s = map(*s);
        }
    }

    /// Points the envelope was built from (deduplicated)
    pub fn points(&self) -> &[[f64; D]] {
        &self.points
    }

    /// Input index of each point in [`Self::points`]
    pub fn sources(&self) -> &[usize] {
        &self.sources
    }

    /// Lower facets
    pub fn facets(&self) -> &[LowerFacet<D>] {
        &self.facets
    }

    /// Check whether the envelope has no facet
    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    /// Coordinates of a facet's vertices
    pub fn facet_points(&self, facet: &LowerFacet<D>) -> [[f64; D]; D] {
        std::array::from_fn(|i| self.points[facet.vertices[i]])
    }

    /// Facet whose composition projection contains `coords`, with weights
    ///
    /// `coords` holds the `D - 1` embedded composition coordinates.
    pub fn locate(&self, coords: &[f64]) -> Option<(usize, [f64; D])> {
        if coords.len() + 1 != D {
            return None;
        }
        self.facets.iter().enumerate().find_map(|(i, facet)| {
            let weights = barycentric_weights(&self.facet_points(facet), coords)?;
            weights_inside(&weights, LOCATE_TOLERANCE).then_some((i, weights))
        })
    }

    /// Energy of the envelope at `coords`, `None` outside its footprint
    pub fn energy_at(&self, coords: &[f64]) -> Option<f64> {
        let (i, weights) = self.locate(coords)?;
        let corners = self.facet_points(&self.facets[i]);
        Some(
            weights
                .iter()
                .zip(corners.iter())
                .map(|(w, p)| w * p[D - 1])
                .sum(),
        )
    }

    /// Input indices of the points that are vertices of a lower facet
    pub fn vertex_sources(&self) -> Vec<usize> {
        let mut used: Vec<usize> = self
            .facets
            .iter()
            .flat_map(|f| f.vertices.iter().map(|&v| self.sources[v]))
            .collect();
        used.sort_unstable();
        used.dedup();
        used
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn triangle_with_dip() -> Vec<[f64; 3]> {
        vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.25, 0.25, -1.0],
            [0.5, 0.25, 2.0],
        ]
    }

    #[test]
    fn test_lower_filter() {
        let hull = LowerHull::build(&triangle_with_dip(), &QuickhullOptions::default());
        // The dip splits the base triangle into three lower facets
        assert_eq!(hull.facets().len(), 3);
        for facet in hull.facets() {
            assert!(facet.normal[2] < 0.0);
            assert!(facet.vertices.iter().all(|&v| hull.sources()[v] != 4));
        }
        assert_eq!(hull.vertex_sources(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_energy_at_interpolates() {
        let hull = LowerHull::build(&triangle_with_dip(), &QuickhullOptions::default());
        let dip = hull.energy_at(&[0.25, 0.25]).unwrap();
        assert_relative_eq!(dip, -1.0, epsilon = 1e-9);
        // halfway between the dip and corner A
        let halfway = hull.energy_at(&[0.125, 0.125]).unwrap();
        assert_relative_eq!(halfway, -0.5, epsilon = 1e-9);
        let corner = hull.energy_at(&[1.0, 0.0]).unwrap();
        assert_relative_eq!(corner, 0.0, epsilon = 1e-9);
        assert!(hull.energy_at(&[1.0, 1.0]).is_none());
        assert!(hull.energy_at(&[0.5]).is_none());
    }

    #[test]
    fn test_coplanar_is_empty() {
        let points = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.3, 0.3, 0.0],
        ];
        let hull = LowerHull::build(&points, &QuickhullOptions::default());
        assert!(hull.is_empty());
        assert!(hull.energy_at(&[0.2, 0.2]).is_none());
    }

    #[test]
    fn test_quaternary_envelope() {
        let points = vec![
            [0.0, 0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.2, 0.2, 0.2, -0.8],
        ];
        let hull = LowerHull::build(&points, &QuickhullOptions::default());
        assert_eq!(hull.facets().len(), 4);
        let dip = hull.energy_at(&[0.2, 0.2, 0.2]).unwrap();
        assert_relative_eq!(dip, -0.8, epsilon = 1e-9);
        let halfway = hull.energy_at(&[0.1, 0.1, 0.1]).unwrap();
        assert_relative_eq!(halfway, -0.4, epsilon = 1e-9);
    }

    #[test]
    fn test_quaternary_references_only_is_empty() {
        // the four elements at 0 eV/atom span no volume below the energy axis
        let points = vec![
            [0.0, 0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
        ];
        let hull = LowerHull::build(&points, &QuickhullOptions::default());
        assert!(hull.is_empty());
        assert!(hull.energy_at(&[0.25, 0.25, 0.25]).is_none());
        assert!(hull.vertex_sources().is_empty());
    }
}
