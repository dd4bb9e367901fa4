//! Lower convex hulls of formation energy vs. composition
//!
//! [`HullModel`] has one variant per supported arity. The variant is picked
//! once from the number of elements of the chemical system:
//!
//! | arity | composition space | hull |
//! |-------|-------------------|------|
//! | 1 | a point | minimum energy |
//! | 2 | segment `[0, 1]` | monotone chain, tie lines |
//! | 3 | equilateral triangle | 3-D quickhull, lower triangles |
//! | 4 | regular tetrahedron | 4-D quickhull, lower tetrahedra |

mod binary;
mod lower;
mod quickhull;

pub use binary::{BinaryHull, TieLine};
pub use lower::{LowerFacet, LowerHull};
pub use quickhull::{ConvexHull, QuickhullOptions, RawFacet, quickhull};

use crate::composition::CompositionPoint;
use crate::error::{PhaseHullError, Result};
use crate::geometry::{barycentric_to_tetrahedral, barycentric_to_triangular};

/// Hull of a unary system: the lowest energy seen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnaryHull {
    /// Lowest energy, `None` without any point
    pub energy: Option<f64>,
    /// Input index of the lowest point
    pub source: Option<usize>,
}

/// Lower hull of one chemical system, specialized by arity
#[derive(Debug, Clone, PartialEq)]
pub enum HullModel {
    Unary(UnaryHull),
    Binary(BinaryHull),
    Ternary(LowerHull<3>),
    Quaternary(LowerHull<4>),
}

impl HullModel {
    /// Build the hull of composition points over an `arity`-element system
    ///
    /// Every point must hold `arity` fractions. Points with a non-finite
    /// energy are ignored.
    pub fn build(
        arity: usize,
        points: &[CompositionPoint],
        options: &QuickhullOptions,
    ) -> Result<Self> {
        if let Some(bad) = points.iter().find(|p| p.fractions().len() != arity) {
            return Err(PhaseHullError::DimensionMismatch {
                expected: arity,
                got: bad.fractions().len(),
            });
        }

        // keep the input index of every finite point
        let finite: Vec<(usize, &CompositionPoint)> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.energy().is_finite())
            .collect();

        let model = match arity {
            1 => {
                let lowest = finite
                    .iter()
                    .min_by(|a, b| a.1.energy().total_cmp(&b.1.energy()));
                HullModel::Unary(UnaryHull {
                    energy: lowest.map(|(_, p)| p.energy()),
                    source: lowest.map(|(i, _)| *i),
                })
            }
            2 => {
                let coords: Vec<[f64; 2]> = finite
                    .iter()
                    .map(|(_, p)| [p.fractions()[1], p.energy()])
                    .collect();
                let mut hull = BinaryHull::build(&coords);
                hull.remap_sources(|i| finite[i].0);
                HullModel::Binary(hull)
            }
            3 => {
                let coords: Vec<[f64; 3]> = finite
                    .iter()
                    .map(|(_, p)| ternary_point(p.fractions(), p.energy()))
                    .collect();
                let mut hull = LowerHull::build(&coords, options);
                hull.remap_sources(|i| finite[i].0);
                HullModel::Ternary(hull)
            }
            4 => {
                let coords: Vec<[f64; 4]> = finite
                    .iter()
                    .map(|(_, p)| quaternary_point(p.fractions(), p.energy()))
                    .collect();
                let mut hull = LowerHull::build(&coords, options);
                hull.remap_sources(|i| finite[i].0);
                HullModel::Quaternary(hull)
            }
            _ => return Err(PhaseHullError::UnsupportedArity { arity }),
        };

        Ok(model)
    }

    /// Number of elements of the system
    pub fn arity(&self) -> usize {
        match self {
            HullModel::Unary(_) => 1,
            HullModel::Binary(_) => 2,
            HullModel::Ternary(_) => 3,
            HullModel::Quaternary(_) => 4,
        }
    }

    /// Number of lower facets (tie lines for binaries, 0 or 1 for unaries)
    pub fn num_facets(&self) -> usize {
        match self {
            HullModel::Unary(h) => usize::from(h.energy.is_some()),
            HullModel::Binary(h) => h.tie_lines().len(),
            HullModel::Ternary(h) => h.facets().len(),
            HullModel::Quaternary(h) => h.facets().len(),
        }
    }

    /// Check whether no query can be answered
    pub fn is_empty(&self) -> bool {
        self.num_facets() == 0
    }

    /// Energy of the lower envelope at a composition
    ///
    /// `fractions` are the atomic fractions over the system's elements.
    /// Returns `None` for a wrong number of fractions or a composition
    /// outside the hull footprint.
    pub fn e_hull_at(&self, fractions: &[f64]) -> Option<f64> {
        if fractions.len() != self.arity() {
            return None;
        }
        match self {
            HullModel::Unary(h) => h.energy,
            HullModel::Binary(h) => h.energy_at(fractions[1]),
            HullModel::Ternary(h) => h.energy_at(&barycentric_to_triangular(fractions)),
            HullModel::Quaternary(h) => h.energy_at(&barycentric_to_tetrahedral(fractions)),
        }
    }

    /// Hull vertices a composition decomposes into
    ///
    /// Returns `(input index, weight)` pairs with positive weight; the
    /// weights are the barycentric coordinates within the containing facet.
    pub fn decomposition(&self, fractions: &[f64]) -> Option<Vec<(usize, f64)>> {
        if fractions.len() != self.arity() {
            return None;
        }
        let pairs: Vec<(usize, f64)> = match self {
            HullModel::Unary(h) => vec![(h.source?, 1.0)],
            HullModel::Binary(h) => {
                let (i, [a, b]) = h.locate(fractions[1])?;
                vec![(h.sources()[i], a), (h.sources()[i + 1], b)]
            }
            HullModel::Ternary(h) => {
                let (i, w) = h.locate(&barycentric_to_triangular(fractions))?;
                let facet = &h.facets()[i];
                (0..3)
                    .map(|k| (h.sources()[facet.vertices[k]], w[k]))
                    .collect()
            }
            HullModel::Quaternary(h) => {
                let (i, w) = h.locate(&barycentric_to_tetrahedral(fractions))?;
                let facet = &h.facets()[i];
                (0..4)
                    .map(|k| (h.sources()[facet.vertices[k]], w[k]))
                    .collect()
            }
        };
        Some(pairs.into_iter().filter(|(_, w)| *w > 1e-9).collect())
    }

    /// Input indices of the points that are hull vertices
    pub fn vertex_sources(&self) -> Vec<usize> {
        match self {
            HullModel::Unary(h) => h.source.into_iter().collect(),
            HullModel::Binary(h) => h.sources().to_vec(),
            HullModel::Ternary(h) => h.vertex_sources(),
            HullModel::Quaternary(h) => h.vertex_sources(),
        }
    }
}

/// Energy of the lower envelope of `model` at `fractions`
pub fn e_hull_at(model: &HullModel, fractions: &[f64]) -> Option<f64> {
    model.e_hull_at(fractions)
}

/// Embed ternary fractions and energy as a 3-D hull point
pub fn ternary_point(fractions: &[f64], energy: f64) -> [f64; 3] {
    let [x, y] = barycentric_to_triangular(fractions);
    [x, y, energy]
}

/// Embed quaternary fractions and energy as a 4-D hull point
pub fn quaternary_point(fractions: &[f64], energy: f64) -> [f64; 4] {
    let [x, y, z] = barycentric_to_tetrahedral(fractions);
    [x, y, z, energy]
}
