//! Render geometry of lower hulls and its JSON / OBJ export

use crate::error::{PhaseHullError, Result};
use crate::hull::{HullModel, LowerHull};
use crate::system::PhaseSystem;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// A hull point in render coordinates
///
/// Ternary: `x, y` in the triangle, `z` the formation energy. Quaternary:
/// `x, y, z` in the tetrahedron, `w` the formation energy. Binary and unary
/// points use `x` for the composition and `y` for the energy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<f64>,
    /// Label of the entry at this point
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
}

/// One lower facet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetGeometry {
    /// Indices into [`HullGeometry::points`]
    pub vertices: Vec<usize>,
    /// Outward unit normal, pointing to lower energy
    pub normal: Vec<f64>,
    pub centroid: Vec<f64>,
}

/// Points and lower facets of a chemical system's hull
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HullGeometry {
    pub chemical_system: String,
    pub elements: Vec<String>,
    /// Number of coordinates per point including the energy
    pub dimension: usize,
    pub points: Vec<RenderPoint>,
    pub facets: Vec<FacetGeometry>,
}

impl HullGeometry {
    /// Geometry of a hull model, without entry labels
    pub fn from_model(model: &HullModel) -> Self {
        let (points, facets) = match model {
            HullModel::Unary(h) => {
                let points = h
                    .energy
                    .map(|e| vec![planar_point(0.0, e)])
                    .unwrap_or_default();
                (points, Vec::new())
            }
            HullModel::Binary(h) => {
                let points = h
                    .vertices()
                    .iter()
                    .map(|p| planar_point(p[0], p[1]))
                    .collect();
                let facets = h
                    .tie_lines()
                    .iter()
                    .enumerate()
                    .map(|(i, line)| {
                        let len = (line.slope * line.slope + 1.0).sqrt();
                        FacetGeometry {
                            vertices: vec![i, i + 1],
                            normal: vec![line.slope / len, -1.0 / len],
                            centroid: vec![
                                0.5 * (line.start[0] + line.end[0]),
                                0.5 * (line.start[1] + line.end[1]),
                            ],
                        }
                    })
                    .collect();
                (points, facets)
            }
            HullModel::Ternary(h) => (
                h.points()
                    .iter()
                    .map(|p| RenderPoint {
                        x: p[0],
                        y: p[1],
                        z: p[2],
                        w: None,
                        entry: None,
                    })
                    .collect(),
                lower_facets(h),
            ),
            HullModel::Quaternary(h) => (
                h.points()
                    .iter()
                    .map(|p| RenderPoint {
                        x: p[0],
                        y: p[1],
                        z: p[2],
                        w: Some(p[3]),
                        entry: None,
                    })
                    .collect(),
                lower_facets(h),
            ),
        };

        Self {
            chemical_system: String::new(),
            elements: Vec::new(),
            dimension: model.arity().max(2),
            points,
            facets,
        }
    }

    /// Geometry of a system's hull, with points labelled by entry
    pub fn from_system(system: &PhaseSystem) -> Self {
        let mut geometry = Self::from_model(system.model());
        geometry.chemical_system = system.chemical_system();
        geometry.elements = system.elements().to_vec();

        let sources: Vec<usize> = match system.model() {
            HullModel::Unary(h) => h.source.into_iter().collect(),
            HullModel::Binary(h) => h.sources().to_vec(),
            HullModel::Ternary(h) => h.sources().to_vec(),
            HullModel::Quaternary(h) => h.sources().to_vec(),
        };
        for (point, source) in geometry.points.iter_mut().zip(sources) {
            point.entry = system.hull_entry(source).map(|(i, e)| e.label(i));
        }
        geometry
    }

    /// Number of lower facets
    pub fn num_facets(&self) -> usize {
        self.facets.len()
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| PhaseHullError::SerializeError(e.to_string()))
    }

    /// Write ternary geometry as Wavefront OBJ
    ///
    /// Energies become the `z` axis. Other arities have no 3-D surface and
    /// are rejected.
    pub fn write_obj<W: Write>(&self, out: &mut W) -> Result<()> {
        if self.dimension != 3 {
            return Err(PhaseHullError::DimensionMismatch {
                expected: 3,
                got: self.dimension,
            });
        }

        writeln!(out, "# Lower hull {}", self.chemical_system)?;
        writeln!(out, "# Vertices: {}", self.points.len())?;
        writeln!(out, "# Faces: {}", self.facets.len())?;
        writeln!(out)?;

        for p in &self.points {
            writeln!(out, "v {} {} {}", p.x, p.y, p.z)?;
        }
        writeln!(out)?;

        for facet in &self.facets {
            let n = &facet.normal;
            writeln!(out, "vn {} {} {}", n[0], n[1], n[2])?;
        }
        writeln!(out)?;

        // OBJ indices start at 1
        for (i, facet) in self.facets.iter().enumerate() {
            let corners: Vec<String> = facet
                .vertices
                .iter()
                .map(|v| format!("{}//{}", v + 1, i + 1))
                .collect();
            writeln!(out, "f {}", corners.join(" "))?;
        }
        Ok(())
    }
}

fn planar_point(x: f64, energy: f64) -> RenderPoint {
    RenderPoint {
        x,
        y: energy,
        z: 0.0,
        w: None,
        entry: None,
    }
}

fn lower_facets<const D: usize>(hull: &LowerHull<D>) -> Vec<FacetGeometry> {
    hull.facets()
        .iter()
        .map(|f| FacetGeometry {
            vertices: f.vertices.to_vec(),
            normal: f.normal.to_vec(),
            centroid: f.centroid.to_vec(),
        })
        .collect()
}

/// Write hull geometry as pretty JSON
pub fn export_json<P: AsRef<Path>>(geometry: &HullGeometry, path: P) -> Result<()> {
    std::fs::write(path, geometry.to_json()?)?;
    Ok(())
}

/// Write ternary hull geometry as Wavefront OBJ
pub fn export_obj<P: AsRef<Path>>(geometry: &HullGeometry, path: P) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    geometry.write_obj(&mut out)?;
    out.flush()?;
    Ok(())
}
