//! Thermodynamic stability from convex hulls of formation energy
//!
//! This library takes candidate phases of a chemical system (a composition
//! and a computed energy each), picks elemental references, computes
//! formation energies and builds the lower convex hull of formation energy
//! versus composition. Phases on the hull are stable; every other phase gets
//! its energy above the hull.
//!
//! Unary to quaternary systems are supported. Binary hulls use a monotone
//! chain; ternary and quaternary hulls use a quickhull over composition
//! coordinates embedded in a triangle or a regular tetrahedron.
//!
//! # Example
//! ```
//! use math_phase_hull::{PhaseEntry, calculate_e_above_hull};
//!
//! let refs = vec![
//!     PhaseEntry::from_energy_per_atom([("Li", 1.0)], -1.9),
//!     PhaseEntry::from_energy_per_atom([("O", 2.0)], -4.9),
//! ];
//! let li2o = PhaseEntry::from_energy_per_atom([("Li", 2.0), ("O", 1.0)], -4.8);
//!
//! let e_above = calculate_e_above_hull(&li2o, &refs).unwrap();
//! assert_eq!(e_above, Some(0.0));
//! ```
//!
//! # Systems and sessions
//! ```
//! use math_phase_hull::{HullConfig, HullSession, testdata};
//!
//! let entries = testdata::li_fe_o_entries();
//! let mut session = HullSession::new(HullConfig::default());
//! let system = session.system_for(&["Li", "Fe", "O"], &entries).unwrap();
//! for entry in system.stable_entries() {
//!     println!("{} is on the hull", entry.composition);
//! }
//! ```

mod composition;
mod config;
mod elements;
mod entry;
mod error;
mod evaluate;
mod export;
mod formation;
mod geometry;
mod hull;
mod references;
mod session;
mod stats;
mod system;

// Make testdata publicly available for tests and benches
pub mod testdata;

pub use composition::{Composition, CompositionPoint, normalize_amounts};
pub use config::{
    ConfigFormat, HullConfig, load_config, load_entries, parse_config, parse_entries, save_config,
    serialize_config,
};
pub use elements::{chemical_system_label, compare_elements, electronegativity, sort_elements};
pub use entry::PhaseEntry;
pub use error::{PhaseHullError, Result};
pub use evaluate::{HullQuery, calculate_e_above_hull, calculate_e_above_hull_with, e_above_hull};
pub use export::{FacetGeometry, HullGeometry, RenderPoint, export_json, export_obj};
pub use formation::{annotate_formation_energies, compute_formation_energy_per_atom};
pub use geometry::{
    TETRAHEDRON_VERTICES, TRIANGLE_VERTICES, barycentric_to_tetrahedral, barycentric_to_triangular,
};
pub use hull::{
    BinaryHull, ConvexHull, HullModel, LowerFacet, LowerHull, QuickhullOptions, RawFacet, TieLine,
    UnaryHull, e_hull_at, quaternary_point, quickhull, ternary_point,
};
pub use references::{
    ReferenceMap, corrected_energy_per_atom, find_lowest_energy_unary_refs, reference_energies,
};
pub use session::{HullSession, content_hash, process_systems};
pub use stats::{PhaseStats, ValueRange, classify_entries, get_phase_diagram_stats, is_stable};
pub use system::PhaseSystem;

/// Numerical tolerance of the hull geometry
///
/// Scaled by the extent of the point cloud before use.
pub(crate) const EPSILON: f64 = 1e-10;

/// Default stability tolerance (eV/atom)
pub const STABILITY_TOLERANCE: f64 = 1e-6;

/// Energies above hull closer to zero than this are reported as 0
pub const E_ABOVE_HULL_NOISE: f64 = 1e-9;

/// Library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
