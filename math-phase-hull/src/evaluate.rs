//! Energy above the hull
//!
//! [`calculate_e_above_hull`] is the high-level entry point: it takes one
//! entry or a slice of entries plus a reference set, builds the hull of the
//! system spanned by the references, and reports how far each entry lies
//! above it.

use crate::composition::CompositionPoint;
use crate::config::HullConfig;
use crate::elements::sort_elements;
use crate::entry::PhaseEntry;
use crate::error::{PhaseHullError, Result};
use crate::hull::HullModel;
use crate::references::find_lowest_energy_unary_refs;
use crate::system::PhaseSystem;
use std::collections::BTreeMap;

/// Distance of a point above the lower hull (eV/atom)
///
/// Values within numerical noise of zero are reported as exactly 0.
/// `None` when the point lies outside the hull footprint or the hull is
/// empty.
pub fn e_above_hull(model: &HullModel, point: &CompositionPoint) -> Option<f64> {
    let e_hull = model.e_hull_at(point.fractions())?;
    let distance = point.energy() - e_hull;
    if !distance.is_finite() {
        return None;
    }
    Some(if distance.abs() <= crate::E_ABOVE_HULL_NOISE {
        0.0
    } else {
        distance
    })
}

/// Input accepted by [`calculate_e_above_hull`]
///
/// A single entry yields an `Option<f64>`; a slice yields one value per
/// entry, keyed by entry id (or `entry-<index>` for entries without one).
pub trait HullQuery {
    /// Result type
    type Output;

    /// Entries to evaluate
    fn query_entries(&self) -> &[PhaseEntry];

    /// Assemble per-entry values into the result
    fn into_output(self, values: Vec<Option<f64>>) -> Self::Output;
}

impl HullQuery for &PhaseEntry {
    type Output = Option<f64>;

    fn query_entries(&self) -> &[PhaseEntry] {
        std::slice::from_ref(*self)
    }

    fn into_output(self, values: Vec<Option<f64>>) -> Self::Output {
        values.into_iter().next().flatten()
    }
}

impl HullQuery for &[PhaseEntry] {
    type Output = BTreeMap<String, Option<f64>>;

    fn query_entries(&self) -> &[PhaseEntry] {
        self
    }

    fn into_output(self, values: Vec<Option<f64>>) -> Self::Output {
        self.iter()
            .enumerate()
            .zip(values)
            .map(|((i, entry), value)| (entry.label(i), value))
            .collect()
    }
}

impl HullQuery for &Vec<PhaseEntry> {
    type Output = BTreeMap<String, Option<f64>>;

    fn query_entries(&self) -> &[PhaseEntry] {
        self.as_slice()
    }

    fn into_output(self, values: Vec<Option<f64>>) -> Self::Output {
        self.as_slice().into_output(values)
    }
}

/// Energy above the hull of one or several entries
///
/// The hull is built over the chemical system spanned by the elements of
/// `references`, from the references and the queried entries together.
/// Formation energies are taken against the lowest unary reference of each
/// element.
///
/// # Errors
///
/// - [`PhaseHullError::EmptyReferences`] if `references` is empty
/// - [`PhaseHullError::ElementsNotInReferenceSystem`] if an entry uses an
///   element that no reference covers
/// - [`PhaseHullError::UnsupportedArity`] if the references span more than
///   four elements
pub fn calculate_e_above_hull<Q: HullQuery>(
    input: Q,
    references: &[PhaseEntry],
) -> Result<Q::Output> {
    calculate_e_above_hull_with(input, references, &HullConfig::default())
}

/// [`calculate_e_above_hull`] with an explicit configuration
pub fn calculate_e_above_hull_with<Q: HullQuery>(
    input: Q,
    references: &[PhaseEntry],
    config: &HullConfig,
) -> Result<Q::Output> {
    if references.is_empty() {
        return Err(PhaseHullError::EmptyReferences);
    }

    let elements: Vec<&str> = references
        .iter()
        .flat_map(|r| r.composition.elements())
        .collect();
    let elements = sort_elements(&elements);

    let queried = input.query_entries();
    for (i, entry) in queried.iter().enumerate() {
        let missing = entry.composition.elements_outside(&elements);
        if !missing.is_empty() {
            return Err(PhaseHullError::ElementsNotInReferenceSystem {
                entry: entry.label(i),
                missing,
            });
        }
    }

    let refs = find_lowest_energy_unary_refs(references);
    let hull_points: Vec<PhaseEntry> = references.iter().chain(queried).cloned().collect();
    let system = PhaseSystem::with_references(&elements, refs, hull_points, config)?;

    let values = queried.iter().map(|e| system.e_above_hull(e)).collect();
    Ok(input.into_output(values))
}
