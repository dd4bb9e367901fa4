//! Formation energies relative to elemental references

use crate::entry::PhaseEntry;
use crate::references::{ReferenceMap, corrected_energy_per_atom};

/// Formation energy per atom of `entry` against `refs` (eV/atom)
///
/// `e_pa - Σ x_e · μ_e` where `e_pa` is the corrected energy per atom of the
/// entry, `x_e` its atomic fractions and `μ_e` the corrected energy per atom
/// of each element's reference. The result does not depend on the scale of
/// the composition.
///
/// Returns `None` when an element has no reference, when the entry has no
/// atoms, or when the result is not finite.
pub fn compute_formation_energy_per_atom(entry: &PhaseEntry, refs: &ReferenceMap) -> Option<f64> {
    let atoms = entry.atom_count();
    if atoms <= 0.0 {
        return None;
    }
    let e_pa = entry.corrected_energy() / atoms;

    let mut mix_pa = 0.0;
    for (element, fraction) in entry.composition.fractions() {
        let reference = refs.get(&element)?;
        mix_pa += fraction * corrected_energy_per_atom(reference)?;
    }

    let e_form = e_pa - mix_pa;
    e_form.is_finite().then_some(e_form)
}

/// Fill missing `e_form_per_atom` values in place
///
/// Precomputed values are kept, unlike [`crate::PhaseSystem::build`] which
/// recomputes them against the system references. Returns how many entries
/// still have no formation energy afterwards.
pub fn annotate_formation_energies(entries: &mut [PhaseEntry], refs: &ReferenceMap) -> usize {
    let mut missing = 0;
    for entry in entries.iter_mut() {
        if entry.e_form_per_atom.is_none() {
            entry.e_form_per_atom = compute_formation_energy_per_atom(entry, refs);
        }
        if entry.e_form_per_atom.is_none() {
            missing += 1;
        }
    }
    if missing > 0 {
        log::debug!("{missing} entries have no formation energy (missing references)");
    }
    missing
}
