//! Elemental reference selection
//!
//! Each element's chemical-potential baseline is the unary entry with the
//! lowest corrected energy per atom.

use crate::entry::PhaseEntry;
use std::collections::BTreeMap;

/// Element symbol → reference entry
pub type ReferenceMap = BTreeMap<String, PhaseEntry>;

/// Corrected energy per atom of an entry
///
/// Uses `energy_per_atom` when given, otherwise
/// `(energy + correction) / atom_count`. Returns `None` when the value is
/// not finite (e.g. zero atoms).
pub fn corrected_energy_per_atom(entry: &PhaseEntry) -> Option<f64> {
    let value = match entry.energy_per_atom {
        Some(epa) => epa,
        None => entry.corrected_energy() / entry.atom_count(),
    };
    value.is_finite().then_some(value)
}

/// Pick, for each element, the lowest-energy unary entry
///
/// Non-unary entries are ignored. On ties the first encountered entry is kept.
pub fn find_lowest_energy_unary_refs(entries: &[PhaseEntry]) -> ReferenceMap {
    let mut refs: BTreeMap<String, (f64, &PhaseEntry)> = BTreeMap::new();

    for entry in entries.iter().filter(|e| e.arity() == 1) {
        let Some(epa) = corrected_energy_per_atom(entry) else {
            log::warn!(
                "skipping unary entry {:?} with non-finite energy per atom",
                entry.entry_id
            );
            continue;
        };
        let element = entry.composition.elements()[0].to_string();
        let lower = refs.get(&element).is_none_or(|(best, _)| epa < *best);
        if lower {
            refs.insert(element, (epa, entry));
        }
    }

    refs.into_iter()
        .map(|(element, (_, entry))| (element, entry.clone()))
        .collect()
}

/// Corrected energy per atom of every reference
pub fn reference_energies(refs: &ReferenceMap) -> BTreeMap<String, f64> {
    refs.iter()
        .filter_map(|(element, entry)| {
            corrected_energy_per_atom(entry).map(|epa| (element.clone(), epa))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lowest_unary_wins() {
        let entries = vec![
            PhaseEntry::from_energy_per_atom([("Li", 1.0)], -1.9).with_id("li-a"),
            PhaseEntry::from_energy_per_atom([("Li", 2.0)], -2.0).with_id("li-b"),
            PhaseEntry::from_energy_per_atom([("O", 2.0)], -4.9).with_id("o2"),
            PhaseEntry::from_energy_per_atom([("Li", 2.0), ("O", 1.0)], -5.0).with_id("li2o"),
        ];
        let refs = find_lowest_energy_unary_refs(&entries);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs["Li"].entry_id.as_deref(), Some("li-b"));
        assert_eq!(refs["O"].entry_id.as_deref(), Some("o2"));
    }

    #[test]
    fn test_correction_and_energy_per_atom() {
        let plain = PhaseEntry::from_energy_per_atom([("Fe", 2.0)], -8.0).with_correction(-1.0);
        assert_relative_eq!(corrected_energy_per_atom(&plain).unwrap(), -8.5);

        // energy_per_atom takes precedence over energy/correction
        let given = plain.clone().with_energy_per_atom(-7.0);
        assert_relative_eq!(corrected_energy_per_atom(&given).unwrap(), -7.0);

        let refs = find_lowest_energy_unary_refs(&[given, plain]);
        assert_relative_eq!(reference_energies(&refs)["Fe"], -8.5);
    }

    #[test]
    fn test_ties_keep_first() {
        let entries = vec![
            PhaseEntry::from_energy_per_atom([("A", 1.0)], -1.0).with_id("first"),
            PhaseEntry::from_energy_per_atom([("A", 1.0)], -1.0).with_id("second"),
        ];
        let refs = find_lowest_energy_unary_refs(&entries);
        assert_eq!(refs["A"].entry_id.as_deref(), Some("first"));
    }

    #[test]
    fn test_no_unary_candidates() {
        let ab = PhaseEntry::from_energy_per_atom([("A", 1.0), ("B", 1.0)], -1.0);
        assert!(find_lowest_energy_unary_refs(&[ab]).is_empty());
        let empty = PhaseEntry::new(crate::Composition::new().with("A", 0.0), -1.0);
        assert!(corrected_energy_per_atom(&empty).is_none());
    }

    #[test]
    fn test_non_finite_energies_are_skipped() {
        let entries = vec![
            PhaseEntry::from_energy_per_atom([("Li", 1.0)], f64::NAN).with_id("li-nan"),
            PhaseEntry::from_energy_per_atom([("Li", 1.0)], -1.9).with_id("li"),
            PhaseEntry::from_energy_per_atom([("O", 2.0)], f64::NAN).with_id("o-nan"),
            PhaseEntry::from_energy_per_atom([("Fe", 1.0)], -8.3)
                .with_energy_per_atom(f64::INFINITY),
        ];
        let refs = find_lowest_energy_unary_refs(&entries);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs["Li"].entry_id.as_deref(), Some("li"));
        assert!(!refs.contains_key("O"));
        assert!(!refs.contains_key("Fe"));
    }
}
