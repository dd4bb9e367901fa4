//! Stability classification and per-system statistics

use crate::elements::{chemical_system_label, sort_elements};
use crate::entry::PhaseEntry;
use serde::{Deserialize, Serialize};

/// Check whether an energy above hull counts as stable
pub fn is_stable(e_above_hull: f64, tolerance: f64) -> bool {
    e_above_hull <= tolerance
}

/// Fill `is_stable` from `e_above_hull`
///
/// Entries without a hull distance get `None`. Returns the number of stable
/// entries.
pub fn classify_entries(entries: &mut [PhaseEntry], tolerance: f64) -> usize {
    let mut stable = 0;
    for entry in entries.iter_mut() {
        entry.is_stable = entry.e_above_hull.map(|e| is_stable(e, tolerance));
        if entry.is_stable == Some(true) {
            stable += 1;
        }
    }
    stable
}

/// `{min, max, avg}` of a set of finite values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl ValueRange {
    /// Range of the finite values, `None` if there are none
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values.into_iter().filter(|v| v.is_finite()) {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        (count > 0).then(|| Self {
            min,
            max,
            avg: sum / count as f64,
        })
    }
}

/// Aggregate statistics of a chemical system's entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseStats {
    /// Number of entries considered
    pub total: usize,
    pub unary: usize,
    pub binary: usize,
    pub ternary: usize,
    pub quaternary: usize,
    /// Entries with five or more elements
    pub higher: usize,
    pub stable: usize,
    /// Entries known to lie above the hull
    pub unstable: usize,
    /// Formation energy per atom (eV/atom)
    pub energy_range: Option<ValueRange>,
    /// Energy above hull (eV/atom)
    pub hull_distance: Option<ValueRange>,
    /// Canonical label, e.g. `Na-Li-O`
    pub chemical_system: String,
    /// Elements in canonical order
    pub elements: Vec<String>,
}

impl PhaseStats {
    /// Aggregate `entries` as they are
    ///
    /// The label comes from `elements`, or from the union of the entries'
    /// elements when `elements` is empty.
    pub fn from_entries<S: AsRef<str>>(
        entries: &[PhaseEntry],
        elements: &[S],
        tolerance: f64,
    ) -> Self {
        let elements = if elements.is_empty() {
            let all: Vec<&str> = entries
                .iter()
                .flat_map(|e| e.composition.elements())
                .collect();
            sort_elements(&all)
        } else {
            sort_elements(elements)
        };

        let e_form = entries.iter().filter_map(|e| e.e_form_per_atom);
        let e_hull = entries.iter().filter_map(|e| e.e_above_hull);
        let mut stats = PhaseStats {
            total: entries.len(),
            unary: 0,
            binary: 0,
            ternary: 0,
            quaternary: 0,
            higher: 0,
            stable: 0,
            unstable: 0,
            energy_range: ValueRange::from_values(e_form),
            hull_distance: ValueRange::from_values(e_hull),
            chemical_system: chemical_system_label(&elements),
            elements,
        };

        for entry in entries {
            match entry.arity() {
                0 => {}
                1 => stats.unary += 1,
                2 => stats.binary += 1,
                3 => stats.ternary += 1,
                4 => stats.quaternary += 1,
                _ => stats.higher += 1,
            }

            let state = match entry.is_stable {
                Some(true) => Some(true),
                _ => entry
                    .e_above_hull
                    .filter(|e| e.is_finite())
                    .map(|e| is_stable(e, tolerance))
                    .or(entry.is_stable),
            };
            match state {
                Some(true) => stats.stable += 1,
                Some(false) => stats.unstable += 1,
                None => {}
            }
        }

        stats
    }
}

/// Statistics of the entries of one chemical system
///
/// Entries are restricted to the declared `elements` (all entries when it is
/// empty) and to at most `max_arity` elements. Returns `None` when nothing
/// remains.
pub fn get_phase_diagram_stats<S: AsRef<str>>(
    entries: &[PhaseEntry],
    elements: &[S],
    max_arity: usize,
) -> Option<PhaseStats> {
    let selected: Vec<PhaseEntry> = entries
        .iter()
        .filter(|e| elements.is_empty() || e.composition.is_subset_of(elements))
        .filter(|e| e.arity() <= max_arity)
        .cloned()
        .collect();
    if selected.is_empty() {
        return None;
    }
    let stats = PhaseStats::from_entries(&selected, elements, crate::STABILITY_TOLERANCE);
    Some(stats)
}
