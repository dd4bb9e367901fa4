//! Phase entries: a composition with its computed energy

use crate::composition::Composition;
use serde::{Deserialize, Serialize};

/// One candidate phase of a chemical system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseEntry {
    /// Element → amount
    pub composition: Composition,
    /// Total energy (eV)
    pub energy: f64,
    /// Energy per atom (eV/atom), assumed already correction-adjusted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_per_atom: Option<f64>,
    /// Additive correction to the total energy (eV)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction: Option<f64>,
    /// Identifier, e.g. a database id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
    /// Formation energy per atom (eV/atom)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e_form_per_atom: Option<f64>,
    /// Energy above the lower hull (eV/atom)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e_above_hull: Option<f64>,
    /// Stability flag derived from `e_above_hull`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_stable: Option<bool>,
}

impl PhaseEntry {
    /// Create an entry from a composition and a total energy
    pub fn new(composition: Composition, energy: f64) -> Self {
        Self {
            composition,
            energy,
            energy_per_atom: None,
            correction: None,
            entry_id: None,
            e_form_per_atom: None,
            e_above_hull: None,
            is_stable: None,
        }
    }

    /// Create an entry from `(element, amount)` pairs and an energy per atom
    ///
    /// The total energy is `energy_per_atom * atom_count`.
    pub fn from_energy_per_atom<S: Into<String>>(
        pairs: impl IntoIterator<Item = (S, f64)>,
        energy_per_atom: f64,
    ) -> Self {
        let composition = Composition::from_pairs(pairs);
        let energy = energy_per_atom * composition.atom_count();
        Self::new(composition, energy)
    }

    /// Set the identifier
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.entry_id = Some(id.into());
        self
    }

    /// Set the energy correction
    pub fn with_correction(mut self, correction: f64) -> Self {
        self.correction = Some(correction);
        self
    }

    /// Set a precomputed energy per atom
    pub fn with_energy_per_atom(mut self, energy_per_atom: f64) -> Self {
        self.energy_per_atom = Some(energy_per_atom);
        self
    }

    /// Number of elements with a positive amount
    pub fn arity(&self) -> usize {
        self.composition.arity()
    }

    /// Sum of positive amounts
    pub fn atom_count(&self) -> f64 {
        self.composition.atom_count()
    }

    /// Total energy including the correction
    pub fn corrected_energy(&self) -> f64 {
        self.energy + self.correction.unwrap_or(0.0)
    }

    /// Identifier, or `entry-<index>` when the entry has none
    pub fn label(&self, index: usize) -> String {
        self.entry_id
            .clone()
            .unwrap_or_else(|| format!("entry-{index}"))
    }
}
