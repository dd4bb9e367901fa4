//! A chemical system with its references, formation energies and lower hull

use crate::composition::{Composition, CompositionPoint};
use crate::config::HullConfig;
use crate::elements::{chemical_system_label, sort_elements};
use crate::entry::PhaseEntry;
use crate::error::{PhaseHullError, Result};
use crate::evaluate::e_above_hull;
use crate::formation::compute_formation_energy_per_atom;
use crate::hull::HullModel;
use crate::references::{ReferenceMap, find_lowest_energy_unary_refs};
use crate::stats::is_stable;

/// Hull of one chemical system together with its annotated entries
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSystem {
    elements: Vec<String>,
    references: ReferenceMap,
    entries: Vec<PhaseEntry>,
    model: HullModel,
    // hull point index -> entry index
    point_entries: Vec<usize>,
    tolerance: f64,
}

impl PhaseSystem {
    /// Build the system spanned by `elements` from a dataset
    ///
    /// Entries with elements outside the system are dropped. References are
    /// the lowest-energy unary entries of what remains.
    ///
    /// Formation energies computed against these references replace any
    /// precomputed `e_form_per_atom`. A precomputed value is only used for
    /// entries with an element that has no reference.
    pub fn build<S: AsRef<str>>(
        elements: &[S],
        entries: &[PhaseEntry],
        config: &HullConfig,
    ) -> Result<Self> {
        let elements = sort_elements(elements);
        let members: Vec<PhaseEntry> = entries
            .iter()
            .filter(|e| e.arity() > 0 && e.composition.is_subset_of(&elements))
            .cloned()
            .collect();
        if members.len() < entries.len() {
            log::debug!(
                "{}: {} of {} entries belong to the system",
                chemical_system_label(&elements),
                members.len(),
                entries.len()
            );
        }
        let references = find_lowest_energy_unary_refs(&members);
        Self::assemble(elements, references, members, config)
    }

    /// Build the system spanned by `elements` with explicit references
    ///
    /// Every entry must lie inside the system. Precomputed formation energies
    /// are handled as in [`Self::build`].
    pub fn with_references<S: AsRef<str>>(
        elements: &[S],
        references: ReferenceMap,
        entries: Vec<PhaseEntry>,
        config: &HullConfig,
    ) -> Result<Self> {
        let elements = sort_elements(elements);
        for (i, entry) in entries.iter().enumerate() {
            let missing = entry.composition.elements_outside(&elements);
            if !missing.is_empty() {
                return Err(PhaseHullError::ElementsNotInReferenceSystem {
                    entry: entry.label(i),
                    missing,
                });
            }
        }
        Self::assemble(elements, references, entries, config)
    }

    fn assemble(
        elements: Vec<String>,
        references: ReferenceMap,
        mut entries: Vec<PhaseEntry>,
        config: &HullConfig,
    ) -> Result<Self> {
        let arity = elements.len();
        if !(1..=4).contains(&arity) {
            return Err(PhaseHullError::UnsupportedArity { arity });
        }

        let mut points = Vec::with_capacity(entries.len());
        let mut point_entries = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter_mut().enumerate() {
            let e_form =
                compute_formation_energy_per_atom(entry, &references).or(entry.e_form_per_atom);
            entry.e_form_per_atom = e_form;
            if let Some(e_form) = e_form
                && e_form.is_finite()
            {
                points.push(CompositionPoint::new(&entry.composition, &elements, e_form));
                point_entries.push(i);
            }
        }

        let model = HullModel::build(arity, &points, &config.quickhull_options())?;
        log::debug!(
            "{}: {} hull points, {} lower facets",
            chemical_system_label(&elements),
            points.len(),
            model.num_facets()
        );

        let mut system = Self {
            elements,
            references,
            entries: Vec::new(),
            model,
            point_entries,
            tolerance: config.stability_tolerance,
        };

        for entry in entries.iter_mut() {
            entry.e_above_hull = system.e_above_hull(entry);
            entry.is_stable = entry.e_above_hull.map(|e| is_stable(e, system.tolerance));
        }
        system.entries = entries;
        Ok(system)
    }

    /// Elements in canonical order
    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    /// Canonical chemical-system label
    pub fn chemical_system(&self) -> String {
        self.elements.join("-")
    }

    /// Elemental references
    pub fn references(&self) -> &ReferenceMap {
        &self.references
    }

    /// Lower hull
    pub fn model(&self) -> &HullModel {
        &self.model
    }

    /// Entries of the system with formation energy, hull distance and
    /// stability filled in
    pub fn processed_entries(&self) -> &[PhaseEntry] {
        &self.entries
    }

    /// Entries on the hull
    pub fn stable_entries(&self) -> Vec<&PhaseEntry> {
        self.entries
            .iter()
            .filter(|e| e.is_stable == Some(true))
            .collect()
    }

    /// Stability tolerance (eV/atom)
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Formation energy per atom of any entry against this system's references
    ///
    /// Falls back to the entry's precomputed value when a reference is missing.
    pub fn formation_energy(&self, entry: &PhaseEntry) -> Option<f64> {
        compute_formation_energy_per_atom(entry, &self.references).or(entry.e_form_per_atom)
    }

    /// Hull energy at a composition, `None` outside the system or the hull
    pub fn e_hull_at(&self, composition: &Composition) -> Option<f64> {
        if composition.arity() == 0 || !composition.is_subset_of(&self.elements) {
            return None;
        }
        self.model
            .e_hull_at(&composition.fractions_over(&self.elements))
    }

    /// Energy above the hull of an entry (eV/atom)
    pub fn e_above_hull(&self, entry: &PhaseEntry) -> Option<f64> {
        if entry.arity() == 0 || !entry.composition.is_subset_of(&self.elements) {
            return None;
        }
        let e_form = self.formation_energy(entry)?;
        let point = CompositionPoint::new(&entry.composition, &self.elements, e_form);
        e_above_hull(&self.model, &point)
    }

    /// Entry behind a point of the hull model, with its index in
    /// [`Self::processed_entries`]
    pub fn hull_entry(&self, point: usize) -> Option<(usize, &PhaseEntry)> {
        let index = *self.point_entries.get(point)?;
        self.entries.get(index).map(|e| (index, e))
    }

    /// Stable entries a composition decomposes into, with their weights
    ///
    /// Weights are fractions of atoms and sum to 1.
    pub fn decomposition(&self, composition: &Composition) -> Option<Vec<(&PhaseEntry, f64)>> {
        if composition.arity() == 0 || !composition.is_subset_of(&self.elements) {
            return None;
        }
        let parts = self
            .model
            .decomposition(&composition.fractions_over(&self.elements))?;
        Some(
            parts
                .into_iter()
                .filter_map(|(point, weight)| self.hull_entry(point).map(|(_, e)| (e, weight)))
                .collect(),
        )
    }
}
