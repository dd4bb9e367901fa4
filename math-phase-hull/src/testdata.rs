//! Test data for phase hull tests and benchmarks
//!
//! Random datasets are seeded so that failures can be replayed.

use crate::entry::PhaseEntry;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random dataset over `elements`
///
/// One or two unary polymorphs per element with energies in [-8, -1] eV/atom,
/// then `n_compounds` compounds with small integer amounts whose formation
/// energy is drawn from [-1, 0.5] eV/atom.
pub fn random_system(elements: &[&str], n_compounds: usize, seed: u64) -> Vec<PhaseEntry> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut entries = Vec::with_capacity(2 * elements.len() + n_compounds);
    let mut mu = Vec::with_capacity(elements.len());

    for element in elements {
        let ground = -1.0 - 7.0 * rng.random::<f64>();
        mu.push(ground);
        entries.push(
            PhaseEntry::from_energy_per_atom([(*element, 1.0)], ground)
                .with_id(format!("{element}-ref")),
        );
        if rng.random::<f64>() < 0.5 {
            let polymorph = ground + 0.3 * rng.random::<f64>();
            entries.push(
                PhaseEntry::from_energy_per_atom([(*element, 2.0)], polymorph)
                    .with_id(format!("{element}-alt")),
            );
        }
    }

    if elements.len() < 2 {
        return entries;
    }

    for i in 0..n_compounds {
        let mut amounts: Vec<f64> = elements
            .iter()
            .map(|_| rng.random_range(0..=4) as f64)
            .collect();
        // at least two elements per compound
        while amounts.iter().filter(|a| **a > 0.0).count() < 2 {
            let k = rng.random_range(0..elements.len());
            amounts[k] += 1.0;
        }
        let total: f64 = amounts.iter().sum();
        let reference: f64 = amounts.iter().zip(&mu).map(|(a, m)| a / total * m).sum();
        let e_form = -1.0 + 1.5 * rng.random::<f64>();

        let pairs: Vec<(&str, f64)> = elements
            .iter()
            .zip(&amounts)
            .filter(|(_, a)| **a > 0.0)
            .map(|(e, a)| (*e, *a))
            .collect();
        entries.push(
            PhaseEntry::from_energy_per_atom(pairs, reference + e_form)
                .with_id(format!("compound-{i}")),
        );
    }

    entries
}

/// Random Li-O dataset
pub fn random_binary_system(n_compounds: usize, seed: u64) -> Vec<PhaseEntry> {
    random_system(&["Li", "O"], n_compounds, seed)
}

/// Random Li-Fe-O dataset
pub fn random_ternary_system(n_compounds: usize, seed: u64) -> Vec<PhaseEntry> {
    random_system(&["Li", "Fe", "O"], n_compounds, seed)
}

/// Random Li-Fe-P-O dataset
pub fn random_quaternary_system(n_compounds: usize, seed: u64) -> Vec<PhaseEntry> {
    random_system(&["Li", "Fe", "P", "O"], n_compounds, seed)
}

/// Elemental references and compounds of the Li-Fe-O system
///
/// Energies are in eV/atom and loosely follow DFT values.
pub fn li_fe_o_entries() -> Vec<PhaseEntry> {
    vec![
        PhaseEntry::from_energy_per_atom([("Li", 1.0)], -1.909).with_id("Li"),
        PhaseEntry::from_energy_per_atom([("Fe", 1.0)], -8.312).with_id("Fe"),
        PhaseEntry::from_energy_per_atom([("O", 2.0)], -4.948).with_id("O2"),
        PhaseEntry::from_energy_per_atom([("Li", 2.0), ("O", 1.0)], -4.759).with_id("Li2O"),
        PhaseEntry::from_energy_per_atom([("Li", 2.0), ("O", 2.0)], -4.386).with_id("Li2O2"),
        PhaseEntry::from_energy_per_atom([("Fe", 1.0), ("O", 1.0)], -8.207).with_id("FeO"),
        PhaseEntry::from_energy_per_atom([("Fe", 2.0), ("O", 3.0)], -6.846).with_id("Fe2O3"),
        PhaseEntry::from_energy_per_atom([("Fe", 3.0), ("O", 4.0)], -7.119).with_id("Fe3O4"),
        PhaseEntry::from_energy_per_atom([("Li", 1.0), ("Fe", 1.0), ("O", 2.0)], -5.891)
            .with_id("LiFeO2"),
        PhaseEntry::from_energy_per_atom([("Li", 5.0), ("Fe", 1.0), ("O", 4.0)], -4.902)
            .with_id("Li5FeO4"),
        PhaseEntry::from_energy_per_atom([("Li", 1.0), ("Fe", 1.0), ("O", 1.0)], -3.000)
            .with_id("LiFeO"),
    ]
}

/// Corners of a binary system at zero energy plus a compound and a
/// metastable phase
///
/// Refs A and B at 0 eV/atom, AB at -5 eV/atom, A3B at -2 eV/atom.
/// A3B lies 0.5 eV/atom above the A-AB tie line.
pub fn binary_scenario() -> Vec<PhaseEntry> {
    vec![
        PhaseEntry::from_energy_per_atom([("A", 1.0)], 0.0).with_id("A"),
        PhaseEntry::from_energy_per_atom([("B", 1.0)], 0.0).with_id("B"),
        PhaseEntry::from_energy_per_atom([("A", 1.0), ("B", 1.0)], -5.0).with_id("AB"),
        PhaseEntry::from_energy_per_atom([("A", 3.0), ("B", 1.0)], -2.0).with_id("A3B"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_system_is_reproducible() {
        let a = random_ternary_system(20, 7);
        let b = random_ternary_system(20, 7);
        assert_eq!(a, b);
        assert_ne!(a, random_ternary_system(20, 8));
    }

    #[test]
    fn test_random_system_shape() {
        let entries = random_quaternary_system(50, 1);
        let unary = entries.iter().filter(|e| e.arity() == 1).count();
        assert!((4..=8).contains(&unary));
        assert_eq!(entries.len() - unary, 50);
        assert!(entries.iter().all(|e| e.energy.is_finite()));
        assert!(entries.iter().all(|e| e.arity() <= 4));
    }

    #[test]
    fn test_unary_only() {
        let entries = random_system(&["Cu"], 10, 3);
        assert!(entries.iter().all(|e| e.arity() == 1));
    }
}
