//! Analysis session: memoized hulls per chemical system
//!
//! A [`HullSession`] owns its cache. It holds one hull per canonical element
//! list, tagged with a content hash of every entry field that enters the
//! hull. Editing, adding or removing an entry leads to a rebuild that
//! replaces the stale hull.

use crate::config::HullConfig;
use crate::elements::sort_elements;
use crate::entry::PhaseEntry;
use crate::error::Result;
use crate::stats::PhaseStats;
use crate::system::PhaseSystem;
use rayon::prelude::*;
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Content hash of a chemical system and its dataset
pub fn content_hash<S: AsRef<str>>(elements: &[S], entries: &[PhaseEntry]) -> u64 {
    let mut hasher = DefaultHasher::new();
    sort_elements(elements).hash(&mut hasher);
    entries.len().hash(&mut hasher);
    for entry in entries {
        for (element, amount) in entry.composition.iter() {
            element.hash(&mut hasher);
            amount.to_bits().hash(&mut hasher);
        }
        entry.energy.to_bits().hash(&mut hasher);
        entry.energy_per_atom.map(f64::to_bits).hash(&mut hasher);
        entry.correction.map(f64::to_bits).hash(&mut hasher);
        entry.e_form_per_atom.map(f64::to_bits).hash(&mut hasher);
        entry.entry_id.hash(&mut hasher);
    }
    hasher.finish()
}

/// Hull cached for one chemical system
#[derive(Debug)]
struct CachedSystem {
    key: u64,
    system: Arc<PhaseSystem>,
}

/// Session-scoped hull cache
#[derive(Debug, Default)]
pub struct HullSession {
    config: HullConfig,
    // canonical elements -> latest hull
    cache: HashMap<Vec<String>, CachedSystem>,
    hits: usize,
    misses: usize,
}

impl HullSession {
    /// Create a session with the given configuration
    pub fn new(config: HullConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Session configuration
    pub fn config(&self) -> &HullConfig {
        &self.config
    }

    /// Hull of the system spanned by `elements`, built on first use
    pub fn system_for<S: AsRef<str>>(
        &mut self,
        elements: &[S],
        entries: &[PhaseEntry],
    ) -> Result<Arc<PhaseSystem>> {
        let elements = sort_elements(elements);
        let key = content_hash(&elements, entries);
        if let Some(system) = self.lookup(&elements, key) {
            self.hits += 1;
            return Ok(system);
        }
        self.misses += 1;
        let system = Arc::new(PhaseSystem::build(&elements, entries, &self.config)?);
        self.store(elements, key, Arc::clone(&system));
        Ok(system)
    }

    fn lookup(&self, elements: &[String], key: u64) -> Option<Arc<PhaseSystem>> {
        self.cache
            .get(elements)
            .filter(|cached| cached.key == key)
            .map(|cached| Arc::clone(&cached.system))
    }

    fn store(&mut self, elements: Vec<String>, key: u64, system: Arc<PhaseSystem>) {
        let label = system.chemical_system();
        let previous = self.cache.insert(elements, CachedSystem { key, system });
        if previous.is_some() {
            log::debug!("session: replaced stale hull of {label}");
        } else {
            let cached = self.cache.len();
            log::debug!("session: built {label} ({cached} cached systems)");
        }
    }

    /// Entries of the system annotated with formation energy, hull distance
    /// and stability
    pub fn process_entries<S: AsRef<str>>(
        &mut self,
        elements: &[S],
        entries: &[PhaseEntry],
    ) -> Result<Vec<PhaseEntry>> {
        let system = self.system_for(elements, entries)?;
        Ok(system.processed_entries().to_vec())
    }

    /// Statistics of the processed entries of a system
    pub fn stats_for<S: AsRef<str>>(
        &mut self,
        elements: &[S],
        entries: &[PhaseEntry],
    ) -> Result<Option<PhaseStats>> {
        let system = self.system_for(elements, entries)?;
        let processed = system.processed_entries();
        if processed.is_empty() {
            return Ok(None);
        }
        let tolerance = self.config.stability_tolerance;
        let stats = PhaseStats::from_entries(processed, system.elements(), tolerance);
        Ok(Some(stats))
    }

    /// Build several systems over one dataset, filling the cache
    ///
    /// Systems already cached are reused. The rest are built in parallel
    /// when the configuration allows it.
    pub fn process_systems<S: AsRef<str> + Sync>(
        &mut self,
        systems: &[Vec<S>],
        entries: &[PhaseEntry],
    ) -> Vec<Result<Arc<PhaseSystem>>> {
        let keyed: Vec<(Vec<String>, u64)> = systems
            .iter()
            .map(|elements| {
                let elements = sort_elements(elements);
                let key = content_hash(&elements, entries);
                (elements, key)
            })
            .collect();
        let cached: Vec<Option<Arc<PhaseSystem>>> = keyed
            .iter()
            .map(|(elements, key)| self.lookup(elements, *key))
            .collect();
        let pending: Vec<&Vec<String>> = keyed
            .iter()
            .zip(&cached)
            .filter(|(_, c)| c.is_none())
            .map(|((elements, _), _)| elements)
            .collect();

        self.misses += pending.len();
        self.hits += systems.len() - pending.len();
        let mut built = build_systems(&pending, entries, &self.config).into_iter();

        let mut results = Vec::with_capacity(systems.len());
        for ((elements, key), cached) in keyed.into_iter().zip(cached) {
            if let Some(system) = cached {
                results.push(Ok(system));
            } else if let Some(result) = built.next() {
                results.push(result.map(|system| {
                    let system = Arc::new(system);
                    self.store(elements, key, Arc::clone(&system));
                    system
                }));
            }
        }
        results
    }

    /// Number of cached systems
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Cache hits and misses so far
    pub fn cache_stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }

    /// Drop every cached system
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

/// Build independent chemical systems from one dataset
///
/// Runs on the rayon thread pool when `config.parallel` is set and there is
/// more than one system. Results keep the order of `systems`.
pub fn process_systems<S: AsRef<str> + Sync>(
    systems: &[Vec<S>],
    entries: &[PhaseEntry],
    config: &HullConfig,
) -> Vec<Result<PhaseSystem>> {
    let refs: Vec<&Vec<S>> = systems.iter().collect();
    build_systems(&refs, entries, config)
}

fn build_systems<S: AsRef<str> + Sync>(
    systems: &[&Vec<S>],
    entries: &[PhaseEntry],
    config: &HullConfig,
) -> Vec<Result<PhaseSystem>> {
    if !config.parallel || systems.len() < 2 {
        return systems
            .iter()
            .map(|elements| PhaseSystem::build(elements.as_slice(), entries, config))
            .collect();
    }
    systems
        .par_iter()
        .map(|elements| PhaseSystem::build(elements.as_slice(), entries, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Vec<PhaseEntry> {
        vec![
            PhaseEntry::from_energy_per_atom([("A", 1.0)], -1.0).with_id("A"),
            PhaseEntry::from_energy_per_atom([("B", 1.0)], -2.0).with_id("B"),
            PhaseEntry::from_energy_per_atom([("C", 1.0)], -3.0).with_id("C"),
            PhaseEntry::from_energy_per_atom([("A", 1.0), ("B", 1.0)], -2.5).with_id("AB"),
            PhaseEntry::from_energy_per_atom([("B", 1.0), ("C", 1.0)], -2.0).with_id("BC"),
        ]
    }

    #[test]
    fn test_cache_reuse_and_invalidation() {
        let mut session = HullSession::new(HullConfig::default());
        let mut entries = dataset();
        let first = session.system_for(&["A", "B"], &entries).unwrap();
        let again = session.system_for(&["B", "A"], &entries).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(session.cache_len(), 1);
        assert_eq!(session.cache_stats(), (1, 1));

        entries[3].energy = -10.0;
        let rebuilt = session.system_for(&["A", "B"], &entries).unwrap();
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert_eq!(session.cache_stats(), (1, 2));

        // the edited dataset replaces the stale hull instead of adding one
        assert_eq!(session.cache_len(), 1);
        drop(again);
        assert_eq!(Arc::strong_count(&first), 1);
        let cached = session.system_for(&["A", "B"], &entries).unwrap();
        assert!(Arc::ptr_eq(&cached, &rebuilt));

        session.system_for(&["B", "C"], &entries).unwrap();
        assert_eq!(session.cache_len(), 2);

        session.clear();
        assert_eq!(session.cache_len(), 0);
    }

    #[test]
    fn test_content_hash() {
        let entries = dataset();
        assert_eq!(
            content_hash(&["A", "B"], &entries),
            content_hash(&["B", "A"], &entries)
        );
        assert_ne!(
            content_hash(&["A", "B"], &entries),
            content_hash(&["A", "B"], &entries[..4])
        );
    }

    #[test]
    fn test_process_systems_keeps_order() {
        let entries = dataset();
        let systems = vec![vec!["A", "B"], vec!["B", "C"], vec!["A", "B", "C"]];
        let parallel = process_systems(&systems, &entries, &HullConfig::default());
        let sequential = process_systems(
            &systems,
            &entries,
            &HullConfig::default().with_parallel(false),
        );
        let labels: Vec<String> = parallel
            .iter()
            .map(|r| r.as_ref().unwrap().chemical_system())
            .collect();
        // B and C are boron and carbon; A has no electronegativity and goes last
        assert_eq!(labels, vec!["B-A", "B-C", "B-C-A"]);
        for (p, s) in parallel.iter().zip(&sequential) {
            assert_eq!(p.as_ref().unwrap(), s.as_ref().unwrap());
        }

        let mut session = HullSession::new(HullConfig::default());
        session.system_for(&["A", "B"], &entries).unwrap();
        let results = session.process_systems(&systems, &entries);
        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(session.cache_len(), 3);
        assert_eq!(session.cache_stats(), (1, 3));
    }

    #[test]
    fn test_stats_for() {
        let mut session = HullSession::new(HullConfig::default());
        let stats = session
            .stats_for(&["A", "B", "C"], &dataset())
            .unwrap()
            .unwrap();
        assert_eq!(stats.total, 5);
        assert_eq!(stats.unary, 3);
        assert_eq!(stats.binary, 2);
        assert_eq!(stats.stable + stats.unstable, 5);
    }
}
