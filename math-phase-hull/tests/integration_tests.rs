//! Integration tests for phase stability analysis

use approx::assert_relative_eq;
use math_phase_hull::{
    Composition, ConfigFormat, HullConfig, HullGeometry, HullSession, PhaseEntry, PhaseSystem,
    calculate_e_above_hull, compute_formation_energy_per_atom, export_json, export_obj,
    find_lowest_energy_unary_refs, get_phase_diagram_stats, load_config, parse_config,
    save_config, testdata,
};
use std::fs;
use std::path::PathBuf;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn output_dir() -> PathBuf {
    let dir = std::env::temp_dir().join("math-phase-hull-tests");
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Build a system and check the hull invariants every dataset must satisfy
fn run_random_system(name: &str, elements: &[&str], entries: &[PhaseEntry]) -> PhaseSystem {
    init_logger();
    let system = PhaseSystem::build(elements, entries, &HullConfig::default())
        .unwrap_or_else(|e| panic!("{name}: failed to build system: {e}"));

    println!("\n=== {} ===", name);
    println!("Entries: {}", system.processed_entries().len());
    println!("Lower facets: {}", system.model().num_facets());
    println!("Stable: {}", system.stable_entries().len());

    assert!(!system.model().is_empty(), "{name}: empty hull");
    for entry in system.processed_entries() {
        let e = entry
            .e_above_hull
            .unwrap_or_else(|| panic!("{name}: no hull distance for {:?}", entry.entry_id));
        assert!(e >= -1e-9, "{name}: {:?} below hull by {e}", entry.entry_id);
    }

    // every element reference lies on the hull
    for reference in system.references().values() {
        assert_eq!(system.e_above_hull(reference), Some(0.0));
    }
    system
}

#[test]
fn test_unary_scenario() {
    let refs = vec![PhaseEntry::from_energy_per_atom([("A", 1.0)], -10.0)];
    let a2 = PhaseEntry::from_energy_per_atom([("A", 2.0)], -9.0);
    let e = calculate_e_above_hull(&a2, &refs).unwrap().unwrap();
    assert_relative_eq!(e, 1.0, epsilon = 1e-12);
}

#[test]
fn test_binary_scenario() {
    let entries = testdata::binary_scenario();
    let refs = &entries[..2];
    let out = calculate_e_above_hull(&entries, refs).unwrap();
    assert_eq!(out["A"], Some(0.0));
    assert_eq!(out["B"], Some(0.0));
    assert_eq!(out["AB"], Some(0.0));
    assert_relative_eq!(out["A3B"].unwrap(), 0.5, epsilon = 1e-12);
}

#[test]
fn test_multi_entry_scenario() {
    let refs = vec![
        PhaseEntry::from_energy_per_atom([("A", 1.0)], 0.0).with_id("A"),
        PhaseEntry::from_energy_per_atom([("B", 1.0)], 0.0).with_id("B"),
    ];
    let mut entries = refs.clone();
    entries.push(PhaseEntry::from_energy_per_atom([("A", 1.0), ("B", 1.0)], 1.0).with_id("AB"));

    let out = calculate_e_above_hull(&entries, &refs).unwrap();
    assert_eq!(out.len(), 3);
    assert_eq!(out["A"], Some(0.0));
    assert_eq!(out["B"], Some(0.0));
    assert_relative_eq!(out["AB"].unwrap(), 1.0, epsilon = 1e-12);
}

#[test]
fn test_error_messages() {
    let a = PhaseEntry::from_energy_per_atom([("A", 1.0)], 0.0);
    let c = PhaseEntry::from_energy_per_atom([("C", 1.0)], 0.0);

    let err = calculate_e_above_hull(&c, std::slice::from_ref(&a)).unwrap_err();
    assert!(err.to_string().contains("reference system"), "{err}");

    let err = calculate_e_above_hull(&a, &[]).unwrap_err();
    assert!(err.to_string().contains("cannot be empty"), "{err}");

    let refs: Vec<PhaseEntry> = ["H", "Li", "Be", "B", "C"]
        .iter()
        .map(|e| PhaseEntry::from_energy_per_atom([(*e, 1.0)], -1.0))
        .collect();
    let err = calculate_e_above_hull(&refs[0], &refs).unwrap_err();
    assert!(!err.is_reference_error());
    assert!(err.to_string().contains("unsupported arity 5"), "{err}");
}

#[test]
fn test_formation_energy_scale_invariance() {
    let entries = testdata::li_fe_o_entries();
    let refs = find_lowest_energy_unary_refs(&entries);
    for entry in &entries {
        let mut scaled = entry.clone();
        scaled.composition = entry
            .composition
            .iter()
            .map(|(e, a)| (e, a * 3.7))
            .collect();
        scaled.energy = entry.energy * 3.7;
        let a = compute_formation_energy_per_atom(entry, &refs).unwrap();
        let b = compute_formation_energy_per_atom(&scaled, &refs).unwrap();
        assert!((a - b).abs() < 1e-9, "{:?}: {a} vs {b}", entry.entry_id);
    }
}

#[test]
fn test_rebuild_is_idempotent() {
    let entries = testdata::random_quaternary_system(150, 5);
    let config = HullConfig::default();
    let first = PhaseSystem::build(&["Li", "Fe", "P", "O"], &entries, &config).unwrap();
    let second = PhaseSystem::build(&["O", "P", "Fe", "Li"], &entries, &config).unwrap();
    assert_eq!(first.model(), second.model());
    assert_eq!(first.processed_entries(), second.processed_entries());

    let serial = config.with_parallel(false);
    let sequential = PhaseSystem::build(&["Li", "Fe", "P", "O"], &entries, &serial).unwrap();
    assert_eq!(first.model(), sequential.model());
}

#[test]
fn test_degenerate_ternary() {
    init_logger();
    // all points in the zero-energy plane
    let entries = vec![
        PhaseEntry::from_energy_per_atom([("Li", 1.0)], -1.9),
        PhaseEntry::from_energy_per_atom([("Fe", 1.0)], -8.3),
        PhaseEntry::from_energy_per_atom([("O", 1.0)], -4.9),
    ];
    let system = PhaseSystem::build(&["Li", "Fe", "O"], &entries, &HullConfig::default()).unwrap();
    assert_eq!(system.model().num_facets(), 0);
    let li_o = Composition::new().with("Li", 1.0).with("O", 1.0);
    assert!(system.e_hull_at(&li_o).is_none());
    let processed = system.processed_entries();
    assert!(processed.iter().all(|e| e.e_above_hull.is_none()));
}

#[test]
fn test_random_binary_systems() {
    for seed in 0..5 {
        let entries = testdata::random_binary_system(40, seed);
        let label = format!("binary-{seed}");
        run_random_system(&label, &["Li", "O"], &entries);
    }
}

#[test]
fn test_random_ternary_systems() {
    for seed in 0..5 {
        let entries = testdata::random_ternary_system(120, seed);
        let label = format!("ternary-{seed}");
        run_random_system(&label, &["Li", "Fe", "O"], &entries);
    }
}

#[test]
fn test_random_quaternary_systems() {
    for seed in 0..3 {
        let entries = testdata::random_quaternary_system(200, seed);
        let label = format!("quaternary-{seed}");
        run_random_system(&label, &["Li", "Fe", "P", "O"], &entries);
    }
}

#[test]
fn test_decomposition_reproduces_hull_energy() {
    let system = run_random_system(
        "Li-Fe-O fixture",
        &["Li", "Fe", "O"],
        &testdata::li_fe_o_entries(),
    );
    let stable: Vec<&str> = system
        .stable_entries()
        .iter()
        .filter_map(|e| e.entry_id.as_deref())
        .collect();
    for id in ["Li", "Fe", "O2", "Li2O"] {
        assert!(stable.contains(&id), "{id} should be stable: {stable:?}");
    }

    let lifeo = Composition::new()
        .with("Li", 1.0)
        .with("Fe", 1.0)
        .with("O", 1.0);
    let parts = system.decomposition(&lifeo).unwrap();
    let total: f64 = parts.iter().map(|(_, w)| w).sum();
    assert_relative_eq!(total, 1.0, epsilon = 1e-9);

    let mixed: f64 = parts
        .iter()
        .map(|(e, w)| w * e.e_form_per_atom.unwrap())
        .sum();
    assert_relative_eq!(mixed, system.e_hull_at(&lifeo).unwrap(), epsilon = 1e-9);
    assert!(parts.iter().all(|(e, _)| e.is_stable == Some(true)));
}

#[test]
fn test_stats_label_and_counts() {
    let mut entries = vec![
        PhaseEntry::from_energy_per_atom([("Li", 1.0)], -1.9),
        PhaseEntry::from_energy_per_atom([("Na", 1.0)], -1.3),
        PhaseEntry::from_energy_per_atom([("O", 2.0)], -4.9),
        PhaseEntry::from_energy_per_atom([("Li", 2.0), ("O", 1.0)], -4.8),
        PhaseEntry::from_energy_per_atom([("Na", 2.0), ("O", 1.0)], -4.1),
        PhaseEntry::from_energy_per_atom([("Li", 1.0), ("Na", 1.0), ("O", 1.0)], -3.9),
    ];
    let mut session = HullSession::new(HullConfig::default());
    let stats = session
        .stats_for(&["Li", "O", "Na"], &entries)
        .unwrap()
        .unwrap();
    assert_eq!(stats.chemical_system, "Na-Li-O");
    assert_eq!(stats.elements, vec!["Na", "Li", "O"]);
    assert_eq!(stats.total, 6);
    assert_eq!((stats.unary, stats.binary, stats.ternary), (3, 2, 1));
    assert_eq!(stats.stable + stats.unstable, 6);
    assert_relative_eq!(stats.hull_distance.unwrap().min, 0.0);

    // plain aggregation over raw entries uses the same label
    entries.push(PhaseEntry::from_energy_per_atom([("Fe", 1.0)], -8.3));
    let raw = get_phase_diagram_stats(&entries, &["O", "Na", "Li"], 4).unwrap();
    assert_eq!(raw.chemical_system, "Na-Li-O");
    assert_eq!(raw.total, 6);
    assert!(raw.energy_range.is_none());
}

#[test]
fn test_session_cache_invalidation() {
    let mut entries = testdata::random_ternary_system(60, 9);
    let mut session = HullSession::new(HullConfig::default());

    let first = session.system_for(&["Li", "Fe", "O"], &entries).unwrap();
    let cached = session.system_for(&["Fe", "O", "Li"], &entries).unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &cached));

    // push the last compound far below everything else
    let last = entries.len() - 1;
    let atoms = entries[last].atom_count();
    entries[last].energy -= 100.0 * atoms;
    let rebuilt = session.system_for(&["Li", "Fe", "O"], &entries).unwrap();
    assert!(!std::sync::Arc::ptr_eq(&first, &rebuilt));
    assert_eq!(session.cache_len(), 1);
    assert_eq!(rebuilt.processed_entries()[last].is_stable, Some(true));
}

#[test]
fn test_config_files() {
    let dir = output_dir();
    let config = HullConfig::default().with_stability_tolerance(0.025);

    let toml_path = dir.join("hull.toml");
    save_config(&config, &toml_path).unwrap();
    assert_eq!(load_config(&toml_path).unwrap(), config);

    let json_path = dir.join("hull.json");
    save_config(&config, &json_path).unwrap();
    assert_eq!(load_config(&json_path).unwrap(), config);

    let partial = parse_config("parallel = false\n", ConfigFormat::Toml).unwrap();
    assert!(!partial.parallel);
    assert_eq!(partial.stability_tolerance, 1e-6);
}

#[test]
fn test_geometry_export() {
    init_logger();
    let system = PhaseSystem::build(
        &["Li", "Fe", "O"],
        &testdata::li_fe_o_entries(),
        &HullConfig::default(),
    )
    .unwrap();
    let geometry = HullGeometry::from_system(&system);
    let dir = output_dir();

    let json_path = dir.join("li_fe_o.json");
    export_json(&geometry, &json_path).unwrap();
    let json = fs::read_to_string(&json_path).unwrap();
    assert!(json.contains("\"chemical_system\": \"Li-Fe-O\""));

    let obj_path = dir.join("li_fe_o.obj");
    export_obj(&geometry, &obj_path).unwrap();
    let obj = fs::read_to_string(&obj_path).unwrap();
    assert_eq!(
        obj.lines().filter(|l| l.starts_with("f ")).count(),
        geometry.num_facets()
    );

    let quaternary = PhaseSystem::build(
        &["Li", "Fe", "P", "O"],
        &testdata::random_quaternary_system(30, 2),
        &HullConfig::default(),
    )
    .unwrap();
    let geometry = HullGeometry::from_system(&quaternary);
    assert_eq!(geometry.dimension, 4);
    assert!(geometry.points.iter().all(|p| p.w.is_some()));
    assert!(geometry.facets.iter().all(|f| f.normal[3] < 0.0));
    assert!(export_obj(&geometry, dir.join("quaternary.obj")).is_err());
}
