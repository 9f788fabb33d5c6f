use env_logger::Env;
use tileflow::samples::{corridor_flow, corridor_library, demo_project};
use tileflow::{GenerationError, Generator, GeneratorSettings, SnapshotRealizer};

fn init_test_log() {
    let _ = env_logger::Builder::from_env(Env::default().filter_or("TILEFLOW_LOG", "warn"))
        .is_test(true)
        .try_init();
}

fn demo_fingerprint(seed: u64) -> Result<u64, GenerationError> {
    let project = demo_project();
    let settings = GeneratorSettings { seed: Some(seed), ..project.settings.clone() };
    let mut generator =
        Generator::new(&project.flow, &project.library, settings).expect("demo flow is valid");
    generator.generate().map(|dungeon| dungeon.graph.fingerprint())
}

#[test]
fn test_identical_seeds_produce_identical_layouts() {
    init_test_log();
    for seed in [0, 1, 7, 12345, u64::MAX] {
        assert_eq!(demo_fingerprint(seed), demo_fingerprint(seed), "seed {seed}");
    }
}

#[test]
fn test_different_seeds_produce_different_layouts() {
    let fingerprints: Vec<u64> = (0..12).filter_map(|seed| demo_fingerprint(seed).ok()).collect();
    assert!(fingerprints.len() > 1, "too few successful generations to compare");
    assert!(
        fingerprints.iter().any(|fingerprint| *fingerprint != fingerprints[0]),
        "every seed produced the same layout"
    );
}

#[test]
fn test_fixed_seed_corridor_layout() {
    init_test_log();
    let settings = GeneratorSettings { seed: Some(12345), ..GeneratorSettings::default() };
    let mut generator = Generator::with_realizer(
        &corridor_flow(5),
        &corridor_library(),
        settings,
        SnapshotRealizer::default(),
    )
    .expect("corridor flow is valid");

    let dungeon = generator.generate().expect("a straight corridor always fits").clone();
    assert_eq!(dungeon.seed, 12345);
    assert_eq!(dungeon.attempt_seed, 12345);
    assert_eq!(dungeon.graph.main_path().len(), 5);
    assert!(dungeon.graph.branch_path().is_empty());
    assert_eq!(dungeon.graph.connections().len(), 4);
    assert_eq!(dungeon.stats.attempts, 1);
    assert_eq!(dungeon.stats.total_retries, 0);
    assert_eq!(dungeon.stats.main_path_rooms, 5);
    assert_eq!(dungeon.stats.total_rooms, 5);
    assert!(dungeon.locks.is_empty());
    assert!(dungeon.keys.is_empty());

    let snapshot = generator.realizer().snapshot().expect("snapshot captured");
    assert_eq!(snapshot.fingerprint, dungeon.graph.fingerprint());
    let depths: Vec<u32> = snapshot.tiles.iter().map(|tile| tile.path_depth).collect();
    assert_eq!(depths, vec![0, 1, 2, 3, 4]);
    assert_eq!(snapshot.tiles[4].normalized_path_depth, 1.0);
}

#[test]
fn test_randomized_seed_is_reported() {
    let settings = GeneratorSettings { randomize_seed: true, ..GeneratorSettings::default() };
    let mut generator =
        Generator::new(&corridor_flow(3), &corridor_library(), settings).expect("valid flow");
    let seed = generator.seed();
    let dungeon = generator.generate().expect("corridor fits");
    assert_eq!(dungeon.seed, seed);
}
