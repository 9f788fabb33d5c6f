use tileflow::flow::{
    ConnectionResult, ConnectionRule, ProposedConnection, TileInjectionRule, TileSetSpec,
};
use tileflow::generator::RetryReason;
use tileflow::samples::{corridor_flow, corridor_library};
use tileflow::weighted::Weighted;
use tileflow::{FlowError, FloatRange, GenerationError, Generator, GeneratorSettings, TilePrefab};

struct DenyAll;

impl ConnectionRule for DenyAll {
    fn priority(&self) -> i32 {
        100
    }

    fn evaluate(&self, _connection: &ProposedConnection<'_>) -> ConnectionResult {
        ConnectionResult::Deny
    }
}

#[test]
fn test_injected_tile_is_added_to_the_main_path() {
    let mut library = corridor_library();
    library.prefabs.push(TilePrefab { name: "vault".to_string(), ..library.prefabs[0].clone() });
    let mut flow = corridor_flow(6);
    flow.tile_sets.push(TileSetSpec {
        name: "vaults".to_string(),
        tiles: vec![Weighted::new("vault".to_string(), 1.0)],
        lock_prefabs: Vec::new(),
    });

    for seed in 0..8 {
        let settings = GeneratorSettings { seed: Some(seed), ..GeneratorSettings::default() };
        let mut generator = Generator::new(&flow, &library, settings).expect("valid flow");
        generator
            .inject(&TileInjectionRule {
                path_depth: FloatRange::new(0.4, 0.6),
                required: true,
                ..TileInjectionRule::new("vaults")
            })
            .expect("vaults tile set exists");
        let vault = generator.catalog().templates()[2].prefab;

        let dungeon = generator.generate().expect("corridors always fit");
        let graph = &dungeon.graph;
        assert_eq!(graph.main_path().len(), 7, "seed {seed}: injected rooms are additive");
        let injected: Vec<_> = graph
            .main_path()
            .iter()
            .filter_map(|id| graph.tile(*id))
            .filter(|tile| tile.placement.injection.is_some())
            .collect();
        assert_eq!(injected.len(), 1, "seed {seed}");
        assert_eq!(injected[0].proxy.prefab, vault);
        assert!(injected[0].placement.injection.is_some_and(|marker| marker.required));
    }
}

#[test]
fn test_injecting_an_unknown_tile_set_is_rejected() {
    let settings = GeneratorSettings { seed: Some(1), ..GeneratorSettings::default() };
    let mut generator =
        Generator::new(&corridor_flow(4), &corridor_library(), settings).expect("valid flow");
    let result = generator.inject(&TileInjectionRule::new("nowhere"));
    assert!(matches!(result, Err(FlowError::UnknownTileSet { .. })));
}

#[test]
fn test_host_connection_rule_can_veto_every_pairing() {
    let settings = GeneratorSettings {
        seed: Some(1),
        max_attempt_count: 2,
        ..GeneratorSettings::default()
    };
    let mut generator =
        Generator::new(&corridor_flow(4), &corridor_library(), settings).expect("valid flow");
    generator.add_connection_rule(Box::new(DenyAll));

    match generator.generate() {
        Err(GenerationError::AttemptsExhausted { attempts, retries, .. }) => {
            assert_eq!(attempts, 2);
            assert_eq!(retries.get(&RetryReason::MainPathFailed), Some(&2));
        }
        other => panic!("expected exhausted attempts, got {other:?}"),
    }
    assert_eq!(generator.stats().attempts, 2);
}
