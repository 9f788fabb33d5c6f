use tileflow::graph::ProxyGraph;
use tileflow::samples::demo_project;
use tileflow::{GeneratedDungeon, Generator, GeneratorSettings, TileId};

fn is_behind(graph: &ProxyGraph, tile: TileId, root: TileId) -> bool {
    let mut current = Some(tile);
    for _ in 0..=graph.len() {
        match current {
            Some(id) if id == root => return true,
            Some(id) => current = graph.predecessor(id),
            None => return false,
        }
    }
    false
}

fn check_keys(dungeon: &GeneratedDungeon) -> Result<(), String> {
    let graph = &dungeon.graph;
    for (index, lock) in dungeon.locks.iter().enumerate() {
        let partner = lock.partner.ok_or("lock on an unconnected doorway")?;
        // The recorded doorway sits on the tile nearer the start.
        if graph.predecessor(partner.tile) != Some(lock.doorway.tile) {
            return Err(format!("lock {index} is not recorded on the nearer tile"));
        }
        let root = partner.tile;
        let keys: Vec<_> = dungeon.keys.iter().filter(|key| key.lock == index).collect();
        if keys.is_empty() {
            return Err(format!("lock {index} has no key"));
        }
        for key in keys {
            if key.key != lock.key {
                return Err(format!("lock {index} is paired with the wrong key"));
            }
            let tile = graph.tile(key.tile).ok_or("key on a missing tile")?;
            if tile.placement.normalized_path_depth > lock.depth + 1e-6 {
                return Err(format!("key for lock {index} lies deeper than the lock"));
            }
            if is_behind(graph, key.tile, root) {
                return Err(format!("key for lock {index} is sealed behind it"));
            }
        }
    }
    if dungeon.keys.iter().any(|key| key.lock >= dungeon.locks.len()) {
        return Err("key references a lock that was never placed".to_string());
    }
    Ok(())
}

#[test]
fn test_keys_are_reachable_before_their_locks() {
    let project = demo_project();
    let mut successes = 0;
    for seed in 0..24 {
        let settings = GeneratorSettings { seed: Some(seed), ..project.settings.clone() };
        let mut generator =
            Generator::new(&project.flow, &project.library, settings).expect("demo flow is valid");
        let gold = generator.catalog().flow().keys.find("gold").expect("gold key");
        let Ok(dungeon) = generator.generate() else {
            continue;
        };
        successes += 1;
        check_keys(dungeon).unwrap_or_else(|err| panic!("seed {seed}: {err}"));

        let gold_lock = dungeon.locks.iter().find(|lock| lock.key == gold);
        let gold_lock = gold_lock.unwrap_or_else(|| panic!("seed {seed}: goal room is unlocked"));
        let main_path = dungeon.graph.main_path();
        assert_eq!(gold_lock.doorway.tile, main_path[main_path.len() - 2], "seed {seed}");
        assert_eq!(gold_lock.partner.map(|p| p.tile), main_path.last().copied(), "seed {seed}");
        assert_eq!(dungeon.stats.locks_placed, dungeon.locks.len());
        assert_eq!(dungeon.stats.keys_placed, dungeon.keys.len());
    }
    assert!(successes > 0, "no demo seed generated");
}

#[test]
fn test_flows_without_keys_place_no_locks() {
    let mut project = demo_project();
    for node in &mut project.flow.nodes {
        node.locks.clear();
    }
    for line in &mut project.flow.lines {
        line.locks.clear();
    }
    for seed in 0..6 {
        let settings = GeneratorSettings { seed: Some(seed), ..project.settings.clone() };
        let mut generator =
            Generator::new(&project.flow, &project.library, settings).expect("demo flow is valid");
        if let Ok(dungeon) = generator.generate() {
            assert!(dungeon.locks.is_empty());
            assert!(dungeon.keys.is_empty());
        }
    }
}
