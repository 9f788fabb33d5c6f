use proptest::{
    arbitrary::any,
    test_runner::{Config as ProptestConfig, TestCaseError, TestRunner},
};
use tileflow::graph::DoorwayRef;
use tileflow::samples::{corridor_flow, corridor_library, demo_project};
use tileflow::{GeneratedDungeon, Generator, GeneratorSettings};

fn check_layout(dungeon: &GeneratedDungeon, max_overlap: f32) -> Result<(), String> {
    let graph = &dungeon.graph;
    let tiles = graph.all_tiles();

    for (index, a) in tiles.iter().enumerate() {
        let a_bounds = graph.tile(*a).ok_or("dangling tile id")?.proxy.bounds;
        for b in &tiles[index + 1..] {
            let b_bounds = graph.tile(*b).ok_or("dangling tile id")?.proxy.bounds;
            if a_bounds.is_overlapping(b_bounds, max_overlap) {
                return Err(format!("tiles {a:?} and {b:?} overlap"));
            }
        }
    }

    for connection in graph.connections() {
        let a = graph.doorway(connection.a).ok_or("connection to a missing doorway")?;
        let b = graph.doorway(connection.b).ok_or("connection to a missing doorway")?;
        if a.connected != Some(connection.b) || b.connected != Some(connection.a) {
            return Err(format!("connection {connection:?} is not symmetric"));
        }
        if a.facing != b.facing.opposite() {
            return Err(format!("connection {connection:?} joins doorways that do not face"));
        }
    }

    for id in tiles {
        let tile = graph.tile(*id).ok_or("dangling tile id")?;
        for doorway in tile.proxy.used_doorways() {
            let here = DoorwayRef::new(*id, doorway.index);
            let listed = graph
                .connections()
                .iter()
                .any(|connection| connection.a == here || connection.b == here);
            if !listed {
                return Err(format!("doorway {here:?} is marked used without a connection"));
            }
        }
    }

    let main_path = graph.main_path();
    for (depth, id) in main_path.iter().enumerate() {
        let placement = &graph.tile(*id).ok_or("dangling tile id")?.placement;
        if placement.path_depth as usize != depth || !placement.on_main_path {
            return Err(format!("main-path tile {depth} has placement {placement:?}"));
        }
    }
    for pair in main_path.windows(2) {
        if !graph.are_connected(pair[0], pair[1]) {
            return Err(format!("main-path tiles {pair:?} are not connected"));
        }
    }
    for id in graph.branch_path() {
        if graph.predecessor(*id).is_none() {
            return Err(format!("branch tile {id:?} hangs from nothing"));
        }
    }
    Ok(())
}

#[test]
fn test_demo_layouts_hold_invariants() {
    let project = demo_project();
    let mut runner = TestRunner::new(ProptestConfig::with_cases(24));

    runner
        .run(&any::<u64>(), |seed| {
            let settings = GeneratorSettings { seed: Some(seed), ..project.settings.clone() };
            let max_overlap = settings.overlap_threshold;
            let mut generator = Generator::new(&project.flow, &project.library, settings)
                .map_err(|err| TestCaseError::fail(err.to_string()))?;
            if let Ok(dungeon) = generator.generate() {
                check_layout(dungeon, max_overlap).map_err(TestCaseError::fail)?;
                let stats = &dungeon.stats;
                if stats.total_rooms != dungeon.graph.len() {
                    return Err(TestCaseError::fail("room count disagrees with the graph"));
                }
            }
            Ok(())
        })
        .expect("generated layouts should preserve invariants");
}

#[test]
fn test_corridor_length_is_exact_for_any_seed() {
    let mut runner = TestRunner::new(ProptestConfig::with_cases(32));

    runner
        .run(&(any::<u64>(), 2..12_i32), |(seed, length)| {
            let settings = GeneratorSettings { seed: Some(seed), ..GeneratorSettings::default() };
            let flow = corridor_flow(length);
            let mut generator = Generator::new(&flow, &corridor_library(), settings)
                .map_err(|err| TestCaseError::fail(err.to_string()))?;
            let dungeon =
                generator.generate().map_err(|err| TestCaseError::fail(err.to_string()))?;
            check_layout(dungeon, 0.01).map_err(TestCaseError::fail)?;
            if dungeon.graph.main_path().len() != length as usize {
                return Err(TestCaseError::fail(format!(
                    "expected {length} tiles, got {}",
                    dungeon.graph.main_path().len()
                )));
            }
            Ok(())
        })
        .expect("corridor flows always reach their exact length");
}

#[test]
fn test_demo_main_path_stays_within_its_length_range() {
    let project = demo_project();
    let (min, max) = (project.flow.length.min as usize, project.flow.length.max as usize);
    let mut successes = 0;
    for seed in 0..16 {
        let settings = GeneratorSettings { seed: Some(seed), ..project.settings.clone() };
        let mut generator =
            Generator::new(&project.flow, &project.library, settings).expect("demo flow is valid");
        let Ok(dungeon) = generator.generate().cloned() else {
            continue;
        };
        successes += 1;
        let length = dungeon.graph.main_path().len();
        assert!((min..=max).contains(&length), "seed {seed}: main path of {length}");
        let first = dungeon.graph.tile(dungeon.graph.main_path()[0]).expect("first tile");
        let last = dungeon.graph.tile(dungeon.graph.main_path()[length - 1]).expect("last tile");
        assert_eq!(generator.catalog().node(first.placement.node.expect("start")).label, "start");
        assert_eq!(generator.catalog().node(last.placement.node.expect("goal")).label, "goal");
    }
    assert!(successes > 0, "no demo seed generated");
}
