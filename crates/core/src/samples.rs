//! Built-in tile libraries and flows: a bare corridor for smoke tests and a
//! small keyed dungeon that exercises nodes, branches, locks and injection.

use crate::config::Project;
use crate::flow::{
    ArchetypeSpec, BranchCapMode, BranchMode, BranchPruneRule, ConnectionRuleSpec, DungeonFlow,
    FlowLine, FlowNode, KeyManager, KeySpec, LockPrefabSpec, LockSpec, NodeLockPlacement,
    PruneMode, TagPair, TagPairMode, TileInjectionRule, TileSetSpec,
};
use crate::geometry::{Bounds, Direction, Vec3};
use crate::library::{DoorwaySpec, TileLibrary, TilePrefab};
use crate::settings::GeneratorSettings;
use crate::types::{FloatRange, IntRange, RepeatMode, Tags};
use crate::weighted::{DepthCurve, Weighted, WeightedTable};

fn bounds(min: (f32, f32, f32), max: (f32, f32, f32)) -> Bounds {
    Bounds::from_corners(Vec3::new(min.0, min.1, min.2), Vec3::new(max.0, max.1, max.2))
}

fn door(x: f32, z: f32, facing: Direction) -> DoorwaySpec {
    DoorwaySpec::new(Vec3::new(x, 0.0, z), facing)
}

fn weighted(name: &str, weight: f32) -> Weighted<String> {
    Weighted::new(name.to_string(), weight)
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|name| (*name).to_string()).collect()
}

/// Two straight corridor pieces along X. Prefab 0 is four units long with
/// doorway 0 facing -X and doorway 1 facing +X.
pub fn corridor_library() -> TileLibrary {
    TileLibrary {
        prefabs: vec![
            TilePrefab::new("corridor", bounds((-2.0, 0.0, -1.0), (2.0, 3.0, 1.0)))
                .with_doorway(door(-2.0, 0.0, Direction::NegX))
                .with_doorway(door(2.0, 0.0, Direction::PosX))
                .with_tags(Tags::new(["corridor"])),
            TilePrefab::new("corridor_long", bounds((-4.0, 0.0, -1.0), (4.0, 3.0, 1.0)))
                .with_doorway(door(-4.0, 0.0, Direction::NegX))
                .with_doorway(door(4.0, 0.0, Direction::PosX))
                .with_tags(Tags::new(["corridor"])),
        ],
    }
}

/// A branchless main path of exactly `length` corridor tiles.
pub fn corridor_flow(length: i32) -> DungeonFlow {
    DungeonFlow {
        length: IntRange::exactly(length),
        branch_mode: BranchMode::Local,
        branch_count: IntRange::default(),
        tile_sets: vec![TileSetSpec {
            name: "corridors".to_string(),
            tiles: vec![weighted("corridor", 1.0), weighted("corridor_long", 1.0)],
            lock_prefabs: Vec::new(),
        }],
        archetypes: vec![ArchetypeSpec {
            name: "hall".to_string(),
            tile_sets: names(&["corridors"]),
            branch_start_tile_sets: Vec::new(),
            branch_start_mode: BranchCapMode::InsteadOf,
            branch_cap_tile_sets: Vec::new(),
            branch_cap_mode: BranchCapMode::InsteadOf,
            branch_count: IntRange::default(),
            branching_depth: IntRange::default(),
            straighten_chance: 0.0,
            unique: false,
        }],
        lines: vec![FlowLine {
            position: 0.0,
            length: 1.0,
            archetypes: names(&["hall"]),
            keys: Vec::new(),
            locks: Vec::new(),
        }],
        nodes: Vec::new(),
        connection_chance: 0.0,
        restrict_connection_to_same_section: false,
        connection_rules: Vec::new(),
        injection_rules: Vec::new(),
        branch_prune: BranchPruneRule::default(),
        keys: KeyManager::default(),
    }
}

pub fn demo_library() -> TileLibrary {
    TileLibrary {
        prefabs: vec![
            TilePrefab::new("start_room", bounds((-3.0, 0.0, -3.0), (3.0, 4.0, 3.0)))
                .with_doorway(door(3.0, 0.0, Direction::PosX))
                .with_doorway(door(0.0, 3.0, Direction::PosZ))
                .with_tags(Tags::new(["start", "room"]))
                .with_key_spawn_point(Vec3::new(0.0, 0.0, 0.0)),
            TilePrefab::new("cross_room", bounds((-4.0, 0.0, -4.0), (4.0, 4.0, 4.0)))
                .with_doorway(door(-4.0, 0.0, Direction::NegX))
                .with_doorway(door(4.0, 0.0, Direction::PosX))
                .with_doorway(door(0.0, -4.0, Direction::NegZ))
                .with_doorway(door(0.0, 4.0, Direction::PosZ))
                .with_tags(Tags::new(["room"]))
                .with_key_spawn_point(Vec3::new(1.0, 0.0, 1.0)),
            TilePrefab::new("corridor", bounds((-2.0, 0.0, -1.0), (2.0, 3.0, 1.0)))
                .with_doorway(door(-2.0, 0.0, Direction::NegX))
                .with_doorway(door(2.0, 0.0, Direction::PosX))
                .with_tags(Tags::new(["corridor"])),
            TilePrefab::new("corner", bounds((-2.0, 0.0, -2.0), (2.0, 3.0, 2.0)))
                .with_doorway(door(-2.0, 0.0, Direction::NegX))
                .with_doorway(door(0.0, 2.0, Direction::PosZ))
                .with_tags(Tags::new(["corridor"])),
            TilePrefab::new("dead_end", bounds((-2.0, 0.0, -2.0), (2.0, 3.0, 2.0)))
                .with_doorway(door(-2.0, 0.0, Direction::NegX))
                .with_tags(Tags::new(["dead_end"]))
                .with_key_spawn_point(Vec3::new(0.0, 0.0, 0.0)),
            TilePrefab::new("treasure_room", bounds((-3.0, 0.0, -3.0), (3.0, 4.0, 3.0)))
                .with_doorway(door(-3.0, 0.0, Direction::NegX))
                .with_tags(Tags::new(["treasure", "room"]))
                .with_repeat_mode(RepeatMode::Disallow)
                .with_key_spawn_point(Vec3::new(0.0, 0.0, 1.0)),
            TilePrefab {
                entrance: Some(0),
                ..TilePrefab::new("goal_room", bounds((-5.0, 0.0, -5.0), (5.0, 5.0, 5.0)))
                    .with_doorway(door(-5.0, 0.0, Direction::NegX))
                    .with_tags(Tags::new(["goal", "room"]))
            },
            TilePrefab::new("locked_door", bounds((-0.5, 0.0, -1.0), (0.5, 3.0, 1.0)))
                .with_doorway(door(0.0, 0.0, Direction::PosX)),
        ],
    }
}

pub fn demo_flow() -> DungeonFlow {
    let corridor_weight = Weighted {
        value: "corridor".to_string(),
        main_path_weight: 2.0,
        branch_path_weight: 1.0,
        depth_curve: DepthCurve::from_keys(vec![(0.0, 1.5), (1.0, 0.5)]),
    };
    let tile_set = |name: &str, tiles: Vec<Weighted<String>>| TileSetSpec {
        name: name.to_string(),
        tiles,
        lock_prefabs: Vec::new(),
    };

    DungeonFlow {
        length: IntRange::new(6, 9),
        branch_mode: BranchMode::Local,
        branch_count: IntRange::default(),
        tile_sets: vec![
            tile_set("start", vec![weighted("start_room", 1.0)]),
            tile_set("goal", vec![weighted("goal_room", 1.0)]),
            TileSetSpec {
                name: "rooms".to_string(),
                tiles: vec![weighted("cross_room", 1.0), corridor_weight, weighted("corner", 1.0)],
                lock_prefabs: vec![LockPrefabSpec {
                    socket: None,
                    prefabs: WeightedTable::new(vec![weighted("locked_door", 1.0)]),
                }],
            },
            tile_set("dead_ends", vec![weighted("dead_end", 1.0)]),
            tile_set("treasure", vec![weighted("treasure_room", 1.0)]),
        ],
        archetypes: vec![
            ArchetypeSpec {
                name: "halls".to_string(),
                tile_sets: names(&["rooms"]),
                branch_start_tile_sets: Vec::new(),
                branch_start_mode: BranchCapMode::InsteadOf,
                branch_cap_tile_sets: names(&["dead_ends"]),
                branch_cap_mode: BranchCapMode::AsWellAs,
                branch_count: IntRange::new(0, 2),
                branching_depth: IntRange::new(1, 3),
                straighten_chance: 0.3,
                unique: false,
            },
            ArchetypeSpec {
                name: "vaults".to_string(),
                tile_sets: names(&["rooms"]),
                branch_start_tile_sets: Vec::new(),
                branch_start_mode: BranchCapMode::InsteadOf,
                branch_cap_tile_sets: Vec::new(),
                branch_cap_mode: BranchCapMode::InsteadOf,
                branch_count: IntRange::new(1, 1),
                branching_depth: IntRange::new(1, 2),
                straighten_chance: 0.0,
                unique: true,
            },
        ],
        lines: vec![
            FlowLine {
                position: 0.0,
                length: 0.5,
                archetypes: names(&["halls"]),
                keys: names(&["gold", "silver"]),
                locks: Vec::new(),
            },
            FlowLine {
                position: 0.5,
                length: 0.5,
                archetypes: names(&["halls", "vaults"]),
                keys: Vec::new(),
                locks: vec![LockSpec { key: "silver".to_string(), count: IntRange::new(0, 1) }],
            },
        ],
        nodes: vec![
            FlowNode {
                label: "start".to_string(),
                position: 0.0,
                tile_sets: names(&["start"]),
                lock_placement: NodeLockPlacement::default(),
                keys: names(&["gold"]),
                locks: Vec::new(),
            },
            FlowNode {
                label: "goal".to_string(),
                position: 1.0,
                tile_sets: names(&["goal"]),
                lock_placement: NodeLockPlacement { entrance: true, exit: false },
                keys: Vec::new(),
                locks: vec![LockSpec { key: "gold".to_string(), count: IntRange::exactly(1) }],
            },
        ],
        connection_chance: 0.25,
        restrict_connection_to_same_section: false,
        connection_rules: vec![ConnectionRuleSpec::TilePairTags {
            priority: 0,
            mode: TagPairMode::Reject,
            pairs: vec![TagPair::new("start", "dead_end")],
        }],
        injection_rules: vec![TileInjectionRule {
            path_depth: FloatRange::new(0.3, 0.7),
            can_appear_on_main_path: false,
            can_appear_on_branch_path: true,
            ..TileInjectionRule::new("treasure")
        }],
        branch_prune: BranchPruneRule {
            mode: PruneMode::AnyTagPresent,
            tags: Tags::new(["dead_end"]),
        },
        keys: KeyManager { keys: vec![KeySpec::new("gold"), KeySpec::new("silver")] },
    }
}

pub fn demo_project() -> Project {
    Project {
        flow: demo_flow(),
        library: demo_library(),
        settings: GeneratorSettings { seed: Some(1), ..GeneratorSettings::default() },
    }
}
