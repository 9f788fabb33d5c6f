//! Hooks that turn a proxy layout into something concrete, plus a serializable
//! snapshot of a finished dungeon.

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::generator::{GeneratedDungeon, GenerationStats};
use crate::geometry::{Bounds, Vec3};
use crate::graph::ProxyGraph;
use crate::types::TileId;

/// Receives the layout once tiles are final. Both hooks default to no-ops.
pub trait Realizer {
    /// Called after the layout is complete and overlapping doorways are joined.
    fn instantiate(&mut self, _graph: &ProxyGraph, _catalog: &Catalog) {}

    /// Called once locks and keys are placed.
    fn finalize(&mut self, _dungeon: &GeneratedDungeon, _catalog: &Catalog) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NullRealizer;

impl Realizer for NullRealizer {}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileSnapshot {
    pub prefab: String,
    pub position: Vec3,
    pub quarter_turns: u8,
    pub bounds: Bounds,
    pub on_main_path: bool,
    pub path_depth: u32,
    pub branch_depth: u32,
    pub normalized_path_depth: f32,
    pub tile_set: Option<String>,
    pub archetype: Option<String>,
    pub node: Option<String>,
    pub branch_id: Option<u32>,
}

/// One connection, as `(tile ordinal, doorway index)` pairs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSnapshot {
    pub a: (usize, usize),
    pub b: (usize, usize),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LockSnapshot {
    pub tile: usize,
    pub doorway: usize,
    pub key: String,
    pub lock_prefab: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeySnapshot {
    pub key: String,
    pub tile: usize,
    pub position: Vec3,
    pub lock: usize,
}

/// Name-resolved, arena-independent view of a dungeon, suitable for JSON output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DungeonSnapshot {
    pub seed: u64,
    pub attempt_seed: u64,
    pub fingerprint: u64,
    pub tiles: Vec<TileSnapshot>,
    pub connections: Vec<ConnectionSnapshot>,
    pub locks: Vec<LockSnapshot>,
    pub keys: Vec<KeySnapshot>,
    pub stats: GenerationStats,
}

impl DungeonSnapshot {
    pub fn capture(dungeon: &GeneratedDungeon, catalog: &Catalog) -> Self {
        let graph = &dungeon.graph;
        let ordinal = |id: TileId| graph.ordinal(id).unwrap_or(usize::MAX);
        let prefab_name = |id| catalog.template(id).map(|t| t.name.clone()).unwrap_or_default();
        let key_name =
            |id| catalog.flow().keys.get(id).map(|key| key.name.clone()).unwrap_or_default();

        let tiles = graph
            .all_tiles()
            .iter()
            .filter_map(|id| graph.tile(*id))
            .map(|tile| {
                let placement = &tile.placement;
                TileSnapshot {
                    prefab: prefab_name(tile.proxy.prefab),
                    position: tile.proxy.position,
                    quarter_turns: tile.proxy.rotation.turns(),
                    bounds: tile.proxy.bounds,
                    on_main_path: placement.on_main_path,
                    path_depth: placement.path_depth,
                    branch_depth: placement.branch_depth,
                    normalized_path_depth: placement.normalized_path_depth,
                    tile_set: placement.tile_set.map(|id| catalog.tile_set(id).name.clone()),
                    archetype: placement.archetype.map(|id| catalog.archetype(id).name.clone()),
                    node: placement.node.map(|id| catalog.node(id).label.clone()),
                    branch_id: placement.branch_id,
                }
            })
            .collect();

        let connections = graph
            .connections()
            .iter()
            .map(|connection| ConnectionSnapshot {
                a: (ordinal(connection.a.tile), connection.a.index),
                b: (ordinal(connection.b.tile), connection.b.index),
            })
            .collect();

        let locks = dungeon
            .locks
            .iter()
            .map(|lock| LockSnapshot {
                tile: ordinal(lock.doorway.tile),
                doorway: lock.doorway.index,
                key: key_name(lock.key),
                lock_prefab: lock.lock_prefab.map(prefab_name),
            })
            .collect();

        let keys = dungeon
            .keys
            .iter()
            .map(|key| {
                let position = graph
                    .tile(key.tile)
                    .and_then(|tile| {
                        let template = catalog.template(tile.proxy.prefab)?;
                        let point = template.key_spawn_points.get(key.spawn_point)?;
                        let offset = tile.proxy.rotation.apply(point.position, tile.proxy.up);
                        Some(tile.proxy.position + offset)
                    })
                    .unwrap_or_default();
                KeySnapshot {
                    key: key_name(key.key),
                    tile: ordinal(key.tile),
                    position,
                    lock: key.lock,
                }
            })
            .collect();

        Self {
            seed: dungeon.seed,
            attempt_seed: dungeon.attempt_seed,
            fingerprint: graph.fingerprint(),
            tiles,
            connections,
            locks,
            keys,
            stats: dungeon.stats.clone(),
        }
    }
}

/// Keeps a [`DungeonSnapshot`] of the last finished dungeon.
#[derive(Clone, Debug, Default)]
pub struct SnapshotRealizer {
    instantiated_tiles: usize,
    snapshot: Option<DungeonSnapshot>,
}

impl SnapshotRealizer {
    pub fn snapshot(&self) -> Option<&DungeonSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn take_snapshot(&mut self) -> Option<DungeonSnapshot> {
        self.snapshot.take()
    }

    /// Tile count seen by the most recent instantiate call.
    pub fn instantiated_tiles(&self) -> usize {
        self.instantiated_tiles
    }
}

impl Realizer for SnapshotRealizer {
    fn instantiate(&mut self, graph: &ProxyGraph, _catalog: &Catalog) {
        self.instantiated_tiles = graph.len();
    }

    fn finalize(&mut self, dungeon: &GeneratedDungeon, catalog: &Catalog) {
        self.snapshot = Some(DungeonSnapshot::capture(dungeon, catalog));
    }
}
