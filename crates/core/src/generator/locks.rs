//! Depth normalization, locked doorways and key placement on a finished layout.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, Lock};
use crate::graph::{DoorwayRef, ProxyGraph};
use crate::random::RandomStream;
use crate::types::{KeyId, LineId, PrefabId, TileId};
use crate::weighted::DrawContext;

/// Slack when comparing a key tile's depth against its lock's depth.
const DEPTH_EPSILON: f32 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LockedDoorway {
    /// The locked doorway, on the tile nearer the start.
    pub doorway: DoorwayRef,
    pub partner: Option<DoorwayRef>,
    pub key: KeyId,
    /// Normalized path depth of the tile in front of the lock.
    pub depth: f32,
    pub lock_prefab: Option<PrefabId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPlacement {
    pub key: KeyId,
    pub tile: TileId,
    /// Index into the tile's key spawn points.
    pub spawn_point: usize,
    /// Index of the lock this key opens.
    pub lock: usize,
}

pub(super) struct PlacedLocks {
    pub locks: Vec<LockedDoorway>,
    pub keys: Vec<KeyPlacement>,
    pub abandoned: usize,
}

/// A doorway to lock: `near` is the tile in front of it, `behind` the root of
/// everything it seals off.
#[derive(Clone, Copy, Debug)]
struct LockRequest {
    doorway: DoorwayRef,
    near: TileId,
    behind: TileId,
    key: KeyId,
}

/// Fills in normalized depths from the final layout's maxima.
pub(super) fn normalize_depths(graph: &mut ProxyGraph) {
    let ids = graph.all_tiles().to_vec();
    let mut max_path = 0;
    let mut max_branch = 0;
    for id in &ids {
        if let Some(tile) = graph.tile(*id) {
            max_path = max_path.max(tile.placement.path_depth);
            if !tile.placement.on_main_path {
                max_branch = max_branch.max(tile.placement.branch_depth);
            }
        }
    }
    for id in ids {
        let Some(tile) = graph.tile_mut(id) else {
            continue;
        };
        let placement = &mut tile.placement;
        placement.normalized_path_depth = ratio(placement.path_depth, max_path);
        placement.normalized_branch_depth =
            if placement.on_main_path { 0.0 } else { ratio(placement.branch_depth, max_branch) };
    }
}

fn ratio(value: u32, max: u32) -> f32 {
    if max == 0 { 0.0 } else { value as f32 / max as f32 }
}

fn pick_key(locks: &[Lock], random: &mut RandomStream) -> Option<KeyId> {
    if locks.is_empty() {
        return None;
    }
    Some(locks[random.next_index(locks.len())].key)
}

/// The doorway on `tile` that `next` entered through.
/// The doorway on `next`'s predecessor that leads into `next`.
fn exit_toward(graph: &ProxyGraph, next: TileId) -> Option<DoorwayRef> {
    let entrance = graph.tile(next)?.placement.entrance?;
    graph.doorway(DoorwayRef::new(next, entrance))?.connected
}

fn gather_requests(
    catalog: &Catalog,
    graph: &ProxyGraph,
    random: &mut RandomStream,
) -> Vec<LockRequest> {
    let mut requests = Vec::new();
    let mut locked = BTreeSet::new();
    // Each doorway pair is locked at most once, whichever source claims it first.
    let mut push = |request: LockRequest,
                    partner: Option<DoorwayRef>,
                    requests: &mut Vec<LockRequest>| {
        if locked.contains(&request.doorway) || partner.is_some_and(|p| locked.contains(&p)) {
            return;
        }
        locked.insert(request.doorway);
        if let Some(partner) = partner {
            locked.insert(partner);
        }
        requests.push(request);
    };
    let main_path = graph.main_path();

    for (index, &id) in main_path.iter().enumerate() {
        let Some(node_id) = graph.tile(id).and_then(|tile| tile.placement.node) else {
            continue;
        };
        let node = catalog.node(node_id);
        if node.lock_placement.entrance
            && let Some(doorway) = exit_toward(graph, id)
            && let Some(key) = pick_key(&node.locks, random)
        {
            let partner = graph.doorway(doorway).and_then(|d| d.connected);
            let near = doorway.tile;
            push(LockRequest { doorway, near, behind: id, key }, partner, &mut requests);
        }
        if node.lock_placement.exit
            && let Some(&next) = main_path.get(index + 1)
            && let Some(doorway) = exit_toward(graph, next)
            && let Some(key) = pick_key(&node.locks, random)
        {
            let partner = graph.doorway(doorway).and_then(|d| d.connected);
            push(LockRequest { doorway, near: id, behind: next, key }, partner, &mut requests);
        }
    }

    for (line_index, line) in catalog.lines().iter().enumerate() {
        if line.locks.is_empty() {
            continue;
        }
        let mut candidates: Vec<(DoorwayRef, TileId, TileId)> = main_path
            .windows(2)
            .filter_map(|pair| {
                let (near, behind) = (graph.tile(pair[0])?, graph.tile(pair[1])?);
                let in_line = |line: Option<LineId>| {
                    line.is_some_and(|line| line.index() == line_index)
                };
                if !in_line(near.placement.line) || !in_line(behind.placement.line) {
                    return None;
                }
                let tile_set = catalog.tile_set(near.placement.tile_set?);
                if tile_set.lock_prefabs.is_empty() {
                    return None;
                }
                Some((exit_toward(graph, pair[1])?, pair[0], pair[1]))
            })
            .collect();
        for lock in &line.locks {
            let drawn = usize::try_from(lock.count.random(random)).unwrap_or(0);
            for _ in 0..drawn.min(candidates.len()) {
                let picked = random.next_index(candidates.len());
                let (doorway, near, behind) = candidates.swap_remove(picked);
                let partner = graph.doorway(doorway).and_then(|d| d.connected);
                push(LockRequest { doorway, near, behind, key: lock.key }, partner, &mut requests);
            }
        }
    }

    for &id in graph.all_tiles() {
        let Some(injected) = graph.tile(id).and_then(|tile| tile.placement.injection) else {
            continue;
        };
        let (true, Some(key)) = (injected.locked, injected.lock_key) else {
            continue;
        };
        if let Some(doorway) = exit_toward(graph, id) {
            let partner = graph.doorway(doorway).and_then(|d| d.connected);
            let near = doorway.tile;
            push(LockRequest { doorway, near, behind: id, key }, partner, &mut requests);
        }
    }
    requests
}

/// Whether `tile` sits in the subtree rooted at `root`, following entrances back
/// toward the start.
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

/// Whether a tile's node (or, failing that, its line) lists `key`.
fn holds_key(catalog: &Catalog, graph: &ProxyGraph, tile: TileId, key: KeyId) -> bool {
    let Some(placement) = graph.tile(tile).map(|tile| &tile.placement) else {
        return false;
    };
    if let Some(node) = placement.node {
        return catalog.node(node).keys.contains(&key);
    }
    placement.line.is_some_and(|line| catalog.line(line.index()).keys.contains(&key))
}

fn choose_lock_prefab(
    catalog: &Catalog,
    graph: &ProxyGraph,
    doorway: DoorwayRef,
    random: &mut RandomStream,
) -> Option<PrefabId> {
    let tile = graph.tile(doorway.tile)?;
    let template = catalog.template(tile.proxy.prefab)?;
    let socket = &template.doorways.get(doorway.index)?.socket;
    let tile_set = catalog.tile_set(tile.placement.tile_set?);
    let entries: Vec<_> = tile_set
        .lock_prefabs
        .iter()
        .filter(|entry| entry.socket.as_ref().is_none_or(|wanted| wanted == socket))
        .collect();
    if entries.is_empty() {
        return None;
    }
    let mut table = entries[random.next_index(entries.len())].prefabs.clone();
    let context =
        DrawContext::new(tile.placement.on_main_path, tile.placement.normalized_path_depth);
    table.draw(random, context).map(|entry| entry.value)
}

/// Locks doorways for nodes, lines and injected tiles, then spreads keys over
/// tiles reachable before each lock.
pub(super) fn place_locks_and_keys(
    catalog: &Catalog,
    graph: &ProxyGraph,
    random: &mut RandomStream,
) -> PlacedLocks {
    let requests = gather_requests(catalog, graph, random);
    let mut placed = PlacedLocks { locks: Vec::new(), keys: Vec::new(), abandoned: 0 };
    let mut used_points = BTreeSet::new();

    for request in requests {
        let Some(spec) = catalog.flow().keys.get(request.key) else {
            placed.abandoned += 1;
            continue;
        };
        let depth =
            graph.tile(request.near).map_or(0.0, |tile| tile.placement.normalized_path_depth);

        let mut candidates = Vec::new();
        for &id in graph.all_tiles() {
            let Some(tile) = graph.tile(id) else {
                continue;
            };
            if tile.placement.normalized_path_depth > depth + DEPTH_EPSILON
                || is_behind(graph, id, request.behind)
                || !holds_key(catalog, graph, id, request.key)
            {
                continue;
            }
            let Some(template) = catalog.template(tile.proxy.prefab) else {
                continue;
            };
            for (point_index, point) in template.key_spawn_points.iter().enumerate() {
                let used = used_points.contains(&(id, point_index, request.key));
                if point.accepts(&spec.name) && !used {
                    candidates.push((id, point_index));
                }
            }
        }

        if candidates.is_empty() {
            log::debug!("no spawn point for key {:?}, lock abandoned", spec.name);
            placed.abandoned += 1;
            continue;
        }

        let lock_index = placed.locks.len();
        let wanted = usize::try_from(spec.keys_per_lock.random(random)).unwrap_or(1).max(1);
        for _ in 0..wanted.min(candidates.len()) {
            let picked = random.next_index(candidates.len());
            let (tile, spawn_point) = candidates.swap_remove(picked);
            used_points.insert((tile, spawn_point, request.key));
            placed.keys.push(KeyPlacement {
                key: request.key,
                tile,
                spawn_point,
                lock: lock_index,
            });
        }
        placed.locks.push(LockedDoorway {
            doorway: request.doorway,
            partner: graph.doorway(request.doorway).and_then(|d| d.connected),
            key: request.key,
            depth,
            lock_prefab: choose_lock_prefab(catalog, graph, request.doorway, random),
        });
    }
    placed
}
