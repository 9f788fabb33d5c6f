//! Places one tile: rank candidates, position each, keep the first that fits.

use crate::catalog::Catalog;
use crate::graph::{DoorwayRef, PlacedTile, ProxyGraph, TilePlacement};
use crate::pairing::PairFinder;
use crate::random::RandomStream;
use crate::settings::GeneratorSettings;
use crate::template::{TileProxy, TileTemplate};
use crate::types::{ArchetypeId, RepeatMode, TileId, TileSetId};

use super::stats::{GenerationStats, PlacementFailure};

pub(super) struct PlacementContext<'a> {
    pub catalog: &'a Catalog,
    pub settings: &'a GeneratorSettings,
    pub graph: &'a mut ProxyGraph,
    pub random: &'a mut RandomStream,
    pub stats: &'a mut GenerationStats,
}

pub(super) struct TileRequest<'a> {
    /// Frontier tile to attach to; `None` places the first tile at the origin.
    pub previous: Option<TileId>,
    pub tile_sets: &'a [TileSetId],
    pub archetype: Option<ArchetypeId>,
    /// Depth used for weight curves: path depth on the main path, branch depth on branches.
    pub normalized_depth: f32,
    /// Bookkeeping copied onto the new tile; `tile_set` and `entrance` are filled in here.
    pub placement: TilePlacement,
}

pub(super) fn add_tile(
    context: &mut PlacementContext<'_>,
    request: TileRequest<'_>,
) -> Result<TileId, PlacementFailure> {
    let catalog = context.catalog;
    let settings = context.settings;
    let table = catalog.merged_table(request.tile_sets);
    let archetype = request.archetype.map(|id| catalog.archetype(id));

    let pairs = {
        let graph: &ProxyGraph = &*context.graph;
        let finder = PairFinder {
            catalog,
            graph,
            previous: request.previous,
            tiles: &table,
            archetype,
            on_main_path: request.placement.on_main_path,
            normalized_depth: request.normalized_depth,
            up: settings.up_axis,
            allow_rotation: settings.allow_tile_rotation,
            max_pairing_attempts: settings.max_pairing_attempts,
        };
        finder.find(&mut *context.random, |previous, next| repeat_allowed(graph, previous, next))
    };

    for pair in pairs {
        let Some(template) = catalog.template(pair.next_prefab) else {
            context.stats.record_failure(PlacementFailure::TemplateIsNull);
            continue;
        };
        let mut proxy = template.clone_for_placement();
        if let Some(previous_doorway) = pair.previous {
            let Some(other) = context.graph.doorway(previous_doorway) else {
                context.stats.record_failure(PlacementFailure::NewTileIsNull);
                continue;
            };
            proxy.position_by_socket(pair.next_doorway, other);
        }

        if let Err(failure) = check_placement(settings, context.graph, &proxy, request.previous) {
            context.stats.record_failure(failure);
            continue;
        }

        let mut placement = request.placement.clone();
        placement.tile_set = request.tile_sets.iter().copied().find(|id| {
            let entries = catalog.tile_set(*id).tiles.entries();
            entries.iter().any(|entry| entry.value == pair.next_prefab)
        });
        placement.entrance = pair.previous.map(|_| pair.next_doorway);

        let id = context.graph.add_tile(PlacedTile { proxy, placement });
        let entrance = DoorwayRef::new(id, pair.next_doorway);
        if let Some(previous_doorway) = pair.previous
            && let Err(error) = context.graph.make_connection(previous_doorway, entrance)
        {
            log::debug!("discarding placed tile: {error}");
            context.graph.remove_tile(id);
            context.stats.record_failure(PlacementFailure::NewTileIsNull);
            continue;
        }
        return Ok(id);
    }

    context.stats.record_failure(PlacementFailure::NoValidTile);
    Err(PlacementFailure::NoValidTile)
}

fn repeat_allowed(
    graph: &ProxyGraph,
    previous: Option<&TileTemplate>,
    next: &TileTemplate,
) -> bool {
    match next.repeat_mode {
        RepeatMode::Allow | RepeatMode::DisallowImmediate => {}
        RepeatMode::Disallow => {
            let already_placed = graph
                .all_tiles()
                .iter()
                .filter_map(|id| graph.tile(*id))
                .any(|tile| tile.proxy.prefab == next.prefab);
            if already_placed {
                return false;
            }
        }
    }
    match previous {
        Some(previous) if previous.prefab == next.prefab => {
            previous.repeat_mode == RepeatMode::Allow && next.repeat_mode == RepeatMode::Allow
        }
        _ => true,
    }
}

/// Bounds and collision checks for a positioned candidate. The tile it attaches
/// to may overlap by up to `overlap_threshold`; every other tile must stay
/// `padding` away.
fn check_placement(
    settings: &GeneratorSettings,
    graph: &ProxyGraph,
    proxy: &TileProxy,
    attached_to: Option<TileId>,
) -> Result<(), PlacementFailure> {
    if settings.restrict_to_bounds && !settings.placement_bounds.contains(proxy.bounds) {
        return Err(PlacementFailure::OutOfBounds);
    }
    for &id in graph.all_tiles() {
        let Some(other) = graph.tile(id) else {
            continue;
        };
        let colliding = if Some(id) == attached_to {
            proxy.is_overlapping(&other.proxy, settings.overlap_threshold)
        } else if settings.disallow_overhangs {
            proxy.is_overlapping_or_overhanging(&other.proxy, -settings.padding)
        } else {
            proxy.is_overlapping(&other.proxy, -settings.padding)
        };
        if colliding {
            return Err(PlacementFailure::TileIsColliding);
        }
    }
    Ok(())
}
