//! Enumerates and ranks admissible (next tile, next doorway) candidates against
//! the open doorways of a frontier tile.

use crate::catalog::{Archetype, Catalog};
use crate::flow::ProposedConnection;
use crate::geometry::{Axis, Direction};
use crate::graph::{DoorwayRef, ProxyGraph};
use crate::random::RandomStream;
use crate::template::TileTemplate;
use crate::types::{PrefabId, TileId};
use crate::weighted::{DrawContext, WeightedTable};

/// Doorway weight multiplier applied when the straighten bias fires.
const STRAIGHTEN_BOOST: f64 = 100.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DoorwayPair {
    /// Open doorway on the frontier tile, `None` for the very first tile.
    pub previous: Option<DoorwayRef>,
    pub next_prefab: PrefabId,
    pub next_doorway: usize,
    pub tile_weight: f32,
    pub doorway_weight: f64,
}

pub struct PairFinder<'a> {
    pub catalog: &'a Catalog,
    pub graph: &'a ProxyGraph,
    pub previous: Option<TileId>,
    pub tiles: &'a WeightedTable<PrefabId>,
    pub archetype: Option<&'a Archetype>,
    pub on_main_path: bool,
    pub normalized_depth: f32,
    pub up: Axis,
    /// Replaces each tile's own rotation flag when set.
    pub allow_rotation: Option<bool>,
    pub max_pairing_attempts: Option<usize>,
}

impl PairFinder<'_> {
    /// Ranked candidates, best first. `is_tile_allowed` receives the previous
    /// tile's template (if any) and the candidate's.
    pub fn find<F>(&self, random: &mut RandomStream, is_tile_allowed: F) -> Vec<DoorwayPair>
    where
        F: Fn(Option<&TileTemplate>, &TileTemplate) -> bool,
    {
        let order = self.priority_order(random);
        let order_len = order.len();
        let previous_template = self
            .previous
            .and_then(|id| self.graph.tile(id))
            .and_then(|tile| self.catalog.template(tile.proxy.prefab));

        let mut pairs = Vec::new();
        match self.previous.zip(previous_template) {
            None => {
                for (rank, prefab) in order.iter().enumerate() {
                    let Some(template) = self.catalog.template(*prefab) else {
                        continue;
                    };
                    if !is_tile_allowed(None, template) {
                        continue;
                    }
                    let tile_weight = (order_len - rank) as f32;
                    for next_doorway in 0..template.doorways.len() {
                        pairs.push(DoorwayPair {
                            previous: None,
                            next_prefab: *prefab,
                            next_doorway,
                            tile_weight,
                            doorway_weight: random.next_double(),
                        });
                    }
                }
            }
            Some((previous_id, previous_template)) => {
                for previous_doorway in self.open_doorways(previous_id, previous_template) {
                    for (rank, prefab) in order.iter().enumerate() {
                        let Some(template) = self.catalog.template(*prefab) else {
                            continue;
                        };
                        if !is_tile_allowed(Some(previous_template), template) {
                            continue;
                        }
                        let tile_weight = (order_len - rank) as f32;
                        self.push_pairs_for_tile(
                            &mut pairs,
                            random,
                            previous_template,
                            previous_doorway,
                            template,
                            tile_weight,
                        );
                    }
                }
            }
        }

        pairs.sort_by(|a, b| {
            b.tile_weight
                .total_cmp(&a.tile_weight)
                .then_with(|| b.doorway_weight.total_cmp(&a.doorway_weight))
        });
        if let Some(cap) = self.max_pairing_attempts {
            pairs.truncate(cap);
        }
        pairs
    }

    /// Drains a copy of the tile table so heavier tiles tend to come first
    /// without always winning.
    fn priority_order(&self, random: &mut RandomStream) -> Vec<PrefabId> {
        let mut table = self.tiles.clone();
        let mut order = Vec::with_capacity(table.len());
        while table.has_positive_weight(self.on_main_path, self.normalized_depth) {
            let context = DrawContext {
                remove_on_draw: true,
                ..DrawContext::new(self.on_main_path, self.normalized_depth)
            };
            match table.draw(random, context) {
                Some(entry) => order.push(entry.value),
                None => break,
            }
        }
        order
    }

    fn open_doorways(&self, previous: TileId, template: &TileTemplate) -> Vec<DoorwayRef> {
        let unused: Vec<DoorwayRef> = self.graph.unused_doorways(previous).collect();
        match template.exit {
            Some(exit) if unused.iter().any(|doorway| doorway.index == exit) => {
                vec![DoorwayRef::new(previous, exit)]
            }
            _ => unused,
        }
    }

    fn push_pairs_for_tile(
        &self,
        pairs: &mut Vec<DoorwayPair>,
        random: &mut RandomStream,
        previous_template: &TileTemplate,
        previous_doorway: DoorwayRef,
        template: &TileTemplate,
        tile_weight: f32,
    ) {
        let Some(previous_proxy) = self.graph.doorway(previous_doorway) else {
            return;
        };
        let Some(previous_spec) = previous_template.doorways.get(previous_doorway.index) else {
            return;
        };
        let allow_rotation = self.allow_rotation.unwrap_or(template.allow_rotation);

        for (next_doorway, doorway) in template.doorways.iter().enumerate() {
            if template.entrance.is_some_and(|entrance| entrance != next_doorway)
                || template.exit == Some(next_doorway)
            {
                continue;
            }
            let proposal = ProposedConnection {
                previous_tile: previous_template,
                previous_doorway: previous_spec,
                next_tile: template,
                next_doorway: doorway,
            };
            if !self.catalog.rules().can_connect(&proposal)
                || !facing_is_compatible(
                    previous_proxy.facing,
                    doorway.facing,
                    allow_rotation,
                    self.up,
                )
            {
                continue;
            }

            let mut doorway_weight = random.next_double();
            if let Some(chance) = self.straighten_chance()
                && self.exits_straight(previous_doorway)
                && random.next_double() < chance
            {
                doorway_weight *= STRAIGHTEN_BOOST;
            }
            pairs.push(DoorwayPair {
                previous: Some(previous_doorway),
                next_prefab: template.prefab,
                next_doorway,
                tile_weight,
                doorway_weight,
            });
        }
    }

    fn straighten_chance(&self) -> Option<f64> {
        self.archetype
            .map(|archetype| f64::from(archetype.straighten_chance))
            .filter(|chance| *chance > 0.0)
    }

    /// The frontier tile was entered through exactly one doorway, and leaving
    /// through `previous_doorway` keeps going in the same direction.
    fn exits_straight(&self, previous_doorway: DoorwayRef) -> bool {
        let mut used = self.graph.used_doorways(previous_doorway.tile);
        let (Some(entrance), None) = (used.next(), used.next()) else {
            return false;
        };
        match (self.graph.doorway(entrance), self.graph.doorway(previous_doorway)) {
            (Some(entrance), Some(exit)) => entrance.facing == exit.facing.opposite(),
            _ => false,
        }
    }
}

/// `previous` is the frontier doorway's world facing and `next` the candidate
/// doorway's local facing.
fn facing_is_compatible(
    previous: Direction,
    next: Direction,
    allow_rotation: bool,
    up: Axis,
) -> bool {
    if previous.is_vertical(up) {
        return next == previous.opposite();
    }
    if next.is_vertical(up) {
        return false;
    }
    allow_rotation || next == previous.opposite()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Rotation, Vec3};
    use crate::graph::{PlacedTile, TilePlacement};
    use crate::samples;
    use crate::types::ArchetypeId;
    use crate::weighted::Weighted;

    fn catalog() -> Catalog {
        Catalog::new(&samples::corridor_flow(5), &samples::corridor_library(), Axis::Y)
            .expect("sample catalog")
    }

    fn finder<'a>(
        catalog: &'a Catalog,
        graph: &'a ProxyGraph,
        previous: Option<TileId>,
        tiles: &'a WeightedTable<PrefabId>,
    ) -> PairFinder<'a> {
        PairFinder {
            catalog,
            graph,
            previous,
            tiles,
            archetype: None,
            on_main_path: true,
            normalized_depth: 0.0,
            up: Axis::Y,
            allow_rotation: None,
            max_pairing_attempts: None,
        }
    }

    #[test]
    fn facing_rules_for_vertical_and_fixed_rotation() {
        assert!(facing_is_compatible(Direction::PosY, Direction::NegY, true, Axis::Y));
        assert!(!facing_is_compatible(Direction::PosY, Direction::PosX, true, Axis::Y));
        assert!(!facing_is_compatible(Direction::PosX, Direction::NegY, true, Axis::Y));
        assert!(facing_is_compatible(Direction::PosX, Direction::PosZ, true, Axis::Y));
        assert!(!facing_is_compatible(Direction::PosX, Direction::PosZ, false, Axis::Y));
        assert!(facing_is_compatible(Direction::PosX, Direction::NegX, false, Axis::Y));
    }

    #[test]
    fn first_tile_yields_every_doorway_of_every_tile() {
        let catalog = catalog();
        let graph = ProxyGraph::new();
        let tiles = catalog.merged_table(&catalog.archetype(ArchetypeId(0)).tile_sets);
        let mut random = RandomStream::new(7);
        let pairs = finder(&catalog, &graph, None, &tiles).find(&mut random, |_, _| true);
        let expected: usize = tiles
            .entries()
            .iter()
            .filter_map(|entry| catalog.template(entry.value))
            .map(|template| template.doorways.len())
            .sum();
        assert_eq!(pairs.len(), expected);
        assert!(pairs.iter().all(|pair| pair.previous.is_none()));
    }

    #[test]
    fn ranking_is_by_tile_priority_then_doorway_weight() {
        let catalog = catalog();
        let graph = ProxyGraph::new();
        let tiles = catalog.merged_table(&catalog.archetype(ArchetypeId(0)).tile_sets);
        let mut random = RandomStream::new(99);
        let pairs = finder(&catalog, &graph, None, &tiles).find(&mut random, |_, _| true);
        for window in pairs.windows(2) {
            let (a, b) = (&window[0], &window[1]);
            assert!(
                a.tile_weight > b.tile_weight
                    || (a.tile_weight == b.tile_weight && a.doorway_weight >= b.doorway_weight)
            );
        }
    }

    #[test]
    fn pairing_cap_truncates_candidates() {
        let catalog = catalog();
        let graph = ProxyGraph::new();
        let tiles = catalog.merged_table(&catalog.archetype(ArchetypeId(0)).tile_sets);
        let mut random = RandomStream::new(1);
        let mut capped = finder(&catalog, &graph, None, &tiles);
        capped.max_pairing_attempts = Some(2);
        assert_eq!(capped.find(&mut random, |_, _| true).len(), 2);
    }

    #[test]
    fn zero_weight_tiles_never_appear() {
        let catalog = catalog();
        let graph = ProxyGraph::new();
        let tiles = WeightedTable::new(vec![
            Weighted::new(PrefabId(0), 0.0),
            Weighted::new(PrefabId(1), 1.0),
        ]);
        let mut random = RandomStream::new(4);
        let pairs = finder(&catalog, &graph, None, &tiles).find(&mut random, |_, _| true);
        assert!(!pairs.is_empty());
        assert!(pairs.iter().all(|pair| pair.next_prefab == PrefabId(1)));
    }

    #[test]
    fn rejected_tiles_are_filtered_by_predicate() {
        let catalog = catalog();
        let mut graph = ProxyGraph::new();
        let template = catalog.template(PrefabId(0)).expect("template");
        let previous = graph.add_tile(PlacedTile {
            proxy: template.clone_for_placement(),
            placement: TilePlacement { on_main_path: true, ..TilePlacement::default() },
        });
        let tiles = catalog.merged_table(&catalog.archetype(ArchetypeId(0)).tile_sets);
        let mut random = RandomStream::new(12);
        let pairs = finder(&catalog, &graph, Some(previous), &tiles)
            .find(&mut random, |previous, next| previous.is_some_and(|p| p.prefab != next.prefab));
        assert!(!pairs.is_empty());
        assert!(pairs.iter().all(|pair| pair.next_prefab != PrefabId(0)));
        assert!(pairs.iter().all(|pair| pair.previous.map(|d| d.tile) == Some(previous)));
    }

    #[test]
    fn designated_exit_is_the_only_open_doorway_while_unused() {
        let mut library = samples::corridor_library();
        library.prefabs[0].exit = Some(1);
        let catalog = Catalog::new(&samples::corridor_flow(5), &library, Axis::Y).expect("catalog");
        let mut graph = ProxyGraph::new();
        let mut proxy = catalog.template(PrefabId(0)).expect("template").clone_for_placement();
        proxy.set_transform(Rotation::IDENTITY, Vec3::ZERO);
        let previous = graph.add_tile(PlacedTile { proxy, placement: TilePlacement::default() });
        let tiles = WeightedTable::new(vec![Weighted::new(PrefabId(1), 1.0)]);
        let mut random = RandomStream::new(2);
        let pairs = finder(&catalog, &graph, Some(previous), &tiles).find(&mut random, |_, _| true);
        assert!(!pairs.is_empty());
        assert!(pairs.iter().all(|pair| pair.previous == Some(DoorwayRef::new(previous, 1))));
    }
}
