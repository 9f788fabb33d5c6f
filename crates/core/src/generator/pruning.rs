//! Strips unwanted dead ends from branch tips.

use super::*;
use crate::flow::BranchPruneRule;
use crate::types::TileId;

/// A branch tile nothing deeper hangs off.
fn is_tip(graph: &ProxyGraph, id: TileId) -> bool {
    let Some(tile) = graph.tile(id) else {
        return false;
    };
    if tile.placement.on_main_path {
        return false;
    }
    let depth = tile.placement.branch_depth;
    !graph.neighbours(id).iter().any(|neighbour| {
        graph.tile(*neighbour).is_some_and(|other| {
            !other.placement.on_main_path && other.placement.branch_depth > depth
        })
    })
}

/// Removes tips matching `rule`, then re-examines the tiles they hung from.
/// Required injected tiles stay. Returns the number of tiles removed.
pub(super) fn prune(catalog: &Catalog, rule: &BranchPruneRule, graph: &mut ProxyGraph) -> usize {
    if rule.tags.is_empty() {
        return 0;
    }
    let mut stack: Vec<TileId> =
        graph.branch_path().iter().copied().filter(|id| is_tip(graph, *id)).collect();
    let mut removed = 0;

    while let Some(id) = stack.pop() {
        let Some(tile) = graph.tile(id) else {
            continue;
        };
        if tile.placement.injection.is_some_and(|injected| injected.required) {
            continue;
        }
        let tags = catalog.template(tile.proxy.prefab).map(|template| &template.tags);
        if !tags.is_some_and(|tags| rule.should_prune(tags)) {
            continue;
        }
        let parent = graph.predecessor(id);
        graph.remove_tile(id);
        removed += 1;
        if let Some(parent) = parent
            && is_tip(graph, parent)
        {
            stack.push(parent);
        }
    }
    removed
}

impl<R: Realizer> Generator<R> {
    pub(super) fn prune_branches(&mut self) {
        let Some(attempt) = self.attempt.as_mut() else {
            return;
        };
        let rule = &self.catalog.flow().branch_prune;
        let removed = prune(&self.catalog, rule, &mut attempt.graph);
        if removed > 0 {
            log::debug!("pruned {removed} branch tiles");
        }
        self.stats.pruned_tiles = removed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::PruneMode;
    use crate::geometry::{Axis, Rotation, Vec3};
    use crate::graph::{DoorwayRef, InjectedTile, PlacedTile, TilePlacement};
    use crate::samples;
    use crate::types::{PrefabId, Tags};

    fn tile(catalog: &Catalog, x: f32, on_main_path: bool, branch_depth: u32) -> PlacedTile {
        let template = catalog.template(PrefabId(0)).expect("template");
        let mut proxy = template.clone_for_placement();
        proxy.set_transform(Rotation::IDENTITY, Vec3::new(x, 0.0, 0.0));
        PlacedTile {
            proxy,
            placement: TilePlacement {
                on_main_path,
                branch_depth,
                entrance: (x != 0.0).then_some(0),
                ..TilePlacement::default()
            },
        }
    }

    /// A main tile at the origin with a two-tile branch running along +X.
    fn branch_graph(catalog: &Catalog) -> (ProxyGraph, [TileId; 3]) {
        let mut graph = ProxyGraph::new();
        let main = graph.add_tile(tile(catalog, 0.0, true, 0));
        let first = graph.add_tile(tile(catalog, 4.0, false, 0));
        let second = graph.add_tile(tile(catalog, 8.0, false, 1));
        graph.make_connection(DoorwayRef::new(main, 1), DoorwayRef::new(first, 0)).expect("link");
        graph.make_connection(DoorwayRef::new(first, 1), DoorwayRef::new(second, 0)).expect("link");
        (graph, [main, first, second])
    }

    #[test]
    fn only_the_deepest_branch_tile_is_a_tip() {
        let catalog =
            Catalog::new(&samples::corridor_flow(5), &samples::corridor_library(), Axis::Y)
                .expect("sample catalog");
        let (graph, [main, first, second]) = branch_graph(&catalog);
        assert!(!is_tip(&graph, main));
        assert!(!is_tip(&graph, first));
        assert!(is_tip(&graph, second));
    }

    #[test]
    fn pruning_walks_back_toward_the_main_path() {
        let catalog =
            Catalog::new(&samples::corridor_flow(5), &samples::corridor_library(), Axis::Y)
                .expect("sample catalog");
        let tags = catalog.template(PrefabId(0)).expect("template").tags.clone();
        let (mut graph, [main, ..]) = branch_graph(&catalog);

        let keep = BranchPruneRule { mode: PruneMode::AllTagsMissing, tags: tags.clone() };
        assert_eq!(prune(&catalog, &keep, &mut graph), 0);

        let strip = BranchPruneRule { mode: PruneMode::AnyTagPresent, tags };
        assert_eq!(prune(&catalog, &strip, &mut graph), 2);
        assert_eq!(graph.all_tiles(), &[main]);
        assert!(graph.connections().is_empty());

        let disabled = BranchPruneRule { mode: PruneMode::AnyTagPresent, tags: Tags::default() };
        assert_eq!(prune(&catalog, &disabled, &mut graph), 0);
    }

    #[test]
    fn required_injected_tips_are_kept() {
        let catalog =
            Catalog::new(&samples::corridor_flow(5), &samples::corridor_library(), Axis::Y)
                .expect("sample catalog");
        let tags = catalog.template(PrefabId(0)).expect("template").tags.clone();
        let (mut graph, [_, first, second]) = branch_graph(&catalog);
        let required = InjectedTile { required: true, locked: false, lock_key: None };
        graph.tile_mut(second).expect("tip").placement.injection = Some(required);

        let strip = BranchPruneRule { mode: PruneMode::AnyTagPresent, tags };
        assert_eq!(prune(&catalog, &strip, &mut graph), 0);
        assert!(graph.tile(first).is_some());
        assert!(graph.tile(second).is_some());
    }
}
