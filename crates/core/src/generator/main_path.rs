//! Main path: slot planning, one tile per step, and bounded backtracking.

use std::collections::BTreeSet;

use super::injection::{self, InjectionRequest};
use super::placement::{self, PlacementContext, TileRequest};
use super::*;
use crate::catalog::Line;
use crate::graph::TilePlacement;
use crate::types::{ArchetypeId, LineId, NodeId, TileId};

/// What a main-path slot is filled from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum SlotKind {
    Node(NodeId),
    Line { line: LineId, archetype: ArchetypeId },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct PathSlot {
    pub kind: SlotKind,
    /// Normalized main-path depth of the slot.
    pub depth: f32,
}

#[derive(Clone, Copy, Debug)]
struct PlacedSlot {
    tile: TileId,
    injection: Option<InjectionRequest>,
}

#[derive(Debug, Default)]
pub(super) struct MainPathState {
    slots: Vec<PathSlot>,
    cursor: usize,
    placed: Vec<PlacedSlot>,
    slot_backtracks: u32,
    total_backtracks: u32,
}

enum MainPathStep {
    Placed,
    Backtracked,
    Finished,
    Failed,
}

/// Draws the target length. The path always has room for a start and a goal.
pub(super) fn target_length(
    catalog: &Catalog,
    multiplier: f32,
    random: &mut RandomStream,
) -> usize {
    let drawn = catalog.flow().length.random(random);
    let scaled = (drawn as f32 * multiplier).round();
    if scaled.is_finite() && scaled > 2.0 { scaled as usize } else { 2 }
}

/// Lays out every main-path slot up front. A node claims the first slot whose
/// depth reaches its position; all other slots come from the line covering
/// their depth, with one archetype drawn per line run.
pub(super) fn plan_slots(
    catalog: &Catalog,
    target_length: usize,
    random: &mut RandomStream,
) -> Vec<PathSlot> {
    let nodes = catalog.nodes();
    let mut handled = vec![false; nodes.len()];
    let mut used_unique = BTreeSet::new();
    let mut current: Option<(usize, ArchetypeId)> = None;
    let denominator = target_length.saturating_sub(1).max(1) as f32;
    let mut slots = Vec::with_capacity(target_length + nodes.len());

    let mut index = 0;
    while index < target_length || handled.iter().any(|done| !done) {
        let depth = (index as f32 / denominator).clamp(0.0, 1.0);
        let due_node = (0..nodes.len()).find(|&n| !handled[n] && depth >= nodes[n].position);
        if let Some(node) = due_node {
            handled[node] = true;
            slots.push(PathSlot { kind: SlotKind::Node(NodeId::from_index(node)), depth });
        } else {
            let line = catalog.flow().line_at_depth(depth).unwrap_or(0);
            let archetype = match current {
                Some((current_line, archetype)) if current_line == line => archetype,
                _ => pick_archetype(catalog, catalog.line(line), &mut used_unique, random),
            };
            current = Some((line, archetype));
            slots.push(PathSlot {
                kind: SlotKind::Line { line: LineId::from_index(line), archetype },
                depth,
            });
        }
        index += 1;
    }
    slots
}

fn pick_archetype(
    catalog: &Catalog,
    line: &Line,
    used_unique: &mut BTreeSet<ArchetypeId>,
    random: &mut RandomStream,
) -> ArchetypeId {
    let fresh: Vec<ArchetypeId> = line
        .archetypes
        .iter()
        .copied()
        .filter(|id| !(catalog.archetype(*id).unique && used_unique.contains(id)))
        .collect();
    let pool = if fresh.is_empty() { &line.archetypes } else { &fresh };
    let chosen = pool[random.next_index(pool.len())];
    if catalog.archetype(chosen).unique {
        used_unique.insert(chosen);
    }
    chosen
}

impl<R: Realizer> Generator<R> {
    pub(super) fn prepare_main_path(&mut self) {
        let Some(attempt) = self.attempt.as_mut() else {
            return;
        };
        attempt.pending = injection::gather_injections(
            self.catalog.injection_rules().iter().chain(&self.extra_injections),
            &mut attempt.random,
        );
        let length =
            target_length(&self.catalog, self.settings.length_multiplier, &mut attempt.random);
        attempt.main_path = MainPathState {
            slots: plan_slots(&self.catalog, length, &mut attempt.random),
            ..MainPathState::default()
        };
        log::debug!(
            "main path planned: {} slots, {} injection requests",
            attempt.main_path.slots.len(),
            attempt.pending.len()
        );
    }

    pub(super) fn main_path_step(&mut self) -> bool {
        let Some(attempt) = self.attempt.as_mut() else {
            return false;
        };
        let outcome = place_next_slot(&self.catalog, &self.settings, &mut self.stats, attempt);
        match outcome {
            MainPathStep::Placed => true,
            MainPathStep::Backtracked => false,
            MainPathStep::Finished => {
                self.transition(GenerationStatus::Branching);
                false
            }
            MainPathStep::Failed => {
                self.retry(RetryReason::MainPathFailed);
                false
            }
        }
    }
}

fn place_next_slot(
    catalog: &Catalog,
    settings: &GeneratorSettings,
    stats: &mut GenerationStats,
    attempt: &mut Attempt,
) -> MainPathStep {
    let state = &mut attempt.main_path;
    let Some(slot) = state.slots.get(state.cursor).copied() else {
        return MainPathStep::Finished;
    };

    let (mut tile_sets, archetype, node, line) = match slot.kind {
        SlotKind::Node(id) => (catalog.node(id).tile_sets.clone(), None, Some(id), None),
        SlotKind::Line { line, archetype } => {
            (catalog.archetype(archetype).tile_sets.clone(), Some(archetype), None, Some(line))
        }
    };
    let due = match slot.kind {
        SlotKind::Line { .. } => injection::due_request(&attempt.pending, true, slot.depth, 0.0),
        SlotKind::Node(_) => None,
    };
    let request = due.map(|index| attempt.pending[index]);
    if let Some(request) = request {
        tile_sets = vec![request.tile_set];
    }

    let placement = TilePlacement {
        on_main_path: true,
        path_depth: state.placed.len() as u32,
        archetype,
        node,
        line,
        injection: request.map(|request| request.marker()),
        ..TilePlacement::default()
    };
    let mut context = PlacementContext {
        catalog,
        settings,
        graph: &mut attempt.graph,
        random: &mut attempt.random,
        stats: &mut *stats,
    };
    let result = placement::add_tile(
        &mut context,
        TileRequest {
            previous: state.placed.last().map(|placed| placed.tile),
            tile_sets: &tile_sets,
            archetype,
            normalized_depth: slot.depth,
            placement,
        },
    );

    match result {
        Ok(tile) => {
            if let Some(index) = due {
                attempt.pending.remove(index);
                // Injected tiles are additive: the slot they took is offered again.
                state.slots.insert(state.cursor + 1, slot);
            }
            state.placed.push(PlacedSlot { tile, injection: request });
            state.cursor += 1;
            state.slot_backtracks = 0;
            MainPathStep::Placed
        }
        Err(_) => {
            let can_backtrack = state.placed.len() >= settings.min_tiles_for_backtrack
                && state.slot_backtracks < settings.max_slot_backtracks
                && state.total_backtracks < settings.max_total_backtracks;
            if !can_backtrack {
                log::debug!(
                    "main path stuck at slot {} of {} after {} backtracks",
                    state.cursor,
                    state.slots.len(),
                    state.total_backtracks
                );
                return MainPathStep::Failed;
            }
            backtrack(attempt);
            stats.backtracks += 1;
            MainPathStep::Backtracked
        }
    }
}

/// Removes the most recent main-path tile and steps the cursor back onto its slot.
fn backtrack(attempt: &mut Attempt) {
    let state = &mut attempt.main_path;
    let Some(last) = state.placed.pop() else {
        return;
    };
    state.cursor -= 1;
    if let Some(request) = last.injection {
        // Undo the extra slot the injection inserted and put the request back.
        state.slots.remove(state.cursor + 1);
        attempt.pending.push(request);
    }
    attempt.graph.remove_last_connection();
    attempt.graph.remove_tile(last.tile);
    state.slot_backtracks += 1;
    state.total_backtracks += 1;
}
