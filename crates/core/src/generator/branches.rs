//! Side branches grown off the main path, one tile per step.

use std::collections::VecDeque;

use super::injection;
use super::placement::{self, PlacementContext, TileRequest};
use super::*;
use crate::branching::{self, BranchSite};
use crate::catalog::Archetype;
use crate::flow::BranchCapMode;
use crate::graph::TilePlacement;
use crate::types::{ArchetypeId, TileId, TileSetId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct BranchJob {
    attach: TileId,
    archetype: ArchetypeId,
    /// Number of tiles this branch tries to place.
    depth: usize,
}

#[derive(Clone, Copy, Debug)]
struct ActiveBranch {
    job: BranchJob,
    id: u32,
    frontier: TileId,
    placed: usize,
}

#[derive(Debug, Default)]
pub(super) struct BranchState {
    jobs: VecDeque<BranchJob>,
    active: Option<ActiveBranch>,
    next_id: u32,
    grown: usize,
    global_total: Option<usize>,
}

enum BranchStep {
    Placed,
    Idle,
    Finished,
}

/// Decides how many branches each eligible main-path tile hosts and how deep
/// each one goes. Node tiles never host branches.
fn plan_jobs(catalog: &Catalog, attempt: &mut Attempt) -> BranchState {
    let graph = &attempt.graph;
    let mut sites = Vec::new();
    let mut hosts = Vec::new();
    for &id in graph.main_path() {
        let Some(tile) = graph.tile(id) else {
            continue;
        };
        if tile.placement.node.is_some() {
            continue;
        }
        let Some(archetype) = tile.placement.archetype else {
            continue;
        };
        sites.push(BranchSite {
            free_doorways: graph.unused_doorways(id).count(),
            branch_count: catalog.archetype(archetype).branch_count,
        });
        hosts.push((id, archetype));
    }

    let flow = catalog.flow();
    let plan =
        branching::plan_branches(flow.branch_mode, flow.branch_count, &sites, &mut attempt.random);
    let mut jobs = VecDeque::new();
    for (&(attach, archetype), &count) in hosts.iter().zip(&plan.counts) {
        for _ in 0..count {
            let drawn = catalog.archetype(archetype).branching_depth.random(&mut attempt.random);
            let depth = usize::try_from(drawn).unwrap_or(0);
            if depth > 0 {
                jobs.push_back(BranchJob { attach, archetype, depth });
            }
        }
    }
    log::debug!("planned {} branches (global budget {:?})", jobs.len(), plan.global_total);
    BranchState { jobs, global_total: plan.global_total, ..BranchState::default() }
}

/// Tile sets for the `index`-th tile of a branch `depth` tiles long. The cap
/// set wins over the start set on one-tile branches.
fn branch_tile_sets(archetype: &Archetype, index: usize, depth: usize) -> Vec<TileSetId> {
    let mut sets = archetype.tile_sets.clone();
    let special = if index + 1 == depth && !archetype.branch_cap_tile_sets.is_empty() {
        Some((&archetype.branch_cap_tile_sets, archetype.branch_cap_mode))
    } else if index == 0 && !archetype.branch_start_tile_sets.is_empty() {
        Some((&archetype.branch_start_tile_sets, archetype.branch_start_mode))
    } else {
        None
    };
    if let Some((extra, mode)) = special {
        match mode {
            BranchCapMode::InsteadOf => sets = extra.clone(),
            BranchCapMode::AsWellAs => sets.extend(extra.iter().copied()),
        }
    }
    sets
}

fn normalized_branch_depth(index: usize, depth: usize) -> f32 {
    if depth <= 1 { 1.0 } else { index as f32 / (depth - 1) as f32 }
}

impl<R: Realizer> Generator<R> {
    pub(super) fn branch_step(&mut self) -> bool {
        let Some(attempt) = self.attempt.as_mut() else {
            return false;
        };
        if attempt.branches.is_none() {
            attempt.branches = Some(plan_jobs(&self.catalog, attempt));
            return false;
        }
        match grow_branch(&self.catalog, &self.settings, &mut self.stats, attempt) {
            BranchStep::Placed => true,
            BranchStep::Idle => false,
            BranchStep::Finished => {
                self.finish_branching();
                false
            }
        }
    }

    fn finish_branching(&mut self) {
        let Some(attempt) = self.attempt.as_mut() else {
            return;
        };
        if let Some(branches) = &attempt.branches {
            self.stats.branches_grown = branches.grown;
            self.stats.global_branch_budget = branches.global_total;
        }
        let missing = attempt.pending.iter().filter(|request| request.required).count();
        if missing > 0 {
            log::debug!("{missing} required injected tiles were never placed");
            self.retry(RetryReason::RequiredInjectionMissing);
            return;
        }
        if !attempt.pending.is_empty() {
            log::debug!("dropping {} optional injection requests", attempt.pending.len());
            attempt.pending.clear();
        }
        self.transition(GenerationStatus::BranchPruning);
    }
}

fn grow_branch(
    catalog: &Catalog,
    settings: &GeneratorSettings,
    stats: &mut GenerationStats,
    attempt: &mut Attempt,
) -> BranchStep {
    let Some(branches) = attempt.branches.as_mut() else {
        return BranchStep::Finished;
    };
    let active = match branches.active {
        Some(active) => active,
        None => {
            let Some(job) = branches.jobs.pop_front() else {
                return BranchStep::Finished;
            };
            let active =
                ActiveBranch { job, id: branches.next_id, frontier: job.attach, placed: 0 };
            branches.next_id += 1;
            active
        }
    };

    let graph = &attempt.graph;
    let Some(frontier) = graph.tile(active.frontier) else {
        branches.active = None;
        return BranchStep::Idle;
    };
    let Some(attach) = graph.tile(active.job.attach) else {
        branches.active = None;
        return BranchStep::Idle;
    };

    let job = active.job;
    let archetype = catalog.archetype(job.archetype);
    let branch_depth = normalized_branch_depth(active.placed, job.depth);
    let main_len = graph.main_path().len();
    let attach_depth = if main_len <= 1 {
        0.0
    } else {
        attach.placement.path_depth as f32 / (main_len - 1) as f32
    };

    let mut tile_sets = branch_tile_sets(archetype, active.placed, job.depth);
    let due = injection::due_request(&attempt.pending, false, attach_depth, branch_depth);
    let request = due.map(|index| attempt.pending[index]);
    if let Some(request) = request {
        tile_sets = vec![request.tile_set];
    }

    let placement = TilePlacement {
        on_main_path: false,
        path_depth: frontier.placement.path_depth,
        branch_depth: if frontier.placement.on_main_path {
            0
        } else {
            frontier.placement.branch_depth + 1
        },
        archetype: Some(job.archetype),
        line: attach.placement.line,
        injection: request.map(|request| request.marker()),
        branch_id: Some(active.id),
        ..TilePlacement::default()
    };
    let mut context = PlacementContext {
        catalog,
        settings,
        graph: &mut attempt.graph,
        random: &mut attempt.random,
        stats,
    };
    let result = placement::add_tile(
        &mut context,
        TileRequest {
            previous: Some(active.frontier),
            tile_sets: &tile_sets,
            archetype: Some(job.archetype),
            normalized_depth: branch_depth,
            placement,
        },
    );

    match result {
        Ok(tile) => {
            if let Some(index) = due {
                attempt.pending.remove(index);
            }
            if active.placed == 0 {
                branches.grown += 1;
            }
            let placed = active.placed + 1;
            branches.active = (placed < job.depth)
                .then_some(ActiveBranch { frontier: tile, placed, ..active });
            BranchStep::Placed
        }
        Err(failure) => {
            log::debug!(
                "branch {} stopped after {} of {} tiles: {failure:?}",
                active.id,
                active.placed,
                job.depth
            );
            branches.active = None;
            BranchStep::Idle
        }
    }
}
