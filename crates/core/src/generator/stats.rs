//! Diagnostics collected across every attempt of one generation.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::status::GenerationStatus;

/// Why a single placement candidate (or a whole slot) was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PlacementFailure {
    NoValidTile,
    TemplateIsNull,
    TileIsColliding,
    OutOfBounds,
    NewTileIsNull,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RetryReason {
    MainPathFailed,
    RequiredInjectionMissing,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTimings {
    pub pre_processing: Duration,
    pub tile_injection: Duration,
    pub main_path: Duration,
    pub branching: Duration,
    pub branch_pruning: Duration,
    pub instantiating_tiles: Duration,
    pub post_processing: Duration,
}

impl PhaseTimings {
    pub fn add(&mut self, status: GenerationStatus, elapsed: Duration) {
        let slot = match status {
            GenerationStatus::PreProcessing => &mut self.pre_processing,
            GenerationStatus::TileInjection => &mut self.tile_injection,
            GenerationStatus::MainPath => &mut self.main_path,
            GenerationStatus::Branching => &mut self.branching,
            GenerationStatus::BranchPruning => &mut self.branch_pruning,
            GenerationStatus::InstantiatingTiles => &mut self.instantiating_tiles,
            GenerationStatus::PostProcessing => &mut self.post_processing,
            _ => return,
        };
        *slot += elapsed;
    }

    pub fn total(&self) -> Duration {
        self.pre_processing
            + self.tile_injection
            + self.main_path
            + self.branching
            + self.branch_pruning
            + self.instantiating_tiles
            + self.post_processing
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub attempts: u32,
    pub main_path_rooms: usize,
    pub branch_path_rooms: usize,
    pub total_rooms: usize,
    pub max_branch_depth: u32,
    pub branches_grown: usize,
    /// Total drawn in global branch mode for the successful attempt.
    pub global_branch_budget: Option<usize>,
    pub total_retries: u32,
    pub backtracks: u32,
    pub pruned_tiles: usize,
    pub closed_doorway_overlaps: usize,
    pub locks_placed: usize,
    pub locks_abandoned: usize,
    pub keys_placed: usize,
    pub timings: PhaseTimings,
    pub placement_failures: BTreeMap<PlacementFailure, u32>,
    pub retry_reasons: BTreeMap<RetryReason, u32>,
}

impl GenerationStats {
    pub fn record_failure(&mut self, failure: PlacementFailure) {
        *self.placement_failures.entry(failure).or_default() += 1;
    }

    pub fn record_retry(&mut self, reason: RetryReason) {
        self.total_retries += 1;
        *self.retry_reasons.entry(reason).or_default() += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timings_accumulate_per_phase_and_ignore_terminal_states() {
        let mut timings = PhaseTimings::default();
        timings.add(GenerationStatus::MainPath, Duration::from_millis(3));
        timings.add(GenerationStatus::MainPath, Duration::from_millis(2));
        timings.add(GenerationStatus::Complete, Duration::from_millis(50));
        assert_eq!(timings.main_path, Duration::from_millis(5));
        assert_eq!(timings.total(), Duration::from_millis(5));
    }

    #[test]
    fn histograms_count_each_reason() {
        let mut stats = GenerationStats::default();
        stats.record_failure(PlacementFailure::TileIsColliding);
        stats.record_failure(PlacementFailure::TileIsColliding);
        stats.record_retry(RetryReason::MainPathFailed);
        assert_eq!(stats.placement_failures.get(&PlacementFailure::TileIsColliding), Some(&2));
        assert_eq!(stats.total_retries, 1);
    }
}
