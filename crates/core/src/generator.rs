//! Resumable generation state machine.
//!
//! A [`Generator`] walks the phases in [`GenerationStatus`] order. Each call to
//! [`Generator::advance`] runs a bounded number of steps, so a caller can spread
//! one generation over many frames; [`Generator::generate`] simply drives it to
//! a terminal state. A failed attempt restarts from pre-processing with a seed
//! derived from the failed attempt's stream.

mod branches;
mod injection;
mod locks;
mod main_path;
mod placement;
mod pruning;
mod stats;
mod status;

use std::time::{Duration, Instant};

use crate::catalog::{Catalog, InjectionRule};
use crate::error::{FlowError, GenerationError};
use crate::flow::{ConnectionRule, DungeonFlow, TileInjectionRule};
use crate::graph::ProxyGraph;
use crate::library::TileLibrary;
use crate::random::RandomStream;
use crate::realizer::{NullRealizer, Realizer};
use crate::seed::{SeedChoice, retry_seed};
use crate::settings::GeneratorSettings;

use branches::BranchState;
use injection::InjectionRequest;
use main_path::MainPathState;

pub use locks::{KeyPlacement, LockedDoorway};
pub use stats::{GenerationStats, PhaseTimings, PlacementFailure, RetryReason};
pub use status::{GenerationStatus, StatusObserver};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdvanceStopReason {
    Complete,
    Failed,
    Cancelled,
    /// A tile was placed with `yield_between_tiles` set, or the frame budget ran out.
    Yielded,
    BudgetExhausted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdvanceResult {
    pub steps: u32,
    pub stop_reason: AdvanceStopReason,
}

/// The finished layout of one successful generation.
#[derive(Clone, Debug)]
pub struct GeneratedDungeon {
    /// Seed the generation was started with.
    pub seed: u64,
    /// Seed of the attempt that succeeded.
    pub attempt_seed: u64,
    pub graph: ProxyGraph,
    pub locks: Vec<LockedDoorway>,
    pub keys: Vec<KeyPlacement>,
    pub stats: GenerationStats,
}

/// Per-attempt working state; dropped wholesale on retry.
struct Attempt {
    seed: u64,
    random: RandomStream,
    graph: ProxyGraph,
    pending: Vec<InjectionRequest>,
    main_path: MainPathState,
    branches: Option<BranchState>,
}

impl Attempt {
    fn new(seed: u64) -> Self {
        Self {
            seed,
            random: RandomStream::new(seed),
            graph: ProxyGraph::new(),
            pending: Vec::new(),
            main_path: MainPathState::default(),
            branches: None,
        }
    }
}

pub struct Generator<R: Realizer = NullRealizer> {
    catalog: Catalog,
    settings: GeneratorSettings,
    extra_injections: Vec<InjectionRule>,
    observers: Vec<StatusObserver>,
    realizer: R,
    status: GenerationStatus,
    seed: u64,
    next_attempt_seed: u64,
    attempt: Option<Attempt>,
    stats: GenerationStats,
    outcome: Option<Result<GeneratedDungeon, GenerationError>>,
}

impl Generator<NullRealizer> {
    pub fn new(
        flow: &DungeonFlow,
        library: &TileLibrary,
        settings: GeneratorSettings,
    ) -> Result<Self, GenerationError> {
        Self::with_realizer(flow, library, settings, NullRealizer)
    }
}

impl<R: Realizer> Generator<R> {
    pub fn with_realizer(
        flow: &DungeonFlow,
        library: &TileLibrary,
        settings: GeneratorSettings,
        realizer: R,
    ) -> Result<Self, GenerationError> {
        let catalog = Catalog::new(flow, library, settings.up_axis)?;
        let seed = SeedChoice::from_settings(&settings).value();
        Ok(Self {
            catalog,
            settings,
            extra_injections: Vec::new(),
            observers: Vec::new(),
            realizer,
            status: GenerationStatus::NotStarted,
            seed,
            next_attempt_seed: seed,
            attempt: None,
            stats: GenerationStats::default(),
            outcome: None,
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn status(&self) -> GenerationStatus {
        self.status
    }

    pub fn stats(&self) -> &GenerationStats {
        &self.stats
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    pub fn realizer(&self) -> &R {
        &self.realizer
    }

    pub fn realizer_mut(&mut self) -> &mut R {
        &mut self.realizer
    }

    pub fn into_realizer(self) -> R {
        self.realizer
    }

    /// The finished dungeon, once generation has completed.
    pub fn dungeon(&self) -> Option<&GeneratedDungeon> {
        self.outcome.as_ref().and_then(|outcome| outcome.as_ref().ok())
    }

    pub fn error(&self) -> Option<&GenerationError> {
        self.outcome.as_ref().and_then(|outcome| outcome.as_ref().err())
    }

    /// Adds a caller-supplied injection rule, applied after the flow's own rules.
    pub fn inject(&mut self, rule: &TileInjectionRule) -> Result<(), FlowError> {
        let resolved = self.catalog.resolve_injection(rule)?;
        self.extra_injections.push(resolved);
        Ok(())
    }

    pub fn add_connection_rule(&mut self, rule: Box<dyn ConnectionRule>) {
        self.catalog.rules_mut().push(rule);
    }

    pub fn on_status_changed<F>(&mut self, observer: F)
    where
        F: FnMut(GenerationStatus, GenerationStatus) + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Discards all progress and prepares a fresh generation from `seed`.
    pub fn reset(&mut self, seed: u64) {
        self.seed = seed;
        self.next_attempt_seed = seed;
        self.attempt = None;
        self.stats = GenerationStats::default();
        self.outcome = None;
        self.transition(GenerationStatus::NotStarted);
    }

    /// Stops an in-flight generation. The partial layout is discarded.
    pub fn cancel(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.attempt = None;
        self.outcome = Some(Err(GenerationError::Cancelled));
        log::info!("generation cancelled during {:?}", self.status);
        self.transition(GenerationStatus::Cancelled);
    }

    /// Runs at most `max_steps` steps.
    pub fn advance(&mut self, max_steps: u32) -> AdvanceResult {
        let started = Instant::now();
        let frame_budget = Duration::from_millis(self.settings.max_frame_millis);
        let mut steps = 0;

        while steps < max_steps {
            if let Some(stop_reason) = self.terminal_stop_reason() {
                return AdvanceResult { steps, stop_reason };
            }

            let phase = self.status;
            let step_started = Instant::now();
            let placed_tile = self.step();
            self.stats.timings.add(phase, step_started.elapsed());
            steps += 1;

            if let Some(stop_reason) = self.terminal_stop_reason() {
                return AdvanceResult { steps, stop_reason };
            }
            if placed_tile && self.settings.yield_between_tiles {
                return AdvanceResult { steps, stop_reason: AdvanceStopReason::Yielded };
            }
            if !frame_budget.is_zero() && started.elapsed() >= frame_budget {
                return AdvanceResult { steps, stop_reason: AdvanceStopReason::Yielded };
            }
        }

        AdvanceResult { steps, stop_reason: AdvanceStopReason::BudgetExhausted }
    }

    /// Drives generation to completion in one call.
    pub fn generate(&mut self) -> Result<&GeneratedDungeon, GenerationError> {
        while self.outcome.is_none() {
            self.advance(u32::MAX);
        }
        match &self.outcome {
            Some(Ok(dungeon)) => Ok(dungeon),
            Some(Err(error)) => Err(error.clone()),
            None => Err(GenerationError::Cancelled),
        }
    }

    fn terminal_stop_reason(&self) -> Option<AdvanceStopReason> {
        match self.status {
            GenerationStatus::Complete => Some(AdvanceStopReason::Complete),
            GenerationStatus::Failed => Some(AdvanceStopReason::Failed),
            GenerationStatus::Cancelled => Some(AdvanceStopReason::Cancelled),
            _ => None,
        }
    }

    /// Runs one unit of work. Returns true when a tile was placed.
    fn step(&mut self) -> bool {
        match self.status {
            GenerationStatus::NotStarted => {
                self.transition(GenerationStatus::PreProcessing);
                false
            }
            GenerationStatus::PreProcessing => {
                self.begin_attempt();
                self.transition(GenerationStatus::TileInjection);
                false
            }
            GenerationStatus::TileInjection => {
                self.prepare_main_path();
                self.transition(GenerationStatus::MainPath);
                false
            }
            GenerationStatus::MainPath => self.main_path_step(),
            GenerationStatus::Branching => self.branch_step(),
            GenerationStatus::BranchPruning => {
                self.prune_branches();
                self.transition(GenerationStatus::InstantiatingTiles);
                false
            }
            GenerationStatus::InstantiatingTiles => {
                self.instantiate_tiles();
                self.transition(GenerationStatus::PostProcessing);
                false
            }
            GenerationStatus::PostProcessing => {
                self.post_process();
                false
            }
            GenerationStatus::Complete | GenerationStatus::Failed | GenerationStatus::Cancelled => {
                false
            }
        }
    }

    fn transition(&mut self, next: GenerationStatus) {
        let previous = self.status;
        if previous == next {
            return;
        }
        self.status = next;
        log::debug!("generation status {previous:?} -> {next:?}");
        for observer in &mut self.observers {
            observer(previous, next);
        }
    }

    fn begin_attempt(&mut self) {
        self.stats.attempts += 1;
        let seed = self.next_attempt_seed;
        log::debug!("starting attempt {} with seed {seed}", self.stats.attempts);
        self.attempt = Some(Attempt::new(seed));
    }

    /// Abandons the current attempt, or fails the generation once the attempt
    /// budget is spent.
    fn retry(&mut self, reason: RetryReason) {
        self.stats.record_retry(reason);
        let Some(mut attempt) = self.attempt.take() else {
            return;
        };

        if self.stats.attempts >= self.settings.max_attempt_count.max(1) {
            log::warn!(
                "generation failed after {} attempts, last retry reason {reason:?}",
                self.stats.attempts
            );
            self.outcome = Some(Err(GenerationError::AttemptsExhausted {
                attempts: self.stats.attempts,
                failures: self.stats.placement_failures.clone(),
                retries: self.stats.retry_reasons.clone(),
            }));
            self.transition(GenerationStatus::Failed);
            return;
        }

        self.next_attempt_seed = retry_seed(&mut attempt.random, self.stats.attempts);
        log::warn!(
            "attempt {} with seed {} failed ({reason:?}), retrying",
            self.stats.attempts,
            attempt.seed
        );
        self.transition(GenerationStatus::PreProcessing);
    }

    fn instantiate_tiles(&mut self) {
        let Some(attempt) = self.attempt.as_mut() else {
            return;
        };
        let flow = self.catalog.flow();
        self.stats.closed_doorway_overlaps = attempt.graph.connect_overlapping_doorways(
            flow.connection_chance,
            flow.restrict_connection_to_same_section,
            &self.catalog,
            &mut attempt.random,
        );
        self.realizer.instantiate(&attempt.graph, &self.catalog);
    }

    fn post_process(&mut self) {
        let Some(mut attempt) = self.attempt.take() else {
            return;
        };
        locks::normalize_depths(&mut attempt.graph);
        let placed =
            locks::place_locks_and_keys(&self.catalog, &attempt.graph, &mut attempt.random);

        let graph = &attempt.graph;
        let stats = &mut self.stats;
        stats.main_path_rooms = graph.main_path().len();
        stats.branch_path_rooms = graph.branch_path().len();
        stats.total_rooms = graph.len();
        stats.max_branch_depth = graph
            .branch_path()
            .iter()
            .filter_map(|id| graph.tile(*id))
            .map(|tile| tile.placement.branch_depth)
            .max()
            .unwrap_or(0);
        stats.locks_placed = placed.locks.len();
        stats.locks_abandoned = placed.abandoned;
        stats.keys_placed = placed.keys.len();

        let dungeon = GeneratedDungeon {
            seed: self.seed,
            attempt_seed: attempt.seed,
            graph: attempt.graph,
            locks: placed.locks,
            keys: placed.keys,
            stats: self.stats.clone(),
        };
        self.realizer.finalize(&dungeon, &self.catalog);
        log::info!(
            "generated {} tiles ({} main path, {} branch) in {} attempts, fingerprint {:016x}",
            dungeon.graph.len(),
            self.stats.main_path_rooms,
            self.stats.branch_path_rooms,
            self.stats.attempts,
            dungeon.graph.fingerprint()
        );
        self.outcome = Some(Ok(dungeon));
        self.transition(GenerationStatus::Complete);
    }
}
