//! Designer-authored dungeon flow: path length, line segments, nodes and rules.

pub mod keys;
pub mod rules;

use serde::{Deserialize, Serialize};

use crate::types::{FloatRange, IntRange, Tags};
use crate::weighted::{Weighted, WeightedTable};

pub use keys::{KeyManager, KeySpec};
pub use rules::{
    ConnectionResult, ConnectionRule, ConnectionRuleSpec, ProposedConnection, RuleChain, TagPair,
    TagPairMode,
};

fn one() -> IntRange {
    IntRange::exactly(1)
}

fn default_true() -> bool {
    true
}

fn unit_range() -> FloatRange {
    FloatRange::new(0.0, 1.0)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchMode {
    /// Each main-path tile draws from its own archetype's branch count.
    #[default]
    Local,
    /// One branch count for the whole dungeon, spread across the main path.
    Global,
}

/// How branch start/cap tile sets combine with the archetype's normal sets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchCapMode {
    #[default]
    InsteadOf,
    AsWellAs,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PruneMode {
    #[default]
    AnyTagPresent,
    AllTagsMissing,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchPruneRule {
    #[serde(default)]
    pub mode: PruneMode,
    #[serde(default)]
    pub tags: Tags,
}

impl BranchPruneRule {
    /// An empty tag list disables pruning in both modes.
    pub fn should_prune(&self, tile_tags: &Tags) -> bool {
        if self.tags.is_empty() {
            return false;
        }
        match self.mode {
            PruneMode::AnyTagPresent => tile_tags.has_any(&self.tags),
            PruneMode::AllTagsMissing => !tile_tags.has_any(&self.tags),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LockPrefabSpec {
    /// Only doorways with this socket may use these prefabs; `None` matches any.
    #[serde(default)]
    pub socket: Option<String>,
    pub prefabs: WeightedTable<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileSetSpec {
    pub name: String,
    pub tiles: Vec<Weighted<String>>,
    #[serde(default)]
    pub lock_prefabs: Vec<LockPrefabSpec>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeSpec {
    pub name: String,
    pub tile_sets: Vec<String>,
    #[serde(default)]
    pub branch_start_tile_sets: Vec<String>,
    #[serde(default)]
    pub branch_start_mode: BranchCapMode,
    #[serde(default)]
    pub branch_cap_tile_sets: Vec<String>,
    #[serde(default)]
    pub branch_cap_mode: BranchCapMode,
    pub branch_count: IntRange,
    pub branching_depth: IntRange,
    #[serde(default)]
    pub straighten_chance: f32,
    /// A unique archetype is used by at most one line segment per dungeon when
    /// alternatives exist.
    #[serde(default)]
    pub unique: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LockSpec {
    pub key: String,
    #[serde(default = "one")]
    pub count: IntRange,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLockPlacement {
    #[serde(default = "default_true")]
    pub entrance: bool,
    #[serde(default)]
    pub exit: bool,
}

impl Default for NodeLockPlacement {
    fn default() -> Self {
        Self { entrance: true, exit: false }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowLine {
    pub position: f32,
    pub length: f32,
    pub archetypes: Vec<String>,
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub locks: Vec<LockSpec>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    pub label: String,
    pub position: f32,
    pub tile_sets: Vec<String>,
    #[serde(default)]
    pub lock_placement: NodeLockPlacement,
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub locks: Vec<LockSpec>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileInjectionRule {
    pub tile_set: String,
    #[serde(default = "unit_range")]
    pub path_depth: FloatRange,
    #[serde(default = "unit_range")]
    pub branch_depth: FloatRange,
    #[serde(default = "default_true")]
    pub can_appear_on_main_path: bool,
    #[serde(default)]
    pub can_appear_on_branch_path: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub lock_key: Option<String>,
}

impl TileInjectionRule {
    pub fn new(tile_set: impl Into<String>) -> Self {
        Self {
            tile_set: tile_set.into(),
            path_depth: unit_range(),
            branch_depth: unit_range(),
            can_appear_on_main_path: true,
            can_appear_on_branch_path: false,
            required: false,
            locked: false,
            lock_key: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DungeonFlow {
    pub length: IntRange,
    #[serde(default)]
    pub branch_mode: BranchMode,
    /// Total branch count, used in [`BranchMode::Global`].
    #[serde(default)]
    pub branch_count: IntRange,
    pub tile_sets: Vec<TileSetSpec>,
    pub archetypes: Vec<ArchetypeSpec>,
    pub lines: Vec<FlowLine>,
    #[serde(default)]
    pub nodes: Vec<FlowNode>,
    /// Chance that two coincident unused doorways get connected after layout.
    #[serde(default)]
    pub connection_chance: f32,
    #[serde(default)]
    pub restrict_connection_to_same_section: bool,
    #[serde(default)]
    pub connection_rules: Vec<ConnectionRuleSpec>,
    #[serde(default)]
    pub injection_rules: Vec<TileInjectionRule>,
    #[serde(default)]
    pub branch_prune: BranchPruneRule,
    #[serde(default)]
    pub keys: KeyManager,
}

impl DungeonFlow {
    /// Index of the line segment covering `normalized_depth`.
    pub fn line_at_depth(&self, normalized_depth: f32) -> Option<usize> {
        if self.lines.is_empty() {
            return None;
        }
        let depth = normalized_depth.clamp(0.0, 1.0);
        if depth <= 0.0 {
            return Some(0);
        }
        if depth >= 1.0 {
            return Some(self.lines.len() - 1);
        }
        self.lines
            .iter()
            .position(|line| depth >= line.position && depth < line.position + line.length)
    }
}
