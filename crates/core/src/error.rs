use std::collections::BTreeMap;

use crate::generator::{PlacementFailure, RetryReason};
use crate::graph::DoorwayRef;

/// Malformed designer input, rejected before any generation starts.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum FlowError {
    #[error("duplicate {kind} name `{name}`")]
    DuplicateName { kind: &'static str, name: String },

    #[error("unknown prefab `{name}` referenced by tile set `{tile_set}`")]
    UnknownPrefab { tile_set: String, name: String },

    #[error("unknown tile set `{name}` referenced by {owner}")]
    UnknownTileSet { owner: String, name: String },

    #[error("unknown archetype `{name}` referenced by line {line}")]
    UnknownArchetype { line: usize, name: String },

    #[error("unknown key `{name}` referenced by {owner}")]
    UnknownKey { owner: String, name: String },

    #[error("tile set `{0}` has no tiles")]
    EmptyTileSet(String),

    #[error("prefab `{0}` has no doorways")]
    PrefabWithoutDoorways(String),

    #[error("prefab `{prefab}` designates doorway {index} as {role} but has {count} doorways")]
    InvalidDoorwayDesignation { prefab: String, role: &'static str, index: usize, count: usize },

    #[error("archetype `{0}` has no tile sets")]
    ArchetypeWithoutTileSets(String),

    #[error("line {0} has no archetypes")]
    LineWithoutArchetypes(usize),

    #[error("node `{0}` has no tile sets")]
    NodeWithoutTileSets(String),

    #[error("flow has no lines")]
    NoLines,

    #[error("lines must cover [0, 1] in order without gaps (problem at line {0})")]
    LinesDoNotCover(usize),

    #[error("node `{label}` sits at {position}, outside [0, 1]")]
    NodeOutOfRange { label: String, position: f32 },

    #[error("invalid range for {what}: {min}..={max}")]
    InvalidRange { what: String, min: f32, max: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("doorway {0:?} does not exist")]
    MissingDoorway(DoorwayRef),

    #[error("doorway {0:?} is already connected")]
    DoorwayInUse(DoorwayRef),

    #[error("a doorway cannot connect to itself")]
    SelfConnection,
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum GenerationError {
    #[error(
        "generation failed after {attempts} attempts (placement failures: {failures:?}, retries: {retries:?})"
    )]
    AttemptsExhausted {
        attempts: u32,
        failures: BTreeMap<PlacementFailure, u32>,
        retries: BTreeMap<RetryReason, u32>,
    },

    #[error("generation was cancelled")]
    Cancelled,

    #[error("invalid flow: {0}")]
    InvalidFlow(#[from] FlowError),
}
