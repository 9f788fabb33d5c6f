pub mod branching;
pub mod catalog;
pub mod config;
pub mod error;
pub mod flow;
pub mod generator;
pub mod geometry;
pub mod graph;
pub mod library;
pub mod pairing;
pub mod random;
pub mod realizer;
pub mod samples;
pub mod seed;
pub mod settings;
pub mod template;
pub mod types;
pub mod weighted;

pub use catalog::Catalog;
pub use config::{Project, ProjectFormat, ProjectLoadError, load_project_from_file};
pub use error::{FlowError, GenerationError, GraphError};
pub use flow::DungeonFlow;
pub use generator::{
    AdvanceResult, AdvanceStopReason, GeneratedDungeon, GenerationStats, GenerationStatus,
    Generator,
};
pub use graph::ProxyGraph;
pub use library::{TileLibrary, TilePrefab};
pub use realizer::{DungeonSnapshot, NullRealizer, Realizer, SnapshotRealizer};
pub use settings::GeneratorSettings;
pub use types::*;
