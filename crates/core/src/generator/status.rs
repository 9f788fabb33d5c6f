use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GenerationStatus {
    NotStarted,
    PreProcessing,
    TileInjection,
    MainPath,
    Branching,
    BranchPruning,
    InstantiatingTiles,
    PostProcessing,
    Complete,
    Failed,
    Cancelled,
}

impl GenerationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Cancelled)
    }
}

/// Called with `(previous, next)` on every status transition.
pub type StatusObserver = Box<dyn FnMut(GenerationStatus, GenerationStatus)>;
