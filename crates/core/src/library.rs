//! Authored tile prefabs: bounds, doorways and placement options.

use serde::{Deserialize, Serialize};

use crate::geometry::{Bounds, Direction, Vec3};
use crate::types::{RepeatMode, Tags};

pub const DEFAULT_SOCKET: &str = "default";

fn default_socket() -> String {
    DEFAULT_SOCKET.to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DoorwaySpec {
    #[serde(default = "default_socket")]
    pub socket: String,
    pub position: Vec3,
    pub facing: Direction,
    #[serde(default)]
    pub tags: Tags,
}

impl DoorwaySpec {
    pub fn new(position: Vec3, facing: Direction) -> Self {
        Self { socket: default_socket(), position, facing, tags: Tags::default() }
    }

    pub fn with_socket(mut self, socket: impl Into<String>) -> Self {
        self.socket = socket.into();
        self
    }
}

/// A point inside a tile where a key may be spawned. An empty `keys` list
/// accepts any key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeySpawnPoint {
    pub position: Vec3,
    #[serde(default)]
    pub keys: Vec<String>,
}

impl KeySpawnPoint {
    pub fn accepts(&self, key_name: &str) -> bool {
        self.keys.is_empty() || self.keys.iter().any(|key| key == key_name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TilePrefab {
    pub name: String,
    /// Bounds measured from the prefab's geometry.
    pub geometry_bounds: Bounds,
    /// Designer override that replaces `geometry_bounds` when present.
    #[serde(default)]
    pub override_bounds: Option<Bounds>,
    pub doorways: Vec<DoorwaySpec>,
    #[serde(default)]
    pub entrance: Option<usize>,
    #[serde(default)]
    pub exit: Option<usize>,
    #[serde(default = "default_true")]
    pub allow_rotation: bool,
    #[serde(default)]
    pub repeat_mode: RepeatMode,
    /// Overrides the flow's doorway connection chance for this tile.
    #[serde(default)]
    pub connection_chance: Option<f32>,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub key_spawn_points: Vec<KeySpawnPoint>,
}

impl TilePrefab {
    pub fn new(name: impl Into<String>, geometry_bounds: Bounds) -> Self {
        Self {
            name: name.into(),
            geometry_bounds,
            override_bounds: None,
            doorways: Vec::new(),
            entrance: None,
            exit: None,
            allow_rotation: true,
            repeat_mode: RepeatMode::Allow,
            connection_chance: None,
            tags: Tags::default(),
            key_spawn_points: Vec::new(),
        }
    }

    pub fn with_doorway(mut self, doorway: DoorwaySpec) -> Self {
        self.doorways.push(doorway);
        self
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_repeat_mode(mut self, repeat_mode: RepeatMode) -> Self {
        self.repeat_mode = repeat_mode;
        self
    }

    pub fn with_key_spawn_point(mut self, position: Vec3) -> Self {
        self.key_spawn_points.push(KeySpawnPoint { position, keys: Vec::new() });
        self
    }

    pub fn bounds(&self) -> Bounds {
        self.override_bounds.unwrap_or(self.geometry_bounds)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TileLibrary {
    pub prefabs: Vec<TilePrefab>,
}

impl TileLibrary {
    pub fn find(&self, name: &str) -> Option<usize> {
        self.prefabs.iter().position(|prefab| prefab.name == name)
    }
}
