use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::random::RandomStream;

new_key_type! {
    pub struct TileId;
}

macro_rules! index_id {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
            pub struct $name(pub u32);

            impl $name {
                pub fn index(self) -> usize {
                    self.0 as usize
                }

                pub(crate) fn from_index(index: usize) -> Self {
                    Self(index as u32)
                }
            }
        )*
    };
}

index_id!(PrefabId, TileSetId, ArchetypeId, LineId, NodeId, KeyId);

/// Inclusive integer range. The default is the empty-count range `0..=0`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    pub min: i32,
    pub max: i32,
}

impl IntRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub const fn exactly(value: i32) -> Self {
        Self { min: value, max: value }
    }

    pub fn random(self, random: &mut RandomStream) -> i32 {
        random.next_range(self.min, self.max.saturating_add(1))
    }

    pub fn is_valid(self) -> bool {
        self.min <= self.max
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FloatRange {
    pub min: f32,
    pub max: f32,
}

impl FloatRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn random(self, random: &mut RandomStream) -> f32 {
        self.min + (random.next_double() as f32) * (self.max - self.min)
    }

    pub fn is_valid(self) -> bool {
        self.min <= self.max && self.min.is_finite() && self.max.is_finite()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RepeatMode {
    #[default]
    Allow,
    DisallowImmediate,
    Disallow,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(Vec<String>);

impl Tags {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tags.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|existing| existing == tag)
    }

    pub fn has_any(&self, tags: &Tags) -> bool {
        tags.0.iter().any(|tag| self.contains(tag))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
