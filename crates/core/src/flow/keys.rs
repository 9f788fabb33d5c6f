use serde::{Deserialize, Serialize};

use crate::types::{IntRange, KeyId};

fn one() -> IntRange {
    IntRange::exactly(1)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeySpec {
    pub name: String,
    /// How many copies of this key are spawned for each lock that uses it.
    #[serde(default = "one")]
    pub keys_per_lock: IntRange,
}

impl KeySpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), keys_per_lock: one() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyManager {
    #[serde(default)]
    pub keys: Vec<KeySpec>,
}

impl KeyManager {
    pub fn find(&self, name: &str) -> Option<KeyId> {
        self.keys.iter().position(|key| key.name == name).map(KeyId::from_index)
    }

    pub fn get(&self, id: KeyId) -> Option<&KeySpec> {
        self.keys.get(id.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_found_by_name() {
        let manager = KeyManager { keys: vec![KeySpec::new("red"), KeySpec::new("blue")] };
        let blue = manager.find("blue").expect("blue key");
        assert_eq!(blue.index(), 1);
        assert_eq!(manager.get(blue).map(|key| key.keys_per_lock), Some(IntRange::exactly(1)));
        assert!(manager.find("green").is_none());
    }
}
