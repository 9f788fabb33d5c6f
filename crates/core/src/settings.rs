//! Generator tunables. Every field has a serde default so partial config files load.

use serde::{Deserialize, Serialize};

use crate::geometry::{Axis, Bounds, Vec3};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    pub seed: Option<u64>,
    pub randomize_seed: bool,
    pub up_axis: Axis,
    /// Scales the flow's drawn main-path length.
    pub length_multiplier: f32,
    /// Whole-attempt retries before generation is declared failed.
    pub max_attempt_count: u32,
    /// Main-path tiles required before a failed slot may backtrack.
    pub min_tiles_for_backtrack: usize,
    pub max_slot_backtracks: u32,
    pub max_total_backtracks: u32,
    pub max_pairing_attempts: Option<usize>,
    /// Penetration allowed between a new tile and the tile it attaches to.
    pub overlap_threshold: f32,
    /// Gap required between a new tile and every tile it does not attach to.
    pub padding: f32,
    pub disallow_overhangs: bool,
    pub restrict_to_bounds: bool,
    pub placement_bounds: Bounds,
    /// Overrides every tile's own rotation flag when set.
    pub allow_tile_rotation: Option<bool>,
    /// Wall-clock budget per `advance` call; zero means unlimited.
    pub max_frame_millis: u64,
    pub yield_between_tiles: bool,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            seed: None,
            randomize_seed: false,
            up_axis: Axis::Y,
            length_multiplier: 1.0,
            max_attempt_count: 20,
            min_tiles_for_backtrack: 6,
            max_slot_backtracks: 5,
            max_total_backtracks: 20,
            max_pairing_attempts: None,
            overlap_threshold: 0.01,
            padding: 0.0,
            disallow_overhangs: false,
            restrict_to_bounds: false,
            placement_bounds: Bounds::from_center_size(
                Vec3::ZERO,
                Vec3::new(1000.0, 1000.0, 1000.0),
            ),
            allow_tile_rotation: None,
            max_frame_millis: 0,
            yield_between_tiles: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_fill_in_defaults() {
        let settings: GeneratorSettings =
            serde_json::from_str(r#"{ "max_attempt_count": 3, "padding": 0.5 }"#).expect("parse");
        assert_eq!(settings.max_attempt_count, 3);
        assert_eq!(settings.padding, 0.5);
        assert_eq!(settings.up_axis, Axis::Y);
        assert_eq!(settings.min_tiles_for_backtrack, 6);
    }
}
