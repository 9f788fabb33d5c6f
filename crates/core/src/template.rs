//! Immutable per-prefab tile templates and the mutable proxies cloned from them
//! for each placement.

use serde::{Deserialize, Serialize};

use crate::geometry::{Axis, Bounds, Direction, Rotation, Vec3};
use crate::graph::DoorwayRef;
use crate::library::{KeySpawnPoint, TilePrefab};
use crate::types::{PrefabId, RepeatMode, Tags};

#[derive(Clone, Debug, PartialEq)]
pub struct DoorwayTemplate {
    pub socket: String,
    pub position: Vec3,
    pub facing: Direction,
    pub tags: Tags,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TileTemplate {
    pub prefab: PrefabId,
    pub name: String,
    /// Local bounds with every horizontal doorway lying on a face.
    pub bounds: Bounds,
    pub doorways: Vec<DoorwayTemplate>,
    pub entrance: Option<usize>,
    pub exit: Option<usize>,
    pub allow_rotation: bool,
    pub repeat_mode: RepeatMode,
    pub connection_chance: Option<f32>,
    pub tags: Tags,
    pub key_spawn_points: Vec<KeySpawnPoint>,
    up: Axis,
}

impl TileTemplate {
    pub fn from_prefab(prefab_id: PrefabId, prefab: &TilePrefab, up: Axis) -> Self {
        let doorways: Vec<DoorwayTemplate> = prefab
            .doorways
            .iter()
            .map(|doorway| DoorwayTemplate {
                socket: doorway.socket.clone(),
                position: doorway.position,
                facing: doorway.facing,
                tags: doorway.tags.clone(),
            })
            .collect();

        Self {
            prefab: prefab_id,
            name: prefab.name.clone(),
            bounds: condense_bounds(prefab.bounds(), &doorways, up),
            doorways,
            entrance: prefab.entrance,
            exit: prefab.exit,
            allow_rotation: prefab.allow_rotation,
            repeat_mode: prefab.repeat_mode,
            connection_chance: prefab.connection_chance,
            tags: prefab.tags.clone(),
            key_spawn_points: prefab.key_spawn_points.clone(),
            up,
        }
    }

    /// A fresh, unplaced proxy. Each placement owns its own doorway state.
    pub fn clone_for_placement(&self) -> TileProxy {
        TileProxy {
            prefab: self.prefab,
            up: self.up,
            rotation: Rotation::IDENTITY,
            position: Vec3::ZERO,
            local_bounds: self.bounds,
            bounds: self.bounds,
            doorways: self
                .doorways
                .iter()
                .enumerate()
                .map(|(index, doorway)| DoorwayProxy {
                    index,
                    local_position: doorway.position,
                    local_facing: doorway.facing,
                    position: doorway.position,
                    facing: doorway.facing,
                    connected: None,
                })
                .collect(),
        }
    }
}

fn condense_bounds(bounds: Bounds, doorways: &[DoorwayTemplate], up: Axis) -> Bounds {
    let mut condensed = bounds;
    for doorway in doorways.iter().filter(|doorway| !doorway.facing.is_vertical(up)) {
        let axis = doorway.facing.axis();
        let value = doorway.position.component(axis);
        if doorway.facing.is_positive() {
            condensed.max = condensed.max.with_component(axis, value);
        } else {
            condensed.min = condensed.min.with_component(axis, value);
        }
    }
    condensed
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DoorwayProxy {
    pub index: usize,
    pub local_position: Vec3,
    pub local_facing: Direction,
    /// World-space position after the owning tile was positioned.
    pub position: Vec3,
    pub facing: Direction,
    pub connected: Option<DoorwayRef>,
}

impl DoorwayProxy {
    pub fn is_used(&self) -> bool {
        self.connected.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileProxy {
    pub prefab: PrefabId,
    pub up: Axis,
    pub rotation: Rotation,
    pub position: Vec3,
    pub local_bounds: Bounds,
    /// World-space bounds.
    pub bounds: Bounds,
    pub doorways: Vec<DoorwayProxy>,
}

impl TileProxy {
    /// Rotates and translates this tile so doorway `my_index` sits face to face
    /// with `other`. Vertical doorways never rotate the tile.
    pub fn position_by_socket(&mut self, my_index: usize, other: &DoorwayProxy) {
        let Some(mine) = self.doorways.get(my_index) else {
            return;
        };
        let rotation = if mine.local_facing.is_vertical(self.up) {
            Rotation::IDENTITY
        } else {
            Rotation::between(mine.local_facing, other.facing.opposite(), self.up)
                .unwrap_or(Rotation::IDENTITY)
        };
        let position = other.position - rotation.apply(mine.local_position, self.up);
        self.set_transform(rotation, position);
    }

    pub fn set_transform(&mut self, rotation: Rotation, position: Vec3) {
        self.rotation = rotation;
        self.position = position;
        self.bounds = self.local_bounds.transformed(rotation, self.up, position);
        for doorway in &mut self.doorways {
            doorway.position = rotation.apply(doorway.local_position, self.up) + position;
            doorway.facing = doorway.local_facing.rotated(rotation, self.up);
        }
    }

    pub fn doorway(&self, index: usize) -> Option<&DoorwayProxy> {
        self.doorways.get(index)
    }

    pub fn unused_doorways(&self) -> impl Iterator<Item = &DoorwayProxy> {
        self.doorways.iter().filter(|doorway| !doorway.is_used())
    }

    pub fn used_doorways(&self) -> impl Iterator<Item = &DoorwayProxy> {
        self.doorways.iter().filter(|doorway| doorway.is_used())
    }

    pub fn is_overlapping(&self, other: &TileProxy, max_overlap: f32) -> bool {
        self.bounds.is_overlapping(other.bounds, max_overlap)
    }

    pub fn is_overlapping_or_overhanging(&self, other: &TileProxy, max_overlap: f32) -> bool {
        self.bounds.is_overlapping_or_overhanging(other.bounds, self.up, max_overlap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::DoorwaySpec;

    fn corridor() -> TilePrefab {
        TilePrefab::new(
            "corridor",
            Bounds::from_corners(Vec3::new(-2.5, 0.0, -1.0), Vec3::new(2.5, 3.0, 1.0)),
        )
        .with_doorway(DoorwaySpec::new(Vec3::new(-2.0, 0.0, 0.0), Direction::NegX))
        .with_doorway(DoorwaySpec::new(Vec3::new(2.0, 0.0, 0.0), Direction::PosX))
    }

    #[test]
    fn bounds_are_condensed_onto_doorway_faces() {
        let template = TileTemplate::from_prefab(PrefabId(0), &corridor(), Axis::Y);
        assert_eq!(template.bounds.min, Vec3::new(-2.0, 0.0, -1.0));
        assert_eq!(template.bounds.max, Vec3::new(2.0, 3.0, 1.0));
    }

    #[test]
    fn override_bounds_take_precedence() {
        let mut prefab = corridor();
        prefab.override_bounds =
            Some(Bounds::from_corners(Vec3::new(-4.0, 0.0, -4.0), Vec3::new(4.0, 4.0, 4.0)));
        let template = TileTemplate::from_prefab(PrefabId(0), &prefab, Axis::Y);
        assert_eq!(template.bounds.min, Vec3::new(-2.0, 0.0, -4.0));
        assert_eq!(template.bounds.max, Vec3::new(2.0, 4.0, 4.0));
    }

    #[test]
    fn placement_clones_do_not_share_doorway_state() {
        let template = TileTemplate::from_prefab(PrefabId(0), &corridor(), Axis::Y);
        let mut first = template.clone_for_placement();
        let second = template.clone_for_placement();
        first.set_transform(Rotation::quarter_turns(1), Vec3::new(5.0, 0.0, 0.0));
        assert_ne!(first.doorways[0].position, second.doorways[0].position);
        assert_eq!(second.doorways[0].position, Vec3::new(-2.0, 0.0, 0.0));
    }

    #[test]
    fn position_by_socket_brings_doorways_face_to_face() {
        let template = TileTemplate::from_prefab(PrefabId(0), &corridor(), Axis::Y);
        let mut anchor = template.clone_for_placement();
        anchor.set_transform(Rotation::quarter_turns(1), Vec3::new(3.0, 0.0, 7.0));
        let target = anchor.doorways[1].clone();

        for my_index in 0..2 {
            let mut placed = template.clone_for_placement();
            placed.position_by_socket(my_index, &target);
            let mine = &placed.doorways[my_index];
            assert_eq!(mine.position, target.position);
            assert_eq!(mine.facing, target.facing.opposite());
            assert!(!placed.is_overlapping(&anchor, 0.0));
        }
    }

    #[test]
    fn vertical_doorways_keep_identity_rotation() {
        let shaft = TilePrefab::new(
            "shaft",
            Bounds::from_corners(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 4.0, 1.0)),
        )
        .with_doorway(DoorwaySpec::new(Vec3::new(0.0, 0.0, 0.0), Direction::NegY));
        let template = TileTemplate::from_prefab(PrefabId(1), &shaft, Axis::Y);
        let mut placed = template.clone_for_placement();
        let other = DoorwayProxy {
            index: 0,
            local_position: Vec3::ZERO,
            local_facing: Direction::PosY,
            position: Vec3::new(0.0, 4.0, 0.0),
            facing: Direction::PosY,
            connected: None,
        };
        placed.position_by_socket(0, &other);
        assert_eq!(placed.rotation, Rotation::IDENTITY);
        assert_eq!(placed.position, Vec3::new(0.0, 4.0, 0.0));
    }
}
