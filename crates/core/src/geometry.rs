//! Grid-aligned vectors, facings, quarter-turn rotations and axis-aligned bounds.
//!
//! Doorways face one of the six axis directions and tiles rotate only in
//! quarter turns about the up axis, so every transform here is exact.

use std::ops::{Add, Neg, Sub};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn component(self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn with_component(mut self, axis: Axis, value: f32) -> Self {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
        self
    }

    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vec3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    #[default]
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// The two remaining axes in cyclic order, so a positive quarter turn about
    /// `self` maps the first onto the second.
    fn others(self) -> (Axis, Axis) {
        match self {
            Axis::X => (Axis::Y, Axis::Z),
            Axis::Y => (Axis::Z, Axis::X),
            Axis::Z => (Axis::X, Axis::Y),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl Direction {
    pub fn new(axis: Axis, positive: bool) -> Self {
        match (axis, positive) {
            (Axis::X, true) => Direction::PosX,
            (Axis::X, false) => Direction::NegX,
            (Axis::Y, true) => Direction::PosY,
            (Axis::Y, false) => Direction::NegY,
            (Axis::Z, true) => Direction::PosZ,
            (Axis::Z, false) => Direction::NegZ,
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            Direction::PosX | Direction::NegX => Axis::X,
            Direction::PosY | Direction::NegY => Axis::Y,
            Direction::PosZ | Direction::NegZ => Axis::Z,
        }
    }

    pub fn is_positive(self) -> bool {
        matches!(self, Direction::PosX | Direction::PosY | Direction::PosZ)
    }

    pub fn opposite(self) -> Self {
        Self::new(self.axis(), !self.is_positive())
    }

    pub fn is_vertical(self, up: Axis) -> bool {
        self.axis() == up
    }

    pub fn vector(self) -> Vec3 {
        let sign = if self.is_positive() { 1.0 } else { -1.0 };
        Vec3::ZERO.with_component(self.axis(), sign)
    }

    pub fn rotated(self, rotation: Rotation, up: Axis) -> Self {
        let rotated = rotation.apply(self.vector(), up);
        Axis::ALL
            .into_iter()
            .find_map(|axis| {
                let value = rotated.component(axis);
                (value != 0.0).then(|| Self::new(axis, value > 0.0))
            })
            .unwrap_or(self)
    }
}

/// Rotation about the up axis in quarter turns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rotation(u8);

impl Rotation {
    pub const IDENTITY: Self = Self(0);

    pub fn quarter_turns(turns: u8) -> Self {
        Self(turns % 4)
    }

    pub fn turns(self) -> u8 {
        self.0
    }

    pub fn apply(self, vector: Vec3, up: Axis) -> Vec3 {
        let (u, w) = up.others();
        let mut result = vector;
        for _ in 0..self.0 {
            let old_u = result.component(u);
            let old_w = result.component(w);
            result = result.with_component(u, -old_w).with_component(w, old_u);
        }
        result
    }

    /// The rotation taking horizontal facing `from` onto `to`, if one exists.
    pub fn between(from: Direction, to: Direction, up: Axis) -> Option<Self> {
        (0..4).map(Self::quarter_turns).find(|rotation| from.rotated(*rotation, up) == to)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn from_corners(a: Vec3, b: Vec3) -> Self {
        Self { min: a.min(b), max: a.max(b) }
    }

    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = Vec3::new(size.x * 0.5, size.y * 0.5, size.z * 0.5);
        Self { min: center - half, max: center + half }
    }

    pub fn size(self) -> Vec3 {
        self.max - self.min
    }

    pub fn contains_point(self, point: Vec3) -> bool {
        Axis::ALL.into_iter().all(|axis| {
            point.component(axis) >= self.min.component(axis)
                && point.component(axis) <= self.max.component(axis)
        })
    }

    pub fn contains(self, other: Bounds) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    pub fn transformed(self, rotation: Rotation, up: Axis, translation: Vec3) -> Self {
        let a = rotation.apply(self.min, up);
        let b = rotation.apply(self.max, up);
        let rotated = Self::from_corners(a, b);
        Self { min: rotated.min + translation, max: rotated.max + translation }
    }

    /// Penetration depth along each axis; negative values measure the gap.
    pub fn per_axis_overlap(self, other: Bounds) -> Vec3 {
        let overlap = |axis: Axis| {
            self.max.component(axis).min(other.max.component(axis))
                - self.min.component(axis).max(other.min.component(axis))
        };
        Vec3::new(overlap(Axis::X), overlap(Axis::Y), overlap(Axis::Z))
    }

    pub fn is_overlapping(self, other: Bounds, max_overlap: f32) -> bool {
        let overlap = self.per_axis_overlap(other);
        Axis::ALL.into_iter().all(|axis| overlap.component(axis) > max_overlap)
    }

    /// Like [`Bounds::is_overlapping`] but ignores the up axis, so any shared
    /// footprint counts regardless of vertical separation.
    pub fn is_overlapping_or_overhanging(self, other: Bounds, up: Axis, max_overlap: f32) -> bool {
        let overlap = self.per_axis_overlap(other);
        let (u, w) = up.others();
        overlap.component(u).min(overlap.component(w)) > max_overlap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_turn_about_y_maps_z_onto_x() {
        let rotated = Rotation::quarter_turns(1).apply(Vec3::new(0.0, 0.0, 1.0), Axis::Y);
        assert_eq!(rotated, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(Direction::PosZ.rotated(Rotation::quarter_turns(1), Axis::Y), Direction::PosX);
        assert_eq!(Direction::PosX.rotated(Rotation::quarter_turns(1), Axis::Y), Direction::NegZ);
    }

    #[test]
    fn four_quarter_turns_are_identity() {
        let vector = Vec3::new(1.5, -2.0, 3.25);
        for up in Axis::ALL {
            let mut result = vector;
            for _ in 0..4 {
                result = Rotation::quarter_turns(1).apply(result, up);
            }
            assert_eq!(result, vector);
        }
    }

    #[test]
    fn rotation_leaves_up_component_untouched() {
        let vector = Vec3::new(1.0, 2.0, 3.0);
        for turns in 0..4 {
            let rotated = Rotation::quarter_turns(turns).apply(vector, Axis::Y);
            assert_eq!(rotated.y, 2.0);
        }
        assert_eq!(Direction::PosY.rotated(Rotation::quarter_turns(3), Axis::Y), Direction::PosY);
    }

    #[test]
    fn rotation_between_horizontal_facings_exists_and_vertical_does_not_rotate() {
        let rotation = Rotation::between(Direction::PosX, Direction::NegX, Axis::Y);
        assert_eq!(rotation, Some(Rotation::quarter_turns(2)));
        assert_eq!(Rotation::between(Direction::PosX, Direction::PosY, Axis::Y), None);
    }

    #[test]
    fn overlap_requires_penetration_on_every_axis() {
        let a = Bounds::from_corners(Vec3::ZERO, Vec3::new(2.0, 2.0, 2.0));
        let touching = Bounds::from_corners(Vec3::new(2.0, 0.0, 0.0), Vec3::new(4.0, 2.0, 2.0));
        let inside = Bounds::from_corners(Vec3::new(1.0, 1.0, 1.0), Vec3::new(3.0, 3.0, 3.0));
        assert!(!a.is_overlapping(touching, 0.0));
        assert!(a.is_overlapping(touching, -0.1), "negative tolerance acts as padding");
        assert!(a.is_overlapping(inside, 0.5));
        assert!(!a.is_overlapping(inside, 1.0));
    }

    #[test]
    fn overhang_check_ignores_vertical_separation() {
        let lower = Bounds::from_corners(Vec3::ZERO, Vec3::new(4.0, 2.0, 4.0));
        let upper = Bounds::from_corners(Vec3::new(1.0, 5.0, 1.0), Vec3::new(3.0, 7.0, 3.0));
        assert!(!lower.is_overlapping(upper, 0.0));
        assert!(lower.is_overlapping_or_overhanging(upper, Axis::Y, 0.0));
    }

    #[test]
    fn transformed_bounds_rotate_then_translate() {
        let bounds = Bounds::from_corners(Vec3::ZERO, Vec3::new(4.0, 1.0, 2.0));
        let moved =
            bounds.transformed(Rotation::quarter_turns(1), Axis::Y, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(moved.min, Vec3::new(10.0, 0.0, -4.0));
        assert_eq!(moved.max, Vec3::new(12.0, 1.0, 0.0));
    }

    #[test]
    fn containment_is_inclusive() {
        let outer = Bounds::from_corners(Vec3::ZERO, Vec3::new(10.0, 10.0, 10.0));
        assert!(outer.contains(outer));
        assert!(!outer.contains(Bounds::from_corners(Vec3::ZERO, Vec3::new(11.0, 1.0, 1.0))));
    }
}
