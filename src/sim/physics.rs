//! Arena geometry: vectors, bounding boxes and tank movement steps

use std::ops::{Add, AddAssign, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Distance a tank travels per simulation tick
pub const TANK_SPEED: f32 = 0.1;
/// Hull rotation per simulation tick (radians)
pub const TANK_TURN_RATE: f32 = 0.03;
/// Half extents of a tank's hull+turret volume in its local frame
pub const TANK_HALF_EXTENTS: Vec3 = Vec3::new(1.0, 1.0, 1.5);
/// Offset from a tank's ground position to the centre of its volume
pub const TANK_CENTER_OFFSET: Vec3 = Vec3::new(0.0, 0.5, 0.0);

/// A point or direction in arena space (y is up)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance_to(self, other: Vec3) -> f32 {
        (self - other).length()
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Vec3) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Yaw-only rotation as carried on the wire (`{"y": radians}`)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation {
    pub y: f32,
}

impl Rotation {
    pub const fn yaw(y: f32) -> Self {
        Self { y }
    }
}

/// Unit forward vector for a yaw. Yaw 0 faces +z.
pub fn forward(yaw: f32) -> Vec3 {
    Vec3::new(yaw.sin(), 0.0, yaw.cos())
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center(center: Vec3, half: Vec3) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// World-space box enclosing a local box of `half` extents rotated by `yaw`
    /// about the vertical axis.
    pub fn oriented(center: Vec3, half: Vec3, yaw: f32) -> Self {
        let (sin, cos) = (yaw.sin().abs(), yaw.cos().abs());
        let world_half = Vec3::new(
            cos * half.x + sin * half.z,
            half.y,
            sin * half.x + cos * half.z,
        );
        Self::from_center(center, world_half)
    }

    /// Touching boxes count as intersecting. A NaN bound never intersects.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
            && self.min.z <= other.max.z
            && other.min.z <= self.max.z
    }

    pub fn contains_xz(&self, x: f32, z: f32) -> bool {
        x >= self.min.x && x <= self.max.x && z >= self.min.z && z <= self.max.z
    }
}

/// Bounding volume of a tank standing at `position` with hull yaw `yaw`
pub fn tank_bounds(position: Vec3, yaw: f32) -> Aabb {
    Aabb::oriented(position + TANK_CENTER_OFFSET, TANK_HALF_EXTENTS, yaw)
}

/// Movement steps shared by every tank behavior
pub struct MovementSystem;

impl MovementSystem {
    /// Translate along the hull's forward vector; negative distance reverses.
    pub fn advance(position: Vec3, yaw: f32, distance: f32) -> Vec3 {
        position + forward(yaw) * distance
    }

    /// Rotate the hull. Yaw is left unnormalised, it only ever feeds sin/cos.
    pub fn turn(yaw: f32, delta: f32) -> f32 {
        yaw + delta
    }
}
