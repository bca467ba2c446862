//! Static obstacle bounds for the arena

use rand::Rng;

use super::physics::{Aabb, Vec3};

/// Key of the ground collider. It never blocks a position.
pub const GROUND_KEY: &str = "terrain";

const GROUND_HALF_SIZE: f32 = 100.0;
const MOUNTAIN_COUNT: usize = 20;
const MOUNTAIN_RING_RADIUS: f32 = 90.0;
const MOUNTAIN_BASE_RADIUS: f32 = 20.0;
const MOUNTAIN_HEIGHT: f32 = 40.0;
const TREE_COUNT: usize = 50;
const ROCK_COUNT: usize = 100;
const OBSTACLE_COUNT: usize = 20;
/// Scattered props land within +/- this on x and z
const SCATTER_HALF_SIZE: f32 = 80.0;

/// Named collider registry built once per arena.
///
/// Colliders keep insertion order so iteration (and therefore which obstacle
/// reports a hit first) is stable for a given seed.
#[derive(Debug, Clone, Default)]
pub struct TerrainCollisionIndex {
    colliders: Vec<(String, Aabb)>,
}

impl TerrainCollisionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lay out the standard arena: ground, a ring of mountains, then trees,
    /// rocks and box obstacles scattered over the floor.
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        let mut index = Self::new();

        index.insert(
            GROUND_KEY,
            Aabb::new(
                Vec3::new(-GROUND_HALF_SIZE, -1.5, -GROUND_HALF_SIZE),
                Vec3::new(GROUND_HALF_SIZE, -0.5, GROUND_HALF_SIZE),
            ),
        );

        for i in 0..MOUNTAIN_COUNT {
            let angle = (i as f32 / MOUNTAIN_COUNT as f32) * std::f32::consts::TAU;
            let cx = angle.cos() * MOUNTAIN_RING_RADIUS;
            let cz = angle.sin() * MOUNTAIN_RING_RADIUS;
            index.insert(
                format!("mountain_{i}"),
                Aabb::new(
                    Vec3::new(cx - MOUNTAIN_BASE_RADIUS, 0.0, cz - MOUNTAIN_BASE_RADIUS),
                    Vec3::new(cx + MOUNTAIN_BASE_RADIUS, MOUNTAIN_HEIGHT, cz + MOUNTAIN_BASE_RADIUS),
                ),
            );
        }

        for i in 0..TREE_COUNT {
            let (x, z) = scatter(rng);
            index.insert(
                format!("tree_{i}"),
                Aabb::new(Vec3::new(x - 1.0, 0.0, z - 1.0), Vec3::new(x + 1.0, 3.5, z + 1.0)),
            );
        }

        for i in 0..ROCK_COUNT {
            let (x, z) = scatter(rng);
            let scale = rng.gen_range(0.5..1.0);
            index.insert(
                format!("rock_{i}"),
                Aabb::from_center(Vec3::new(x, 0.5, z), Vec3::new(scale, scale, scale)),
            );
        }

        for i in 0..OBSTACLE_COUNT {
            let (x, z) = scatter(rng);
            let size: f32 = rng.gen_range(1.0..3.0);
            let half = size / 2.0;
            index.insert(
                format!("obstacle_{i}"),
                Aabb::new(
                    Vec3::new(x - half, 0.0, z - half),
                    Vec3::new(x + half, size * 2.0, z + half),
                ),
            );
        }

        index
    }

    /// Register or replace a collider.
    pub fn insert(&mut self, name: impl Into<String>, bounds: Aabb) {
        let name = name.into();
        match self.colliders.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = bounds,
            None => self.colliders.push((name, bounds)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Aabb> {
        let idx = self.colliders.iter().position(|(key, _)| key == name)?;
        Some(self.colliders.remove(idx).1)
    }

    pub fn get(&self, name: &str) -> Option<&Aabb> {
        self.colliders
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, bounds)| bounds)
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    /// Whether a cube of half-size `radius` around `position` touches any
    /// obstacle. The ground collider is skipped.
    pub fn check_collision(&self, position: Vec3, radius: f32) -> bool {
        self.first_collision(position, radius).is_some()
    }

    /// Name of the first obstacle hit by the probe cube, if any.
    pub fn first_collision(&self, position: Vec3, radius: f32) -> Option<&str> {
        let probe = Aabb::from_center(position, Vec3::new(radius, radius, radius));
        self.colliders
            .iter()
            .filter(|(key, _)| key != GROUND_KEY)
            .find(|(_, bounds)| probe.intersects(bounds))
            .map(|(key, _)| key.as_str())
    }

    /// Whether (x, z) lies over the ground collider. An index without ground
    /// accepts every position.
    pub fn on_ground(&self, x: f32, z: f32) -> bool {
        self.get(GROUND_KEY)
            .map(|ground| ground.contains_xz(x, z))
            .unwrap_or(true)
    }
}

fn scatter<R: Rng>(rng: &mut R) -> (f32, f32) {
    (
        rng.gen_range(-SCATTER_HALF_SIZE..SCATTER_HALF_SIZE),
        rng.gen_range(-SCATTER_HALF_SIZE..SCATTER_HALF_SIZE),
    )
}
