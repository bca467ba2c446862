//! Client-side simulation: tanks, bots, projectiles and terrain

pub mod bot;
pub mod combat;
pub mod physics;
pub mod tank;
pub mod terrain;

pub use bot::BotController;
pub use combat::{CombatResolver, HitResult, Projectile, ProjectileStep};
pub use physics::{Aabb, Rotation, Vec3};
pub use tank::{ControlInput, TankEntity, TankId};
pub use terrain::TerrainCollisionIndex;
