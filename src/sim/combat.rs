//! Projectiles and hit resolution against tanks

use super::physics::{forward, Aabb, Vec3};
use super::tank::{DamageOutcome, TankEntity, TankId};

/// Distance a projectile covers per tick
pub const PROJECTILE_SPEED: f32 = 0.5;
/// Projectiles past this distance from their spawn point are dropped
pub const PROJECTILE_MAX_RANGE: f32 = 100.0;
/// Lifetime of relayed (ghost) projectiles
pub const GHOST_LIFETIME_MS: u64 = 2000;
/// Damage dealt by one hit
pub const HIT_DAMAGE: u32 = 20;
/// Half extents of the shell volume in its local frame
pub const PROJECTILE_HALF_EXTENTS: Vec3 = Vec3::new(0.1, 0.05, 0.2);

/// A fired shell
#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub origin_id: TankId,
    pub position: Vec3,
    start: Vec3,
    direction: Vec3,
    yaw: f32,
    speed: f32,
    spawned_at_ms: u64,
}

impl Projectile {
    /// Direction is fixed from `yaw` at creation.
    pub fn new(origin_id: TankId, position: Vec3, yaw: f32, now_ms: u64) -> Self {
        Self {
            origin_id,
            position,
            start: position,
            direction: forward(yaw),
            yaw,
            speed: PROJECTILE_SPEED,
            spawned_at_ms: now_ms,
        }
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn advance(&mut self) {
        self.position += self.direction * self.speed;
    }

    pub fn distance_traveled(&self) -> f32 {
        self.position.distance_to(self.start)
    }

    pub fn out_of_range(&self) -> bool {
        self.distance_traveled() > PROJECTILE_MAX_RANGE
    }

    pub fn expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.spawned_at_ms) >= GHOST_LIFETIME_MS
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::oriented(self.position, PROJECTILE_HALF_EXTENTS, self.yaw)
    }
}

/// Hit registered by the resolver
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub shooter_id: TankId,
    pub target_id: TankId,
    pub damage: u32,
    /// Where the hit effect spawns
    pub position: Vec3,
    pub target_eliminated: bool,
}

/// What one simulation step did to a projectile
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectileStep {
    InFlight,
    Hit(HitResult),
    /// Left its range without hitting anything
    Spent,
}

/// Moves projectiles and applies their damage.
///
/// Runs on the shooter's client only; the server never verifies a hit.
pub struct CombatResolver;

impl CombatResolver {
    /// Advance one tick and test against every live tank except the shooter.
    /// The first intersecting tank in iteration order takes the damage.
    pub fn step<'a>(
        projectile: &mut Projectile,
        tanks: impl IntoIterator<Item = &'a mut TankEntity>,
    ) -> ProjectileStep {
        projectile.advance();
        let bounds = projectile.bounds();

        for tank in tanks {
            if tank.id() == projectile.origin_id || tank.state().is_eliminated() {
                continue;
            }
            if !tank.bounds().intersects(&bounds) {
                continue;
            }

            let outcome = tank.take_damage(HIT_DAMAGE);
            return ProjectileStep::Hit(HitResult {
                shooter_id: projectile.origin_id,
                target_id: tank.id(),
                damage: HIT_DAMAGE,
                position: projectile.position,
                target_eliminated: outcome == DamageOutcome::Eliminated,
            });
        }

        if projectile.out_of_range() {
            ProjectileStep::Spent
        } else {
            ProjectileStep::InFlight
        }
    }

    /// Ghost projectiles are cosmetic: they move and time out, nothing else.
    /// Returns false once the ghost should be removed.
    pub fn step_ghost(projectile: &mut Projectile, now_ms: u64) -> bool {
        projectile.advance();
        !projectile.expired(now_ms)
    }
}
