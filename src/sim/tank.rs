//! Client-side tank state and the behaviors that drive it

use std::fmt;

use uuid::Uuid;

use super::combat::Projectile;
use super::physics::{tank_bounds, Aabb, MovementSystem, Rotation, Vec3, TANK_SPEED, TANK_TURN_RATE};

pub const MAX_HEALTH: u32 = 100;
pub const MAX_AMMO: u32 = 30;
pub const SHOOT_COOLDOWN_MS: u64 = 1000;

/// Identity of a tank as seen by one client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TankId {
    /// A connected participant (the local player or a remote mirror)
    Participant(Uuid),
    /// A bot simulated by this client only
    Bot(u32),
}

impl TankId {
    pub fn participant(&self) -> Option<Uuid> {
        match self {
            TankId::Participant(id) => Some(*id),
            TankId::Bot(_) => None,
        }
    }
}

impl fmt::Display for TankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TankId::Participant(id) => write!(f, "{id}"),
            TankId::Bot(n) => write!(f, "bot_{n}"),
        }
    }
}

/// Held controls for one simulation tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    /// Absolute turret yaw; follows the camera
    pub turret_yaw: f32,
    /// Fire trigger for this tick
    pub fire: bool,
}

/// Why a shot was not fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FireBlocked {
    #[error("out of ammo")]
    OutOfAmmo,
    #[error("weapon cooling down for {remaining_ms}ms")]
    CoolingDown { remaining_ms: u64 },
    #[error("tank is eliminated")]
    Eliminated,
}

/// Result of applying damage to a tank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    Damaged { health: u32 },
    /// Health reached zero on this hit
    Eliminated,
    /// Tank was already eliminated, nothing changed
    Ignored,
}

/// Mutable combat/transform state of a tank
#[derive(Debug, Clone)]
pub struct TankState {
    pub id: TankId,
    pub position: Vec3,
    pub rotation: Rotation,
    pub turret_rotation: Rotation,
    pub health: u32,
    pub ammo: u32,
    pub last_shot_ms: Option<u64>,
    eliminated: bool,
}

impl TankState {
    pub fn new(id: TankId, position: Vec3) -> Self {
        Self {
            id,
            position,
            rotation: Rotation::default(),
            turret_rotation: Rotation::default(),
            health: MAX_HEALTH,
            ammo: MAX_AMMO,
            last_shot_ms: None,
            eliminated: false,
        }
    }

    pub fn is_eliminated(&self) -> bool {
        self.eliminated
    }

    pub fn bounds(&self) -> Aabb {
        tank_bounds(self.position, self.rotation.y)
    }

    /// Fire along the turret's yaw. Ammo and cooldown gate every caller.
    pub fn try_fire(&mut self, now_ms: u64) -> Result<Projectile, FireBlocked> {
        if self.eliminated {
            return Err(FireBlocked::Eliminated);
        }
        if self.ammo == 0 {
            return Err(FireBlocked::OutOfAmmo);
        }
        if let Some(last) = self.last_shot_ms {
            let elapsed = now_ms.saturating_sub(last);
            if elapsed < SHOOT_COOLDOWN_MS {
                return Err(FireBlocked::CoolingDown {
                    remaining_ms: SHOOT_COOLDOWN_MS - elapsed,
                });
            }
        }

        self.ammo -= 1;
        self.last_shot_ms = Some(now_ms);
        Ok(Projectile::new(
            self.id,
            self.position,
            self.turret_rotation.y,
            now_ms,
        ))
    }

    pub fn take_damage(&mut self, amount: u32) -> DamageOutcome {
        if self.eliminated {
            return DamageOutcome::Ignored;
        }
        self.health = self.health.saturating_sub(amount);
        if self.health == 0 {
            self.eliminated = true;
            DamageOutcome::Eliminated
        } else {
            DamageOutcome::Damaged {
                health: self.health,
            }
        }
    }

    /// Mark eliminated on an external notice. Returns false if it already was.
    pub fn eliminate(&mut self) -> bool {
        if self.eliminated {
            return false;
        }
        self.health = 0;
        self.eliminated = true;
        true
    }

    /// Back to full health for a new round. Ammo is not refilled.
    pub fn revive(&mut self) {
        self.health = MAX_HEALTH;
        self.eliminated = false;
    }
}

/// What happened to a tank during one tick
#[derive(Debug, Default)]
pub struct TickOutcome {
    pub moved: bool,
    pub fired: Option<Projectile>,
}

/// Per-tick driver of a tank, chosen when the tank is built
pub trait TankBehavior: Send {
    fn tick(&mut self, tank: &mut TankState, input: &ControlInput, now_ms: u64) -> TickOutcome;

    fn is_bot(&self) -> bool {
        false
    }
}

/// Keyboard/pointer driven tank
#[derive(Debug, Default)]
pub struct HumanDriver;

impl TankBehavior for HumanDriver {
    fn tick(&mut self, tank: &mut TankState, input: &ControlInput, now_ms: u64) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        if input.forward {
            tank.position = MovementSystem::advance(tank.position, tank.rotation.y, TANK_SPEED);
            outcome.moved = true;
        }
        if input.backward {
            tank.position = MovementSystem::advance(tank.position, tank.rotation.y, -TANK_SPEED);
            outcome.moved = true;
        }
        if input.left {
            tank.rotation.y = MovementSystem::turn(tank.rotation.y, TANK_TURN_RATE);
            outcome.moved = true;
        }
        if input.right {
            tank.rotation.y = MovementSystem::turn(tank.rotation.y, -TANK_TURN_RATE);
            outcome.moved = true;
        }

        tank.turret_rotation.y = input.turret_yaw;

        if input.fire {
            outcome.fired = tank.try_fire(now_ms).ok();
        }

        outcome
    }
}

/// Another participant's tank; its transform is overwritten by network events
#[derive(Debug, Default)]
pub struct RemoteMirror;

impl TankBehavior for RemoteMirror {
    fn tick(&mut self, _tank: &mut TankState, _input: &ControlInput, _now_ms: u64) -> TickOutcome {
        TickOutcome::default()
    }
}

/// A tank plus the behavior that drives it
pub struct TankEntity {
    state: TankState,
    behavior: Box<dyn TankBehavior>,
}

impl TankEntity {
    pub fn new(id: TankId, position: Vec3, behavior: impl TankBehavior + 'static) -> Self {
        Self {
            state: TankState::new(id, position),
            behavior: Box::new(behavior),
        }
    }

    pub fn human(id: TankId, position: Vec3) -> Self {
        Self::new(id, position, HumanDriver)
    }

    pub fn remote(id: TankId, position: Vec3) -> Self {
        Self::new(id, position, RemoteMirror)
    }

    /// Run the behavior for one tick. Eliminated tanks stay put.
    pub fn tick(&mut self, input: &ControlInput, now_ms: u64) -> TickOutcome {
        if self.state.is_eliminated() {
            return TickOutcome::default();
        }
        self.behavior.tick(&mut self.state, input, now_ms)
    }

    pub fn id(&self) -> TankId {
        self.state.id
    }

    pub fn is_bot(&self) -> bool {
        self.behavior.is_bot()
    }

    pub fn state(&self) -> &TankState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut TankState {
        &mut self.state
    }

    pub fn bounds(&self) -> Aabb {
        self.state.bounds()
    }

    pub fn take_damage(&mut self, amount: u32) -> DamageOutcome {
        self.state.take_damage(amount)
    }

    /// Replace position and hull rotation wholesale (no blending).
    pub fn overwrite_transform(&mut self, position: Vec3, rotation: Rotation) {
        self.state.position = position;
        self.state.rotation = rotation;
    }
}

impl fmt::Debug for TankEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TankEntity")
            .field("state", &self.state)
            .field("is_bot", &self.is_bot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local() -> TankEntity {
        TankEntity::human(TankId::Participant(Uuid::new_v4()), Vec3::ZERO)
    }

    #[test]
    fn empty_magazine_never_fires() {
        let mut tank = local();
        tank.state_mut().ammo = 0;
        for now in [0, 5_000, 60_000, 1_000_000] {
            assert_eq!(tank.state_mut().try_fire(now).unwrap_err(), FireBlocked::OutOfAmmo);
        }
    }

    #[test]
    fn shots_inside_cooldown_fire_once() {
        let mut tank = local();
        let input = ControlInput {
            fire: true,
            ..Default::default()
        };
        let first = tank.tick(&input, 10_000);
        let second = tank.tick(&input, 10_999);
        assert!(first.fired.is_some());
        assert!(second.fired.is_none());
        assert_eq!(tank.state().ammo, MAX_AMMO - 1);

        let third = tank.tick(&input, 11_000);
        assert!(third.fired.is_some());
    }

    #[test]
    fn damage_clamps_and_eliminates_once() {
        let mut tank = local();
        assert_eq!(tank.take_damage(30), DamageOutcome::Damaged { health: 70 });
        assert_eq!(tank.take_damage(90), DamageOutcome::Eliminated);
        assert_eq!(tank.state().health, 0);
        assert_eq!(tank.take_damage(20), DamageOutcome::Ignored);
        assert!(!tank.state_mut().eliminate());
    }

    #[test]
    fn forward_and_turn_follow_hull_yaw() {
        let mut tank = local();
        let forward = ControlInput {
            forward: true,
            ..Default::default()
        };
        tank.tick(&forward, 0);
        assert!((tank.state().position.z - TANK_SPEED).abs() < 1e-6);

        let left = ControlInput {
            left: true,
            ..Default::default()
        };
        tank.tick(&left, 0);
        assert!((tank.state().rotation.y - TANK_TURN_RATE).abs() < 1e-6);
    }

    #[test]
    fn projectile_uses_turret_yaw_not_hull() {
        let mut tank = local();
        tank.state_mut().rotation.y = 1.0;
        let input = ControlInput {
            turret_yaw: 0.0,
            fire: true,
            ..Default::default()
        };
        let fired = tank.tick(&input, 0).fired.expect("shot");
        assert!(fired.direction().x.abs() < 1e-6);
        assert!((fired.direction().z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn remote_mirror_is_overwritten_wholesale() {
        let mut tank = TankEntity::remote(TankId::Participant(Uuid::new_v4()), Vec3::ZERO);
        tank.tick(
            &ControlInput {
                forward: true,
                ..Default::default()
            },
            0,
        );
        assert_eq!(tank.state().position, Vec3::ZERO);

        tank.overwrite_transform(Vec3::new(4.0, 0.0, -2.0), Rotation::yaw(2.0));
        assert_eq!(tank.state().position, Vec3::new(4.0, 0.0, -2.0));
        assert_eq!(tank.state().rotation.y, 2.0);
    }

    #[test]
    fn revived_tank_can_be_eliminated_again() {
        let mut tank = local();
        assert_eq!(tank.take_damage(MAX_HEALTH), DamageOutcome::Eliminated);
        tank.state_mut().revive();
        assert_eq!(tank.state().health, MAX_HEALTH);
        assert!(!tank.state().is_eliminated());
        assert_eq!(tank.take_damage(MAX_HEALTH), DamageOutcome::Eliminated);
    }

    #[test]
    fn eliminated_tank_does_not_move() {
        let mut tank = local();
        tank.state_mut().eliminate();
        let outcome = tank.tick(
            &ControlInput {
                forward: true,
                fire: true,
                ..Default::default()
            },
            0,
        );
        assert!(!outcome.moved);
        assert!(outcome.fired.is_none());
    }
}
