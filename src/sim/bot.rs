//! Bot behavior: wander on a random heading and fire at random

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::physics::{MovementSystem, TANK_SPEED};
use super::tank::{ControlInput, TankBehavior, TankState, TickOutcome};

/// How long a bot keeps its heading
pub const DIRECTION_CHANGE_INTERVAL_MS: u64 = 3000;
/// Independent chance per tick that a bot pulls the trigger
pub const FIRE_CHANCE: f64 = 0.01;

/// Drives one bot tank. No targeting and no obstacle avoidance.
#[derive(Debug)]
pub struct BotController {
    rng: ChaCha8Rng,
    /// `None` until the first tick, which always picks a heading
    last_direction_change_ms: Option<u64>,
    direction_change_interval_ms: u64,
    fire_chance: f64,
}

impl BotController {
    pub fn new(seed: u64) -> Self {
        Self::with_tuning(seed, DIRECTION_CHANGE_INTERVAL_MS, FIRE_CHANCE)
    }

    pub fn with_tuning(seed: u64, direction_change_interval_ms: u64, fire_chance: f64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            last_direction_change_ms: None,
            direction_change_interval_ms,
            fire_chance: fire_chance.clamp(0.0, 1.0),
        }
    }

    /// Time since the heading last changed; zero right after a change.
    pub fn ms_since_direction_change(&self, now_ms: u64) -> Option<u64> {
        self.last_direction_change_ms
            .map(|last| now_ms.saturating_sub(last))
    }

    fn direction_change_due(&self, now_ms: u64) -> bool {
        match self.last_direction_change_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.direction_change_interval_ms,
        }
    }

    /// New heading in [0, 2π), never equal to the current one.
    fn roll_heading(&mut self, current: f32) -> f32 {
        loop {
            let heading = self.rng.gen_range(0.0..std::f32::consts::TAU);
            if heading != current {
                return heading;
            }
        }
    }
}

impl TankBehavior for BotController {
    fn tick(&mut self, tank: &mut TankState, _input: &ControlInput, now_ms: u64) -> TickOutcome {
        if self.direction_change_due(now_ms) {
            tank.rotation.y = self.roll_heading(tank.rotation.y);
            self.last_direction_change_ms = Some(now_ms);
        }

        // Turret rides the hull
        tank.turret_rotation.y = tank.rotation.y;
        tank.position = MovementSystem::advance(tank.position, tank.rotation.y, TANK_SPEED);

        let fired = if self.rng.gen_bool(self.fire_chance) {
            tank.try_fire(now_ms).ok()
        } else {
            None
        };

        TickOutcome { moved: true, fired }
    }

    fn is_bot(&self) -> bool {
        true
    }
}
