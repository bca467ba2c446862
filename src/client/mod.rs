//! Client-side world: local tank, bots and remote mirrors kept in step with
//! the server's event stream.
//!
//! Remote mirrors are replaced wholesale on every `playerMoved`; there is no
//! interpolation or prediction. Hits are decided here, by the client that
//! fired the shell, and reported to the server as `playerHit`.

pub mod transport;

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;
use uuid::Uuid;

use crate::game::round::ScoreEntry;
use crate::sim::bot::BotController;
use crate::sim::combat::{CombatResolver, HitResult, Projectile, ProjectileStep};
use crate::sim::physics::{Rotation, Vec3};
use crate::sim::tank::{ControlInput, TankEntity, TankId};
use crate::sim::terrain::TerrainCollisionIndex;
use crate::ws::protocol::{ClientMsg, ServerMsg};

pub use transport::{run_client, ClientError};

/// Bots are only added while the arena has room
pub const MAX_PLAYERS: usize = 16;
pub const DEFAULT_BOTS: usize = 4;
/// Bots spawn within +/- this on x and z
const BOT_SPAWN_HALF_SIZE: f32 = 40.0;
const BOT_SPAWN_ATTEMPTS: usize = 16;
/// Clearance probed around a bot spawn point
const BOT_SPAWN_CLEARANCE: f32 = 1.5;

/// Client world state for one connection
pub struct ArenaClient {
    own_id: Option<Uuid>,
    tanks: BTreeMap<TankId, TankEntity>,
    input: ControlInput,
    projectiles: Vec<Projectile>,
    ghosts: Vec<Projectile>,
    hit_effects: Vec<Vec3>,
    outbox: Vec<ClientMsg>,
    terrain: TerrainCollisionIndex,
    rng: ChaCha8Rng,
    round_time_left: Option<u32>,
    leaderboard: Vec<ScoreEntry>,
    last_elimination: Option<(Uuid, Uuid)>,
}

impl ArenaClient {
    pub fn new(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let terrain = TerrainCollisionIndex::generate(&mut rng);
        Self {
            own_id: None,
            tanks: BTreeMap::new(),
            input: ControlInput::default(),
            projectiles: Vec::new(),
            ghosts: Vec::new(),
            hit_effects: Vec::new(),
            outbox: Vec::new(),
            terrain,
            rng,
            round_time_left: None,
            leaderboard: Vec::new(),
            last_elimination: None,
        }
    }

    /// Add up to `count` bots, fewer if the arena is near capacity.
    /// Returns how many were added.
    pub fn spawn_bots(&mut self, count: usize) -> usize {
        let room = MAX_PLAYERS.saturating_sub(self.tanks.len());
        let wanted = count.min(room);
        let first = self.tanks.keys().filter(|id| matches!(id, TankId::Bot(_))).count() as u32;

        for n in first..first + wanted as u32 {
            let position = self.bot_spawn_point();
            let controller = BotController::new(self.rng.gen());
            let id = TankId::Bot(n);
            debug!(bot = %id, x = position.x, z = position.z, "Spawning bot");
            self.tanks.insert(id, TankEntity::new(id, position, controller));
        }
        wanted
    }

    /// Random floor point clear of obstacles; the last candidate is used if
    /// every attempt is blocked.
    fn bot_spawn_point(&mut self) -> Vec3 {
        let mut candidate = Vec3::ZERO;
        for _ in 0..BOT_SPAWN_ATTEMPTS {
            candidate = Vec3::new(
                self.rng.gen_range(-BOT_SPAWN_HALF_SIZE..BOT_SPAWN_HALF_SIZE),
                0.0,
                self.rng.gen_range(-BOT_SPAWN_HALF_SIZE..BOT_SPAWN_HALF_SIZE),
            );
            if self.terrain.on_ground(candidate.x, candidate.z)
                && !self.terrain.check_collision(candidate, BOT_SPAWN_CLEARANCE)
            {
                break;
            }
        }
        candidate
    }

    /// Controls applied to the local tank on the next tick. `fire` is
    /// consumed by that tick.
    pub fn set_input(&mut self, input: ControlInput) {
        self.input = input;
    }

    /// Apply one server event.
    pub fn handle_server_msg(&mut self, msg: ServerMsg, now_ms: u64) {
        match msg {
            ServerMsg::Connected { id } => {
                self.own_id = Some(id);
                let key = TankId::Participant(id);
                self.tanks
                    .entry(key)
                    .or_insert_with(|| TankEntity::human(key, Vec3::ZERO));
                self.outbox.push(ClientMsg::Join);
            }
            ServerMsg::PlayerJoined { id, position } => {
                if self.is_self(id) {
                    return;
                }
                let key = TankId::Participant(id);
                self.tanks
                    .entry(key)
                    .or_insert_with(|| TankEntity::remote(key, position));
            }
            ServerMsg::PlayerLeft { id } => {
                if !self.is_self(id) {
                    self.tanks.remove(&TankId::Participant(id));
                }
            }
            ServerMsg::PlayerMoved {
                id,
                position,
                rotation,
            } => {
                if self.is_self(id) {
                    return;
                }
                match self.tanks.get_mut(&TankId::Participant(id)) {
                    Some(mirror) => mirror.overwrite_transform(position, rotation),
                    None => debug!(participant_id = %id, "Move for unknown tank dropped"),
                }
            }
            ServerMsg::PlayerShot {
                id,
                position,
                rotation,
            } => {
                self.ghosts.push(Projectile::new(
                    TankId::Participant(id),
                    position,
                    rotation.y,
                    now_ms,
                ));
            }
            ServerMsg::PlayerHit { id, damage } => {
                if let Some(tank) = self.tanks.get_mut(&TankId::Participant(id)) {
                    tank.take_damage(damage.max(0) as u32);
                }
            }
            ServerMsg::PlayerDied { id, killer_id } => {
                if let Some(tank) = self.tanks.get_mut(&TankId::Participant(id)) {
                    tank.state_mut().eliminate();
                }
                self.last_elimination = Some((id, killer_id));
            }
            ServerMsg::RoundTimeUpdate { time_left } => {
                self.round_time_left = Some(time_left);
            }
            ServerMsg::RoundEnd { scores } => {
                self.leaderboard = scores;
                // Eliminations last one round
                for tank in self.tanks.values_mut() {
                    tank.state_mut().revive();
                }
            }
        }
    }

    /// One simulation frame: tanks, then owned shells, then ghosts.
    pub fn tick(&mut self, now_ms: u64) {
        let local = self.own_id.map(TankId::Participant);
        let idle = ControlInput::default();

        for (id, tank) in self.tanks.iter_mut() {
            let is_local = Some(*id) == local;
            let input = if is_local { &self.input } else { &idle };
            let outcome = tank.tick(input, now_ms);

            if let Some(projectile) = outcome.fired {
                self.outbox.push(ClientMsg::Shoot {
                    position: projectile.position,
                    rotation: Rotation::yaw(projectile.yaw()),
                });
                self.projectiles.push(projectile);
            }

            if is_local && !tank.state().is_eliminated() {
                self.outbox.push(ClientMsg::UpdatePosition {
                    position: tank.state().position,
                    rotation: tank.state().rotation,
                });
            }
        }
        self.input.fire = false;

        self.step_projectiles();
        self.ghosts
            .retain_mut(|ghost| CombatResolver::step_ghost(ghost, now_ms));
    }

    fn step_projectiles(&mut self) {
        let mut hits: Vec<HitResult> = Vec::new();
        let tanks = &mut self.tanks;

        self.projectiles.retain_mut(|projectile| {
            match CombatResolver::step(projectile, tanks.values_mut()) {
                ProjectileStep::InFlight => true,
                ProjectileStep::Spent => false,
                ProjectileStep::Hit(hit) => {
                    hits.push(hit);
                    false
                }
            }
        });

        for hit in hits {
            self.hit_effects.push(hit.position);
            // Damage to our own tank from a local bot stays local
            if let Some(target) = hit.target_id.participant() {
                if !self.is_self(target) {
                    self.outbox.push(ClientMsg::PlayerHit {
                        target_id: Some(target),
                        damage: hit.damage as i32,
                    });
                }
            }
        }
    }

    /// Events produced since the last drain, in emission order.
    pub fn drain_outbox(&mut self) -> Vec<ClientMsg> {
        std::mem::take(&mut self.outbox)
    }

    /// Hit effect positions produced since the last drain.
    pub fn drain_hit_effects(&mut self) -> Vec<Vec3> {
        std::mem::take(&mut self.hit_effects)
    }

    fn is_self(&self, id: Uuid) -> bool {
        self.own_id == Some(id)
    }

    pub fn own_id(&self) -> Option<Uuid> {
        self.own_id
    }

    pub fn local_tank(&self) -> Option<&TankEntity> {
        self.own_id
            .and_then(|id| self.tanks.get(&TankId::Participant(id)))
    }

    pub fn tank(&self, id: &TankId) -> Option<&TankEntity> {
        self.tanks.get(id)
    }

    pub fn tank_mut(&mut self, id: &TankId) -> Option<&mut TankEntity> {
        self.tanks.get_mut(id)
    }

    pub fn tanks(&self) -> impl Iterator<Item = &TankEntity> {
        self.tanks.values()
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn ghosts(&self) -> &[Projectile] {
        &self.ghosts
    }

    pub fn terrain(&self) -> &TerrainCollisionIndex {
        &self.terrain
    }

    pub fn round_time_left(&self) -> Option<u32> {
        self.round_time_left
    }

    pub fn leaderboard(&self) -> &[ScoreEntry] {
        &self.leaderboard
    }

    pub fn last_elimination(&self) -> Option<(Uuid, Uuid)> {
        self.last_elimination
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::combat::GHOST_LIFETIME_MS;

    fn connected() -> (ArenaClient, Uuid) {
        let mut client = ArenaClient::new(5);
        let id = Uuid::new_v4();
        client.handle_server_msg(ServerMsg::Connected { id }, 0);
        client.drain_outbox();
        (client, id)
    }

    #[test]
    fn connected_creates_local_tank_and_requests_join() {
        let mut client = ArenaClient::new(1);
        let id = Uuid::new_v4();
        client.handle_server_msg(ServerMsg::Connected { id }, 0);
        assert_eq!(client.own_id(), Some(id));
        assert!(client.local_tank().is_some());
        assert_eq!(client.drain_outbox(), vec![ClientMsg::Join]);
    }

    #[test]
    fn own_join_does_not_create_mirror() {
        let (mut client, id) = connected();
        client.handle_server_msg(
            ServerMsg::PlayerJoined {
                id,
                position: Vec3::new(9.0, 0.0, 9.0),
            },
            0,
        );
        assert_eq!(client.tanks().count(), 1);
        assert_eq!(client.local_tank().unwrap().state().position, Vec3::ZERO);
    }

    #[test]
    fn mirrors_follow_moves_and_leave() {
        let (mut client, _) = connected();
        let other = Uuid::new_v4();
        client.handle_server_msg(
            ServerMsg::PlayerJoined {
                id: other,
                position: Vec3::ZERO,
            },
            0,
        );
        client.handle_server_msg(
            ServerMsg::PlayerMoved {
                id: other,
                position: Vec3::new(7.0, 0.0, -1.0),
                rotation: Rotation::yaw(0.5),
            },
            0,
        );
        let mirror = client.tank(&TankId::Participant(other)).unwrap();
        assert_eq!(mirror.state().position, Vec3::new(7.0, 0.0, -1.0));

        client.handle_server_msg(ServerMsg::PlayerLeft { id: other }, 0);
        assert!(client.tank(&TankId::Participant(other)).is_none());
    }

    #[test]
    fn local_tank_reports_position_every_tick() {
        let (mut client, _) = connected();
        client.set_input(ControlInput {
            forward: true,
            ..Default::default()
        });
        client.tick(16);
        client.tick(32);
        let reports = client
            .drain_outbox()
            .into_iter()
            .filter(|m| matches!(m, ClientMsg::UpdatePosition { .. }))
            .count();
        assert_eq!(reports, 2);
    }

    #[test]
    fn local_hit_on_remote_participant_is_reported() {
        let (mut client, _) = connected();
        let other = Uuid::new_v4();
        client.handle_server_msg(
            ServerMsg::PlayerJoined {
                id: other,
                position: Vec3::new(0.0, 0.0, 5.0),
            },
            0,
        );
        client.set_input(ControlInput {
            fire: true,
            ..Default::default()
        });

        let mut now = 0;
        let mut sent = Vec::new();
        for _ in 0..20 {
            now += 16;
            client.tick(now);
            sent.extend(client.drain_outbox());
        }

        assert_eq!(
            sent.iter()
                .filter(|m| matches!(m, ClientMsg::Shoot { .. }))
                .count(),
            1
        );
        assert!(sent.contains(&ClientMsg::PlayerHit {
            target_id: Some(other),
            damage: 20
        }));
        assert_eq!(
            client.tank(&TankId::Participant(other)).unwrap().state().health,
            80
        );
        assert_eq!(client.drain_hit_effects().len(), 1);
    }

    #[test]
    fn ghosts_expire_without_damage() {
        let (mut client, _) = connected();
        let other = Uuid::new_v4();
        client.handle_server_msg(
            ServerMsg::PlayerShot {
                id: other,
                position: Vec3::new(0.0, 0.0, -3.0),
                rotation: Rotation::yaw(0.0),
            },
            1_000,
        );
        client.tick(1_016);
        assert_eq!(client.ghosts().len(), 1);
        client.tick(1_000 + GHOST_LIFETIME_MS);
        assert!(client.ghosts().is_empty());
        assert_eq!(client.local_tank().unwrap().state().health, 100);
    }

    #[test]
    fn relayed_hit_and_death_apply_to_named_tank() {
        let (mut client, id) = connected();
        client.handle_server_msg(ServerMsg::PlayerHit { id, damage: 20 }, 0);
        assert_eq!(client.local_tank().unwrap().state().health, 80);

        let killer = Uuid::new_v4();
        client.handle_server_msg(ServerMsg::PlayerDied { id, killer_id: killer }, 0);
        assert!(client.local_tank().unwrap().state().is_eliminated());
        assert_eq!(client.last_elimination(), Some((id, killer)));
    }

    #[test]
    fn round_events_update_hud_state() {
        let (mut client, id) = connected();
        client.handle_server_msg(ServerMsg::RoundTimeUpdate { time_left: 9 }, 0);
        assert_eq!(client.round_time_left(), Some(9));
        let scores = vec![ScoreEntry { id, score: 3 }];
        client.handle_server_msg(ServerMsg::RoundEnd { scores: scores.clone() }, 0);
        assert_eq!(client.leaderboard(), scores.as_slice());
    }

    #[test]
    fn round_end_revives_eliminated_tanks() {
        let (mut client, id) = connected();
        client.spawn_bots(1);
        client.handle_server_msg(
            ServerMsg::PlayerDied {
                id,
                killer_id: Uuid::new_v4(),
            },
            0,
        );
        client
            .tank_mut(&TankId::Bot(0))
            .unwrap()
            .state_mut()
            .eliminate();

        client.handle_server_msg(ServerMsg::RoundEnd { scores: Vec::new() }, 0);
        assert!(client.tanks().all(|t| !t.state().is_eliminated()));
        assert_eq!(client.local_tank().unwrap().state().health, 100);

        client.set_input(ControlInput {
            forward: true,
            ..Default::default()
        });
        client.tick(16);
        assert!(client
            .drain_outbox()
            .iter()
            .any(|m| matches!(m, ClientMsg::UpdatePosition { .. })));
    }

    #[test]
    fn bots_spawn_clear_and_capped() {
        let mut client = ArenaClient::new(77);
        assert_eq!(client.spawn_bots(DEFAULT_BOTS), DEFAULT_BOTS);
        let bots: Vec<&TankEntity> = client.tanks().filter(|t| t.is_bot()).collect();
        assert_eq!(bots.len(), DEFAULT_BOTS);
        for bot in bots {
            let p = bot.state().position;
            assert!(p.x.abs() <= BOT_SPAWN_HALF_SIZE && p.z.abs() <= BOT_SPAWN_HALF_SIZE);
        }
        assert!(client.tank(&TankId::Bot(3)).is_some());
    }

    #[test]
    fn bot_count_respects_arena_capacity() {
        let mut client = ArenaClient::new(8);
        assert_eq!(client.spawn_bots(10), 10);
        assert_eq!(client.spawn_bots(10), MAX_PLAYERS - 10);
        assert_eq!(client.spawn_bots(1), 0);
        assert!(client.tank(&TankId::Bot(15)).is_some());
    }

    #[test]
    fn bots_do_not_report_positions() {
        let mut client = ArenaClient::new(3);
        client.spawn_bots(DEFAULT_BOTS);
        for frame in 1..=10u64 {
            client.tick(frame * 16);
        }
        assert!(client
            .drain_outbox()
            .iter()
            .all(|m| !matches!(m, ClientMsg::UpdatePosition { .. })));
    }
}
