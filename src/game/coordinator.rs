//! Session coordinator: the single task that owns participant and round state

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::sim::physics::{Rotation, Vec3};
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::round::{RoundEvent, RoundPhase, RoundScheduler};
use super::session::{HitOutcome, ParticipantId, SessionRegistry};

const INPUT_QUEUE: usize = 1024;
const ROUND_TICK: Duration = Duration::from_secs(1);

/// Who an outbound message is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipients {
    All,
    AllExcept(ParticipantId),
    Only(ParticipantId),
}

/// Addressed server message on the fan-out channel
#[derive(Debug, Clone)]
pub struct Envelope {
    pub recipients: Recipients,
    pub msg: ServerMsg,
}

impl Envelope {
    pub fn is_for(&self, id: &ParticipantId) -> bool {
        match self.recipients {
            Recipients::All => true,
            Recipients::AllExcept(excluded) => excluded != *id,
            Recipients::Only(target) => target == *id,
        }
    }
}

/// Input to the coordinator from connection tasks
#[derive(Debug, Clone)]
pub enum SessionInput {
    Connected { participant_id: ParticipantId },
    Disconnected { participant_id: ParticipantId },
    Event {
        participant_id: ParticipantId,
        msg: ClientMsg,
        received_at: u64,
    },
}

/// Snapshot published for the health endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundStatus {
    pub round: u64,
    pub phase: RoundPhase,
    pub time_left: u32,
}

impl RoundStatus {
    fn of(rounds: &RoundScheduler) -> Self {
        Self {
            round: rounds.round_number(),
            phase: rounds.phase(),
            time_left: rounds.time_left(),
        }
    }
}

/// Coordinator is gone; the process is shutting down
#[derive(Debug, thiserror::Error)]
#[error("Session coordinator is not running")]
pub struct SessionClosed;

/// Cloneable handle used by connection tasks and HTTP handlers
#[derive(Clone)]
pub struct SessionHandle {
    input_tx: mpsc::Sender<SessionInput>,
    outbound_tx: broadcast::Sender<Envelope>,
    participant_count: Arc<AtomicUsize>,
    status_rx: watch::Receiver<RoundStatus>,
}

impl SessionHandle {
    pub async fn send(&self, input: SessionInput) -> Result<(), SessionClosed> {
        self.input_tx.send(input).await.map_err(|_| SessionClosed)
    }

    /// Subscribe before announcing a connection so its own join is seen.
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.outbound_tx.subscribe()
    }

    pub fn participant_count(&self) -> usize {
        self.participant_count.load(Ordering::Relaxed)
    }

    pub fn round_status(&self) -> RoundStatus {
        *self.status_rx.borrow()
    }

    pub fn is_closed(&self) -> bool {
        self.input_tx.is_closed()
    }
}

/// Owns the registry and the round clock; all mutation happens here
pub struct SessionCoordinator {
    registry: SessionRegistry,
    rounds: RoundScheduler,
    input_rx: mpsc::Receiver<SessionInput>,
    outbound_tx: broadcast::Sender<Envelope>,
    participant_count: Arc<AtomicUsize>,
    status_tx: watch::Sender<RoundStatus>,
}

impl SessionCoordinator {
    pub fn new(rounds: RoundScheduler, outbound_buffer: usize) -> (Self, SessionHandle) {
        let (input_tx, input_rx) = mpsc::channel(INPUT_QUEUE);
        let (outbound_tx, _) = broadcast::channel(outbound_buffer.max(1));
        let (status_tx, status_rx) = watch::channel(RoundStatus::of(&rounds));
        let participant_count = Arc::new(AtomicUsize::new(0));

        let handle = SessionHandle {
            input_tx,
            outbound_tx: outbound_tx.clone(),
            participant_count: participant_count.clone(),
            status_rx,
        };

        let coordinator = Self {
            registry: SessionRegistry::new(),
            rounds,
            input_rx,
            outbound_tx,
            participant_count,
            status_tx,
        };

        (coordinator, handle)
    }

    /// Dispatch loop. Runs until every handle is dropped.
    pub async fn run(mut self) {
        info!(
            round = self.rounds.round_number(),
            time_left = self.rounds.time_left(),
            "Session coordinator started"
        );

        let mut round_clock = interval_at(Instant::now() + ROUND_TICK, ROUND_TICK);
        round_clock.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                input = self.input_rx.recv() => match input {
                    Some(input) => self.handle_input(input),
                    None => break,
                },
                _ = round_clock.tick() => self.on_round_tick(),
            }
        }

        info!("Session coordinator stopped");
    }

    pub fn handle_input(&mut self, input: SessionInput) {
        match input {
            SessionInput::Connected { participant_id } => self.on_connect(participant_id),
            SessionInput::Disconnected { participant_id } => self.on_disconnect(participant_id),
            SessionInput::Event {
                participant_id,
                msg,
                received_at,
            } => {
                if !self.registry.contains(&participant_id) {
                    debug!(participant_id = %participant_id, "Event from unknown participant dropped");
                    return;
                }
                let lag_ms = unix_millis().saturating_sub(received_at);
                if lag_ms > 1000 {
                    warn!(participant_id = %participant_id, lag_ms, "Slow input processing");
                }
                self.handle_event(participant_id, msg);
            }
        }
    }

    fn handle_event(&mut self, participant_id: ParticipantId, msg: ClientMsg) {
        match msg {
            ClientMsg::Join => self.on_join(participant_id),
            ClientMsg::UpdatePosition { position, rotation } => {
                self.on_position_update(participant_id, position, rotation)
            }
            ClientMsg::Shoot { position, rotation } => {
                self.on_shoot(participant_id, position, rotation)
            }
            ClientMsg::PlayerHit { target_id, damage } => match target_id {
                Some(target_id) => self.on_hit(participant_id, target_id, damage),
                None => debug!(participant_id = %participant_id, "Hit without target dropped"),
            },
        }
    }

    fn on_connect(&mut self, id: ParticipantId) {
        let position = match self.registry.connect(id) {
            Ok(participant) => participant.position,
            Err(e) => {
                warn!(participant_id = %id, error = %e, "Connect rejected");
                return;
            }
        };
        self.rounds.register(id);
        self.sync_count();

        info!(
            participant_id = %id,
            participants = self.registry.len(),
            "Participant connected"
        );
        self.broadcast(Recipients::All, ServerMsg::PlayerJoined { id, position });
    }

    fn on_disconnect(&mut self, id: ParticipantId) {
        if self.registry.disconnect(&id).is_none() {
            debug!(participant_id = %id, "Disconnect for unknown participant");
            return;
        }
        self.sync_count();

        info!(
            participant_id = %id,
            participants = self.registry.len(),
            "Participant disconnected"
        );
        self.broadcast(Recipients::All, ServerMsg::PlayerLeft { id });
    }

    /// Replays the roster to the requester so late joiners see existing tanks.
    fn on_join(&mut self, id: ParticipantId) {
        let roster: Vec<ServerMsg> = self
            .registry
            .participants()
            .into_iter()
            .filter(|p| p.id != id)
            .map(|p| ServerMsg::PlayerJoined {
                id: p.id,
                position: p.position,
            })
            .collect();

        debug!(participant_id = %id, roster = roster.len(), "Join roster replay");
        for msg in roster {
            self.broadcast(Recipients::Only(id), msg);
        }
    }

    fn on_position_update(
        &mut self,
        id: ParticipantId,
        position: Vec3,
        rotation: Rotation,
    ) {
        if self.registry.update_position(&id, position, rotation) {
            self.broadcast(
                Recipients::AllExcept(id),
                ServerMsg::PlayerMoved {
                    id,
                    position,
                    rotation,
                },
            );
        }
    }

    /// Relayed without ammo or cooldown checks; those are enforced client-side.
    fn on_shoot(
        &mut self,
        id: ParticipantId,
        position: Vec3,
        rotation: Rotation,
    ) {
        self.broadcast(
            Recipients::All,
            ServerMsg::PlayerShot {
                id,
                position,
                rotation,
            },
        );
    }

    fn on_hit(&mut self, attacker: ParticipantId, target: ParticipantId, damage: i32) {
        match self.registry.apply_hit(&attacker, &target, damage) {
            HitOutcome::UnknownTarget => {
                debug!(attacker = %attacker, target = %target, "Hit on unknown target dropped");
            }
            HitOutcome::AlreadyEliminated => {
                debug!(attacker = %attacker, target = %target, "Hit on eliminated target ignored");
            }
            HitOutcome::Damaged { health } => {
                debug!(attacker = %attacker, target = %target, health, "Participant damaged");
                self.broadcast(
                    Recipients::Only(target),
                    ServerMsg::PlayerHit { id: target, damage },
                );
            }
            HitOutcome::Eliminated { killer_credited } => {
                if killer_credited {
                    self.rounds.record_kill(attacker);
                }
                info!(killer = %attacker, target = %target, "Participant eliminated");
                self.broadcast(
                    Recipients::Only(target),
                    ServerMsg::PlayerHit { id: target, damage },
                );
                self.broadcast(
                    Recipients::All,
                    ServerMsg::PlayerDied {
                        id: target,
                        killer_id: attacker,
                    },
                );
            }
        }
    }

    pub fn on_round_tick(&mut self) {
        for event in self.rounds.tick() {
            match event {
                RoundEvent::TimeUpdate { time_left } => {
                    self.broadcast(Recipients::All, ServerMsg::RoundTimeUpdate { time_left });
                }
                RoundEvent::Ended { round, scores } => {
                    info!(round, entries = scores.len(), "Round ended");
                    self.broadcast(Recipients::All, ServerMsg::RoundEnd { scores });
                    self.registry.start_new_round();
                    let live: Vec<Uuid> = self.registry.participants().iter().map(|p| p.id).collect();
                    for id in live {
                        self.rounds.register(id);
                    }
                }
                RoundEvent::Started { round } => {
                    info!(round, "Round started");
                }
            }
        }
        let _ = self.status_tx.send(RoundStatus::of(&self.rounds));
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn rounds(&self) -> &RoundScheduler {
        &self.rounds
    }

    fn sync_count(&self) {
        self.participant_count
            .store(self.registry.len(), Ordering::Relaxed);
    }

    /// Fire-and-forget; having no subscribers is fine.
    fn broadcast(&self, recipients: Recipients, msg: ServerMsg) {
        let _ = self.outbound_tx.send(Envelope { recipients, msg });
    }
}
