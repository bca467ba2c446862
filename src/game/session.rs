//! Participant registry: the authoritative record of who is connected

use std::collections::HashMap;

use uuid::Uuid;

use crate::sim::physics::{Rotation, Vec3};

pub type ParticipantId = Uuid;

pub const DEFAULT_HEALTH: i32 = 100;

/// Authoritative state of one connected player
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub id: ParticipantId,
    pub position: Vec3,
    pub rotation: Rotation,
    /// Clamped at zero; zero means eliminated for the rest of the round
    pub health: i32,
    pub score: u32,
    /// Connect order, used for stable iteration
    pub joined_seq: u64,
}

impl Participant {
    fn new(id: ParticipantId, joined_seq: u64) -> Self {
        Self {
            id,
            position: Vec3::ZERO,
            rotation: Rotation::default(),
            health: DEFAULT_HEALTH,
            score: 0,
            joined_seq,
        }
    }

    pub fn is_eliminated(&self) -> bool {
        self.health <= 0
    }
}

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Participant {0} is already connected")]
    DuplicateId(ParticipantId),
}

/// Result of a damage claim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// Target is not in the registry; the claim is dropped
    UnknownTarget,
    /// Target was already eliminated; nothing changes
    AlreadyEliminated,
    Damaged { health: i32 },
    /// Target reached zero on this hit
    Eliminated { killer_credited: bool },
}

/// Keyed participant store, owned by the session coordinator
#[derive(Debug, Default)]
pub struct SessionRegistry {
    participants: HashMap<ParticipantId, Participant>,
    next_seq: u64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a participant with defaults (origin, full health, no score).
    pub fn connect(&mut self, id: ParticipantId) -> Result<&Participant, SessionError> {
        if self.participants.contains_key(&id) {
            return Err(SessionError::DuplicateId(id));
        }
        let participant = Participant::new(id, self.next_seq);
        self.next_seq += 1;
        Ok(self.participants.entry(id).or_insert(participant))
    }

    pub fn disconnect(&mut self, id: &ParticipantId) -> Option<Participant> {
        self.participants.remove(id)
    }

    /// Last writer wins; values are stored exactly as reported.
    /// Returns false for an unknown id.
    pub fn update_position(&mut self, id: &ParticipantId, position: Vec3, rotation: Rotation) -> bool {
        match self.participants.get_mut(id) {
            Some(participant) => {
                participant.position = position;
                participant.rotation = rotation;
                true
            }
            None => false,
        }
    }

    /// Subtract `damage` from the target. The attacker scores when the
    /// target first reaches zero.
    pub fn apply_hit(
        &mut self,
        attacker: &ParticipantId,
        target: &ParticipantId,
        damage: i32,
    ) -> HitOutcome {
        let Some(victim) = self.participants.get_mut(target) else {
            return HitOutcome::UnknownTarget;
        };
        if victim.is_eliminated() {
            return HitOutcome::AlreadyEliminated;
        }

        victim.health = victim.health.saturating_sub(damage).max(0);
        if !victim.is_eliminated() {
            return HitOutcome::Damaged {
                health: victim.health,
            };
        }

        let killer_credited = match self.participants.get_mut(attacker) {
            Some(killer) => {
                killer.score += 1;
                true
            }
            None => false,
        };
        HitOutcome::Eliminated { killer_credited }
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.participants.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Participants in connect order
    pub fn participants(&self) -> Vec<&Participant> {
        let mut all: Vec<&Participant> = self.participants.values().collect();
        all.sort_by_key(|p| p.joined_seq);
        all
    }

    /// Round rollover: scores back to zero, eliminated tanks back in play.
    pub fn start_new_round(&mut self) {
        for participant in self.participants.values_mut() {
            participant.score = 0;
            participant.health = DEFAULT_HEALTH;
        }
    }
}
