//! Round countdown and per-round leaderboard

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_ROUND_SECS: u32 = 600;
pub const DEFAULT_BREAK_SECS: u32 = 10;

/// One leaderboard line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub id: Uuid,
    pub score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Active { time_left: u32 },
    /// Between rounds; the next round opens when `break_left` reaches zero
    Ended { break_left: u32 },
}

/// Emitted by [`RoundScheduler::tick`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundEvent {
    TimeUpdate { time_left: u32 },
    Ended { round: u64, scores: Vec<ScoreEntry> },
    Started { round: u64 },
}

/// Countdown state machine driven by a 1 Hz tick.
///
/// `Active(n) -> ... -> Active(0) -> Ended -> (break) -> Active(full)`.
/// Scores are kept per round in first-seen order so that the descending
/// sort at round end breaks ties deterministically.
#[derive(Debug, Clone)]
pub struct RoundScheduler {
    round_number: u64,
    round_secs: u32,
    break_secs: u32,
    phase: RoundPhase,
    scores: Vec<ScoreEntry>,
}

impl RoundScheduler {
    pub fn new(round_secs: u32, break_secs: u32) -> Self {
        Self {
            round_number: 1,
            round_secs,
            break_secs,
            phase: RoundPhase::Active {
                time_left: round_secs,
            },
            scores: Vec::new(),
        }
    }

    pub fn round_number(&self) -> u64 {
        self.round_number
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn time_left(&self) -> u32 {
        match self.phase {
            RoundPhase::Active { time_left } => time_left,
            RoundPhase::Ended { .. } => 0,
        }
    }

    /// Advance one second.
    pub fn tick(&mut self) -> Vec<RoundEvent> {
        match self.phase {
            RoundPhase::Active { time_left } => {
                let time_left = time_left.saturating_sub(1);
                let mut events = vec![RoundEvent::TimeUpdate { time_left }];

                if time_left == 0 {
                    let scores = self.standings();
                    self.scores.clear();
                    self.phase = RoundPhase::Ended {
                        break_left: self.break_secs,
                    };
                    events.push(RoundEvent::Ended {
                        round: self.round_number,
                        scores,
                    });
                } else {
                    self.phase = RoundPhase::Active { time_left };
                }
                events
            }
            RoundPhase::Ended { break_left } => {
                let break_left = break_left.saturating_sub(1);
                if break_left == 0 {
                    self.round_number += 1;
                    self.phase = RoundPhase::Active {
                        time_left: self.round_secs,
                    };
                    vec![RoundEvent::Started {
                        round: self.round_number,
                    }]
                } else {
                    self.phase = RoundPhase::Ended { break_left };
                    Vec::new()
                }
            }
        }
    }

    /// Put a participant on this round's board with zero if absent.
    pub fn register(&mut self, id: Uuid) {
        if !self.scores.iter().any(|entry| entry.id == id) {
            self.scores.push(ScoreEntry { id, score: 0 });
        }
    }

    pub fn record_kill(&mut self, killer: Uuid) {
        match self.scores.iter_mut().find(|entry| entry.id == killer) {
            Some(entry) => entry.score += 1,
            None => self.scores.push(ScoreEntry { id: killer, score: 1 }),
        }
    }

    /// Current board, highest first; ties keep first-seen order.
    pub fn standings(&self) -> Vec<ScoreEntry> {
        let mut sorted = self.scores.clone();
        sorted.sort_by(|a, b| b.score.cmp(&a.score));
        sorted
    }
}

impl Default for RoundScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_ROUND_SECS, DEFAULT_BREAK_SECS)
    }
}
