//! Authoritative session state: participants, rounds and the coordinator task

pub mod coordinator;
pub mod round;
pub mod session;

pub use coordinator::{Envelope, Recipients, RoundStatus, SessionCoordinator, SessionHandle, SessionInput};
pub use round::{RoundScheduler, ScoreEntry};
pub use session::{Participant, ParticipantId, SessionRegistry};
