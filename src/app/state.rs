//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{RoundScheduler, SessionCoordinator, SessionHandle};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: SessionHandle,
}

impl AppState {
    /// Build the state plus the coordinator that still has to be spawned.
    pub fn new(config: Config) -> (Self, SessionCoordinator) {
        let config = Arc::new(config);

        let rounds = RoundScheduler::new(config.round_secs, config.round_break_secs);
        let (coordinator, session) = SessionCoordinator::new(rounds, config.outbound_buffer);

        (Self { config, session }, coordinator)
    }
}
