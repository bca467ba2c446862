//! Tank Arena - session and combat state for a multiplayer tank arena
//!
//! The server side (`game`, `ws`, `http`) keeps the participant registry,
//! relays events between connections and runs the round clock. The client
//! side (`sim`, `client`) simulates tanks, bots and projectiles locally.

pub mod app;
pub mod client;
pub mod config;
pub mod game;
pub mod http;
pub mod sim;
pub mod util;
pub mod ws;
