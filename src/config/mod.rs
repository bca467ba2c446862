//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::game::round::{DEFAULT_BREAK_SECS, DEFAULT_ROUND_SECS};
use crate::util::rate_limit::INPUT_RATE_LIMIT;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_OUTBOUND_BUFFER: usize = 256;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Round duration in seconds
    pub round_secs: u32,
    /// Pause between rounds in seconds
    pub round_break_secs: u32,

    /// Directory holding the browser client
    pub static_dir: PathBuf,
    /// Allowed client origins for CORS; `None` allows any
    pub client_origin: Option<String>,

    /// Max inbound frames per second per connection
    pub input_rate_limit: u32,
    /// Fan-out buffer depth before a slow connection starts skipping events
    pub outbound_buffer: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // PORT wins (hosting platforms set it), then SERVER_ADDR, then the default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| format!("0.0.0.0:{}", DEFAULT_PORT))
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            round_secs: parse_or("ROUND_TIME_SECS", DEFAULT_ROUND_SECS)?,
            round_break_secs: parse_or("ROUND_BREAK_SECS", DEFAULT_BREAK_SECS)?,

            static_dir: env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("public")),
            client_origin: env::var("CLIENT_ORIGIN").ok().filter(|s| !s.trim().is_empty()),

            input_rate_limit: parse_or("INPUT_RATE_LIMIT", INPUT_RATE_LIMIT)?,
            outbound_buffer: parse_or("OUTBOUND_BUFFER", DEFAULT_OUTBOUND_BUFFER)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            log_level: "info".to_string(),
            round_secs: DEFAULT_ROUND_SECS,
            round_break_secs: DEFAULT_BREAK_SECS,
            static_dir: PathBuf::from("public"),
            client_origin: None,
            input_rate_limit: INPUT_RATE_LIMIT,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
