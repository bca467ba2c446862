//! RealtimeChannel message definitions
//! These are the wire types for client-server communication.
//!
//! Every frame is a JSON object `{"event": "<name>", "data": {...}}`;
//! events without a payload omit `data`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::round::ScoreEntry;
use crate::sim::physics::{Rotation, Vec3};

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Request to enter the session
    Join,

    /// Trusted position report
    UpdatePosition { position: Vec3, rotation: Rotation },

    /// Fire intent, relayed for the visual projectile
    Shoot { position: Vec3, rotation: Rotation },

    /// Damage claim decided by the shooter's client
    #[serde(rename_all = "camelCase")]
    PlayerHit {
        #[serde(default)]
        target_id: Option<Uuid>,
        damage: i32,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMsg {
    /// Identity assigned to this connection (sent to that socket only)
    Connected { id: Uuid },

    /// New participant announced
    PlayerJoined { id: Uuid, position: Vec3 },

    /// Participant removed
    PlayerLeft { id: Uuid },

    /// Position relay, never sent back to the reporter
    PlayerMoved {
        id: Uuid,
        position: Vec3,
        rotation: Rotation,
    },

    /// Shot relay, sent to everyone including the shooter
    PlayerShot {
        id: Uuid,
        position: Vec3,
        rotation: Rotation,
    },

    /// Damage relayed to the owner of the struck tank
    PlayerHit { id: Uuid, damage: i32 },

    /// Elimination notice
    #[serde(rename_all = "camelCase")]
    PlayerDied { id: Uuid, killer_id: Uuid },

    /// 1 Hz countdown tick
    #[serde(rename_all = "camelCase")]
    RoundTimeUpdate { time_left: u32 },

    /// Round closure with the leaderboard, highest score first
    RoundEnd { scores: Vec<ScoreEntry> },
}

/// Wire encoding/decoding failures
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub fn decode_client(text: &str) -> Result<ClientMsg, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

pub fn decode_server(text: &str) -> Result<ServerMsg, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

pub fn encode<T: Serialize>(msg: &T) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(msg)?)
}
