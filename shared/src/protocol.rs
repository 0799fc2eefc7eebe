//! JSON wire protocol between the world server and its clients.
//!
//! Every frame is a JSON object with a `type` discriminator. Both directions
//! are closed enums, so the server's dispatch is an exhaustive `match`.

use crate::environment::EnvironmentObject;
use crate::Position;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported frame type")]
    UnsupportedFrame,
}

/// Client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Move {
        x: f64,
        y: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        direction: Option<String>,
    },
    #[serde(alias = "updateViewport")]
    Viewport {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "init_ack")]
    InitAck {
        id: u32,
        seed: String,
        #[serde(deserialize_with = "player_map::deserialize")]
        players: HashMap<u32, Position>,
        environment: Vec<EnvironmentObject>,
    },
    #[serde(rename = "newPlayer", rename_all = "camelCase")]
    NewPlayer { player_id: u32, x: f64, y: f64 },
    #[serde(rename = "playerMove", rename_all = "camelCase")]
    PlayerMove { player_id: u32, x: f64, y: f64 },
    #[serde(rename = "removePlayer", rename_all = "camelCase")]
    RemovePlayer { player_id: u32 },
    #[serde(rename = "environment")]
    Environment { objects: Vec<EnvironmentObject> },
}

impl ServerMessage {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// JSON object keys are strings; buffered internally tagged content will not
/// coerce them back into integers on its own.
mod player_map {
    use crate::Position;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use std::collections::HashMap;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<HashMap<u32, Position>, D::Error>
    where
        D: Deserializer<'de>,
    {
        HashMap::<String, Position>::deserialize(deserializer)?
            .into_iter()
            .map(|(key, position)| {
                key.parse::<u32>()
                    .map(|id| (id, position))
                    .map_err(|_| D::Error::custom(format!("invalid player id `{}`", key)))
            })
            .collect()
    }
}
