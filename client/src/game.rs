use log::debug;
use shared::{EnvironmentObject, Position, ServerMessage};
use std::collections::HashMap;

/// Client-side mirror of one world, rebuilt from server events.
#[derive(Debug, Clone, Default)]
pub struct WorldView {
    pub player_id: Option<u32>,
    pub seed: Option<String>,
    players: HashMap<u32, Position>,
    environment: Vec<EnvironmentObject>,
}

impl WorldView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, message: &ServerMessage) {
        match message {
            ServerMessage::InitAck {
                id,
                seed,
                players,
                environment,
            } => {
                self.player_id = Some(*id);
                self.seed = Some(seed.clone());
                self.players = players.clone();
                self.environment = environment.clone();
            }
            ServerMessage::NewPlayer { player_id, x, y }
            | ServerMessage::PlayerMove { player_id, x, y } => {
                self.players.insert(*player_id, Position::new(*x, *y));
            }
            ServerMessage::RemovePlayer { player_id } => {
                self.players.remove(player_id);
            }
            ServerMessage::Environment { objects } => {
                debug!("Received {} environment objects", objects.len());
                self.environment = objects.clone();
            }
        }
    }

    /// Moves the local player without waiting for the server.
    pub fn set_own_position(&mut self, position: Position) {
        if let Some(id) = self.player_id {
            self.players.insert(id, position);
        }
    }

    pub fn own_position(&self) -> Option<Position> {
        self.player_id.and_then(|id| self.player(id))
    }

    pub fn player(&self, id: u32) -> Option<Position> {
        self.players.get(&id).copied()
    }

    pub fn players(&self) -> &HashMap<u32, Position> {
        &self.players
    }

    pub fn environment(&self) -> &[EnvironmentObject] {
        &self.environment
    }
}
