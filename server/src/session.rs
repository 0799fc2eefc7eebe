//! Connection-to-world binding and message dispatch.
//!
//! A [`SessionManager`] owns the seed registry and the world table. It is
//! created empty, grows as worlds are first joined and is dropped on
//! shutdown; nothing about it is global.
//!
//! Connection lifecycle:
//! - **Connecting**: the transport hands over the raw world name
//! - **Bound**: [`SessionManager::connect`] resolves the world (generating it
//!   at most once per seed), allocates a player id and queues `init_ack`
//! - **Active**: inbound frames go through [`SessionManager::handle_text`]
//! - **Closed**: [`SessionManager::disconnect`] removes the player; the world
//!   stays in the table even when empty

use crate::client_manager::Outbound;
use crate::config::WorldConfig;
use crate::error::SessionError;
use crate::seed_registry::WorldSeedRegistry;
use crate::world::{MoveOutcome, WorldState};
use log::{debug, info, warn};
use shared::{sanitize_world_name, ClientMessage, Position};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

/// A bound connection: one player in one world.
#[derive(Debug, Clone)]
pub struct Session {
    pub player_id: u32,
    pub spawn: Position,
    pub world: Arc<WorldState>,
}

#[derive(Debug)]
pub struct SessionManager {
    config: WorldConfig,
    seeds: WorldSeedRegistry,
    /// One cell per seed. Cells are filled outside the table lock, so a
    /// slow generation only holds up joins to that same world.
    worlds: Mutex<HashMap<String, Arc<OnceCell<Arc<WorldState>>>>>,
    next_player_id: AtomicU32,
}

impl SessionManager {
    pub fn new(config: WorldConfig) -> Self {
        Self {
            config,
            seeds: WorldSeedRegistry::new(),
            worlds: Mutex::new(HashMap::new()),
            next_player_id: AtomicU32::new(1),
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn seeds(&self) -> &WorldSeedRegistry {
        &self.seeds
    }

    /// Registers a world name, as the HTTP route does. Returns its seed.
    pub async fn register_world(&self, raw_name: &str) -> Option<String> {
        self.seeds.register(raw_name).await
    }

    /// Resolves a registered world, creating its state on first use.
    ///
    /// Concurrent first connections to the same world wait on that world's
    /// cell and share a single generation pass, which runs on the blocking
    /// pool.
    pub async fn bind(&self, raw_name: &str) -> Result<Arc<WorldState>, SessionError> {
        let name = sanitize_world_name(raw_name);
        if name.is_empty() {
            return Err(SessionError::MissingWorldName);
        }

        let seed = self
            .seeds
            .lookup(&name)
            .await
            .ok_or_else(|| SessionError::UnknownWorld(name.clone()))?;

        let cell = {
            let mut worlds = self.worlds.lock().await;
            Arc::clone(worlds.entry(seed.clone()).or_default())
        };

        let config = self.config.clone();
        let generating = seed.clone();
        let world = cell
            .get_or_try_init(|| async move {
                tokio::task::spawn_blocking(move || WorldState::new(generating, config))
                    .await
                    .map(Arc::new)
                    .map_err(|e| SessionError::Generation(seed, e.to_string()))
            })
            .await?;
        Ok(Arc::clone(world))
    }

    /// Binds a new connection and spawns its player.
    pub async fn connect(&self, raw_name: &str, outbound: Outbound) -> Result<Session, SessionError> {
        let world = self.bind(raw_name).await?;
        let player_id = self.next_player_id.fetch_add(1, Ordering::Relaxed);
        let spawn = world.add_player(player_id, outbound).await;

        Ok(Session {
            player_id,
            spawn,
            world,
        })
    }

    /// Parses and dispatches one text frame. Malformed frames are logged and
    /// dropped; the connection stays open.
    pub async fn handle_text(&self, session: &Session, text: &str) -> Option<MoveOutcome> {
        match ClientMessage::parse(text) {
            Ok(message) => Some(self.dispatch(session, message).await),
            Err(e) => {
                warn!("Dropping message from player {}: {}", session.player_id, e);
                None
            }
        }
    }

    pub async fn dispatch(&self, session: &Session, message: ClientMessage) -> MoveOutcome {
        let outcome = match message {
            ClientMessage::Move { x, y, direction } => {
                session
                    .world
                    .move_player(session.player_id, x, y, direction)
                    .await
            }
            ClientMessage::Viewport {
                x,
                y,
                width,
                height,
            } => {
                if self.config.full_snapshot {
                    debug!(
                        "Ignoring viewport from player {}, full snapshots enabled",
                        session.player_id
                    );
                    return MoveOutcome::Applied;
                }
                session
                    .world
                    .send_visible(session.player_id, x, y, width, height)
                    .await
            }
        };

        if outcome == MoveOutcome::UnknownPlayer {
            debug!("Player {} no longer in world {}", session.player_id, session.world.seed());
        }
        outcome
    }

    pub async fn disconnect(&self, session: &Session) {
        if session.world.remove_player(session.player_id).await {
            info!(
                "Session closed for player {} in world {}",
                session.player_id,
                session.world.seed()
            );
        }
    }

    /// Worlds created so far. Worlds are never evicted.
    pub async fn world_count(&self) -> usize {
        self.worlds
            .lock()
            .await
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub async fn world(&self, raw_name: &str) -> Option<Arc<WorldState>> {
        let name = sanitize_world_name(raw_name);
        self.worlds
            .lock()
            .await
            .get(&name)
            .and_then(|cell| cell.get().cloned())
    }
}
