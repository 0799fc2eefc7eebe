use crate::client_manager::{ClientManager, Outbound};
use crate::config::WorldConfig;
use log::{debug, info};
use rand::Rng;
use shared::{generate, EnvironmentObject, EnvironmentSet, Position, ServerMessage, SpatialIndex};
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: u32,
    pub position: Position,
    /// Last facing reported by the client, if any.
    pub direction: Option<String>,
}

impl Player {
    pub fn new(id: u32, position: Position) -> Self {
        Self {
            id,
            position,
            direction: None,
        }
    }
}

/// Live players of one world, keyed by id.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: HashMap<u32, Player>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the id was already present; the entry is replaced.
    pub fn insert(&mut self, player: Player) -> bool {
        self.players.insert(player.id, player).is_none()
    }

    pub fn remove(&mut self, id: &u32) -> Option<Player> {
        self.players.remove(id)
    }

    pub fn get(&self, id: &u32) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn set_position(&mut self, id: u32, position: Position, direction: Option<String>) -> bool {
        match self.players.get_mut(&id) {
            Some(player) => {
                player.position = position;
                if direction.is_some() {
                    player.direction = direction;
                }
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> HashMap<u32, Position> {
        self.players
            .iter()
            .map(|(id, player)| (*id, player.position))
            .collect()
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.players.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Applied,
    /// The player left before the message was handled.
    UnknownPlayer,
}

#[derive(Debug, Default)]
struct WorldInner {
    players: PlayerRegistry,
    clients: ClientManager,
}

/// One world: its immutable environment plus the players currently in it.
///
/// Every mutation takes the same lock, so joins, moves and leaves are
/// linearized and each one's broadcast is queued before the next starts.
#[derive(Debug)]
pub struct WorldState {
    seed: String,
    config: WorldConfig,
    index: SpatialIndex,
    inner: Mutex<WorldInner>,
}

impl WorldState {
    /// Generates the environment for `seed`.
    pub fn new(seed: String, config: WorldConfig) -> Self {
        let environment = generate(&seed, &config.generator);
        info!(
            "Generated world {} with {} objects ({} blocking regions)",
            seed,
            environment.len(),
            environment.regions.len()
        );
        Self::with_environment(seed, environment, config)
    }

    pub fn with_environment(
        seed: String,
        environment: EnvironmentSet,
        config: WorldConfig,
    ) -> Self {
        Self {
            seed,
            config,
            index: SpatialIndex::new(environment),
            inner: Mutex::new(WorldInner::default()),
        }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// A random point near a random non-blocking object, clamped to the
    /// world bounds. The clamped point is not re-checked against blocking
    /// regions.
    pub fn spawn_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Position {
        let width = f64::from(self.config.width());
        let height = f64::from(self.config.height());

        match self.index.pick_spawn_anchor(rng) {
            Some(anchor) => {
                let (x, y) = anchor.position();
                let offset = f64::from(self.config.spawn_offset.abs());
                Position::new(
                    f64::from(x) + rng.gen_range(-offset..=offset),
                    f64::from(y) + rng.gen_range(-offset..=offset),
                )
                .clamped(width, height)
            }
            None => Position::new(rng.gen::<f64>() * width, rng.gen::<f64>() * height),
        }
    }

    /// Spawns player `id`, queues its `init_ack` and announces it to peers.
    pub async fn add_player(&self, id: u32, outbound: Outbound) -> Position {
        let position = self.spawn_position(&mut rand::thread_rng());
        let environment = if self.config.full_snapshot {
            self.index.objects().to_vec()
        } else {
            Vec::new()
        };

        let mut inner = self.inner.lock().await;
        inner.players.insert(Player::new(id, position));
        inner.clients.add_client(id, outbound);

        let init = ServerMessage::InitAck {
            id,
            seed: self.seed.clone(),
            players: inner.players.snapshot(),
            environment,
        };
        inner.clients.send_to(id, init);
        inner.clients.broadcast(
            &ServerMessage::NewPlayer {
                player_id: id,
                x: position.x,
                y: position.y,
            },
            Some(id),
        );

        info!(
            "Player {} joined world {} at ({:.1}, {:.1}), {} online",
            id,
            self.seed,
            position.x,
            position.y,
            inner.players.len()
        );
        position
    }

    /// Removes player `id` and tells the remaining peers. Returns false if
    /// the player was not in this world.
    pub async fn remove_player(&self, id: u32) -> bool {
        let mut inner = self.inner.lock().await;
        inner.clients.remove_client(&id);
        if inner.players.remove(&id).is_none() {
            return false;
        }

        inner
            .clients
            .broadcast(&ServerMessage::RemovePlayer { player_id: id }, None);
        info!(
            "Player {} left world {}, {} online",
            id,
            self.seed,
            inner.players.len()
        );
        true
    }

    /// Stores the client-reported position and relays it to peers. Positions
    /// are taken as given.
    pub async fn move_player(
        &self,
        id: u32,
        x: f64,
        y: f64,
        direction: Option<String>,
    ) -> MoveOutcome {
        let mut inner = self.inner.lock().await;
        if !inner.players.set_position(id, Position::new(x, y), direction) {
            return MoveOutcome::UnknownPlayer;
        }

        let relayed = inner
            .clients
            .broadcast(&ServerMessage::PlayerMove { player_id: id, x, y }, Some(id));
        debug!("Player {} moved to ({:.1}, {:.1}), relayed to {}", id, x, y, relayed);
        MoveOutcome::Applied
    }

    /// Environment objects within the viewport plus the configured margin.
    pub fn visible_environment(
        &self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Vec<EnvironmentObject> {
        self.index
            .visible_within(x, y, width, height, self.config.viewport_margin)
            .cloned()
            .collect()
    }

    /// Sends the visible subset to player `id` only. The environment grid is
    /// `f32`; oversized requests saturate to infinite bounds.
    pub async fn send_visible(
        &self,
        id: u32,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> MoveOutcome {
        let objects = self.visible_environment(x as f32, y as f32, width as f32, height as f32);

        let inner = self.inner.lock().await;
        if inner.players.get(&id).is_none() {
            return MoveOutcome::UnknownPlayer;
        }
        inner.clients.send_to(id, ServerMessage::Environment { objects });
        MoveOutcome::Applied
    }

    pub async fn player_count(&self) -> usize {
        self.inner.lock().await.players.len()
    }

    pub async fn player_ids(&self) -> Vec<u32> {
        self.inner.lock().await.players.ids()
    }

    pub async fn player(&self, id: u32) -> Option<Player> {
        self.inner.lock().await.players.get(&id).cloned()
    }
}
