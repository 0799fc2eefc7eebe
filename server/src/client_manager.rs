//! Outbound fan-out to the connections bound to one world
//!
//! Each connection owns a bounded ring of pending messages drained by its
//! writer task. Queuing never waits on a socket:
//! - a full ring evicts its oldest message, so the newest events (a leave,
//!   a final move) always reach the peer
//! - a ring whose writer is gone is skipped
//!
//! Evictions are reported by the writer, which learns how many messages it
//! missed when it next reads.

use log::debug;
use shared::ServerMessage;
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::broadcast::{self, error::TryRecvError};

/// Sending half of a connection's outbound ring.
pub type Outbound = broadcast::Sender<ServerMessage>;
/// Receiving half, owned by the connection's writer task.
pub type Inbox = broadcast::Receiver<ServerMessage>;

/// Creates a drop-oldest queue holding at least `capacity` messages.
///
/// The ring size is rounded up to the next power of two.
pub fn outbound_queue(capacity: usize) -> (Outbound, Inbox) {
    broadcast::channel(capacity.max(1))
}

/// Takes every message currently queued without waiting, skipping over any
/// that were evicted.
pub fn drain_ready(inbox: &mut Inbox) -> Vec<ServerMessage> {
    let mut messages = Vec::new();
    loop {
        match inbox.try_recv() {
            Ok(message) => messages.push(message),
            Err(TryRecvError::Lagged(missed)) => {
                debug!("Skipped {} evicted messages", missed);
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
    messages
}

/// A connection subscribed to a world's events.
#[derive(Debug)]
pub struct Client {
    /// Player id bound to the connection
    pub id: u32,
    pub connected_at: Instant,
    pub sender: Outbound,
}

impl Client {
    pub fn new(id: u32, sender: Outbound) -> Self {
        Self {
            id,
            connected_at: Instant::now(),
            sender,
        }
    }

    /// Queues a message without waiting, evicting the oldest pending one if
    /// the ring is full. Returns false only if the connection is gone.
    pub fn deliver(&self, message: ServerMessage) -> bool {
        match self.sender.send(message) {
            Ok(_) => true,
            Err(_) => {
                debug!("Client {} already closed its outbound queue", self.id);
                false
            }
        }
    }
}

/// Subscriber set of one world.
#[derive(Debug, Default)]
pub struct ClientManager {
    clients: HashMap<u32, Client>,
}

impl ClientManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a connection. An existing subscription with the same id is
    /// replaced.
    pub fn add_client(&mut self, id: u32, sender: Outbound) {
        self.clients.insert(id, Client::new(id, sender));
    }

    pub fn remove_client(&mut self, id: &u32) -> bool {
        match self.clients.remove(id) {
            Some(client) => {
                debug!(
                    "Client {} unsubscribed after {:?}",
                    id,
                    client.connected_at.elapsed()
                );
                true
            }
            None => false,
        }
    }

    /// Unicast. Returns false if the client is unknown or already gone.
    pub fn send_to(&self, id: u32, message: ServerMessage) -> bool {
        self.clients
            .get(&id)
            .map(|client| client.deliver(message))
            .unwrap_or(false)
    }

    /// Queues `message` for every subscriber except `exclude`. Returns the
    /// number of subscribers it was queued for.
    pub fn broadcast(&self, message: &ServerMessage, exclude: Option<u32>) -> usize {
        self.clients
            .values()
            .filter(|client| Some(client.id) != exclude)
            .filter(|client| client.deliver(message.clone()))
            .count()
    }

    pub fn contains(&self, id: &u32) -> bool {
        self.clients.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
