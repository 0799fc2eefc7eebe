//! Maps world names to their generation seeds.
//!
//! The sanitized name is itself the seed, so the same URL always reaches the
//! same world without anything being written to disk. First registration wins
//! and entries are never removed.

use log::info;
use shared::sanitize_world_name;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct WorldSeedRegistry {
    seeds: RwLock<HashMap<String, String>>,
}

impl WorldSeedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `raw_name` if needed and returns its seed.
    ///
    /// Returns `None` when the name sanitizes to the empty string.
    pub async fn register(&self, raw_name: &str) -> Option<String> {
        let name = sanitize_world_name(raw_name);
        if name.is_empty() {
            return None;
        }

        if let Some(seed) = self.seeds.read().await.get(&name) {
            return Some(seed.clone());
        }

        let mut seeds = self.seeds.write().await;
        let seed = seeds.entry(name.clone()).or_insert_with(|| {
            info!("Registered world {}", name);
            name.clone()
        });
        Some(seed.clone())
    }

    /// Seed of an already registered world, without registering it.
    pub async fn lookup(&self, raw_name: &str) -> Option<String> {
        let name = sanitize_world_name(raw_name);
        self.seeds.read().await.get(&name).cloned()
    }

    pub async fn len(&self) -> usize {
        self.seeds.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.seeds.read().await.is_empty()
    }
}
