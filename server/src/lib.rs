//! # World Server Library
//!
//! Authoritative server for shared 2D worlds. Each world is identified by a
//! name taken from the URL, owns a procedurally generated environment and
//! tracks the avatars of everyone connected to it. Clients report their own
//! positions; the server stores them and relays them to the other players in
//! the same world.
//!
//! ## Core Responsibilities
//!
//! ### World Authority
//! The first connection to a world generates its environment from a seed
//! derived from the world name. Generation is deterministic, so the
//! environment never needs to be stored: the same name always produces the
//! same rocks, trees, grass and blocking regions.
//!
//! ### Player Registry
//! Every connection is bound to exactly one player in exactly one world for
//! its whole lifetime. A connection can move only its own player and only
//! ever receives events from its own world.
//!
//! ### Viewport Culling
//! Instead of shipping the full environment, clients describe their visible
//! area and receive the objects inside it plus a margin.
//!
//! ## Architecture Design
//!
//! ### Task Per Connection
//! Each WebSocket gets a reader task that applies inbound messages and a
//! writer task that drains a bounded outbound queue. Broadcasts only enqueue,
//! so a stalled client cannot hold up a world.
//!
//! ### Linearized Worlds
//! All player mutations of a world go through one lock, and the resulting
//! broadcast is queued while that lock is held. Peers therefore observe
//! joins, moves and leaves in the order the server applied them.
//!
//! ### Explicitly Owned State
//! The seed registry and the world table live inside a
//! [`session::SessionManager`] handed to the router at startup. There is no
//! global state; dropping the manager releases everything.
//!
//! ## Module Organization
//!
//! - `config`: command line options and the per-world settings derived from them
//! - `error`: binding errors that close a connection
//! - `seed_registry`: world name to seed mapping
//! - `client_manager`: per-world outbound fan-out
//! - `world`: player registry, spawning and the world state itself
//! - `session`: connection binding, dispatch and the world table
//! - `network`: axum routes and the WebSocket connection loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::WorldConfig;
//! use server::network;
//! use server::session::SessionManager;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = Arc::new(SessionManager::new(WorldConfig::default()));
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!
//!     network::serve(listener, manager, "public".into(), async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Trust Boundary
//!
//! Client-reported positions are accepted as given: there is no bounds,
//! speed or collision check. Hardening this would add validation inside
//! `WorldState::move_player` without changing any message shape.

pub mod client_manager;
pub mod config;
pub mod error;
pub mod network;
pub mod seed_registry;
pub mod session;
pub mod world;
