//! # World Client Library
//!
//! A headless client for the world server. It registers world names over
//! HTTP, joins a world over WebSocket, and keeps a local mirror of the
//! players and environment it is told about.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! - URL handling for `http://` and `ws://` bases
//! - World registration through the page route
//! - `WorldClient`, a typed wrapper over one WebSocket session
//!
//! ### Game Module (`game`)
//! - `WorldView`, which folds `ServerMessage`s into player positions and
//!   the currently visible environment
//!
//! ## Usage Example
//!
//! ```no_run
//! use client::game::WorldView;
//! use client::network::{register_world, WorldClient};
//!
//! # async fn run() -> Result<(), client::network::ClientError> {
//! register_world("http://127.0.0.1:3000", "meadow").await?;
//! let mut socket = WorldClient::connect("http://127.0.0.1:3000", "meadow").await?;
//!
//! let mut view = WorldView::new();
//! view.apply(&socket.next_message().await?);
//!
//! socket.send_move(120.0, 340.0, Some("left".to_string())).await?;
//! # Ok(())
//! # }
//! ```

pub mod game;
pub mod network;
