//! Types and pure functions the world server and its clients agree on.
//!
//! Nothing in this crate performs I/O. World generation is a pure function of
//! the seed string and the world dimensions, which is what lets the server
//! rebuild a world on demand instead of persisting it.

pub mod environment;
pub mod generator;
pub mod protocol;
pub mod spatial;

use serde::{Deserialize, Serialize};

pub use environment::{EnvironmentObject, EnvironmentSet, ObjectKind, Rect};
pub use generator::{generate, seed_to_u64, GeneratorConfig};
pub use protocol::{ClientMessage, ProtocolError, ServerMessage};
pub use spatial::SpatialIndex;

pub const WORLD_WIDTH: f32 = 10_000.0;
pub const WORLD_HEIGHT: f32 = 10_000.0;
pub const OBJECT_COUNT: usize = 2000;
pub const TREE_VARIANTS: u8 = 6;
pub const VIEWPORT_MARGIN: f32 = 200.0;
pub const SPAWN_OFFSET: f32 = 500.0;

/// Character substituted for anything outside `[A-Za-z0-9]` in a world name.
pub const NAME_PLACEHOLDER: char = '_';

/// A player position as reported on the wire.
///
/// Kept at `f64` so client coordinates are stored and relayed exactly as
/// received, and so any number `serde_json` accepts is finite.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Clamps the position into `[0, width] x [0, height]`. Never panics; a
    /// negative bound pins the coordinate to that bound.
    pub fn clamped(self, width: f64, height: f64) -> Self {
        Self {
            x: self.x.max(0.0).min(width),
            y: self.y.max(0.0).min(height),
        }
    }
}

/// Maps every character outside `[A-Za-z0-9]` to [`NAME_PLACEHOLDER`].
///
/// The result is used both as the world's key and as its seed, so the same
/// URL always lands in the same world.
pub fn sanitize_world_name(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c
            } else {
                NAME_PLACEHOLDER
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_sanitize_keeps_alphanumerics() {
        assert_eq!(sanitize_world_name("alpha42"), "alpha42");
        assert_eq!(sanitize_world_name("ZetaWorld"), "ZetaWorld");
    }

    #[test]
    fn test_sanitize_replaces_everything_else() {
        assert_eq!(sanitize_world_name("my world!"), "my_world_");
        assert_eq!(sanitize_world_name("../etc"), "___etc");
        assert_eq!(sanitize_world_name("café"), "caf_");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let once = sanitize_world_name("a b/c");
        assert_eq!(sanitize_world_name(&once), once);
    }

    #[test]
    fn test_sanitize_empty() {
        assert_eq!(sanitize_world_name(""), "");
    }

    #[test]
    fn test_position_clamped() {
        let (width, height) = (f64::from(WORLD_WIDTH), f64::from(WORLD_HEIGHT));
        let p = Position::new(-5.0, 12_000.0).clamped(width, height);
        assert_eq!(p, Position::new(0.0, height));

        let inside = Position::new(10.0, 20.0).clamped(width, height);
        assert_eq!(inside, Position::new(10.0, 20.0));
    }

    #[test]
    fn test_position_clamped_to_small_world() {
        let p = Position::new(612.75, -0.5).clamped(600.5, 400.0);
        assert_approx_eq!(p.x, 600.5);
        assert_approx_eq!(p.y, 0.0);
    }

    #[test]
    fn test_position_clamped_with_negative_bounds_does_not_panic() {
        let p = Position::new(50.0, 50.0).clamped(-10.0, -1.0);
        assert_eq!(p, Position::new(-10.0, -1.0));
    }
}
