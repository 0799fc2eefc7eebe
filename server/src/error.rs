use thiserror::Error;

/// Reasons a connection cannot be bound to a world.
///
/// Raised before any player or world is created; the connection is closed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no world name in request path")]
    MissingWorldName,
    #[error("world `{0}` has not been registered")]
    UnknownWorld(String),
    #[error("world `{0}` could not be generated: {1}")]
    Generation(String, String),
}

/// Rejected command line settings.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a finite number in (0, {max}], got {value}")]
    WorldDimension {
        name: &'static str,
        value: f32,
        max: f32,
    },
}
