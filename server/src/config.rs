use crate::error::ConfigError;
use clap::Parser;
use shared::{GeneratorConfig, OBJECT_COUNT, SPAWN_OFFSET, VIEWPORT_MARGIN};
use std::path::PathBuf;

/// Largest accepted world width or height.
pub const MAX_WORLD_EXTENT: f32 = 1_000_000.0;

/// Command line configuration for the world server.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ServerConfig {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "3000")]
    pub port: u16,

    /// Directory holding index.html and the client assets
    #[arg(long, default_value = "public")]
    pub static_dir: PathBuf,

    #[arg(long, default_value_t = shared::WORLD_WIDTH)]
    pub world_width: f32,

    #[arg(long, default_value_t = shared::WORLD_HEIGHT)]
    pub world_height: f32,

    /// Rocks, trees and grass generated per world
    #[arg(long, default_value_t = OBJECT_COUNT)]
    pub object_count: usize,

    /// Extra distance around each viewport included in environment replies
    #[arg(long, default_value_t = VIEWPORT_MARGIN)]
    pub viewport_margin: f32,

    /// Maximum per-axis distance between a spawn point and its anchor
    #[arg(long, default_value_t = SPAWN_OFFSET)]
    pub spawn_offset: f32,

    /// Messages buffered per connection before the oldest are dropped
    #[arg(long, default_value = "256")]
    pub outbound_buffer: usize,

    /// Send the whole environment in init_ack and ignore viewport requests
    #[arg(long)]
    pub full_snapshot: bool,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn world_config(&self) -> Result<WorldConfig, ConfigError> {
        let width = checked_extent("world width", self.world_width)?;
        let height = checked_extent("world height", self.world_height)?;

        Ok(WorldConfig {
            generator: GeneratorConfig {
                object_count: self.object_count,
                ..GeneratorConfig::with_dimensions(width, height)
            },
            viewport_margin: self.viewport_margin,
            spawn_offset: self.spawn_offset,
            outbound_buffer: self.outbound_buffer.max(1),
            full_snapshot: self.full_snapshot,
        })
    }
}

fn checked_extent(name: &'static str, value: f32) -> Result<f32, ConfigError> {
    if value.is_finite() && value > 0.0 && value <= MAX_WORLD_EXTENT {
        Ok(value)
    } else {
        Err(ConfigError::WorldDimension {
            name,
            value,
            max: MAX_WORLD_EXTENT,
        })
    }
}

/// Settings shared by every world a session manager creates.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldConfig {
    pub generator: GeneratorConfig,
    pub viewport_margin: f32,
    pub spawn_offset: f32,
    pub outbound_buffer: usize,
    pub full_snapshot: bool,
}

impl WorldConfig {
    pub fn width(&self) -> f32 {
        self.generator.width
    }

    pub fn height(&self) -> f32 {
        self.generator.height
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::default(),
            viewport_margin: VIEWPORT_MARGIN,
            spawn_offset: SPAWN_OFFSET,
            outbound_buffer: 256,
            full_snapshot: false,
        }
    }
}
