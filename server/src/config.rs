use std::path::Path;

use serde::Deserialize;

use engine_core::tick::TickConfig;
use space::{Tile, TileError};

use crate::game::GameSettings;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid spawn: {0}")]
    Spawn(#[from] TileError),

    #[error("tick.tick_ms must be at least 1")]
    ZeroTickMs,

    #[error("session.max_packets_per_tick must be at least 1")]
    ZeroQueueCapacity,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetSection {
    pub addr: String,
    /// Client build accepted by JS5 and login.
    pub revision: u32,
}

impl Default for NetSection {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:43594".to_string(),
            revision: 530,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TickSection {
    pub tick_ms: u64,
}

impl Default for TickSection {
    fn default() -> Self {
        Self { tick_ms: 600 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Outbound queue capacity per session.
    pub max_packets_per_tick: usize,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            max_packets_per_tick: 255,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorldSection {
    pub spawn_x: u16,
    pub spawn_z: u16,
    pub spawn_height: u8,
    /// Tiles on each axis within which other players are rendered.
    pub view_distance: u16,
}

impl Default for WorldSection {
    fn default() -> Self {
        Self {
            spawn_x: 3222,
            spawn_z: 3218,
            spawn_height: 0,
            view_distance: 15,
        }
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub net: NetSection,
    pub tick: TickSection,
    pub session: SessionSection,
    pub world: WorldSection,
}

impl ServerConfig {
    /// Load configuration from an optional TOML file path.
    pub fn load(config_path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        let config = match config_path {
            Some(path) if Path::new(path).exists() => {
                let content = std::fs::read_to_string(path)?;
                toml::from_str(&content)?
            }
            _ => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick.tick_ms == 0 {
            return Err(ConfigError::ZeroTickMs);
        }
        if self.session.max_packets_per_tick == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        self.spawn_tile()?;
        Ok(())
    }

    /// Convert tick section to engine_core's TickConfig.
    pub fn to_tick_config(&self) -> TickConfig {
        TickConfig {
            tick_ms: self.tick.tick_ms,
            max_ticks: 0,
        }
    }

    pub fn spawn_tile(&self) -> Result<Tile, TileError> {
        Tile::new(
            self.world.spawn_x,
            self.world.spawn_z,
            self.world.spawn_height,
        )
    }

    pub fn to_game_settings(&self) -> Result<GameSettings, ConfigError> {
        self.validate()?;
        Ok(GameSettings {
            revision: self.net.revision,
            queue_capacity: self.session.max_packets_per_tick,
            spawn: self.spawn_tile()?,
            view_distance: self.world.view_distance,
        })
    }
}

/// Parse CLI arguments and load config.
/// Supports: --config <path>
pub fn parse_cli_args() -> ServerConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<&str> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                if let Some(val) = args.get(i + 1) {
                    config_path = Some(val.as_str());
                    i += 2;
                } else {
                    eprintln!("--config requires a path argument");
                    std::process::exit(1);
                }
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                std::process::exit(1);
            }
        }
    }

    match ServerConfig::load(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    }
}
