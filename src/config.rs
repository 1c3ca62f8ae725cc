use anyhow::{Context, Result};
use blockcmd_core::{BlockPos, ZoneId};
use blockcmd_net::PlayerId;
use blockcmd_server::{CommandServer, Crate, Machine, ServerConfig, ServerWorld};
use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path};
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "config/blockcmd.toml";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Tracing filter used when `RUST_LOG` is unset.
    pub log_filter: String,
    pub server: ServerConfig,
    pub zones: Vec<ZoneConfig>,
    pub players: Vec<PlayerConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ZoneConfig {
    pub id: ZoneId,
    pub name: String,
    #[serde(default)]
    pub placements: Vec<PlacementConfig>,
}

/// A block entity placed when the world is built.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlacementConfig {
    Machine {
        pos: [i32; 3],
        name: String,
        #[serde(default)]
        enabled: bool,
    },
    Crate {
        pos: [i32; 3],
        #[serde(default)]
        label: String,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlayerConfig {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub zone: ZoneId,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            server: ServerConfig::default(),
            zones: vec![ZoneConfig {
                id: ZoneId::OVERWORLD,
                name: "overworld".to_owned(),
                placements: Vec::new(),
            }],
            players: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Read and parse `path`. `Ok(None)` means the file does not exist.
    pub fn try_load(path: &Path) -> Result<Option<Self>> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        let config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(config))
    }

    /// Settle the outcome of [`AppConfig::try_load`], falling back to defaults.
    ///
    /// Kept apart from loading so the caller can install logging in between.
    pub fn or_defaults(path: &Path, loaded: Result<Option<Self>>) -> Self {
        match loaded {
            Ok(Some(config)) => config,
            Ok(None) => {
                if path != Path::new(DEFAULT_CONFIG_PATH) {
                    warn!("Config not found at {}. Using defaults", path.display());
                } else {
                    info!("No config at {}. Using defaults", path.display());
                }
                AppConfig::default()
            }
            Err(err) => {
                warn!("{err:#}. Using defaults");
                AppConfig::default()
            }
        }
    }

    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        Self::or_defaults(path, Self::try_load(path))
    }

    /// Build a server with the configured zones, placements and players.
    pub fn build_server(&self) -> Result<CommandServer> {
        let mut world = ServerWorld::new();
        for zone in &self.zones {
            if !world.add_zone(zone.id, zone.name.clone()) {
                anyhow::bail!("Zone {} is configured twice", zone.id);
            }
            for placement in &zone.placements {
                match placement {
                    PlacementConfig::Machine { pos, name, enabled } => {
                        let mut machine = Machine::new(name.clone());
                        machine.enabled = *enabled;
                        world.place(zone.id, BlockPos::from(*pos), machine)?;
                    }
                    PlacementConfig::Crate { pos, label } => {
                        world.place(
                            zone.id,
                            BlockPos::from(*pos),
                            Crate {
                                label: label.clone(),
                            },
                        )?;
                    }
                }
            }
        }
        for player in &self.players {
            world
                .join(PlayerId(player.id), player.name.clone(), player.zone)
                .with_context(|| format!("Failed to add configured player {}", player.name))?;
        }
        CommandServer::new(world, self.server.clone())
    }
}
