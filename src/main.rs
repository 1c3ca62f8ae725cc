//! blockcmd - typed remote commands addressed to block entities
//!
//! Encodes and decodes command messages, and replays scripted player commands
//! against a configured server.

mod config;
mod script;

use anyhow::{Context, Result};
use blockcmd_core::{BlockPos, ZoneId};
use blockcmd_net::{CommandMessage, TypedMap};
use blockcmd_server::CommandServer;
use clap::{Parser, Subcommand};
use config::{AppConfig, DEFAULT_CONFIG_PATH};
use script::ReplayScript;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Typed remote commands for block entities", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the hex encoding of a command message
    Encode {
        /// Target block position
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
        pos: Vec<i32>,
        /// Target zone (name or number); defaults to the sender's zone
        #[arg(long)]
        zone: Option<String>,
        /// Command name
        #[arg(long)]
        command: String,
        /// Parameters as JSON, e.g. '{"page":{"type":"int","value":2}}'
        #[arg(long)]
        params: Option<String>,
    },
    /// Decode a hex-encoded command message and print it as JSON
    Decode {
        /// Hex-encoded message bytes
        hex: String,
    },
    /// Replay a command script against a configured server
    Replay {
        /// JSON replay script
        script: PathBuf,
        /// Server configuration (TOML)
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let startup = StartupConfig::for_command(&cli.command);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(startup.log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();
    debug!("Starting blockcmd v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Encode {
            pos,
            zone,
            command,
            params,
        } => {
            println!(
                "{}",
                encode_command(&pos, zone.as_deref(), &command, params.as_deref())?
            );
        }
        Command::Decode { hex } => println!("{}", decode_command(&hex)?),
        Command::Replay { script, .. } => {
            let config = startup.into_config();
            for line in replay(&script, &config)? {
                println!("{line}");
            }
        }
    }

    Ok(())
}

/// Configuration read before logging is installed.
///
/// Only `replay` reads a config file; the other subcommands run on defaults.
enum StartupConfig {
    Defaults,
    Loaded {
        path: PathBuf,
        result: Result<Option<AppConfig>>,
    },
}

impl StartupConfig {
    fn for_command(command: &Command) -> Self {
        match command {
            Command::Replay { config, .. } => StartupConfig::Loaded {
                path: config.clone(),
                result: AppConfig::try_load(config),
            },
            Command::Encode { .. } | Command::Decode { .. } => StartupConfig::Defaults,
        }
    }

    fn log_filter(&self) -> String {
        match self {
            StartupConfig::Loaded {
                result: Ok(Some(config)),
                ..
            } => config.log_filter.clone(),
            _ => AppConfig::default().log_filter,
        }
    }

    /// Settle the loaded config; load problems are reported here, once logging is up.
    fn into_config(self) -> AppConfig {
        match self {
            StartupConfig::Defaults => AppConfig::default(),
            StartupConfig::Loaded { path, result } => AppConfig::or_defaults(&path, result),
        }
    }
}

fn encode_command(
    pos: &[i32],
    zone: Option<&str>,
    command: &str,
    params: Option<&str>,
) -> Result<String> {
    let pos: [i32; 3] = pos
        .try_into()
        .context("--pos takes exactly three coordinates")?;
    let params = match params {
        Some(json) => serde_json::from_str::<TypedMap>(json).context("Invalid --params JSON")?,
        None => TypedMap::new(),
    };
    let zone = zone
        .map(|value| ZoneId::parse(value).with_context(|| format!("Unknown zone '{value}'")))
        .transpose()?;

    let message = CommandMessage {
        target: BlockPos::from(pos),
        zone,
        command: command.to_owned(),
        params,
    };
    if let Err(reason) = message.verify() {
        anyhow::bail!("{reason}");
    }
    Ok(hex::encode(message.to_bytes()))
}

fn decode_command(input: &str) -> Result<String> {
    let compact: String = input.split_whitespace().collect();
    let bytes = hex::decode(&compact).context("Input is not valid hex")?;
    let message = CommandMessage::from_bytes(&bytes).context("Failed to decode command message")?;
    Ok(serde_json::to_string_pretty(&message)?)
}

/// Run `script` to completion and describe every block entity afterwards.
fn replay(script: &Path, config: &AppConfig) -> Result<Vec<String>> {
    let mut script = ReplayScript::from_path(script)?;
    let mut server = config.build_server()?;
    run_script(&mut script, &mut server)?;

    info!(ticks = server.current_tick().0, "Replay finished");
    Ok(server
        .world()
        .block_entities()
        .map(|(zone, pos, entity)| format!("{zone} {pos} {}", entity.describe()))
        .collect())
}

fn run_script(script: &mut ReplayScript, server: &mut CommandServer) -> Result<()> {
    let gateway = server.gateway();
    while !script.is_finished() || server.pending_work() > 0 {
        for step in script.drain_ready(server.current_tick()) {
            let frame = gateway.encode(&step.message)?;
            // Malformed frames are already logged by the gateway.
            let _ = gateway.receive(step.player, &frame);
        }
        server.tick();
    }
    Ok(())
}
