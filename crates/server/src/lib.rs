#![warn(missing_docs)]
//! Authoritative host for typed block-entity commands.

mod config;
pub mod machines;
mod server;
mod world;

pub use config::ServerConfig;
pub use machines::{Crate, Machine};
pub use server::{CommandServer, InboundGateway};
pub use world::{ServerWorld, ZoneState};
