#![warn(missing_docs)]
//! Typed remote commands addressed to block entities.
//!
//! A [`CommandMessage`] carries a command name, a target [`BlockPos`], an
//! optional [`ZoneId`] and a [`TypedMap`] of parameters. Receiving it defers a
//! [`dispatch()`] onto the main thread through a [`MainThreadHandle`].

mod buffer;
mod codec;
mod command;
mod context;
mod dispatch;
mod executor;
mod registry;
mod typed_map;

pub use blockcmd_core::{BlockPos, ZoneId};
pub use buffer::{PacketReader, PacketWriter, WireError, MAX_STRING_LEN};
pub use codec::{
    compute_schema_hash, decode_frame, encode_frame, Frame, FRAME_HEADER_LEN, MAX_FRAME_LEN,
    PROTOCOL_VERSION,
};
pub use command::{CommandMessage, MAX_COMMAND_LEN};
pub use context::MessageContext;
pub use dispatch::{
    dispatch, BlockEntity, CommandHandler, CommandWorld, DispatchOutcome, Player, PlayerId, Zone,
};
pub use executor::{MainThreadExecutor, MainThreadHandle, SubmitError, Task, DEFAULT_QUEUE_CAPACITY};
pub use registry::{HandleMessage, Message, PacketRegistry};
pub use typed_map::{Key, ParamType, TypedMap, TypedValue, ValueKind, MAX_LIST_LEN, MAX_PARAMETERS};

/// Discriminator under which [`CommandMessage`] is registered by default.
pub const COMMAND_DISCRIMINATOR: u8 = 0;

/// Registry with the built-in messages registered.
pub fn default_registry<W: CommandWorld + 'static>() -> anyhow::Result<PacketRegistry<W>> {
    let mut registry = PacketRegistry::new();
    registry.register::<CommandMessage>(COMMAND_DISCRIMINATOR)?;
    Ok(registry)
}
