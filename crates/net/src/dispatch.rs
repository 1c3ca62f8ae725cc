//! Capability-based command dispatch.
//!
//! The receiving side exposes its world through [`CommandWorld`]. A command is
//! delivered only when the block entity at the target position answers the
//! [`BlockEntity::command_handler`] capability query.

use crate::command::CommandMessage;
use crate::typed_map::TypedMap;
use blockcmd_core::{BlockPos, ZoneId};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Identifier of a connected player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

/// The acting player, as seen at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Player identifier.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Zone the player currently stands in.
    pub zone: ZoneId,
}

/// Receiver of typed commands.
pub trait CommandHandler {
    /// Execute `command`; return `false` if it was not recognised or refused.
    fn execute(&mut self, player: &Player, command: &str, params: &TypedMap) -> bool;
}

/// Object located at a block position.
pub trait BlockEntity: Send {
    /// Short type label used in logs.
    fn kind(&self) -> &str;

    /// One-line state summary for logs and tooling.
    fn describe(&self) -> String {
        self.kind().to_owned()
    }

    /// Command-handler capability, if this entity accepts commands.
    fn command_handler(&mut self) -> Option<&mut dyn CommandHandler> {
        None
    }
}

/// A single coordinate space.
pub trait Zone {
    /// Block entity at `pos`, if any.
    fn block_entity_mut(&mut self, pos: BlockPos) -> Option<&mut dyn BlockEntity>;
}

/// World state owned by the main thread.
pub trait CommandWorld {
    /// Look up a connected player.
    fn player(&self, id: PlayerId) -> Option<Player>;

    /// Look up a loaded zone.
    fn zone_mut(&mut self, id: ZoneId) -> Option<&mut dyn Zone>;
}

/// Result of a single dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler accepted the command.
    Handled,
    /// The handler returned `false`.
    Unhandled,
    /// The sender is no longer connected.
    UnknownPlayer,
    /// The requested zone is not loaded.
    UnknownZone(ZoneId),
    /// Nothing is located at the target.
    NoBlockEntity,
    /// The target exists but does not accept commands.
    NotACommandHandler,
}

/// Resolve the target of `msg` and execute it.
///
/// Must run on the thread that owns `world`. Failures are logged (except an
/// unknown zone, which is dropped silently) and never propagate to the sender.
pub fn dispatch<W>(world: &mut W, sender: PlayerId, msg: &CommandMessage) -> DispatchOutcome
where
    W: CommandWorld + ?Sized,
{
    let Some(player) = world.player(sender) else {
        debug!(%sender, command = %msg.command, "Sender left before command ran");
        return DispatchOutcome::UnknownPlayer;
    };

    let zone_id = msg.zone.unwrap_or(player.zone);
    let Some(zone) = world.zone_mut(zone_id) else {
        return DispatchOutcome::UnknownZone(zone_id);
    };

    let Some(entity) = zone.block_entity_mut(msg.target) else {
        warn!(
            zone = %zone_id,
            pos = %msg.target,
            command = %msg.command,
            "No block entity at command target"
        );
        return DispatchOutcome::NoBlockEntity;
    };

    let kind = entity.kind().to_owned();
    let Some(handler) = entity.command_handler() else {
        warn!(
            zone = %zone_id,
            pos = %msg.target,
            kind = %kind,
            command = %msg.command,
            "Block entity is not a command handler"
        );
        return DispatchOutcome::NotACommandHandler;
    };

    if handler.execute(&player, &msg.command, &msg.params) {
        debug!(player = %player.id, kind = %kind, command = %msg.command, "Command handled");
        DispatchOutcome::Handled
    } else {
        warn!(
            player = %player.id,
            kind = %kind,
            command = %msg.command,
            "Command was not handled"
        );
        DispatchOutcome::Unhandled
    }
}
