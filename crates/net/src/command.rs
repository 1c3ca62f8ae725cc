//! Typed command addressed to a block entity.
//!
//! Sent by a client (typically from a GUI) to the block entity at `target` on
//! the server. The receiving side defers the lookup and the `execute` call to
//! its main thread; see [`dispatch()`].

use crate::buffer::{PacketReader, PacketWriter, WireError};
use crate::context::MessageContext;
use crate::dispatch::{dispatch, CommandWorld};
use crate::registry::{HandleMessage, Message};
use crate::typed_map::TypedMap;
use blockcmd_core::{BlockPos, ZoneId};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Maximum length of a command name (bytes).
pub const MAX_COMMAND_LEN: usize = 256;

/// A command plus its parameters, addressed to a block position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandMessage {
    /// Block entity the command is addressed to.
    pub target: BlockPos,
    /// Zone containing `target`; `None` means the sender's current zone.
    pub zone: Option<ZoneId>,
    /// Command name understood by the target's handler.
    pub command: String,
    /// Command parameters.
    #[serde(default)]
    pub params: TypedMap,
}

impl CommandMessage {
    /// Command for the block entity at `target` in the sender's current zone.
    pub fn new(target: BlockPos, command: impl Into<String>, params: TypedMap) -> Self {
        Self {
            target,
            zone: None,
            command: command.into(),
            params,
        }
    }

    /// Command for the block entity at `target` in an explicit zone.
    pub fn in_zone(
        target: BlockPos,
        zone: ZoneId,
        command: impl Into<String>,
        params: TypedMap,
    ) -> Self {
        Self {
            target,
            zone: Some(zone),
            command: command.into(),
            params,
        }
    }

    /// Check sender-side limits before sending.
    ///
    /// A message that passes is accepted by [`CommandMessage::decode`].
    pub fn verify(&self) -> Result<(), WireError> {
        if self.command.is_empty() {
            return Err(WireError::EmptyCommand);
        }
        if self.command.len() > MAX_COMMAND_LEN {
            return Err(WireError::CommandTooLong {
                len: self.command.len(),
                max: MAX_COMMAND_LEN,
            });
        }
        self.params.verify()
    }

    /// Append the message to a packet.
    ///
    /// Layout: target, command, parameters, zone flag, zone (iff flagged).
    pub fn encode(&self, w: &mut PacketWriter) {
        w.write_pos(self.target);
        w.write_string(&self.command);
        self.params.encode(w);
        match self.zone {
            Some(zone) => {
                w.write_bool(true);
                w.write_i32(zone.as_i32());
            }
            None => w.write_bool(false),
        }
    }

    /// Read a message written by [`CommandMessage::encode`].
    pub fn decode(r: &mut PacketReader<'_>) -> Result<Self, WireError> {
        let target = r.read_pos()?;
        let command = r.read_string()?;
        if command.is_empty() {
            return Err(WireError::EmptyCommand);
        }
        let params = TypedMap::decode(r)?;
        let zone = if r.read_bool()? {
            Some(ZoneId(r.read_i32()?))
        } else {
            None
        };
        Ok(Self {
            target,
            zone,
            command,
            params,
        })
    }

    /// Encode into a standalone buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = PacketWriter::with_capacity(32 + self.command.len());
        self.encode(&mut w);
        w.into_bytes()
    }

    /// Decode a standalone buffer, rejecting trailing bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, WireError> {
        let mut r = PacketReader::new(data);
        let msg = Self::decode(&mut r)?;
        r.finish()?;
        Ok(msg)
    }
}

impl Message for CommandMessage {
    const NAME: &'static str = "command";

    fn encode(&self, w: &mut PacketWriter) {
        CommandMessage::encode(self, w);
    }

    fn decode(r: &mut PacketReader<'_>) -> Result<Self, WireError> {
        CommandMessage::decode(r)
    }
}

impl<W: CommandWorld + 'static> HandleMessage<W> for CommandMessage {
    fn handle(self, ctx: &mut MessageContext<W>) {
        let sender = ctx.sender();
        trace!(%sender, command = %self.command, pos = %self.target, "Deferring command");
        ctx.enqueue_work(move |world: &mut W| {
            dispatch(world, sender, &self);
        });
        ctx.set_packet_handled(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed_map::{Key, TypedValue, MAX_PARAMETERS};

    const PAGE: Key<i32> = Key::new("page");

    #[test]
    fn unset_zone_ends_with_false_flag() {
        let msg = CommandMessage::new(BlockPos::new(10, 64, -3), "open_gui", TypedMap::new());
        let bytes = msg.to_bytes();
        assert_eq!(bytes.last(), Some(&0));

        // 12 (pos) + 4 + 8 (command) + 4 (empty map) + 1 (flag)
        assert_eq!(bytes.len(), 29);
        assert_eq!(CommandMessage::from_bytes(&bytes).unwrap().zone, None);
    }

    #[test]
    fn set_zone_appends_flag_and_value() {
        let msg = CommandMessage::in_zone(BlockPos::ORIGIN, ZoneId::NETHER, "x", TypedMap::new());
        let bytes = msg.to_bytes();
        assert_eq!(&bytes[bytes.len() - 5..], &[1, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(CommandMessage::from_bytes(&bytes).unwrap(), msg);
    }

    #[test]
    fn field_order_is_pos_command_params_zone() {
        let msg = CommandMessage::in_zone(
            BlockPos::new(1, 2, 3),
            ZoneId(9),
            "go",
            TypedMap::new().with(&PAGE, 2),
        );
        let bytes = msg.to_bytes();
        assert_eq!(&bytes[..12], &[0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3]);
        assert_eq!(&bytes[12..18], &[0, 0, 0, 2, b'g', b'o']);
        assert_eq!(&bytes[18..22], &[0, 0, 0, 1]);
        assert_eq!(&bytes[bytes.len() - 5..], &[1, 0, 0, 0, 9]);
    }

    #[test]
    fn empty_command_rejected_on_decode() {
        let msg = CommandMessage::new(BlockPos::ORIGIN, "", TypedMap::new());
        assert_eq!(msg.verify(), Err(WireError::EmptyCommand));
        assert_eq!(
            CommandMessage::from_bytes(&msg.to_bytes()),
            Err(WireError::EmptyCommand)
        );
    }

    #[test]
    fn verify_limits_command_length() {
        let msg = CommandMessage::new(BlockPos::ORIGIN, "a".repeat(MAX_COMMAND_LEN + 1), TypedMap::new());
        assert_eq!(
            msg.verify(),
            Err(WireError::CommandTooLong {
                len: MAX_COMMAND_LEN + 1,
                max: MAX_COMMAND_LEN,
            })
        );
    }

    #[test]
    fn verified_messages_decode() {
        let mut params = TypedMap::new();
        for i in 0..MAX_PARAMETERS {
            params.insert_raw(format!("p{i}"), TypedValue::Int(i as i32));
        }
        let msg = CommandMessage::new(BlockPos::ORIGIN, "bulk", params.clone());
        assert_eq!(msg.verify(), Ok(()));
        assert_eq!(CommandMessage::from_bytes(&msg.to_bytes()), Ok(msg));

        params.insert_raw("one_more", TypedValue::Int(0));
        let msg = CommandMessage::new(BlockPos::ORIGIN, "bulk", params);
        let err = msg.verify().unwrap_err();
        assert_eq!(CommandMessage::from_bytes(&msg.to_bytes()), Err(err));
    }

    #[test]
    fn missing_zone_flag_is_an_error() {
        let msg = CommandMessage::new(BlockPos::ORIGIN, "x", TypedMap::new());
        let mut bytes = msg.to_bytes();
        bytes.pop();
        assert!(matches!(
            CommandMessage::from_bytes(&bytes),
            Err(WireError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut bytes = CommandMessage::new(BlockPos::ORIGIN, "x", TypedMap::new()).to_bytes();
        bytes.push(0);
        assert_eq!(
            CommandMessage::from_bytes(&bytes),
            Err(WireError::TrailingBytes(1))
        );
    }
}
