//! Message type registration.
//!
//! Each message type is registered once under a one-byte discriminator. The
//! registry turns outgoing messages into frames and routes incoming frames to
//! the matching handler.

use crate::buffer::{PacketReader, PacketWriter, WireError};
use crate::codec::{compute_schema_hash, decode_frame, encode_frame, FRAME_HEADER_LEN};
use crate::context::MessageContext;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use tracing::trace;

/// A message that can be written to and read from a packet.
pub trait Message: Sized + Send + 'static {
    /// Unique name, also folded into the schema hash.
    const NAME: &'static str;

    /// Append the message to a packet.
    fn encode(&self, w: &mut PacketWriter);

    /// Read the message from a packet.
    fn decode(r: &mut PacketReader<'_>) -> Result<Self, WireError>;
}

/// Receive-side behaviour of a message for world type `W`.
pub trait HandleMessage<W>: Message {
    /// Called on the receiving thread right after decoding.
    fn handle(self, ctx: &mut MessageContext<W>);
}

type ReceiveFn<W> = fn(&[u8], &mut MessageContext<W>) -> Result<(), WireError>;

struct Registration<W> {
    name: &'static str,
    receive: ReceiveFn<W>,
}

fn receive_as<W, M: HandleMessage<W>>(
    payload: &[u8],
    ctx: &mut MessageContext<W>,
) -> Result<(), WireError> {
    let mut r = PacketReader::new(payload);
    let msg = M::decode(&mut r)?;
    r.finish()?;
    msg.handle(ctx);
    Ok(())
}

/// Discriminator table for one world type.
pub struct PacketRegistry<W> {
    by_discriminator: BTreeMap<u8, Registration<W>>,
}

impl<W> Default for PacketRegistry<W> {
    fn default() -> Self {
        Self {
            by_discriminator: BTreeMap::new(),
        }
    }
}

impl<W> PacketRegistry<W> {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register message type `M` under `discriminator`.
    pub fn register<M: HandleMessage<W>>(&mut self, discriminator: u8) -> Result<()> {
        if let Some(existing) = self.by_discriminator.get(&discriminator) {
            anyhow::bail!(
                "Discriminator {} already registered to {:?}",
                discriminator,
                existing.name
            );
        }
        if self.discriminator_of(M::NAME).is_some() {
            anyhow::bail!("Message {:?} registered twice", M::NAME);
        }

        self.by_discriminator.insert(
            discriminator,
            Registration {
                name: M::NAME,
                receive: receive_as::<W, M>,
            },
        );
        Ok(())
    }

    /// Discriminator assigned to the named message.
    pub fn discriminator_of(&self, name: &str) -> Option<u8> {
        self.by_discriminator
            .iter()
            .find(|(_, reg)| reg.name == name)
            .map(|(d, _)| *d)
    }

    /// Number of registered message types.
    pub fn len(&self) -> usize {
        self.by_discriminator.len()
    }

    /// Whether no message types are registered.
    pub fn is_empty(&self) -> bool {
        self.by_discriminator.is_empty()
    }

    /// Encode `msg` as a complete frame.
    pub fn encode<M: Message>(&self, msg: &M) -> Result<Vec<u8>> {
        let discriminator = self
            .discriminator_of(M::NAME)
            .with_context(|| format!("Message {:?} is not registered", M::NAME))?;
        let mut w = PacketWriter::new();
        msg.encode(&mut w);
        encode_frame(discriminator, w.as_bytes())
    }

    /// Decode exactly one frame and hand the message to its handler.
    ///
    /// `data` must hold one complete frame and nothing else. Returns the name of
    /// the message that was received.
    pub fn receive(&self, data: &[u8], ctx: &mut MessageContext<W>) -> Result<&'static str> {
        let frame = decode_frame(data)?;
        let consumed = FRAME_HEADER_LEN + frame.payload.len();
        if consumed != data.len() {
            anyhow::bail!(
                "{} trailing bytes after {}-byte frame",
                data.len() - consumed,
                consumed
            );
        }
        let reg = self
            .by_discriminator
            .get(&frame.discriminator)
            .with_context(|| format!("Unknown message discriminator {}", frame.discriminator))?;

        trace!(
            message = reg.name,
            bytes = frame.payload.len(),
            sender = %ctx.sender(),
            "Received frame"
        );
        (reg.receive)(frame.payload, ctx)
            .with_context(|| format!("Failed to decode {} message", reg.name))?;
        Ok(reg.name)
    }

    /// Hash of the registered `(discriminator, name)` table.
    pub fn schema_hash(&self) -> u64 {
        compute_schema_hash(
            self.by_discriminator
                .iter()
                .map(|(d, reg)| (*d, reg.name)),
        )
    }
}
