//! Command server: owns the world and drains deferred command work each tick.

use crate::config::ServerConfig;
use crate::world::ServerWorld;
use anyhow::{Context, Result};
use blockcmd_core::SimTick;
use blockcmd_net::{
    default_registry, MainThreadExecutor, MainThreadHandle, Message, MessageContext,
    PacketRegistry, PlayerId,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Network-side entry point, cloneable into every connection thread.
///
/// Frames are decoded on the calling thread; only the resulting world access is
/// deferred to the server's main thread.
#[derive(Clone)]
pub struct InboundGateway {
    registry: Arc<PacketRegistry<ServerWorld>>,
    main_thread: MainThreadHandle<ServerWorld>,
}

impl InboundGateway {
    /// Receive one frame from `sender`.
    ///
    /// `frame` must hold exactly one frame; trailing bytes reject it. Returns
    /// whether the message marked itself handled. Decode failures are logged
    /// and returned; the sender is never notified.
    pub fn receive(&self, sender: PlayerId, frame: &[u8]) -> Result<bool> {
        let mut ctx = MessageContext::new(sender, self.main_thread.clone());
        match self.registry.receive(frame, &mut ctx) {
            Ok(name) => {
                debug!(%sender, message = name, "Frame accepted");
                Ok(ctx.packet_handled())
            }
            Err(err) => {
                warn!(%sender, "Dropping malformed frame: {err:#}");
                Err(err)
            }
        }
    }

    /// Encode a message with this server's discriminator table.
    pub fn encode<M: Message>(&self, msg: &M) -> Result<Vec<u8>> {
        self.registry.encode(msg)
    }

    /// Schema hash of the registered message table.
    pub fn schema_hash(&self) -> u64 {
        self.registry.schema_hash()
    }
}

/// Authoritative host for block-entity commands.
pub struct CommandServer {
    world: ServerWorld,
    executor: MainThreadExecutor<ServerWorld>,
    gateway: InboundGateway,
    current_tick: SimTick,
    config: ServerConfig,
}

impl CommandServer {
    /// Create a server around an existing world.
    pub fn new(world: ServerWorld, config: ServerConfig) -> Result<Self> {
        let registry = default_registry().context("Failed to register built-in messages")?;
        let (executor, main_thread) = MainThreadExecutor::new(config.queue_capacity);
        let gateway = InboundGateway {
            registry: Arc::new(registry),
            main_thread,
        };

        info!(
            schema_hash = format_args!("{:016x}", gateway.schema_hash()),
            queue_capacity = config.queue_capacity,
            tasks_per_tick = config.tasks_per_tick,
            "Command server ready"
        );

        Ok(Self {
            world,
            executor,
            gateway,
            current_tick: SimTick::ZERO,
            config,
        })
    }

    /// Handle for network threads.
    pub fn gateway(&self) -> InboundGateway {
        self.gateway.clone()
    }

    /// Run one tick: drain up to `tasks_per_tick` deferred tasks.
    ///
    /// Returns the number of tasks run.
    #[instrument(skip(self), fields(tick = self.current_tick.0))]
    pub fn tick(&mut self) -> usize {
        let ran = self
            .executor
            .run_pending(&mut self.world, self.config.tasks_per_tick);
        if ran > 0 {
            debug!(ran, "Ran deferred command work");
        }
        self.current_tick = self.current_tick.advance(1);
        ran
    }

    /// Deferred tasks waiting for a tick.
    pub fn pending_work(&self) -> usize {
        self.executor.pending()
    }

    /// Get current tick.
    pub fn current_tick(&self) -> SimTick {
        self.current_tick
    }

    /// Get reference to the world.
    pub fn world(&self) -> &ServerWorld {
        &self.world
    }

    /// Get mutable reference to the world.
    pub fn world_mut(&mut self) -> &mut ServerWorld {
        &mut self.world
    }

    /// Get the active configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
