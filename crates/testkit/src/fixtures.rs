//! Minimal worlds and block entities for dispatch tests.

use blockcmd_core::{BlockPos, ZoneId};
use blockcmd_net::{BlockEntity, CommandHandler, CommandWorld, Player, PlayerId, TypedMap, Zone};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// One `execute` call observed by a [`RecordingHandler`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Acting player.
    pub player: PlayerId,
    /// Command name.
    pub command: String,
    /// Parameters as received.
    pub params: TypedMap,
}

/// Shared log of recorded calls, readable after the handler moved into a world.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl CallLog {
    /// Calls recorded so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of calls recorded so far.
    pub fn len(&self) -> usize {
        self.calls().len()
    }

    /// Whether no calls were recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, call: RecordedCall) {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(call);
    }
}

/// Command handler that records every call and answers with a fixed result.
#[derive(Debug, Clone)]
pub struct RecordingHandler {
    log: CallLog,
    accept: bool,
}

impl RecordingHandler {
    /// Handler returning `true` for every command.
    pub fn accepting() -> (Self, CallLog) {
        Self::with_result(true)
    }

    /// Handler returning `false` for every command.
    pub fn refusing() -> (Self, CallLog) {
        Self::with_result(false)
    }

    fn with_result(accept: bool) -> (Self, CallLog) {
        let log = CallLog::default();
        (
            Self {
                log: log.clone(),
                accept,
            },
            log,
        )
    }
}

impl CommandHandler for RecordingHandler {
    fn execute(&mut self, player: &Player, command: &str, params: &TypedMap) -> bool {
        self.log.push(RecordedCall {
            player: player.id,
            command: command.to_owned(),
            params: params.clone(),
        });
        self.accept
    }
}

impl BlockEntity for RecordingHandler {
    fn kind(&self) -> &str {
        "recording"
    }

    fn command_handler(&mut self) -> Option<&mut dyn CommandHandler> {
        Some(self)
    }
}

/// Block entity without the command capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct InertBlock;

impl BlockEntity for InertBlock {
    fn kind(&self) -> &str {
        "inert"
    }
}

/// A zone backed by a map of boxed block entities.
#[derive(Default)]
pub struct FixtureZone {
    entities: BTreeMap<BlockPos, Box<dyn BlockEntity>>,
}

impl Zone for FixtureZone {
    fn block_entity_mut(&mut self, pos: BlockPos) -> Option<&mut dyn BlockEntity> {
        self.entities
            .get_mut(&pos)
            .map(|entity| entity.as_mut() as &mut dyn BlockEntity)
    }
}

/// Builder-style world for dispatch tests.
#[derive(Default)]
pub struct FixtureWorld {
    zones: BTreeMap<ZoneId, FixtureZone>,
    players: BTreeMap<PlayerId, Player>,
}

impl FixtureWorld {
    /// World with an empty overworld.
    pub fn new() -> Self {
        Self::default().with_zone(ZoneId::OVERWORLD)
    }

    /// Add an empty zone.
    pub fn with_zone(mut self, zone: ZoneId) -> Self {
        self.zones.entry(zone).or_default();
        self
    }

    /// Add a player standing in `zone`.
    pub fn with_player(mut self, id: u64, name: &str, zone: ZoneId) -> Self {
        let id = PlayerId(id);
        self.players.insert(
            id,
            Player {
                id,
                name: name.to_owned(),
                zone,
            },
        );
        self
    }

    /// Place a block entity, creating the zone if needed.
    pub fn with_entity(mut self, zone: ZoneId, pos: BlockPos, entity: impl BlockEntity + 'static) -> Self {
        self.zones
            .entry(zone)
            .or_default()
            .entities
            .insert(pos, Box::new(entity));
        self
    }
}

impl CommandWorld for FixtureWorld {
    fn player(&self, id: PlayerId) -> Option<Player> {
        self.players.get(&id).cloned()
    }

    fn zone_mut(&mut self, id: ZoneId) -> Option<&mut dyn Zone> {
        self.zones.get_mut(&id).map(|zone| zone as &mut dyn Zone)
    }
}
