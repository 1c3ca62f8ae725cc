//! Server-side world: zones, block entities and connected players.

use anyhow::Result;
use blockcmd_core::{BlockPos, ZoneId};
use blockcmd_net::{BlockEntity, CommandWorld, Player, PlayerId, Zone};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Block entities of a single zone.
#[derive(Default)]
pub struct ZoneState {
    name: String,
    block_entities: BTreeMap<BlockPos, Box<dyn BlockEntity>>,
}

impl ZoneState {
    /// Zone display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of block entities in the zone.
    pub fn len(&self) -> usize {
        self.block_entities.len()
    }

    /// Whether the zone holds no block entities.
    pub fn is_empty(&self) -> bool {
        self.block_entities.is_empty()
    }
}

impl Zone for ZoneState {
    fn block_entity_mut(&mut self, pos: BlockPos) -> Option<&mut dyn BlockEntity> {
        self.block_entities
            .get_mut(&pos)
            .map(|entity| entity.as_mut() as &mut dyn BlockEntity)
    }
}

/// World state owned by the server's main thread.
#[derive(Default)]
pub struct ServerWorld {
    zones: BTreeMap<ZoneId, ZoneState>,
    players: BTreeMap<PlayerId, Player>,
}

impl ServerWorld {
    /// World with no zones.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an empty zone. Returns `false` if it was already loaded.
    pub fn add_zone(&mut self, id: ZoneId, name: impl Into<String>) -> bool {
        if self.zones.contains_key(&id) {
            return false;
        }
        let name = name.into();
        info!(zone = %id, name = %name, "Zone loaded");
        self.zones.insert(
            id,
            ZoneState {
                name,
                block_entities: BTreeMap::new(),
            },
        );
        true
    }

    /// Loaded zone by id.
    pub fn zone(&self, id: ZoneId) -> Option<&ZoneState> {
        self.zones.get(&id)
    }

    /// Ids of all loaded zones, ascending.
    pub fn zone_ids(&self) -> impl Iterator<Item = ZoneId> + '_ {
        self.zones.keys().copied()
    }

    /// Place a block entity, returning the one it replaced.
    pub fn place(
        &mut self,
        zone: ZoneId,
        pos: BlockPos,
        entity: impl BlockEntity + 'static,
    ) -> Result<Option<Box<dyn BlockEntity>>> {
        let Some(state) = self.zones.get_mut(&zone) else {
            anyhow::bail!("Cannot place block entity in unloaded zone {}", zone);
        };
        debug!(zone = %zone, %pos, kind = entity.kind(), "Block entity placed");
        Ok(state.block_entities.insert(pos, Box::new(entity)))
    }

    /// Remove the block entity at `pos`.
    pub fn remove(&mut self, zone: ZoneId, pos: BlockPos) -> Option<Box<dyn BlockEntity>> {
        self.zones
            .get_mut(&zone)
            .and_then(|state| state.block_entities.remove(&pos))
    }

    /// Block entity at `pos`, read-only.
    pub fn block_entity(&self, zone: ZoneId, pos: BlockPos) -> Option<&dyn BlockEntity> {
        self.zones
            .get(&zone)
            .and_then(|state| state.block_entities.get(&pos))
            .map(|entity| entity.as_ref() as &dyn BlockEntity)
    }

    /// Every block entity, ordered by zone then position.
    pub fn block_entities(&self) -> impl Iterator<Item = (ZoneId, BlockPos, &dyn BlockEntity)> + '_ {
        self.zones.iter().flat_map(|(zone, state)| {
            state
                .block_entities
                .iter()
                .map(move |(pos, entity)| (*zone, *pos, entity.as_ref() as &dyn BlockEntity))
        })
    }

    /// Register a connected player standing in `zone`.
    pub fn join(&mut self, id: PlayerId, name: impl Into<String>, zone: ZoneId) -> Result<()> {
        if !self.zones.contains_key(&zone) {
            anyhow::bail!("Player {} cannot join unloaded zone {}", id, zone);
        }
        if self.players.contains_key(&id) {
            anyhow::bail!("Player {} is already connected", id);
        }
        let name = name.into();
        info!(player = %id, name = %name, zone = %zone, "Player joined");
        self.players.insert(id, Player { id, name, zone });
        Ok(())
    }

    /// Remove a player.
    pub fn leave(&mut self, id: PlayerId) -> Option<Player> {
        let player = self.players.remove(&id);
        if player.is_some() {
            info!(player = %id, "Player left");
        }
        player
    }

    /// Move a player to another loaded zone.
    pub fn move_player(&mut self, id: PlayerId, zone: ZoneId) -> Result<()> {
        if !self.zones.contains_key(&zone) {
            anyhow::bail!("Zone {} is not loaded", zone);
        }
        let Some(player) = self.players.get_mut(&id) else {
            anyhow::bail!("Player {} is not connected", id);
        };
        player.zone = zone;
        Ok(())
    }

    /// Number of connected players.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}

impl CommandWorld for ServerWorld {
    fn player(&self, id: PlayerId) -> Option<Player> {
        self.players.get(&id).cloned()
    }

    fn zone_mut(&mut self, id: ZoneId) -> Option<&mut dyn Zone> {
        self.zones.get_mut(&id).map(|zone| zone as &mut dyn Zone)
    }
}
