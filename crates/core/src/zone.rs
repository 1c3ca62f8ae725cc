//! Zone identifiers.
//!
//! A zone is an independent coordinate space (overworld, nether, end, or any
//! custom partition registered by the host). Block positions are only
//! meaningful together with the zone they live in.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier for a zone.
///
/// Signed so the legacy numbering (nether = -1) survives the wire unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub i32);

impl ZoneId {
    /// The overworld.
    pub const OVERWORLD: Self = Self(0);
    /// The nether.
    pub const NETHER: Self = Self(-1);
    /// The end.
    pub const END: Self = Self(1);

    /// Default zone for newly joined players.
    pub const DEFAULT: Self = Self::OVERWORLD;

    /// Numeric representation used on the wire.
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Canonical name for well-known zones, used in configs/logs.
    pub const fn well_known_name(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("overworld"),
            -1 => Some("nether"),
            1 => Some("end"),
            _ => None,
        }
    }

    /// Parse either a well-known name or a plain integer.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "overworld" => Some(Self::OVERWORLD),
            "nether" => Some(Self::NETHER),
            "end" => Some(Self::END),
            other => other.parse().ok().map(Self),
        }
    }
}

impl Default for ZoneId {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.well_known_name() {
            Some(name) => f.write_str(name),
            None => write!(f, "zone#{}", self.0),
        }
    }
}
