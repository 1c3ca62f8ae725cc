//! Server tuning knobs.

use blockcmd_net::DEFAULT_QUEUE_CAPACITY;
use serde::{Deserialize, Serialize};

/// Runtime configuration for a [`crate::CommandServer`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Deferred tasks the main-thread queue holds before rejecting new work.
    pub queue_capacity: usize,
    /// Deferred tasks run per tick; the rest wait for the next tick.
    pub tasks_per_tick: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            tasks_per_tick: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let cfg: ServerConfig = toml::from_str("tasks_per_tick = 8").unwrap();
        assert_eq!(cfg.tasks_per_tick, 8);
        assert_eq!(cfg.queue_capacity, DEFAULT_QUEUE_CAPACITY);
    }
}
