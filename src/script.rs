use anyhow::{Context, Result};
use blockcmd_core::{BlockPos, SimTick, ZoneId};
use blockcmd_net::{CommandMessage, PlayerId, TypedMap};
use serde::Deserialize;
use std::{collections::VecDeque, fs, path::Path};

#[derive(Debug, Deserialize)]
struct ReplayScriptFile {
    steps: Vec<ReplayStepDef>,
}

#[derive(Debug, Clone, Deserialize)]
struct ReplayStepDef {
    tick: u64,
    player: u64,
    pos: [i32; 3],
    #[serde(default)]
    zone: Option<ZoneId>,
    command: String,
    #[serde(default)]
    params: TypedMap,
}

/// One command sent by a player at a given tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayStep {
    pub tick: SimTick,
    pub player: PlayerId,
    pub message: CommandMessage,
}

/// Deterministic replay of player commands.
///
/// Scripts are a list of steps sorted by tick; steps sharing a tick keep file order.
#[derive(Debug)]
pub struct ReplayScript {
    pending: VecDeque<ReplayStep>,
}

impl ReplayScript {
    /// Load a replay script from a JSON file on disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read replay script {}", path.display()))?;
        Self::from_json(&contents)
    }

    /// Load a replay script from an in-memory JSON string.
    pub fn from_json(contents: &str) -> Result<Self> {
        let file: ReplayScriptFile = serde_json::from_str(contents)?;
        if file.steps.is_empty() {
            anyhow::bail!("replay script contains no steps");
        }

        let mut pending = VecDeque::with_capacity(file.steps.len());
        let mut last_tick: Option<u64> = None;
        for (index, step) in file.steps.into_iter().enumerate() {
            if let Some(prev) = last_tick {
                if step.tick < prev {
                    anyhow::bail!("replay script steps must be sorted by tick");
                }
            }
            last_tick = Some(step.tick);

            let message = CommandMessage {
                target: BlockPos::from(step.pos),
                zone: step.zone,
                command: step.command,
                params: step.params,
            };
            if let Err(reason) = message.verify() {
                anyhow::bail!("replay script step {index}: {reason}");
            }

            pending.push_back(ReplayStep {
                tick: SimTick(step.tick),
                player: PlayerId(step.player),
                message,
            });
        }

        Ok(Self { pending })
    }

    /// Drain and return all steps scheduled for ticks `<= tick`.
    pub fn drain_ready(&mut self, tick: SimTick) -> Vec<ReplayStep> {
        let ready = self
            .pending
            .iter()
            .take_while(|step| step.tick <= tick)
            .count();
        self.pending.drain(..ready).collect()
    }

    pub fn is_finished(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockcmd_net::{Key, TypedValue};

    #[test]
    fn replay_script_rejects_unsorted_ticks() {
        let json = r#"{
            "steps": [
                {"tick": 2, "player": 1, "pos": [0, 0, 0], "command": "open_gui"},
                {"tick": 1, "player": 1, "pos": [0, 0, 0], "command": "open_gui"}
            ]
        }"#;
        let err = ReplayScript::from_json(json).unwrap_err();
        assert!(
            err.to_string().contains("sorted by tick"),
            "unexpected error: {err:#}"
        );
    }

    #[test]
    fn replay_script_rejects_empty_scripts_and_commands() {
        assert!(ReplayScript::from_json(r#"{"steps": []}"#).is_err());

        let empty = r#"{"steps": [{"tick": 0, "player": 1, "pos": [0, 0, 0], "command": ""}]}"#;
        let err = ReplayScript::from_json(empty).unwrap_err();
        assert!(err.to_string().contains("step 0"), "unexpected error: {err:#}");
    }

    #[test]
    fn replay_script_keeps_command_names_verbatim() {
        let json = r#"{"steps": [{"tick": 0, "player": 1, "pos": [0, 0, 0], "command": " open_gui"}]}"#;
        let mut script = ReplayScript::from_json(json).unwrap();
        let steps = script.drain_ready(SimTick(0));
        assert_eq!(steps[0].message.command, " open_gui");
    }

    #[test]
    fn replay_script_rejects_params_the_server_would_refuse() {
        let lines: Vec<String> = vec![String::new(); blockcmd_net::MAX_LIST_LEN + 1];
        let json = serde_json::json!({
            "steps": [{
                "tick": 0, "player": 1, "pos": [0, 0, 0], "command": "load",
                "params": { "lines": { "type": "string_list", "value": lines } }
            }]
        });
        let err = ReplayScript::from_json(&json.to_string()).unwrap_err();
        assert!(err.to_string().contains("string list"), "unexpected error: {err:#}");
    }

    #[test]
    fn replay_script_drains_in_order() {
        let json = r#"{
            "steps": [
                {"tick": 1, "player": 1, "pos": [10, 64, -3], "command": "open_gui",
                 "params": {"page": {"type": "int", "value": 2}}},
                {"tick": 1, "player": 2, "pos": [10, 64, -3], "zone": -1, "command": "rename",
                 "params": {"name": {"type": "string", "value": "Forge"}}},
                {"tick": 3, "player": 1, "pos": [0, 70, 0], "command": "set_enabled"}
            ]
        }"#;
        let mut script = ReplayScript::from_json(json).expect("script should parse");

        assert!(script.drain_ready(SimTick(0)).is_empty());

        let first = script.drain_ready(SimTick(1));
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].player, PlayerId(1));
        assert_eq!(first[0].message.zone, None);
        assert_eq!(first[0].message.params.get(&Key::<i32>::new("page")), Some(2));
        assert_eq!(first[1].message.zone, Some(ZoneId::NETHER));
        assert_eq!(
            first[1].message.params.get_raw("name"),
            Some(&TypedValue::String("Forge".into()))
        );

        assert!(script.drain_ready(SimTick(2)).is_empty());
        assert_eq!(script.drain_ready(SimTick(3)).len(), 1);
        assert!(script.is_finished());
    }
}
