//! Built-in block entities.
//!
//! `Machine` is a GUI-driven block that accepts remote commands; `Crate` is a
//! plain storage block that does not.

use blockcmd_net::{BlockEntity, CommandHandler, Key, Player, PlayerId, TypedMap};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Maximum length of a machine name (characters).
pub const MAX_MACHINE_NAME_LEN: usize = 32;

/// Number of GUI pages a machine exposes.
pub const MACHINE_GUI_PAGES: i32 = 4;

/// `set_enabled` parameter.
pub const ENABLED: Key<bool> = Key::new("enabled");
/// `open_gui` parameter.
pub const PAGE: Key<i32> = Key::new("page");
/// `rename` parameter.
pub const NAME: Key<String> = Key::new("name");

/// State of a machine in the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    /// Display name.
    pub name: String,
    /// Whether the machine is running.
    pub enabled: bool,
    /// GUI page last opened, if any.
    pub gui_page: Option<i32>,
    /// Last player whose command was accepted.
    pub last_operator: Option<PlayerId>,
}

impl Machine {
    /// A disabled machine with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: false,
            gui_page: None,
            last_operator: None,
        }
    }

    fn set_enabled(&mut self, params: &TypedMap) -> bool {
        match params.get(&ENABLED) {
            Some(enabled) => {
                self.enabled = enabled;
                true
            }
            None => false,
        }
    }

    fn open_gui(&mut self, params: &TypedMap) -> bool {
        let page = params.get_or(&PAGE, 0);
        if !(0..MACHINE_GUI_PAGES).contains(&page) {
            return false;
        }
        self.gui_page = Some(page);
        true
    }

    fn rename(&mut self, params: &TypedMap) -> bool {
        let Some(name) = params.get(&NAME) else {
            return false;
        };
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_MACHINE_NAME_LEN {
            return false;
        }
        self.name = name.to_owned();
        true
    }
}

impl CommandHandler for Machine {
    fn execute(&mut self, player: &Player, command: &str, params: &TypedMap) -> bool {
        let accepted = match command {
            "set_enabled" => self.set_enabled(params),
            "open_gui" => self.open_gui(params),
            "rename" => self.rename(params),
            _ => false,
        };
        if accepted {
            self.last_operator = Some(player.id);
            debug!(machine = %self.name, player = %player.name, command, "Machine updated");
        }
        accepted
    }
}

impl BlockEntity for Machine {
    fn kind(&self) -> &str {
        "machine"
    }

    fn describe(&self) -> String {
        let page = self
            .gui_page
            .map_or_else(|| "-".to_owned(), |p| p.to_string());
        format!(
            "machine {:?} enabled={} page={}",
            self.name, self.enabled, page
        )
    }

    fn command_handler(&mut self) -> Option<&mut dyn CommandHandler> {
        Some(self)
    }
}

/// Storage block without a command interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crate {
    /// Free-form label.
    pub label: String,
}

impl BlockEntity for Crate {
    fn kind(&self) -> &str {
        "crate"
    }

    fn describe(&self) -> String {
        format!("crate {:?}", self.label)
    }
}
