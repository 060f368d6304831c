//! Help menu plugin: lists every registered menu entry, in game and at the
//! backend console.

use std::sync::{Arc, Weak};

use anyhow::Result;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tether::{BackendMenuEntry, GameChat, GameMenuEntry, MainFrame, MenuEntry, Plugin, PluginInfo};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelpSettings {
    /// First line of every listing.
    pub header: String,
    pub triggers: Vec<String>,
}

impl Default for HelpSettings {
    fn default() -> Self {
        Self {
            header: "Available commands:".to_string(),
            triggers: vec!["help".to_string(), "?".to_string()],
        }
    }
}

#[derive(Default)]
pub struct HelpPlugin {
    settings: Arc<RwLock<HelpSettings>>,
}

impl HelpPlugin {
    pub fn new() -> Self {
        Self::default()
    }
}

fn listing(header: &str, usage: Vec<String>) -> Vec<String> {
    let mut lines = Vec::with_capacity(usage.len() + 1);
    lines.push(header.to_string());
    lines.extend(usage.into_iter().map(|line| format!("  {line}")));
    lines
}

impl Plugin for HelpPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo::new("help", semver::Version::new(1, 0, 0))
            .with_description("Lists the game and backend menus")
            .with_author("Tether Team")
    }

    fn init(&self, frame: Arc<dyn MainFrame>) -> Result<()> {
        let settings = self.settings.read().clone();
        let weak: Weak<dyn MainFrame> = Arc::downgrade(&frame);

        let game_weak = weak.clone();
        let header = settings.header.clone();
        frame.get_game_listener().set_game_menu_entry(GameMenuEntry::new(
            MenuEntry::new(settings.triggers.clone()).usage("list in-game commands"),
            move |chat: &GameChat| {
                let Some(frame) = game_weak.upgrade() else {
                    return false;
                };
                let control = frame.get_game_control();
                for line in listing(&header, frame.get_game_listener().game_menu_usage()) {
                    if let Err(e) = control.say_to(&chat.name, &line) {
                        tracing::warn!("Help listing to {} failed: {}", chat.name, e);
                        break;
                    }
                }
                true
            },
        ))?;

        let header = settings.header;
        frame.set_backend_menu_entry(BackendMenuEntry::new(
            MenuEntry::new(settings.triggers).usage("list console commands"),
            move |_: &[String]| {
                let Some(frame) = weak.upgrade() else {
                    return false;
                };
                let display = frame.get_backend_display();
                for line in listing(&header, frame.backend_menu_usage()) {
                    display.write_line(&line);
                }
                true
            },
        ))?;

        tracing::info!("Help menu registered");
        Ok(())
    }

    fn validate_config(&self, config: &serde_json::Value) -> Result<()> {
        let settings: HelpSettings = serde_json::from_value(config.clone())?;
        if settings.triggers.is_empty() {
            anyhow::bail!("help needs at least one trigger");
        }
        Ok(())
    }

    fn apply_config(&self, config: &serde_json::Value) -> Result<()> {
        *self.settings.write() = serde_json::from_value(config.clone())?;
        Ok(())
    }
}
