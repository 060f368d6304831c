//! Alert relay plugin: records every security alert to a log topic, echoes it
//! on the backend console and optionally forwards it in game. Operators can
//! raise alerts by hand with the `alert` console command.

use std::sync::{Arc, Weak};

use anyhow::Result;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tether::{BackendMenuEntry, MainFrame, MenuEntry, Plugin, PluginInfo};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    pub log_topic: String,
    /// Player name or selector that receives alerts in game.
    pub relay_target: Option<String>,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            log_topic: "security".to_string(),
            relay_target: None,
        }
    }
}

#[derive(Default)]
pub struct AlertRelayPlugin {
    settings: Arc<RwLock<RelaySettings>>,
    frame: Mutex<Option<Weak<dyn MainFrame>>>,
}

impl AlertRelayPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: RelaySettings) -> Self {
        Self {
            settings: Arc::new(RwLock::new(settings)),
            frame: Mutex::new(None),
        }
    }
}

impl Plugin for AlertRelayPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo::new("alert-relay", semver::Version::new(1, 0, 0))
            .with_description("Logs and forwards security alerts")
            .with_author("Tether Team")
    }

    fn init(&self, frame: Arc<dyn MainFrame>) -> Result<()> {
        // Fail early on a topic the storage layer rejects.
        frame.get_logger(&self.settings.read().log_topic)?;

        let weak: Weak<dyn MainFrame> = Arc::downgrade(&frame);
        *self.frame.lock() = Some(weak.clone());

        let relay_weak = weak.clone();
        let settings = Arc::clone(&self.settings);
        frame.reg_on_alert_handler(Box::new(move |info: &str| -> Result<()> {
            let Some(frame) = relay_weak.upgrade() else {
                return Ok(());
            };
            let settings = settings.read().clone();
            frame.get_logger(&settings.log_topic)?.write_line(info);
            frame.get_backend_display().write_line(&format!("[ALERT] {info}"));

            if let Some(target) = &settings.relay_target {
                frame.get_game_control().say_to(target, &format!("§c[ALERT]§r {info}"))?;
            }
            Ok(())
        }))?;

        frame.set_backend_menu_entry(BackendMenuEntry::new(
            MenuEntry::new(["alert"]).argument_hint("<message>").usage("raise a security alert"),
            move |args: &[String]| {
                let Some(frame) = weak.upgrade() else {
                    return false;
                };
                if args.is_empty() {
                    frame.get_backend_display().write_line("usage: alert <message>");
                } else {
                    frame.red_alert(&args.join(" "));
                }
                true
            },
        ))?;

        Ok(())
    }

    fn on_shutdown(&self) -> Result<()> {
        let Some(frame) = self.frame.lock().as_ref().and_then(Weak::upgrade) else {
            return Ok(());
        };
        frame.get_logger(&self.settings.read().log_topic)?.flush()?;
        Ok(())
    }

    fn validate_config(&self, config: &serde_json::Value) -> Result<()> {
        let settings: RelaySettings = serde_json::from_value(config.clone())?;
        if settings.log_topic.trim().is_empty() {
            anyhow::bail!("alert-relay log_topic must not be empty");
        }
        Ok(())
    }

    fn apply_config(&self, config: &serde_json::Value) -> Result<()> {
        *self.settings.write() = serde_json::from_value(config.clone())?;
        Ok(())
    }
}
