//! Join greeter plugin
//!
//! Greets players as they join, announces names never seen before and lets
//! each player record a personal greeting through the `greeting set` menu.
//! Visit counts and personal greetings live in the player's persisted storage.

use std::sync::{Arc, Weak};

use anyhow::Result;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tether::proto::PlayerListEntry;
use tether::{GameChat, GameMenuEntry, MainFrame, MenuEntry, PlayerKit, Plugin, PluginInfo};

const VISITS_KEY: &str = "visits";
const GREETING_KEY: &str = "greeting";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GreeterSettings {
    /// Candidates for the join greeting; `{name}` and `{visits}` are filled in.
    pub greetings: Vec<String>,
    /// Broadcast to everyone the first time a name is seen.
    pub first_visit: String,
    pub title_on_join: bool,
}

impl Default for GreeterSettings {
    fn default() -> Self {
        Self {
            greetings: vec![
                "Welcome back, {name}!".to_string(),
                "Good to see you, {name}. Visit number {visits}.".to_string(),
            ],
            first_visit: "Everyone welcome {name}, here for the first time!".to_string(),
            title_on_join: false,
        }
    }
}

fn render(template: &str, name: &str, visits: u64) -> String {
    template.replace("{name}", name).replace("{visits}", &visits.to_string())
}

#[derive(Default)]
pub struct JoinGreeterPlugin {
    settings: Arc<RwLock<GreeterSettings>>,
}

impl JoinGreeterPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: GreeterSettings) -> Self {
        Self {
            settings: Arc::new(RwLock::new(settings)),
        }
    }
}

/// Bump the visit counter and pick the greeting for this join.
fn greet(kit: &PlayerKit, settings: &GreeterSettings) -> Result<()> {
    let visits = kit.persist_storage(VISITS_KEY)?.parse::<u64>().unwrap_or(0) + 1;
    kit.commit_persist_storage(VISITS_KEY, &visits.to_string())?;

    let personal = kit.persist_storage(GREETING_KEY)?;
    let template = if !personal.is_empty() {
        personal
    } else if settings.greetings.is_empty() {
        return Ok(());
    } else {
        settings.greetings[fastrand::usize(..settings.greetings.len())].clone()
    };

    let message = render(&template, kit.name(), visits);
    kit.say(&message)?;
    if settings.title_on_join {
        kit.title(&message)?;
    }
    Ok(())
}

impl Plugin for JoinGreeterPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo::new("join-greeter", semver::Version::new(1, 0, 0))
            .with_description("Greets joining players and remembers their visits")
            .with_author("Tether Team")
    }

    fn init(&self, frame: Arc<dyn MainFrame>) -> Result<()> {
        let weak: Weak<dyn MainFrame> = Arc::downgrade(&frame);
        let listener = frame.get_game_listener();

        let login_weak = weak.clone();
        let settings = Arc::clone(&self.settings);
        listener.append_login_info_callback(Box::new(move |entry: &PlayerListEntry| {
            let Some(frame) = login_weak.upgrade() else {
                return;
            };
            let Some(kit) = frame.get_game_control().get_player_kit(&entry.username) else {
                return;
            };
            if let Err(e) = greet(&kit, &settings.read()) {
                tracing::warn!("Could not greet {}: {}", entry.username, e);
            }
        }))?;

        let seen_weak = weak.clone();
        let settings = Arc::clone(&self.settings);
        listener.append_on_first_see_player_callback(Box::new(move |name: &str| {
            let Some(frame) = seen_weak.upgrade() else {
                return;
            };
            let message = render(&settings.read().first_visit, name, 1);
            if let Err(e) = frame.get_game_control().say_to("@a", &message) {
                tracing::warn!("First-visit announcement for {} failed: {}", name, e);
            }
        }))?;

        listener.set_game_menu_entry(GameMenuEntry::new(
            MenuEntry::new(["greeting set"]).usage("record your own join greeting"),
            move |chat: &GameChat| {
                let Some(frame) = weak.upgrade() else {
                    return false;
                };
                let Some(kit) = frame.get_game_control().get_player_kit(&chat.name) else {
                    return false;
                };
                let reply = kit.clone();
                let bound = kit.set_on_param_msg(move |answer: &GameChat| {
                    let greeting = answer.line();
                    match reply.commit_persist_storage(GREETING_KEY, &greeting) {
                        Ok(()) => {
                            let _ = reply.say("Greeting saved.");
                        }
                        Err(e) => tracing::error!("Saving greeting for {} failed: {}", reply.name(), e),
                    }
                    true
                });
                match bound {
                    Ok(()) => {
                        let _ = kit.say("Type your greeting; {name} and {visits} are filled in.");
                    }
                    Err(e) => tracing::warn!("Could not prompt {}: {}", chat.name, e),
                }
                true
            },
        ))?;

        Ok(())
    }

    fn validate_config(&self, config: &serde_json::Value) -> Result<()> {
        serde_json::from_value::<GreeterSettings>(config.clone())?;
        Ok(())
    }

    fn apply_config(&self, config: &serde_json::Value) -> Result<()> {
        *self.settings.write() = serde_json::from_value(config.clone())?;
        Ok(())
    }
}
