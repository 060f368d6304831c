//! Per-plugin lifecycle state machine

use std::sync::Arc;

use anyhow::{bail, Result};

use super::{Plugin, PluginInfo, PluginState};
use crate::capability::MainFrame;

/// One registered plugin and where it is in its lifecycle.
pub struct PluginHandle {
    pub info: PluginInfo,
    state: PluginState,
    plugin: Box<dyn Plugin>,
    /// `init` runs on the first enable only.
    initialized: bool,
}

impl PluginHandle {
    pub fn new(plugin: Box<dyn Plugin>) -> Self {
        Self {
            info: plugin.info(),
            state: PluginState::Unloaded,
            plugin,
            initialized: false,
        }
    }

    pub fn state(&self) -> PluginState {
        self.state
    }

    fn expect(&self, allowed: &[PluginState]) -> Result<()> {
        if !allowed.contains(&self.state) {
            bail!(
                "Plugin '{}' is {}, expected one of {:?}",
                self.info.name,
                self.state,
                allowed
            );
        }
        Ok(())
    }

    /// Run a hook; success moves to `next`, failure marks the plugin failed.
    fn run_hook(&mut self, what: &str, next: PluginState, hook: impl FnOnce(&dyn Plugin) -> Result<()>) -> Result<()> {
        match hook(self.plugin.as_ref()) {
            Ok(()) => {
                self.set_state(next)?;
                tracing::info!("{} plugin: {} v{}", what, self.info.name, self.info.version);
                Ok(())
            }
            Err(e) => {
                self.set_state(PluginState::Failed)?;
                bail!("Plugin '{}' failed to {}: {}", self.info.name, what.to_lowercase(), e)
            }
        }
    }

    pub fn load(&mut self) -> Result<()> {
        self.expect(&[PluginState::Unloaded])?;
        self.run_hook("Load", PluginState::Loaded, |p| p.on_load())
    }

    /// Enable the plugin, handing it `frame` through `init` the first time.
    pub fn enable(&mut self, frame: &Arc<dyn MainFrame>) -> Result<()> {
        self.expect(&[PluginState::Loaded, PluginState::Disabled])?;

        if !self.initialized {
            let frame = Arc::clone(frame);
            self.run_hook("Initialize", self.state, move |p| p.init(frame))?;
            self.initialized = true;
        }
        self.run_hook("Enable", PluginState::Enabled, |p| p.on_enable())
    }

    /// Registrations made in `init` stay in place; the plugin's own
    /// `on_disable` decides what to revoke.
    pub fn disable(&mut self) -> Result<()> {
        self.expect(&[PluginState::Enabled])?;
        self.run_hook("Disable", PluginState::Disabled, |p| p.on_disable())
    }

    pub fn shutdown(&mut self) -> Result<()> {
        self.plugin
            .on_shutdown()
            .map_err(|e| anyhow::anyhow!("Plugin '{}' shutdown failed: {}", self.info.name, e))
    }

    fn set_state(&mut self, next: PluginState) -> Result<()> {
        if next == self.state {
            return Ok(());
        }
        if !self.state.can_transition_to(next) {
            bail!("Plugin '{}' cannot go from {} to {}", self.info.name, self.state, next);
        }
        tracing::debug!("Plugin {} state: {} -> {}", self.info.name, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Validate and apply the plugin's component settings.
    pub fn set_config(&mut self, config: serde_json::Value) -> Result<()> {
        self.plugin.validate_config(&config)?;
        self.plugin.apply_config(&config)
    }
}
