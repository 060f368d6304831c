//! Core plugin trait and types

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::capability::MainFrame;

/// Core trait that all plugins must implement
pub trait Plugin: Send + Sync {
    /// Get plugin information and metadata
    fn info(&self) -> PluginInfo;

    /// Wire the plugin into the framework.
    ///
    /// Called once, on first enable. Register menu entries, interceptors and
    /// callbacks here, and keep `frame` if later calls need it.
    fn init(&self, frame: Arc<dyn MainFrame>) -> Result<()>;

    /// Called when the plugin is loaded, before `init`.
    fn on_load(&self) -> Result<()> {
        Ok(())
    }

    fn on_enable(&self) -> Result<()> {
        Ok(())
    }

    fn on_disable(&self) -> Result<()> {
        Ok(())
    }

    /// Called during framework teardown for final cleanup.
    fn on_shutdown(&self) -> Result<()> {
        Ok(())
    }

    /// Validate the `configs` table of this plugin's component entry.
    fn validate_config(&self, _config: &serde_json::Value) -> Result<()> {
        Ok(())
    }

    fn apply_config(&self, _config: &serde_json::Value) -> Result<()> {
        Ok(())
    }
}

/// Plugin information and metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Plugin name (must be unique); also the component name for configuration
    pub name: String,
    pub version: semver::Version,
    pub description: String,
    pub author: String,
    pub dependencies: Vec<PluginDependency>,
}

impl PluginInfo {
    pub fn new(name: impl Into<String>, version: semver::Version) -> Self {
        Self {
            name: name.into(),
            version,
            description: String::new(),
            author: String::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_dependency(mut self, dependency: PluginDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }
}

/// Plugin dependency specification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginDependency {
    pub name: String,
    pub version_req: semver::VersionReq,
    /// Optional dependencies only influence load order when present
    pub optional: bool,
}

impl PluginDependency {
    pub fn new(name: impl Into<String>, version_req: semver::VersionReq) -> Self {
        Self {
            name: name.into(),
            version_req,
            optional: false,
        }
    }

    pub fn optional(name: impl Into<String>, version_req: semver::VersionReq) -> Self {
        Self {
            name: name.into(),
            version_req,
            optional: true,
        }
    }

    pub fn is_satisfied_by(&self, version: &semver::Version) -> bool {
        self.version_req.matches(version)
    }
}

/// Plugin state in the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PluginState {
    Unloaded,
    Loaded,
    Enabled,
    Disabled,
    Failed,
}

impl PluginState {
    /// Any state except unloaded
    pub fn is_loaded(self) -> bool {
        !matches!(self, Self::Unloaded)
    }

    /// Plugins are never unloaded once installed, and a failed plugin stays
    /// failed until the framework is rebuilt.
    pub fn can_transition_to(self, target: PluginState) -> bool {
        matches!(
            (self, target),
            (Self::Unloaded, Self::Loaded)
                | (Self::Loaded | Self::Disabled, Self::Enabled)
                | (Self::Enabled, Self::Disabled)
                | (Self::Unloaded | Self::Loaded | Self::Enabled | Self::Disabled, Self::Failed)
        )
    }
}

impl std::fmt::Display for PluginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}
