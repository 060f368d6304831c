//! Plugin host
//!
//! Plugins are registered with a [`PluginRegistry`], loaded in dependency
//! order and handed the framework's capability surface when first enabled.

#[allow(clippy::module_inception)]
pub mod plugin;
pub mod registry;
pub mod lifecycle;

pub use plugin::{Plugin, PluginInfo, PluginDependency, PluginState};
pub use registry::{PluginRegistry, PluginRegistryStats};
pub use lifecycle::PluginHandle;
