//! Plugin registry for managing loaded plugins

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;

use super::{Plugin, PluginHandle, PluginState};
use crate::capability::MainFrame;

/// Plugin registry that manages all loaded plugins
pub struct PluginRegistry {
    plugins: HashMap<String, PluginHandle>,
    /// Registration order; ties in dependency order fall back to it
    registered: Vec<String>,
    /// Plugin load order for dependency resolution
    load_order: Vec<String>,
    enabled_plugins: HashSet<String>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
            registered: Vec::new(),
            load_order: Vec::new(),
            enabled_plugins: HashSet::new(),
        }
    }

    pub fn register<P: Plugin + 'static>(&mut self, plugin: P) -> Result<()> {
        self.register_boxed(Box::new(plugin))
    }

    pub fn register_boxed(&mut self, plugin: Box<dyn Plugin>) -> Result<()> {
        let handle = PluginHandle::new(plugin);
        let name = handle.info.name.clone();

        if self.plugins.contains_key(&name) {
            return Err(anyhow::anyhow!("Plugin '{}' already registered", name));
        }

        tracing::debug!("Registered plugin: {} v{}", name, handle.info.version);
        self.registered.push(name.clone());
        self.plugins.insert(name, handle);

        Ok(())
    }

    fn load_plugin(&mut self, name: &str) -> Result<()> {
        self.check_dependencies(name)?;

        let plugin = self
            .plugins
            .get_mut(name)
            .ok_or_else(|| anyhow::anyhow!("Plugin '{}' not found", name))?;

        plugin.load()?;

        if !self.load_order.iter().any(|n| n == name) {
            self.load_order.push(name.to_string());
        }

        Ok(())
    }

    pub fn enable_plugin(&mut self, name: &str, frame: &Arc<dyn MainFrame>) -> Result<()> {
        if let Some(plugin) = self.plugins.get(name) {
            if plugin.state() == PluginState::Unloaded {
                self.load_plugin(name)?;
            }
        }

        let plugin = self
            .plugins
            .get_mut(name)
            .ok_or_else(|| anyhow::anyhow!("Plugin '{}' not found", name))?;

        plugin.enable(frame)?;
        self.enabled_plugins.insert(name.to_string());

        Ok(())
    }

    pub fn disable_plugin(&mut self, name: &str) -> Result<()> {
        let plugin = self
            .plugins
            .get_mut(name)
            .ok_or_else(|| anyhow::anyhow!("Plugin '{}' not found", name))?;

        plugin.disable()?;
        self.enabled_plugins.remove(name);

        Ok(())
    }

    pub fn get_plugin(&self, name: &str) -> Option<&PluginHandle> {
        self.plugins.get(name)
    }

    pub fn get_plugin_mut(&mut self, name: &str) -> Option<&mut PluginHandle> {
        self.plugins.get_mut(name)
    }

    /// Plugin names in registration order
    pub fn plugin_names(&self) -> &[String] {
        &self.registered
    }

    pub fn enabled_plugin_count(&self) -> usize {
        self.enabled_plugins.len()
    }

    /// Load all registered plugins in dependency order
    pub fn load_all(&mut self) -> Result<()> {
        let load_order = self.resolve_load_order()?;

        for name in load_order {
            if let Some(plugin) = self.plugins.get(&name) {
                if plugin.state() == PluginState::Unloaded {
                    self.load_plugin(&name)?;
                }
            }
        }

        Ok(())
    }

    /// Enable all loaded plugins in load order
    pub fn enable_all(&mut self, frame: &Arc<dyn MainFrame>) -> Result<()> {
        let names = self.load_order.clone();

        for name in names {
            if let Some(plugin) = self.plugins.get(&name) {
                if plugin.state() == PluginState::Loaded || plugin.state() == PluginState::Disabled {
                    self.enable_plugin(&name, frame)?;
                }
            }
        }

        Ok(())
    }

    /// Run every loaded plugin's shutdown hook, dependents first. Failures
    /// are logged and do not stop the others.
    pub fn shutdown_all(&mut self) {
        let mut order = self.load_order.clone();
        order.reverse();

        for name in order {
            if let Some(plugin) = self.plugins.get_mut(&name) {
                if let Err(e) = plugin.shutdown() {
                    tracing::error!("Failed to shutdown plugin {}: {}", name, e);
                }
            }
        }
    }

    fn check_dependencies(&self, plugin_name: &str) -> Result<()> {
        let plugin = self
            .plugins
            .get(plugin_name)
            .ok_or_else(|| anyhow::anyhow!("Plugin '{}' not found", plugin_name))?;

        for dep in &plugin.info.dependencies {
            if !dep.optional {
                let dep_plugin = self.plugins.get(&dep.name).ok_or_else(|| {
                    anyhow::anyhow!(
                        "Plugin '{}' depends on '{}' which is not registered",
                        plugin_name,
                        dep.name
                    )
                })?;

                if !dep.is_satisfied_by(&dep_plugin.info.version) {
                    return Err(anyhow::anyhow!(
                        "Plugin '{}' dependency '{}' version {} does not satisfy requirement {}",
                        plugin_name,
                        dep.name,
                        dep_plugin.info.version,
                        dep.version_req
                    ));
                }

                if !dep_plugin.state().is_loaded() {
                    return Err(anyhow::anyhow!(
                        "Plugin '{}' depends on '{}' which is not loaded",
                        plugin_name,
                        dep.name
                    ));
                }
            }
        }

        Ok(())
    }

    /// Resolve plugin load order based on dependencies
    fn resolve_load_order(&self) -> Result<Vec<String>> {
        let mut order = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut visiting: HashSet<String> = HashSet::new();

        for name in &self.registered {
            if !visited.contains(name) {
                self.visit_plugin(name, &mut order, &mut visited, &mut visiting)?;
            }
        }

        Ok(order)
    }

    /// Visit a plugin for dependency resolution (topological sort)
    fn visit_plugin(
        &self,
        name: &String,
        order: &mut Vec<String>,
        visited: &mut HashSet<String>,
        visiting: &mut HashSet<String>,
    ) -> Result<()> {
        if visiting.contains(name) {
            return Err(anyhow::anyhow!("Circular dependency detected involving plugin '{}'", name));
        }

        if visited.contains(name) {
            return Ok(());
        }

        visiting.insert(name.clone());

        if let Some(plugin) = self.plugins.get(name) {
            for dep in &plugin.info.dependencies {
                if self.plugins.contains_key(&dep.name) {
                    self.visit_plugin(&dep.name, order, visited, visiting)?;
                }
            }
        }

        visiting.remove(name);
        visited.insert(name.clone());
        order.push(name.clone());

        Ok(())
    }

    pub fn get_stats(&self) -> PluginRegistryStats {
        let mut stats = PluginRegistryStats {
            total_plugins: self.plugins.len(),
            enabled_plugins: self.enabled_plugins.len(),
            ..Default::default()
        };

        for plugin in self.plugins.values() {
            match plugin.state() {
                PluginState::Unloaded => stats.unloaded_plugins += 1,
                PluginState::Loaded => stats.loaded_plugins += 1,
                PluginState::Enabled => {}
                PluginState::Disabled => stats.disabled_plugins += 1,
                PluginState::Failed => stats.failed_plugins += 1,
            }
        }

        stats
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Plugin registry statistics
#[derive(Debug, Clone, Default)]
pub struct PluginRegistryStats {
    pub total_plugins: usize,
    pub enabled_plugins: usize,
    pub loaded_plugins: usize,
    pub disabled_plugins: usize,
    pub unloaded_plugins: usize,
    pub failed_plugins: usize,
}
