//! Tether Plugins
//!
//! Built-in plugins shipped with the framework: a help menu, a join greeter
//! and a security alert relay. Each one only talks to the framework through
//! the `MainFrame` it receives in `init`.

pub mod alert_relay;
pub mod help;
pub mod join_greeter;

#[cfg(test)]
mod testing;

// Re-export core plugin types for convenience
pub use tether::plugin::{Plugin, PluginDependency, PluginInfo, PluginState};

pub use alert_relay::{AlertRelayPlugin, RelaySettings};
pub use help::{HelpPlugin, HelpSettings};
pub use join_greeter::{GreeterSettings, JoinGreeterPlugin};

/// Every built-in plugin with default settings.
pub fn builtin() -> Vec<Box<dyn Plugin>> {
    vec![
        Box::new(HelpPlugin::new()),
        Box::new(JoinGreeterPlugin::new()),
        Box::new(AlertRelayPlugin::new()),
    ]
}
