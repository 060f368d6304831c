//! Tether: capability mediator for a Bedrock game-client agent
//!
//! Plugins are handed one `Arc<dyn MainFrame>` and reach every shared
//! facility through it: outbound game actions, inbound event subscription,
//! per-topic storage and logs, cross-plugin configuration and security
//! alerts. The transport, codec and presentation layers sit behind the
//! [`PacketSink`] and [`LineDst`] seams.

#![warn(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::unwrap_used,
    clippy::str_to_string,
    clippy::clone_on_ref_ptr,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::inefficient_to_string,
    clippy::manual_let_else,
    clippy::redundant_closure_for_method_calls,
    clippy::trivially_copy_pass_by_ref,
    clippy::unused_self
)]

pub mod backend;
pub mod capability;
pub mod chat;
pub mod config;
pub mod context;
pub mod control;
pub mod error;
pub mod framework;
pub mod handler;
pub mod identity;
pub mod kit;
pub mod listener;
pub mod logger;
pub mod menu;
pub mod plugin;
pub mod security;
pub mod storage;
pub mod telemetry;
pub mod transport;

pub use proto;
pub use store;

pub use backend::BackendOutcome;
pub use capability::{
    BackendInteract, ConfigProvider, ContextProvider, GameControl, GameListener, MainFrame, SecurityEventIo,
    StorageAndLogProvider, StorageExt,
};
pub use chat::{ChatCallback, GameChat};
pub use config::{ComponentConfig, ConfigError, FrameworkConfig, LoggingConfig, StorageSettings};
pub use context::{ContextError, ContextKind, ContextStore, ContextValue};
pub use control::{ResponseCallback, TitleSlot};
pub use error::{FrameworkError, FrameworkResult};
pub use framework::{Framework, FrameworkBuilder, FIRST_SEEN_TOPIC};
pub use handler::HandlerId;
pub use identity::{IdentityStore, PlayerInfo, SelfInfo};
pub use kit::PlayerKit;
pub use listener::{ChatOutcome, NameCallback, PacketCallback, PlayerCallback};
pub use logger::{FileLineSink, LineDst, TracingDisplay};
pub use menu::{BackendCallback, BackendMenuEntry, GameMenuEntry, MenuEntry, MenuOutcome};
pub use plugin::{Plugin, PluginDependency, PluginInfo, PluginState};
pub use security::AlertHandler;
pub use transport::{InboundEvent, PacketSink, TransportError};
