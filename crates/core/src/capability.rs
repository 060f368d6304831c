//! The capability surface handed to plugins.
//!
//! Each capability is its own trait; [`MainFrame`] is their union. Plugins
//! receive an `Arc<dyn MainFrame>` and never see the concrete framework.

use std::path::PathBuf;
use std::sync::Arc;

use proto::uuid::Uuid;
use proto::Packet;
use serde::de::DeserializeOwned;
use serde::Serialize;
use store::NoSqlDb;

use crate::chat::ChatCallback;
use crate::config::ComponentConfig;
use crate::context::ContextStore;
use crate::control::ResponseCallback;
use crate::error::FrameworkResult;
use crate::handler::HandlerId;
use crate::identity::IdentityStore;
use crate::kit::PlayerKit;
use crate::listener::{NameCallback, PacketCallback, PlayerCallback};
use crate::logger::LineDst;
use crate::menu::{BackendCallback, BackendMenuEntry, GameMenuEntry};
use crate::security::AlertHandler;

/// Shared session state and the cross-plugin context map.
pub trait ContextProvider {
    fn get_context(&self) -> &ContextStore;

    fn get_uq_holder(&self) -> &IdentityStore;
}

pub trait ConfigProvider {
    fn query_config(&self, name: &str) -> Option<ComponentConfig>;

    fn get_all_configs(&self) -> Vec<ComponentConfig>;

    /// Set one key in another component's exposed settings.
    fn update_config(&self, name: &str, key: &str, value: serde_json::Value) -> FrameworkResult<()>;
}

/// Per-topic storage. Topics are shared, not sandboxed.
pub trait StorageAndLogProvider {
    fn get_logger(&self, topic: &str) -> FrameworkResult<Arc<dyn LineDst>>;

    fn get_nosql_db(&self, topic: &str) -> FrameworkResult<Arc<dyn NoSqlDb>>;

    /// `data/<sanitized topic>`, relative to the storage root.
    fn get_relative_file_name(&self, topic: &str) -> FrameworkResult<PathBuf>;

    /// Missing files read as empty.
    fn get_file_data(&self, topic: &str) -> FrameworkResult<Vec<u8>>;

    /// Missing or empty files read as `None`.
    fn get_json_data(&self, topic: &str) -> FrameworkResult<Option<serde_json::Value>>;

    fn write_file_data(&self, topic: &str, data: &[u8]) -> FrameworkResult<()>;

    fn write_json_data(&self, topic: &str, data: &serde_json::Value) -> FrameworkResult<()>;
}

/// Typed JSON helpers on top of [`StorageAndLogProvider`].
pub trait StorageExt: StorageAndLogProvider {
    fn read_json<T: DeserializeOwned>(&self, topic: &str) -> FrameworkResult<Option<T>> {
        match self.get_json_data(topic)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    fn write_json<T: Serialize>(&self, topic: &str, data: &T) -> FrameworkResult<()> {
        let value = serde_json::to_value(data)?;
        self.write_json_data(topic, &value)
    }
}

impl<S: StorageAndLogProvider + ?Sized> StorageExt for S {}

pub trait BackendInteract {
    fn get_backend_display(&self) -> Arc<dyn LineDst>;

    fn set_backend_menu_entry(&self, entry: BackendMenuEntry) -> FrameworkResult<HandlerId>;

    /// Interceptors see every console line before the menu; returning `true`
    /// consumes it.
    fn set_backend_cmd_interceptor(&self, cb: Box<BackendCallback>) -> FrameworkResult<HandlerId>;

    /// One usage line per backend menu entry, in registration order.
    fn backend_menu_usage(&self) -> Vec<String>;
}

pub trait SecurityEventIo {
    fn red_alert(&self, info: &str);

    fn reg_on_alert_handler(&self, cb: Box<AlertHandler>) -> FrameworkResult<HandlerId>;
}

/// Outbound game actions. Sends are fire-and-forget: `Ok` means accepted
/// for transmission.
pub trait GameControl {
    fn say_to(&self, target: &str, msg: &str) -> FrameworkResult<()>;

    fn action_bar_to(&self, target: &str, msg: &str) -> FrameworkResult<()>;

    fn title_to(&self, target: &str, msg: &str) -> FrameworkResult<()>;

    fn sub_title_to(&self, target: &str, msg: &str) -> FrameworkResult<()>;

    fn send_cmd(&self, cmd: &str) -> FrameworkResult<()>;

    /// `cb` runs exactly once: with the output, or with `None` if the send
    /// fails or the connection drops first.
    fn send_cmd_and_invoke_on_response(&self, cmd: &str, cb: ResponseCallback) -> FrameworkResult<()>;

    fn send_mc_packet(&self, packet: Packet) -> FrameworkResult<()>;

    fn get_player_kit(&self, name: &str) -> Option<PlayerKit>;

    fn get_player_kit_by_uuid(&self, uuid: Uuid) -> Option<PlayerKit>;

    /// Bind the named player's chat claim slot, replacing any earlier binding.
    fn set_on_param_msg(&self, name: &str, cb: Box<ChatCallback>) -> FrameworkResult<()>;
}

/// Inbound subscriptions.
pub trait GameListener {
    fn set_on_any_packet_callback(&self, cb: Box<PacketCallback>) -> FrameworkResult<HandlerId>;

    fn set_on_typed_packet_callback(&self, packet_id: u32, cb: Box<PacketCallback>) -> FrameworkResult<HandlerId>;

    fn set_game_menu_entry(&self, entry: GameMenuEntry) -> FrameworkResult<HandlerId>;

    fn game_menu_usage(&self) -> Vec<String>;

    fn set_game_chat_interceptor(&self, cb: Box<ChatCallback>) -> FrameworkResult<HandlerId>;

    fn append_on_first_see_player_callback(&self, cb: Box<NameCallback>) -> FrameworkResult<HandlerId>;

    fn append_login_info_callback(&self, cb: Box<PlayerCallback>) -> FrameworkResult<HandlerId>;

    fn append_logout_info_callback(&self, cb: Box<PlayerCallback>) -> FrameworkResult<HandlerId>;
}

/// Everything a plugin can reach.
pub trait MainFrame:
    ContextProvider + ConfigProvider + StorageAndLogProvider + BackendInteract + SecurityEventIo + Send + Sync
{
    /// Report an unrecoverable condition. The framework tears down and stops
    /// serving further calls.
    fn fatal_error(&self, err: &str);

    fn get_game_control(&self) -> &dyn GameControl;

    fn get_game_listener(&self) -> &dyn GameListener;

    /// Remove a registration made through any capability.
    fn revoke(&self, id: HandlerId) -> bool;
}
