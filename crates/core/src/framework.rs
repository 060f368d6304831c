//! The capability mediator.
//!
//! [`Framework`] owns every component, implements each capability trait by
//! delegating to them, and runs the single inbound event loop. Build one with
//! [`Framework::builder`], hand it to plugins with
//! [`Framework::install_plugins`], then drive it with [`Framework::serve`].

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use proto::uuid::Uuid;
use proto::{CommandOutput, Packet, PlayerList, PlayerListAction};
use store::{NoSqlDb, StorageEngine};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::backend::{Backend, BackendOutcome};
use crate::capability::{
    BackendInteract, ConfigProvider, ContextProvider, GameControl, GameListener, MainFrame, SecurityEventIo,
    StorageAndLogProvider,
};
use crate::chat::{ChatCallback, GameChat};
use crate::config::{ComponentConfig, ConfigMediator, FrameworkConfig};
use crate::context::ContextStore;
use crate::control::{GameController, ResponseCallback, TitleSlot};
use crate::error::{FrameworkError, FrameworkResult};
use crate::handler::HandlerId;
use crate::identity::IdentityStore;
use crate::kit::PlayerKit;
use crate::listener::{EventHub, NameCallback, PacketCallback, PlayerCallback};
use crate::logger::{LineDst, TracingDisplay};
use crate::menu::{BackendCallback, BackendMenuEntry, GameMenuEntry, MenuRegistry};
use crate::plugin::{Plugin, PluginRegistry, PluginRegistryStats, PluginState};
use crate::security::{AlertHandler, SecurityBus};
use crate::storage::StorageProvider;
use crate::transport::{InboundEvent, PacketSink};

/// Storage topic recording when each player name was first seen.
pub const FIRST_SEEN_TOPIC: &str = "framework/first-seen";

/// Builder for [`Framework`]. Only the packet sink is required.
pub struct FrameworkBuilder {
    config: FrameworkConfig,
    sink: Option<Arc<dyn PacketSink>>,
    engine: Option<Box<dyn StorageEngine>>,
    display: Option<Arc<dyn LineDst>>,
}

impl FrameworkBuilder {
    pub fn config(mut self, config: FrameworkConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn PacketSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Override the engine selected by the storage settings.
    pub fn engine(mut self, engine: impl StorageEngine + 'static) -> Self {
        self.engine = Some(Box::new(engine));
        self
    }

    /// Backend display; defaults to [`TracingDisplay`].
    pub fn display(mut self, display: Arc<dyn LineDst>) -> Self {
        self.display = Some(display);
        self
    }

    pub fn build(self) -> FrameworkResult<Arc<Framework>> {
        self.config.validate()?;
        let sink = self.sink.ok_or(FrameworkError::MissingCollaborator("packet sink"))?;

        let storage = Arc::new(match self.engine {
            Some(engine) => StorageProvider::new(
                self.config.storage.root.clone(),
                self.config.storage.resolved_log_dir(),
                engine,
            ),
            None => StorageProvider::from_settings(&self.config.storage),
        });
        let display = self.display.unwrap_or_else(|| Arc::new(TracingDisplay));
        let identity = Arc::new(IdentityStore::new());
        let menu = Arc::new(MenuRegistry::new());
        let terminated = Arc::new(AtomicBool::new(false));

        tracing::info!(
            "Building framework '{}' with storage at {}",
            self.config.agent.name,
            storage.root().display()
        );

        Ok(Arc::new(Framework {
            configs: ConfigMediator::new(self.config.components.clone()),
            context: ContextStore::new(),
            listener: EventHub::new(Arc::clone(&identity), Arc::clone(&menu)),
            backend: Backend::new(display, Arc::clone(&menu)),
            security: SecurityBus::new(),
            control: GameController::new(sink, Arc::clone(&terminated), Arc::clone(&identity), Arc::clone(&storage)),
            plugins: Mutex::new(PluginRegistry::new()),
            terminated,
            shutdown: CancellationToken::new(),
            config: self.config,
            identity,
            storage,
            menu,
        }))
    }
}

pub struct Framework {
    config: FrameworkConfig,
    context: ContextStore,
    identity: Arc<IdentityStore>,
    configs: ConfigMediator,
    storage: Arc<StorageProvider>,
    menu: Arc<MenuRegistry>,
    listener: EventHub,
    backend: Backend,
    security: SecurityBus,
    control: GameController,
    plugins: Mutex<PluginRegistry>,
    terminated: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl Framework {
    pub fn builder() -> FrameworkBuilder {
        FrameworkBuilder {
            config: FrameworkConfig::default(),
            sink: None,
            engine: None,
            display: None,
        }
    }

    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    pub fn storage(&self) -> &StorageProvider {
        &self.storage
    }

    pub fn controller(&self) -> &GameController {
        &self.control
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Fires when the framework begins tearing down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    fn ensure_live(&self) -> FrameworkResult<()> {
        if self.is_terminated() {
            tracing::warn!("Rejected call on terminated framework");
            return Err(FrameworkError::Terminated);
        }
        Ok(())
    }

    /// Register, configure, load and enable `plugins`.
    ///
    /// Plugins whose component entry is marked disabled are skipped. A
    /// component's `configs` object is validated and applied before load.
    pub fn install_plugins(self: &Arc<Self>, plugins: Vec<Box<dyn Plugin>>) -> anyhow::Result<()> {
        self.ensure_live()?;
        let frame = Arc::clone(self) as Arc<dyn MainFrame>;
        let mut registry = self.plugins.lock();

        for plugin in plugins {
            let name = plugin.info().name;
            let component = self.configs.query(&name);
            if component.as_ref().is_some_and(|c| c.disabled) {
                tracing::info!("Skipping disabled plugin: {}", name);
                continue;
            }

            registry.register_boxed(plugin)?;
            if let (Some(component), Some(handle)) = (component, registry.get_plugin_mut(&name)) {
                handle.set_config(component.configs)?;
            }
        }

        registry.load_all()?;
        registry.enable_all(&frame)?;
        tracing::info!("{} plugin(s) enabled", registry.enabled_plugin_count());
        Ok(())
    }

    pub fn plugin_stats(&self) -> PluginRegistryStats {
        self.plugins.lock().get_stats()
    }

    /// Installed plugin names in registration order.
    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins.lock().plugin_names().to_vec()
    }

    pub fn plugin_state(&self, name: &str) -> Option<PluginState> {
        self.plugins.lock().get_plugin(name).map(|handle| handle.state())
    }

    /// Disable or re-enable an installed plugin. Registrations made in its
    /// `init` stay in place.
    pub fn set_plugin_enabled(self: &Arc<Self>, name: &str, enabled: bool) -> anyhow::Result<()> {
        self.ensure_live()?;
        let mut registry = self.plugins.lock();
        if enabled {
            let frame = Arc::clone(self) as Arc<dyn MainFrame>;
            registry.enable_plugin(name, &frame)
        } else {
            registry.disable_plugin(name)
        }
    }

    /// Consume inbound events until shutdown or until the transport hangs up.
    pub async fn serve(self: Arc<Self>, mut rx: mpsc::Receiver<InboundEvent>) {
        let token = self.shutdown.clone();
        tracing::info!("Inbound event loop started");

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::info!("Inbound event loop cancelled");
                    break;
                }
                event = rx.recv() => match event {
                    Some(event) => self.dispatch(event),
                    None => {
                        self.connection_lost("transport channel closed");
                        break;
                    }
                }
            }
        }

        tracing::info!("Inbound event loop stopped");
    }

    /// Route one inbound event. Events arriving after termination are dropped.
    pub fn dispatch(&self, event: InboundEvent) {
        if self.is_terminated() {
            return;
        }

        match event {
            InboundEvent::Identified(info) => {
                tracing::info!("Agent identified as {} ({})", info.name, info.uuid);
                self.identity.set_self(info);
            }
            InboundEvent::Packet(packet) => self.dispatch_packet(&packet),
            InboundEvent::ConnectionLost { reason } => self.connection_lost(&reason),
            InboundEvent::BackendLine(line) => {
                if let BackendOutcome::Menu(outcome) = self.backend.handle_line(&line) {
                    tracing::trace!("Backend line '{}' -> {:?}", line, outcome);
                }
            }
        }
    }

    fn dispatch_packet(&self, packet: &Packet) {
        if self.listener.dispatch_packet(packet) {
            tracing::trace!("{} stopped by a packet callback", packet.name());
        }

        match packet {
            Packet::Text(text) if text.text_type.is_player_message() => {
                let chat = GameChat::from_text_packet(text);
                if chat.name.is_empty() || self.identity.is_self(&chat.name) {
                    return;
                }
                let outcome = self.listener.dispatch_chat(&chat);
                tracing::trace!("Chat from {} -> {:?}", chat.name, outcome);
            }
            Packet::CommandOutput(output) => {
                self.control.resolve(output.clone());
            }
            Packet::PlayerList(list) => self.apply_player_list(list),
            _ => {}
        }
    }

    fn apply_player_list(&self, list: &PlayerList) {
        match list.action {
            PlayerListAction::Add => {
                for entry in &list.entries {
                    let (info, newly_online) = self.identity.add_player(entry);
                    if !newly_online {
                        continue;
                    }
                    tracing::info!("Player joined: {}", info.name);
                    self.listener.fire_login(entry);
                    self.note_first_seen(&info.name);
                }
            }
            PlayerListAction::Remove => {
                for entry in &list.entries {
                    if let Some(info) = self.identity.remove_player(entry.uuid) {
                        tracing::info!("Player left: {}", info.name);
                        self.listener.fire_logout(&info.to_entry());
                    }
                }
            }
        }
    }

    fn note_first_seen(&self, name: &str) {
        let db = match self.storage.get_nosql_db(FIRST_SEEN_TOPIC) {
            Ok(db) => db,
            Err(e) => {
                tracing::error!("First-seen table unavailable: {}", e);
                return;
            }
        };
        if !db.get(name).is_empty() {
            return;
        }
        db.commit(name, &Utc::now().to_rfc3339());
        self.listener.fire_first_seen(name);
    }

    fn connection_lost(&self, reason: &str) {
        tracing::warn!("Connection lost: {}", reason);
        let failed = self.control.pending().fail_all();
        if failed > 0 {
            tracing::debug!("Resolved {} pending command(s) with no output", failed);
        }
        for info in self.identity.clear() {
            self.listener.fire_logout(&info.to_entry());
        }
    }

    /// Await one command's output; yields `None` if it never arrives.
    pub fn send_cmd_and_wait(&self, cmd: &str) -> oneshot::Receiver<Option<CommandOutput>> {
        if self.is_terminated() {
            let (tx, rx) = oneshot::channel();
            let _ = tx.send(None);
            return rx;
        }
        self.control.send_cmd_and_wait(cmd)
    }

    /// Orderly stop. Runs teardown once; later calls do nothing.
    pub fn shutdown(&self, reason: &str) {
        self.teardown(reason);
    }

    fn teardown(&self, reason: &str) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("Tearing down: {}", reason);
        self.shutdown.cancel();
        self.storage.seal();

        // Plugin init may itself end up here while the registry is locked.
        match self.plugins.try_lock() {
            Some(mut registry) => registry.shutdown_all(),
            None => tracing::warn!("Plugin registry busy, skipping plugin shutdown hooks"),
        }

        self.security.red_alert(&format!("shutdown: {reason}"));

        let failed = self.control.pending().fail_all();
        if failed > 0 {
            tracing::debug!("Resolved {} pending command(s) during teardown", failed);
        }
        let dropped = self.identity.clear();
        if !dropped.is_empty() {
            tracing::debug!("Dropped {} online player(s) during teardown", dropped.len());
        }

        if let Err(e) = self.storage.flush() {
            tracing::error!("Storage flush failed during teardown: {}", e);
        }
    }
}

impl ContextProvider for Framework {
    fn get_context(&self) -> &ContextStore {
        &self.context
    }

    fn get_uq_holder(&self) -> &IdentityStore {
        &self.identity
    }
}

impl ConfigProvider for Framework {
    fn query_config(&self, name: &str) -> Option<ComponentConfig> {
        self.configs.query(name)
    }

    fn get_all_configs(&self) -> Vec<ComponentConfig> {
        self.configs.all()
    }

    fn update_config(&self, name: &str, key: &str, value: serde_json::Value) -> FrameworkResult<()> {
        self.ensure_live()?;
        self.configs.update_value(name, key, value)?;
        Ok(())
    }
}

impl StorageAndLogProvider for Framework {
    fn get_logger(&self, topic: &str) -> FrameworkResult<Arc<dyn LineDst>> {
        Ok(self.storage.get_logger(topic)?)
    }

    fn get_nosql_db(&self, topic: &str) -> FrameworkResult<Arc<dyn NoSqlDb>> {
        Ok(self.storage.get_nosql_db(topic)?)
    }

    fn get_relative_file_name(&self, topic: &str) -> FrameworkResult<PathBuf> {
        Ok(self.storage.get_relative_file_name(topic)?)
    }

    fn get_file_data(&self, topic: &str) -> FrameworkResult<Vec<u8>> {
        Ok(self.storage.get_file_data(topic)?)
    }

    fn get_json_data(&self, topic: &str) -> FrameworkResult<Option<serde_json::Value>> {
        Ok(self.storage.get_json_data(topic)?)
    }

    fn write_file_data(&self, topic: &str, data: &[u8]) -> FrameworkResult<()> {
        self.ensure_live()?;
        Ok(self.storage.write_file_data(topic, data)?)
    }

    fn write_json_data(&self, topic: &str, data: &serde_json::Value) -> FrameworkResult<()> {
        self.ensure_live()?;
        Ok(self.storage.write_json_data(topic, data)?)
    }
}

impl BackendInteract for Framework {
    fn get_backend_display(&self) -> Arc<dyn LineDst> {
        self.backend.display()
    }

    fn set_backend_menu_entry(&self, entry: BackendMenuEntry) -> FrameworkResult<HandlerId> {
        self.ensure_live()?;
        Ok(self.backend.add_menu_entry(entry))
    }

    fn set_backend_cmd_interceptor(&self, cb: Box<BackendCallback>) -> FrameworkResult<HandlerId> {
        self.ensure_live()?;
        Ok(self.backend.add_interceptor(cb))
    }

    fn backend_menu_usage(&self) -> Vec<String> {
        self.menu.backend_usage()
    }
}

impl SecurityEventIo for Framework {
    fn red_alert(&self, info: &str) {
        if self.is_terminated() {
            tracing::warn!("Dropped alert after termination: {}", info);
            return;
        }
        self.security.red_alert(info);
    }

    fn reg_on_alert_handler(&self, cb: Box<AlertHandler>) -> FrameworkResult<HandlerId> {
        self.ensure_live()?;
        Ok(self.security.register(cb))
    }
}

impl GameControl for Framework {
    fn say_to(&self, target: &str, msg: &str) -> FrameworkResult<()> {
        self.ensure_live()?;
        self.control.outbound().say_to(target, msg)
    }

    fn action_bar_to(&self, target: &str, msg: &str) -> FrameworkResult<()> {
        self.ensure_live()?;
        self.control.outbound().title_to(target, TitleSlot::ActionBar, msg)
    }

    fn title_to(&self, target: &str, msg: &str) -> FrameworkResult<()> {
        self.ensure_live()?;
        self.control.outbound().title_to(target, TitleSlot::Title, msg)
    }

    fn sub_title_to(&self, target: &str, msg: &str) -> FrameworkResult<()> {
        self.ensure_live()?;
        self.control.outbound().title_to(target, TitleSlot::Subtitle, msg)
    }

    fn send_cmd(&self, cmd: &str) -> FrameworkResult<()> {
        self.ensure_live()?;
        self.control.outbound().send_cmd(cmd)
    }

    fn send_cmd_and_invoke_on_response(&self, cmd: &str, cb: ResponseCallback) -> FrameworkResult<()> {
        if let Err(e) = self.ensure_live() {
            cb(None);
            return Err(e);
        }
        self.control.send_cmd_and_invoke_on_response(cmd, cb).map(|_: Uuid| ())
    }

    fn send_mc_packet(&self, packet: Packet) -> FrameworkResult<()> {
        self.ensure_live()?;
        self.control.outbound().send_packet(packet)
    }

    fn get_player_kit(&self, name: &str) -> Option<PlayerKit> {
        self.control.player_kit(name)
    }

    fn get_player_kit_by_uuid(&self, uuid: Uuid) -> Option<PlayerKit> {
        self.control.player_kit_by_uuid(uuid)
    }

    fn set_on_param_msg(&self, name: &str, cb: Box<ChatCallback>) -> FrameworkResult<()> {
        self.ensure_live()?;
        self.control.set_on_param_msg(name, cb)
    }
}

impl GameListener for Framework {
    fn set_on_any_packet_callback(&self, cb: Box<PacketCallback>) -> FrameworkResult<HandlerId> {
        self.ensure_live()?;
        Ok(self.listener.on_any_packet(cb))
    }

    fn set_on_typed_packet_callback(&self, packet_id: u32, cb: Box<PacketCallback>) -> FrameworkResult<HandlerId> {
        self.ensure_live()?;
        Ok(self.listener.on_typed_packet(packet_id, cb))
    }

    fn set_game_menu_entry(&self, entry: GameMenuEntry) -> FrameworkResult<HandlerId> {
        self.ensure_live()?;
        Ok(self.listener.add_game_menu_entry(entry))
    }

    fn game_menu_usage(&self) -> Vec<String> {
        self.menu.game_usage()
    }

    fn set_game_chat_interceptor(&self, cb: Box<ChatCallback>) -> FrameworkResult<HandlerId> {
        self.ensure_live()?;
        Ok(self.listener.add_chat_interceptor(cb))
    }

    fn append_on_first_see_player_callback(&self, cb: Box<NameCallback>) -> FrameworkResult<HandlerId> {
        self.ensure_live()?;
        Ok(self.listener.on_first_seen(cb))
    }

    fn append_login_info_callback(&self, cb: Box<PlayerCallback>) -> FrameworkResult<HandlerId> {
        self.ensure_live()?;
        Ok(self.listener.on_login(cb))
    }

    fn append_logout_info_callback(&self, cb: Box<PlayerCallback>) -> FrameworkResult<HandlerId> {
        self.ensure_live()?;
        Ok(self.listener.on_logout(cb))
    }
}

impl MainFrame for Framework {
    fn fatal_error(&self, err: &str) {
        tracing::error!("Fatal error: {}", err);
        self.teardown(&format!("fatal error: {err}"));
    }

    fn get_game_control(&self) -> &dyn GameControl {
        self
    }

    fn get_game_listener(&self) -> &dyn GameListener {
        self
    }

    fn revoke(&self, id: HandlerId) -> bool {
        let removed = self.listener.remove(id) || self.backend.remove(id) || self.security.remove(id);
        if removed {
            tracing::debug!("Revoked registration {}", id);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;
    use store::MemoryEngine;

    struct Discard;

    impl PacketSink for Discard {
        fn write_packet(&self, _packet: Packet) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn framework() -> Arc<Framework> {
        Framework::builder()
            .sink(Arc::new(Discard))
            .engine(MemoryEngine)
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_sink() {
        let result = Framework::builder().engine(MemoryEngine).build();
        assert!(matches!(result, Err(FrameworkError::MissingCollaborator(_))));
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let mut config = FrameworkConfig::default();
        config.agent.name.clear();
        let result = Framework::builder().config(config).sink(Arc::new(Discard)).build();
        assert!(matches!(result, Err(FrameworkError::Config(_))));
    }

    #[test]
    fn test_revoke_reaches_every_registry() {
        let frame = framework();
        let alert = frame.reg_on_alert_handler(Box::new(|_: &str| -> anyhow::Result<()> { Ok(()) })).unwrap();
        let interceptor = frame.set_backend_cmd_interceptor(Box::new(|_: &[String]| false)).unwrap();
        let login = frame
            .get_game_listener()
            .append_login_info_callback(Box::new(|_: &proto::PlayerListEntry| {}))
            .unwrap();

        assert!(frame.revoke(alert));
        assert!(frame.revoke(interceptor));
        assert!(frame.revoke(login));
        assert!(!frame.revoke(login));
    }

    #[test]
    fn test_shutdown_runs_once() {
        let frame = framework();
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        frame
            .reg_on_alert_handler(Box::new(move |info: &str| -> anyhow::Result<()> {
                assert_eq!(info, "shutdown: done");
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .unwrap();

        frame.shutdown("done");
        frame.shutdown("again");
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(frame.shutdown_token().is_cancelled());
    }
}
