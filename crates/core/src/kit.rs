//! Per-player scoped view over the game-control and storage capabilities.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::MutexGuard;
use store::StorageError;

use crate::chat::{ChatCallback, GameChat};
use crate::context::ContextValue;
use crate::control::{Outbound, TitleSlot};
use crate::error::{FrameworkError, FrameworkResult};
use crate::identity::{IdentityStore, PlayerInfo, PlayerSession};
use crate::storage::StorageProvider;

/// Storage topic holding a player's persisted values.
pub fn player_topic(name: &str) -> String {
    format!("player/{name}")
}

/// Handle onto one online player.
///
/// A kit stays usable after the player leaves: sends still go out (the
/// server drops them) and persisted storage still works, but the scratch
/// map belongs to the old session and claim binding fails. Once the
/// framework terminates, sends and writes fail with
/// [`FrameworkError::Terminated`].
#[derive(Clone)]
pub struct PlayerKit {
    info: PlayerInfo,
    session: Arc<PlayerSession>,
    outbound: Outbound,
    identity: Arc<IdentityStore>,
    storage: Arc<StorageProvider>,
}

impl PlayerKit {
    pub(crate) fn new(
        info: PlayerInfo,
        session: Arc<PlayerSession>,
        outbound: Outbound,
        identity: Arc<IdentityStore>,
        storage: Arc<StorageProvider>,
    ) -> Self {
        Self {
            info,
            session,
            outbound,
            identity,
            storage,
        }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn uuid(&self) -> proto::uuid::Uuid {
        self.info.uuid
    }

    /// Current identity record, or `None` once the player has left.
    pub fn related_player(&self) -> Option<PlayerInfo> {
        if self.is_online() {
            self.identity.player_by_uuid(self.info.uuid)
        } else {
            None
        }
    }

    pub fn is_online(&self) -> bool {
        self.identity.is_current(self.info.uuid, &self.session)
    }

    pub fn say(&self, msg: &str) -> FrameworkResult<()> {
        self.outbound.say_to(&self.info.name, msg)
    }

    pub fn action_bar(&self, msg: &str) -> FrameworkResult<()> {
        self.outbound.title_to(&self.info.name, TitleSlot::ActionBar, msg)
    }

    pub fn title(&self, msg: &str) -> FrameworkResult<()> {
        self.outbound.title_to(&self.info.name, TitleSlot::Title, msg)
    }

    pub fn sub_title(&self, msg: &str) -> FrameworkResult<()> {
        self.outbound.title_to(&self.info.name, TitleSlot::Subtitle, msg)
    }

    /// In-memory scratch space for this session. Lost on logout.
    pub fn violated_storage(&self) -> MutexGuard<'_, HashMap<String, ContextValue>> {
        self.session.violated()
    }

    /// Persisted value under `key`, `""` when absent.
    pub fn persist_storage(&self, key: &str) -> Result<String, StorageError> {
        self.storage.get(&player_topic(&self.info.name), key)
    }

    pub fn commit_persist_storage(&self, key: &str, value: &str) -> FrameworkResult<()> {
        self.ensure_live()?;
        Ok(self.storage.commit(&player_topic(&self.info.name), key, value)?)
    }

    fn ensure_live(&self) -> FrameworkResult<()> {
        if self.outbound.is_terminated() {
            return Err(FrameworkError::Terminated);
        }
        Ok(())
    }

    /// Bind the claim slot; the next chat message from this player goes to
    /// `cb` before anything else.
    pub fn set_on_param_msg(&self, cb: impl Fn(&GameChat) -> bool + Send + Sync + 'static) -> FrameworkResult<()> {
        self.ensure_live()?;
        if !self.is_online() {
            return Err(FrameworkError::PlayerNotFound(self.info.name.clone()));
        }
        let cb: Arc<ChatCallback> = Arc::new(cb);
        self.session.bind_claim(cb);
        Ok(())
    }

    pub fn on_param_msg(&self) -> Option<Arc<ChatCallback>> {
        self.session.claim()
    }

    pub fn clear_on_param_msg(&self) -> bool {
        self.session.clear_claim()
    }
}

impl std::fmt::Debug for PlayerKit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerKit")
            .field("name", &self.info.name)
            .field("uuid", &self.info.uuid)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::GameController;
    use crate::transport::{PacketSink, TransportError};
    use parking_lot::Mutex;
    use proto::uuid::Uuid;
    use std::sync::atomic::{AtomicBool, Ordering};
    use proto::{Packet, PlayerListEntry};
    use store::MemoryEngine;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Packet>>);

    impl PacketSink for Recorder {
        fn write_packet(&self, packet: Packet) -> Result<(), TransportError> {
            self.0.lock().push(packet);
            Ok(())
        }
    }

    fn setup_with_flag() -> (GameController, Arc<IdentityStore>, Arc<Recorder>, Arc<AtomicBool>) {
        let sink = Arc::new(Recorder::default());
        let identity = Arc::new(IdentityStore::new());
        let terminated = Arc::new(AtomicBool::new(false));
        let storage = Arc::new(StorageProvider::new("unused", "unused", Box::new(MemoryEngine)));
        let controller = GameController::new(sink.clone(), Arc::clone(&terminated), Arc::clone(&identity), storage);
        (controller, identity, sink, terminated)
    }

    fn setup() -> (GameController, Arc<IdentityStore>, Arc<Recorder>) {
        let (controller, identity, sink, _) = setup_with_flag();
        (controller, identity, sink)
    }

    #[test]
    fn test_absent_player_has_no_kit() {
        let (controller, _, _) = setup();
        assert!(controller.player_kit("Nobody").is_none());
        assert!(controller.player_kit_by_uuid(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_kit_sends_to_its_player() {
        let (controller, identity, sink) = setup();
        identity.add_player(&PlayerListEntry::new(Uuid::new_v4(), "Steve"));

        let kit = controller.player_kit("Steve").unwrap();
        kit.say("hi").unwrap();
        kit.title("big").unwrap();

        let sent = sink.0.lock();
        assert_eq!(sent.len(), 2);
        match &sent[0] {
            Packet::CommandRequest(r) => assert!(r.command_line.starts_with("tellraw Steve ")),
            other => panic!("unexpected packet {other:?}"),
        }
        match &sent[1] {
            Packet::CommandRequest(r) => assert!(r.command_line.starts_with("titleraw Steve title ")),
            other => panic!("unexpected packet {other:?}"),
        }
    }

    #[test]
    fn test_persist_survives_logout_but_scratch_does_not() {
        let (controller, identity, _) = setup();
        let steve = PlayerListEntry::new(Uuid::new_v4(), "Steve");
        identity.add_player(&steve);

        let kit = controller.player_kit("Steve").unwrap();
        kit.commit_persist_storage("coins", "5").unwrap();
        kit.violated_storage().insert("menu".into(), ContextValue::from("open"));

        identity.remove_player(steve.uuid);
        assert!(!kit.is_online());
        assert!(kit.related_player().is_none());
        assert!(matches!(
            kit.set_on_param_msg(|_| true),
            Err(FrameworkError::PlayerNotFound(_))
        ));

        identity.add_player(&steve);
        let kit = controller.player_kit_by_uuid(steve.uuid).unwrap();
        assert_eq!(kit.persist_storage("coins").unwrap(), "5");
        assert!(kit.violated_storage().is_empty());
        assert_eq!(kit.related_player().unwrap().name, "Steve");
    }

    #[test]
    fn test_kit_goes_quiet_after_termination() {
        let (controller, identity, sink, terminated) = setup_with_flag();
        identity.add_player(&PlayerListEntry::new(Uuid::new_v4(), "Steve"));
        let kit = controller.player_kit("Steve").unwrap();
        kit.commit_persist_storage("coins", "5").unwrap();

        terminated.store(true, Ordering::SeqCst);
        assert!(matches!(kit.say("late"), Err(FrameworkError::Terminated)));
        assert!(matches!(kit.title("late"), Err(FrameworkError::Terminated)));
        assert!(matches!(
            kit.commit_persist_storage("coins", "6"),
            Err(FrameworkError::Terminated)
        ));
        assert!(matches!(kit.set_on_param_msg(|_| true), Err(FrameworkError::Terminated)));
        assert_eq!(kit.persist_storage("coins").unwrap(), "5");
        assert!(sink.0.lock().is_empty());
    }

    #[test]
    fn test_rebinding_replaces_claim() {
        let (controller, identity, _) = setup();
        identity.add_player(&PlayerListEntry::new(Uuid::new_v4(), "Steve"));
        let kit = controller.player_kit("Steve").unwrap();

        kit.set_on_param_msg(|_| false).unwrap();
        kit.set_on_param_msg(|_| true).unwrap();

        let claim = kit.on_param_msg().unwrap();
        assert!(claim(&GameChat::framework("Steve", "x")));
        assert!(kit.clear_on_param_msg());
        assert!(kit.on_param_msg().is_none());
    }
}
