//! Outbound game actions and command-response correlation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use proto::uuid::Uuid;
use proto::{CommandOutput, CommandRequest, Packet, RawText};
use tokio::sync::oneshot;

use crate::chat::ChatCallback;
use crate::error::{FrameworkError, FrameworkResult};
use crate::identity::{IdentityStore, PlayerInfo, PlayerSession};
use crate::kit::PlayerKit;
use crate::storage::StorageProvider;
use crate::transport::PacketSink;

/// Called once with the command's output, or `None` if it never arrived.
pub type ResponseCallback = Box<dyn FnOnce(Option<CommandOutput>) + Send>;

/// Commands awaiting their output, keyed by request UUID.
#[derive(Default)]
pub struct PendingResponses {
    waiting: Mutex<HashMap<Uuid, ResponseCallback>>,
}

impl PendingResponses {
    pub fn register(&self, id: Uuid, cb: ResponseCallback) {
        self.waiting.lock().insert(id, cb);
    }

    /// Hand `output` to its waiter, if any. Returns whether one was found.
    pub fn resolve(&self, output: CommandOutput) -> bool {
        let cb = self.waiting.lock().remove(&output.correlation_id());
        match cb {
            Some(cb) => {
                cb(Some(output));
                true
            }
            None => false,
        }
    }

    /// Resolve one waiter with `None`.
    pub fn abandon(&self, id: Uuid) -> bool {
        let cb = self.waiting.lock().remove(&id);
        match cb {
            Some(cb) => {
                cb(None);
                true
            }
            None => false,
        }
    }

    /// Resolve every waiter with `None`, returning how many there were.
    pub fn fail_all(&self) -> usize {
        let drained: Vec<ResponseCallback> = self.waiting.lock().drain().map(|(_, cb)| cb).collect();
        let count = drained.len();
        for cb in drained {
            cb(None);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.waiting.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.lock().is_empty()
    }
}

/// Where a title-style message is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleSlot {
    Title,
    Subtitle,
    ActionBar,
}

impl TitleSlot {
    fn keyword(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Subtitle => "subtitle",
            Self::ActionBar => "actionbar",
        }
    }
}

/// Quote a target selector or player name for use in a command.
pub fn quote_target(target: &str) -> String {
    if target.starts_with('@') || !target.chars().any(char::is_whitespace) {
        target.to_owned()
    } else {
        format!("\"{}\"", target.replace('"', "\\\""))
    }
}

/// Fire-and-forget sender shared by the facade and every player kit.
///
/// Holds the framework's terminated flag; once it is set every send fails
/// with [`FrameworkError::Terminated`].
#[derive(Clone)]
pub struct Outbound {
    sink: Arc<dyn PacketSink>,
    terminated: Arc<AtomicBool>,
}

impl Outbound {
    pub fn new(sink: Arc<dyn PacketSink>, terminated: Arc<AtomicBool>) -> Self {
        Self { sink, terminated }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    pub fn send_packet(&self, packet: Packet) -> FrameworkResult<()> {
        if self.is_terminated() {
            tracing::warn!("Dropped {} on terminated framework", packet.name());
            return Err(FrameworkError::Terminated);
        }
        self.sink.write_packet(packet)?;
        Ok(())
    }

    pub fn send_request(&self, request: CommandRequest) -> FrameworkResult<()> {
        tracing::trace!("Sending command: {}", request.command_line);
        self.send_packet(request.into())
    }

    pub fn send_cmd(&self, cmd: &str) -> FrameworkResult<()> {
        self.send_request(CommandRequest::new(cmd))
    }

    pub fn say_to(&self, target: &str, msg: &str) -> FrameworkResult<()> {
        self.send_cmd(&format!("tellraw {} {}", quote_target(target), RawText::new(msg).to_json()))
    }

    pub fn title_to(&self, target: &str, slot: TitleSlot, msg: &str) -> FrameworkResult<()> {
        self.send_cmd(&format!(
            "titleraw {} {} {}",
            quote_target(target),
            slot.keyword(),
            RawText::new(msg).to_json()
        ))
    }
}

/// The facade behind the game-control capability.
pub struct GameController {
    outbound: Outbound,
    pending: PendingResponses,
    identity: Arc<IdentityStore>,
    storage: Arc<StorageProvider>,
}

impl GameController {
    pub fn new(
        sink: Arc<dyn PacketSink>,
        terminated: Arc<AtomicBool>,
        identity: Arc<IdentityStore>,
        storage: Arc<StorageProvider>,
    ) -> Self {
        Self {
            outbound: Outbound::new(sink, terminated),
            pending: PendingResponses::default(),
            identity,
            storage,
        }
    }

    pub fn outbound(&self) -> &Outbound {
        &self.outbound
    }

    pub fn pending(&self) -> &PendingResponses {
        &self.pending
    }

    /// Send a command and call `cb` with its output.
    ///
    /// If the send itself fails, `cb` receives `None` before the error is
    /// returned, so it still runs exactly once.
    pub fn send_cmd_and_invoke_on_response(&self, cmd: &str, cb: ResponseCallback) -> FrameworkResult<Uuid> {
        let request = CommandRequest::new(cmd);
        let id = request.correlation_id();
        self.pending.register(id, cb);
        if let Err(e) = self.outbound.send_request(request) {
            tracing::warn!("Command '{}' could not be sent: {}", cmd, e);
            self.pending.abandon(id);
            return Err(e);
        }
        Ok(id)
    }

    /// Send a command and await its output. The receiver yields `None` when
    /// the connection drops first.
    pub fn send_cmd_and_wait(&self, cmd: &str) -> oneshot::Receiver<Option<CommandOutput>> {
        let (tx, rx) = oneshot::channel();
        let _ = self.send_cmd_and_invoke_on_response(
            cmd,
            Box::new(move |output: Option<CommandOutput>| {
                let _ = tx.send(output);
            }),
        );
        rx
    }

    pub fn resolve(&self, output: CommandOutput) -> bool {
        let id = output.correlation_id();
        let found = self.pending.resolve(output);
        if !found {
            tracing::trace!("Command output {} has no waiter", id);
        }
        found
    }

    pub fn player_kit(&self, name: &str) -> Option<PlayerKit> {
        let (info, session) = self.identity.session_by_name(name)?;
        Some(self.kit(info, session))
    }

    pub fn player_kit_by_uuid(&self, uuid: Uuid) -> Option<PlayerKit> {
        let (info, session) = self.identity.session_by_uuid(uuid)?;
        Some(self.kit(info, session))
    }

    fn kit(&self, info: PlayerInfo, session: Arc<PlayerSession>) -> PlayerKit {
        PlayerKit::new(
            info,
            session,
            self.outbound.clone(),
            Arc::clone(&self.identity),
            Arc::clone(&self.storage),
        )
    }

    /// Bind the chat claim slot of an online player.
    pub fn set_on_param_msg(&self, name: &str, cb: Box<ChatCallback>) -> FrameworkResult<()> {
        if name.trim().is_empty() {
            return Err(FrameworkError::InvalidBinding("player name is empty".to_string()));
        }
        let (_, session) = self
            .identity
            .session_by_name(name)
            .ok_or_else(|| FrameworkError::PlayerNotFound(name.to_string()))?;
        session.bind_claim(Arc::from(cb));
        tracing::debug!("Bound chat claim for {}", name);
        Ok(())
    }
}
