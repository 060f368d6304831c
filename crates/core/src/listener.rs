//! Inbound event fan-out.
//!
//! Packet and chat subscribers may stop an event: once one returns `true`,
//! later subscribers of the same class do not see it. Login, logout and
//! first-seen observers always all run.

use std::sync::Arc;

use proto::{Packet, PlayerListEntry};

use crate::chat::{ChatCallback, GameChat};
use crate::handler::{HandlerId, HandlerList};
use crate::identity::IdentityStore;
use crate::menu::{GameMenuEntry, MenuOutcome, MenuRegistry};

/// Packet handler. Returning `true` stops later handlers of the same kind.
pub type PacketCallback = dyn Fn(&Packet) -> bool + Send + Sync;
/// Login/logout observer.
pub type PlayerCallback = dyn Fn(&PlayerListEntry) + Send + Sync;
/// First-seen observer, given the player name.
pub type NameCallback = dyn Fn(&str) + Send + Sync;

struct TypedPacketHandler {
    packet_id: u32,
    callback: Box<PacketCallback>,
}

/// What happened to one chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatOutcome {
    /// The speaker's bound claim handler took it.
    Claimed,
    /// A chat interceptor stopped it.
    Intercepted,
    /// Went through the game menu.
    Menu(MenuOutcome),
}

impl ChatOutcome {
    /// Whether default handling (such as forwarding) should be skipped.
    pub fn consumed(&self) -> bool {
        match self {
            Self::Claimed | Self::Intercepted => true,
            Self::Menu(outcome) => outcome.stop,
        }
    }
}

pub struct EventHub {
    identity: Arc<IdentityStore>,
    menu: Arc<MenuRegistry>,
    any_packet: HandlerList<PacketCallback>,
    typed_packet: HandlerList<TypedPacketHandler>,
    chat_interceptors: HandlerList<ChatCallback>,
    login: HandlerList<PlayerCallback>,
    logout: HandlerList<PlayerCallback>,
    first_seen: HandlerList<NameCallback>,
}

impl EventHub {
    pub fn new(identity: Arc<IdentityStore>, menu: Arc<MenuRegistry>) -> Self {
        Self {
            identity,
            menu,
            any_packet: HandlerList::new(),
            typed_packet: HandlerList::new(),
            chat_interceptors: HandlerList::new(),
            login: HandlerList::new(),
            logout: HandlerList::new(),
            first_seen: HandlerList::new(),
        }
    }

    pub fn on_any_packet(&self, cb: Box<PacketCallback>) -> HandlerId {
        self.any_packet.push(Arc::from(cb))
    }

    pub fn on_typed_packet(&self, packet_id: u32, cb: Box<PacketCallback>) -> HandlerId {
        self.typed_packet.push(Arc::new(TypedPacketHandler {
            packet_id,
            callback: cb,
        }))
    }

    pub fn add_game_menu_entry(&self, entry: GameMenuEntry) -> HandlerId {
        self.menu.add_game_entry(entry)
    }

    pub fn add_chat_interceptor(&self, cb: Box<ChatCallback>) -> HandlerId {
        self.chat_interceptors.push(Arc::from(cb))
    }

    pub fn on_login(&self, cb: Box<PlayerCallback>) -> HandlerId {
        self.login.push(Arc::from(cb))
    }

    pub fn on_logout(&self, cb: Box<PlayerCallback>) -> HandlerId {
        self.logout.push(Arc::from(cb))
    }

    pub fn on_first_seen(&self, cb: Box<NameCallback>) -> HandlerId {
        self.first_seen.push(Arc::from(cb))
    }

    /// Remove a registration from whichever list holds it.
    pub fn remove(&self, id: HandlerId) -> bool {
        self.any_packet.remove(id)
            || self.typed_packet.remove(id)
            || self.chat_interceptors.remove(id)
            || self.login.remove(id)
            || self.logout.remove(id)
            || self.first_seen.remove(id)
            || self.menu.remove(id)
    }

    /// Run the any-packet chain, then the chain for this packet's id.
    /// The two chains stop independently.
    pub fn dispatch_packet(&self, packet: &Packet) -> bool {
        let mut stopped = false;
        for cb in self.any_packet.snapshot() {
            if cb(packet) {
                stopped = true;
                break;
            }
        }

        let id = packet.id();
        for handler in self.typed_packet.snapshot() {
            if handler.packet_id == id && (handler.callback)(packet) {
                stopped = true;
                break;
            }
        }
        stopped
    }

    /// Claim slot, then interceptors, then the game menu.
    pub fn dispatch_chat(&self, chat: &GameChat) -> ChatOutcome {
        if let Some((_, session)) = self.identity.session_by_name(&chat.name) {
            if let Some(claim) = session.claim() {
                if claim(chat) {
                    session.release_claim(&claim);
                    tracing::debug!("Chat from {} claimed by bound handler", chat.name);
                    return ChatOutcome::Claimed;
                }
            }
        }

        for cb in self.chat_interceptors.snapshot() {
            if cb(chat) {
                return ChatOutcome::Intercepted;
            }
        }

        ChatOutcome::Menu(self.menu.dispatch_game(chat))
    }

    pub fn fire_login(&self, entry: &PlayerListEntry) {
        for cb in self.login.snapshot() {
            cb(entry);
        }
    }

    pub fn fire_logout(&self, entry: &PlayerListEntry) {
        for cb in self.logout.snapshot() {
            cb(entry);
        }
    }

    pub fn fire_first_seen(&self, name: &str) {
        for cb in self.first_seen.snapshot() {
            cb(name);
        }
    }
}
