//! Textual command triggers for in-game chat and the backend console.
//!
//! Entries are matched in registration order against the leading tokens of
//! the input. A trigger may hold several words and then consumes that many
//! tokens. The first matching entry runs with the tokens after its trigger.
//! A final entry ends matching; a non-final one lets matching continue on
//! the remaining tokens, skipping entries already run for this input.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::chat::{tokenize, ChatCallback, GameChat};
use crate::handler::HandlerId;

/// Backend console handler, given the tokens after the trigger.
pub type BackendCallback = dyn Fn(&[String]) -> bool + Send + Sync;

/// Description shared by both kinds of menu entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub triggers: Vec<String>,
    pub argument_hint: String,
    pub final_trigger: bool,
    pub usage: String,
}

impl MenuEntry {
    pub fn new<I, S>(triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            triggers: triggers.into_iter().map(Into::into).collect(),
            argument_hint: String::new(),
            final_trigger: true,
            usage: String::new(),
        }
    }

    pub fn argument_hint(mut self, hint: impl Into<String>) -> Self {
        self.argument_hint = hint.into();
        self
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    pub fn final_trigger(mut self, final_trigger: bool) -> Self {
        self.final_trigger = final_trigger;
        self
    }

    /// `"<triggers> <hint>: <usage>"`.
    pub fn usage_line(&self) -> String {
        let mut line = self.triggers.join("/");
        if !self.argument_hint.is_empty() {
            line.push(' ');
            line.push_str(&self.argument_hint);
        }
        if !self.usage.is_empty() {
            line.push_str(": ");
            line.push_str(&self.usage);
        }
        line
    }
}

pub struct GameMenuEntry {
    pub entry: MenuEntry,
    pub on_trigger: Box<ChatCallback>,
}

impl GameMenuEntry {
    pub fn new(entry: MenuEntry, on_trigger: impl Fn(&GameChat) -> bool + Send + Sync + 'static) -> Self {
        Self {
            entry,
            on_trigger: Box::new(on_trigger),
        }
    }
}

pub struct BackendMenuEntry {
    pub entry: MenuEntry,
    pub on_trigger: Box<BackendCallback>,
}

impl BackendMenuEntry {
    pub fn new(entry: MenuEntry, on_trigger: impl Fn(&[String]) -> bool + Send + Sync + 'static) -> Self {
        Self {
            entry,
            on_trigger: Box::new(on_trigger),
        }
    }
}

/// Result of running one input through a menu.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MenuOutcome {
    pub matched: bool,
    /// OR of every invoked handler's return.
    pub stop: bool,
}

struct Registered<H: ?Sized> {
    id: HandlerId,
    entry: MenuEntry,
    trigger_tokens: Vec<Vec<String>>,
    handler: Arc<H>,
}

impl<H: ?Sized> Registered<H> {
    fn new(entry: MenuEntry, handler: Arc<H>) -> Self {
        let trigger_tokens = entry
            .triggers
            .iter()
            .map(|t| tokenize(t))
            .filter(|t| !t.is_empty())
            .collect();
        Self {
            id: HandlerId::next(),
            entry,
            trigger_tokens,
            handler,
        }
    }

    /// Tokens consumed by the longest trigger matching the head of `tokens`.
    fn match_len(&self, tokens: &[String]) -> Option<usize> {
        self.trigger_tokens
            .iter()
            .filter(|trigger| {
                trigger.len() <= tokens.len()
                    && trigger
                        .iter()
                        .zip(tokens)
                        .all(|(t, input)| t.eq_ignore_ascii_case(input))
            })
            .map(Vec::len)
            .max()
    }
}

type Chain<H> = Vec<Arc<Registered<H>>>;

fn run_chain<H: ?Sized>(
    entries: &Chain<H>,
    tokens: &[String],
    mut invoke: impl FnMut(&H, &[String]) -> bool,
) -> MenuOutcome {
    let mut outcome = MenuOutcome::default();
    let mut used = HashSet::new();
    let mut rest = tokens;

    while !rest.is_empty() {
        let hit = entries
            .iter()
            .filter(|e| !used.contains(&e.id))
            .find_map(|e| e.match_len(rest).map(|n| (e, n)));
        let Some((entry, consumed)) = hit else {
            break;
        };

        used.insert(entry.id);
        outcome.matched = true;
        let remaining = &rest[consumed..];
        tracing::trace!("Menu trigger '{}' matched", entry.entry.triggers.join("/"));
        outcome.stop |= invoke(entry.handler.as_ref(), remaining);

        if entry.entry.final_trigger {
            break;
        }
        rest = remaining;
    }

    outcome
}

/// Both menus. Handlers run outside the lock on a snapshot of the entries.
#[derive(Default)]
pub struct MenuRegistry {
    game: RwLock<Chain<ChatCallback>>,
    backend: RwLock<Chain<BackendCallback>>,
}

impl MenuRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_game_entry(&self, entry: GameMenuEntry) -> HandlerId {
        let registered = Registered::new(entry.entry, Arc::from(entry.on_trigger));
        let id = registered.id;
        tracing::debug!("Registered game menu entry {} ({})", registered.entry.usage_line(), id);
        self.game.write().push(Arc::new(registered));
        id
    }

    pub fn add_backend_entry(&self, entry: BackendMenuEntry) -> HandlerId {
        let registered = Registered::new(entry.entry, Arc::from(entry.on_trigger));
        let id = registered.id;
        tracing::debug!("Registered backend menu entry {} ({})", registered.entry.usage_line(), id);
        self.backend.write().push(Arc::new(registered));
        id
    }

    pub fn remove(&self, id: HandlerId) -> bool {
        let mut removed = false;
        self.game.write().retain(|e| {
            let keep = e.id != id;
            removed |= !keep;
            keep
        });
        self.backend.write().retain(|e| {
            let keep = e.id != id;
            removed |= !keep;
            keep
        });
        removed
    }

    pub fn dispatch_game(&self, chat: &GameChat) -> MenuOutcome {
        let entries = self.game.read().clone();
        run_chain(&entries, &chat.messages, |handler, rest| {
            handler(&chat.with_messages(rest.to_vec()))
        })
    }

    pub fn dispatch_backend(&self, tokens: &[String]) -> MenuOutcome {
        let entries = self.backend.read().clone();
        run_chain(&entries, tokens, |handler, rest| handler(rest))
    }

    pub fn game_usage(&self) -> Vec<String> {
        self.game.read().iter().map(|e| e.entry.usage_line()).collect()
    }

    pub fn backend_usage(&self) -> Vec<String> {
        self.backend.read().iter().map(|e| e.entry.usage_line()).collect()
    }
}
