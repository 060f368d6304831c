//! In-game chat as seen by plugins.

use proto::TextPacket;

use crate::context::ContextValue;

/// Chat handler. Returning `true` consumes the message.
pub type ChatCallback = dyn Fn(&GameChat) -> bool + Send + Sync;

/// One chat message, already tokenized.
#[derive(Debug, Clone)]
pub struct GameChat {
    /// Speaker, with formatting codes and angle brackets removed.
    pub name: String,
    /// Whitespace-separated words of the message.
    pub messages: Vec<String>,
    pub chat_type: u8,
    /// Set when the framework synthesized this message itself.
    pub framework_triggered: bool,
    /// For chat from the transport, a handle to the originating [`TextPacket`].
    pub aux: Option<ContextValue>,
}

impl GameChat {
    pub fn from_text_packet(packet: &TextPacket) -> Self {
        Self {
            name: clean_name(&packet.source_name),
            messages: tokenize(&packet.message),
            chat_type: packet.text_type.into(),
            framework_triggered: false,
            aux: Some(ContextValue::handle(packet.clone())),
        }
    }

    /// A message injected by the framework on a player's behalf.
    pub fn framework(name: impl Into<String>, line: &str) -> Self {
        Self {
            name: name.into(),
            messages: tokenize(line),
            chat_type: 1,
            framework_triggered: true,
            aux: None,
        }
    }

    /// Same event with a different token list, as handed to menu handlers.
    pub fn with_messages(&self, messages: Vec<String>) -> Self {
        Self {
            messages,
            ..self.clone()
        }
    }

    pub fn line(&self) -> String {
        self.messages.join(" ")
    }

    /// The originating packet, for chat that came from the transport.
    pub fn text_packet(&self) -> Option<std::sync::Arc<TextPacket>> {
        self.aux.as_ref()?.downcast::<TextPacket>().ok()
    }
}

pub fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_owned).collect()
}

/// Strip `§x` formatting codes and surrounding `<>` from a speaker name.
pub fn clean_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '§' {
            chars.next();
            continue;
        }
        out.push(c);
    }
    out.trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim()
        .to_owned()
}
