//! Text packet, the carrier of in-game chat.

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Kind of text message, as carried in the first byte of a Text packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum TextType {
    Raw = 0,
    Chat = 1,
    Translation = 2,
    Popup = 3,
    JukeboxPopup = 4,
    Tip = 5,
    System = 6,
    Whisper = 7,
    Announcement = 8,
    ObjectWhisper = 9,
    Object = 10,
    ObjectAnnouncement = 11,
}

impl TextType {
    /// Whether this kind carries a player-authored message.
    pub fn is_player_message(self) -> bool {
        matches!(self, Self::Chat | Self::Whisper | Self::Announcement)
    }
}

impl From<TextType> for u8 {
    fn from(value: TextType) -> Self {
        value as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPacket {
    pub text_type: TextType,
    pub needs_translation: bool,
    pub source_name: String,
    pub message: String,
    pub parameters: Vec<String>,
    pub xuid: String,
    pub platform_chat_id: String,
}

impl TextPacket {
    /// Plain chat message from a named source.
    pub fn chat(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            text_type: TextType::Chat,
            needs_translation: false,
            source_name: source.into(),
            message: message.into(),
            parameters: Vec::new(),
            xuid: String::new(),
            platform_chat_id: String::new(),
        }
    }

    pub fn with_type(mut self, text_type: TextType) -> Self {
        self.text_type = text_type;
        self
    }
}
