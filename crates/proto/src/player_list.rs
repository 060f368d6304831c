use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum PlayerListAction {
    Add = 0,
    Remove = 1,
}

/// One row of the player list. Remove actions only populate `uuid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerListEntry {
    pub uuid: Uuid,
    pub entity_unique_id: i64,
    pub username: String,
    pub xuid: String,
    pub platform_chat_id: String,
    pub build_platform: i32,
}

impl PlayerListEntry {
    pub fn new(uuid: Uuid, username: impl Into<String>) -> Self {
        Self {
            uuid,
            entity_unique_id: 0,
            username: username.into(),
            xuid: String::new(),
            platform_chat_id: String::new(),
            build_platform: 0,
        }
    }

    /// Entry as sent for a remove action.
    pub fn removal(uuid: Uuid) -> Self {
        Self::new(uuid, String::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerList {
    pub action: PlayerListAction,
    pub entries: Vec<PlayerListEntry>,
}

impl PlayerList {
    pub fn add(entries: Vec<PlayerListEntry>) -> Self {
        Self {
            action: PlayerListAction::Add,
            entries,
        }
    }

    pub fn remove(uuids: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            action: PlayerListAction::Remove,
            entries: uuids.into_iter().map(PlayerListEntry::removal).collect(),
        }
    }
}
