//! Live session state: who the agent is and who is online.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard, RwLock};
use proto::uuid::Uuid;
use proto::PlayerListEntry;
use serde::{Deserialize, Serialize};

use crate::chat::ChatCallback;
use crate::context::ContextValue;

/// The agent's own identity on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfInfo {
    pub name: String,
    pub uuid: Uuid,
    pub runtime_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub uuid: Uuid,
    pub name: String,
    pub entity_unique_id: i64,
    pub xuid: String,
    pub build_platform: i32,
    pub joined_at: DateTime<Utc>,
}

impl PlayerInfo {
    pub fn from_entry(entry: &PlayerListEntry) -> Self {
        Self {
            uuid: entry.uuid,
            name: entry.username.clone(),
            entity_unique_id: entry.entity_unique_id,
            xuid: entry.xuid.clone(),
            build_platform: entry.build_platform,
            joined_at: Utc::now(),
        }
    }

    /// Rebuild a full player-list row, used for logout notifications where
    /// the transport only sends the UUID.
    pub fn to_entry(&self) -> PlayerListEntry {
        PlayerListEntry {
            uuid: self.uuid,
            entity_unique_id: self.entity_unique_id,
            username: self.name.clone(),
            xuid: self.xuid.clone(),
            platform_chat_id: String::new(),
            build_platform: self.build_platform,
        }
    }
}

/// Per-connection state attached to an online player.
///
/// Dropped when the player leaves, which resets the scratch map and any
/// pending claim.
#[derive(Default)]
pub struct PlayerSession {
    violated: Mutex<HashMap<String, ContextValue>>,
    param_claim: Mutex<Option<Arc<ChatCallback>>>,
}

impl PlayerSession {
    pub fn violated(&self) -> MutexGuard<'_, HashMap<String, ContextValue>> {
        self.violated.lock()
    }

    /// Bind the claim slot, replacing any previous binding.
    pub fn bind_claim(&self, cb: Arc<ChatCallback>) {
        *self.param_claim.lock() = Some(cb);
    }

    pub fn claim(&self) -> Option<Arc<ChatCallback>> {
        self.param_claim.lock().clone()
    }

    pub fn clear_claim(&self) -> bool {
        self.param_claim.lock().take().is_some()
    }

    /// Clear the slot only if it still holds `cb`; a handler that re-bound
    /// itself during its own call keeps the new binding.
    pub(crate) fn release_claim(&self, cb: &Arc<ChatCallback>) {
        let mut slot = self.param_claim.lock();
        if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, cb)) {
            *slot = None;
        }
    }
}

impl std::fmt::Debug for PlayerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerSession")
            .field("violated_keys", &self.violated.lock().len())
            .field("claimed", &self.param_claim.lock().is_some())
            .finish()
    }
}

struct OnlinePlayer {
    info: PlayerInfo,
    session: Arc<PlayerSession>,
}

#[derive(Default)]
struct Roster {
    by_uuid: HashMap<Uuid, OnlinePlayer>,
    by_name: HashMap<String, Uuid>,
}

/// Read-mostly view of the connection's identities.
#[derive(Default)]
pub struct IdentityStore {
    self_info: RwLock<Option<SelfInfo>>,
    roster: RwLock<Roster>,
}

impl IdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_self(&self, info: SelfInfo) {
        *self.self_info.write() = Some(info);
    }

    pub fn self_info(&self) -> Option<SelfInfo> {
        self.self_info.read().clone()
    }

    pub fn is_self(&self, name: &str) -> bool {
        self.self_info
            .read()
            .as_ref()
            .is_some_and(|me| me.name == name)
    }

    /// Record a player-list row. Returns the stored info and whether the
    /// player was not online before.
    pub fn add_player(&self, entry: &PlayerListEntry) -> (PlayerInfo, bool) {
        let mut roster = self.roster.write();
        if let Some(existing) = roster.by_uuid.get_mut(&entry.uuid) {
            let previous_name = std::mem::replace(&mut existing.info.name, entry.username.clone());
            existing.info.entity_unique_id = entry.entity_unique_id;
            existing.info.xuid = entry.xuid.clone();
            existing.info.build_platform = entry.build_platform;
            let info = existing.info.clone();
            if previous_name != entry.username {
                roster.by_name.remove(&previous_name);
                roster.by_name.insert(entry.username.clone(), entry.uuid);
            }
            return (info, false);
        }

        let info = PlayerInfo::from_entry(entry);
        roster.by_name.insert(info.name.clone(), info.uuid);
        roster.by_uuid.insert(
            info.uuid,
            OnlinePlayer {
                info: info.clone(),
                session: Arc::new(PlayerSession::default()),
            },
        );
        (info, true)
    }

    pub fn remove_player(&self, uuid: Uuid) -> Option<PlayerInfo> {
        let mut roster = self.roster.write();
        let player = roster.by_uuid.remove(&uuid)?;
        if roster.by_name.get(&player.info.name) == Some(&uuid) {
            roster.by_name.remove(&player.info.name);
        }
        Some(player.info)
    }

    /// Forget everyone, as on connection loss.
    pub fn clear(&self) -> Vec<PlayerInfo> {
        let mut roster = self.roster.write();
        roster.by_name.clear();
        roster.by_uuid.drain().map(|(_, p)| p.info).collect()
    }

    pub fn player_by_name(&self, name: &str) -> Option<PlayerInfo> {
        let roster = self.roster.read();
        let uuid = roster.by_name.get(name)?;
        roster.by_uuid.get(uuid).map(|p| p.info.clone())
    }

    pub fn player_by_uuid(&self, uuid: Uuid) -> Option<PlayerInfo> {
        self.roster.read().by_uuid.get(&uuid).map(|p| p.info.clone())
    }

    pub(crate) fn session_by_name(&self, name: &str) -> Option<(PlayerInfo, Arc<PlayerSession>)> {
        let roster = self.roster.read();
        let uuid = roster.by_name.get(name)?;
        roster
            .by_uuid
            .get(uuid)
            .map(|p| (p.info.clone(), Arc::clone(&p.session)))
    }

    pub(crate) fn session_by_uuid(&self, uuid: Uuid) -> Option<(PlayerInfo, Arc<PlayerSession>)> {
        self.roster
            .read()
            .by_uuid
            .get(&uuid)
            .map(|p| (p.info.clone(), Arc::clone(&p.session)))
    }

    /// Whether `session` is still the live session of player `uuid`.
    pub(crate) fn is_current(&self, uuid: Uuid, session: &Arc<PlayerSession>) -> bool {
        self.roster
            .read()
            .by_uuid
            .get(&uuid)
            .is_some_and(|p| Arc::ptr_eq(&p.session, session))
    }

    /// Online players, sorted by name.
    pub fn players(&self) -> Vec<PlayerInfo> {
        let mut players: Vec<PlayerInfo> = self
            .roster
            .read()
            .by_uuid
            .values()
            .map(|p| p.info.clone())
            .collect();
        players.sort_by(|a, b| a.name.cmp(&b.name));
        players
    }

    pub fn online_count(&self) -> usize {
        self.roster.read().by_uuid.len()
    }
}
