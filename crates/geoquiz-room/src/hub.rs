//! The room registry.
//!
//! One hub per process. It spawns room actors on demand, hands out
//! their handles, and answers lobby queries. Rooms remove themselves
//! when they tear down (via a `Weak` back-reference, so a dangling room
//! can never keep the hub alive).

use std::collections::HashMap;
use std::sync::Arc;

use geoquiz_countries::CountryProvider;
use geoquiz_protocol::{GameMode, PublicRoomEntry, RoomType};
use tokio::sync::RwLock;

use crate::account::AccountStore;
use crate::cache::RoomStateCache;
use crate::config::RoomConfig;
use crate::room::{spawn_room, RoomHandle};

pub struct Hub<A: AccountStore> {
    rooms: RwLock<HashMap<String, RoomHandle>>,
    config: RoomConfig,
    countries: Arc<CountryProvider>,
    cache: Arc<RoomStateCache>,
    accounts: Arc<A>,
}

impl<A: AccountStore> Hub<A> {
    pub fn new(
        config: RoomConfig,
        countries: Arc<CountryProvider>,
        cache: Arc<RoomStateCache>,
        accounts: Arc<A>,
    ) -> Arc<Self> {
        Arc::new(Self {
            rooms: RwLock::new(HashMap::new()),
            config,
            countries,
            cache,
            accounts,
        })
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<RoomStateCache> {
        &self.cache
    }

    pub fn accounts(&self) -> &Arc<A> {
        &self.accounts
    }

    /// Returns the live room with this code, spawning one if none
    /// exists. `None` means the code belongs to a room that is tearing
    /// down right now — the caller should treat it as expired rather
    /// than race the teardown.
    pub async fn get_or_create(self: &Arc<Self>, code: &str) -> Option<RoomHandle> {
        {
            let rooms = self.rooms.read().await;
            if let Some(handle) = rooms.get(code) {
                if handle.is_torn_down() {
                    return None;
                }
                return Some(handle.clone());
            }
        }

        let mut rooms = self.rooms.write().await;
        // Re-check: another connection may have created it between locks.
        if let Some(handle) = rooms.get(code) {
            if handle.is_torn_down() {
                return None;
            }
            return Some(handle.clone());
        }

        let handle = spawn_room(
            code.to_string(),
            self.config.clone(),
            Arc::clone(&self.countries),
            Arc::clone(&self.cache),
            Arc::clone(&self.accounts),
            Arc::downgrade(self),
        );
        rooms.insert(code.to_string(), handle.clone());
        tracing::info!(room = %code, total = rooms.len(), "room created");
        Some(handle)
    }

    /// Live room lookup without creation.
    pub async fn get(&self, code: &str) -> Option<RoomHandle> {
        let rooms = self.rooms.read().await;
        let handle = rooms.get(code)?;
        if handle.is_torn_down() {
            return None;
        }
        Some(handle.clone())
    }

    /// Called by a room during its own teardown.
    pub(crate) async fn remove(&self, code: &str) {
        let mut rooms = self.rooms.write().await;
        if rooms.remove(code).is_some() {
            tracing::info!(room = %code, total = rooms.len(), "room removed");
        }
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Joinable public rooms in the given mode: still in their lobby
    /// phase and with at least one player attached.
    pub async fn list_public(&self, mode: GameMode) -> Vec<PublicRoomEntry> {
        let handles: Vec<RoomHandle> = {
            let rooms = self.rooms.read().await;
            rooms.values().cloned().collect()
        };

        let mut entries = Vec::new();
        for handle in handles {
            // A room may tear down between the snapshot and this call;
            // skip it rather than error.
            let Ok(info) = handle.info().await else {
                continue;
            };
            if info.room_type != RoomType::Public
                || !info.status.is_waiting()
                || info.players.is_empty()
                || info.game_mode != mode
            {
                continue;
            }
            entries.push(PublicRoomEntry {
                code: info.code,
                host: info.owner,
                players: info.players.len(),
                max_players: info.max_players,
                mode: info.game_mode,
            });
        }
        entries.sort_by(|a, b| a.code.cmp(&b.code));
        entries
    }
}
