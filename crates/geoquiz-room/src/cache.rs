//! Room state cache.
//!
//! Rooms persist a snapshot of their state here on every membership
//! change. If a room's last connection drops and the process keeps the
//! actor around, or a player reconnects with the same session id, the
//! snapshot lets the room pick up where it left off. Entries expire
//! after a TTL measured from last activity; a background sweeper evicts
//! the dead ones.

use std::collections::HashMap;
use std::sync::Arc;

use geoquiz_protocol::GameState;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::CacheConfig;

/// Everything needed to rebuild a room's game after a reconnect.
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub room_code: String,
    pub game_state: GameState,
    /// Usernames attached when the snapshot was taken.
    pub players: Vec<String>,
    pub owner: String,
    /// session id → username, for reconnection identity checks.
    pub session_to_user: HashMap<String, String>,
    pub created_at: Instant,
    pub last_activity: Instant,
}

impl RoomSnapshot {
    pub fn new(room_code: impl Into<String>, game_state: GameState) -> Self {
        let now = Instant::now();
        Self {
            room_code: room_code.into(),
            game_state,
            players: Vec::new(),
            owner: String::new(),
            session_to_user: HashMap::new(),
            created_at: now,
            last_activity: now,
        }
    }

    fn is_expired(&self, ttl: std::time::Duration) -> bool {
        self.last_activity.elapsed() > ttl
    }
}

/// TTL-bounded snapshot store, keyed by room code.
pub struct RoomStateCache {
    entries: RwLock<HashMap<String, RoomSnapshot>>,
    config: CacheConfig,
}

impl RoomStateCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Inserts or replaces a snapshot, stamping it as fresh activity.
    pub async fn save(&self, mut snapshot: RoomSnapshot) {
        snapshot.last_activity = Instant::now();
        let mut entries = self.entries.write().await;
        // Keep the original creation time across re-saves.
        if let Some(existing) = entries.get(&snapshot.room_code) {
            snapshot.created_at = existing.created_at;
        }
        entries.insert(snapshot.room_code.clone(), snapshot);
    }

    /// Returns a live (non-expired) snapshot, if one exists.
    pub async fn get(&self, room_code: &str) -> Option<RoomSnapshot> {
        let entries = self.entries.read().await;
        let snapshot = entries.get(room_code)?;
        if snapshot.is_expired(self.config.ttl) {
            return None;
        }
        Some(snapshot.clone())
    }

    /// Refreshes a snapshot's activity stamp without rewriting it.
    pub async fn touch(&self, room_code: &str) {
        let mut entries = self.entries.write().await;
        if let Some(snapshot) = entries.get_mut(room_code) {
            snapshot.last_activity = Instant::now();
        }
    }

    pub async fn delete(&self, room_code: &str) {
        self.entries.write().await.remove(room_code);
    }

    /// If `session_id` was attached to this room, returns the username
    /// it belonged to. Expired snapshots never match.
    pub async fn session_user(&self, room_code: &str, session_id: &str) -> Option<String> {
        if session_id.is_empty() {
            return None;
        }
        let entries = self.entries.read().await;
        let snapshot = entries.get(room_code)?;
        if snapshot.is_expired(self.config.ttl) {
            return None;
        }
        snapshot.session_to_user.get(session_id).cloned()
    }

    /// Evicts every expired snapshot; returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, snapshot| !snapshot.is_expired(self.config.ttl));
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Spawns the periodic eviction task. It runs until the cache's last
/// `Arc` is dropped.
pub fn spawn_sweeper(cache: Arc<RoomStateCache>) -> JoinHandle<()> {
    let interval = cache.config.sweep_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick fires immediately; skip it so a fresh server
        // doesn't sweep an empty map.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = cache.sweep().await;
            if removed > 0 {
                tracing::info!(removed, "swept expired room snapshots");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn short_ttl() -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(10),
        }
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let cache = RoomStateCache::new(short_ttl());
        let mut snapshot = RoomSnapshot::new("ROOM1", GameState::new());
        snapshot.owner = "alice".into();
        cache.save(snapshot).await;

        let back = cache.get("ROOM1").await.expect("snapshot present");
        assert_eq!(back.owner, "alice");
        assert!(cache.get("NOPE").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_snapshot_is_invisible() {
        let cache = RoomStateCache::new(short_ttl());
        cache.save(RoomSnapshot::new("ROOM1", GameState::new())).await;

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(cache.get("ROOM1").await.is_none());
        // Still physically present until a sweep.
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.sweep().await, 1);
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_touch_extends_lifetime() {
        let cache = RoomStateCache::new(short_ttl());
        cache.save(RoomSnapshot::new("ROOM1", GameState::new())).await;

        tokio::time::advance(Duration::from_secs(50)).await;
        cache.touch("ROOM1").await;
        tokio::time::advance(Duration::from_secs(50)).await;

        assert!(cache.get("ROOM1").await.is_some());
        assert_eq!(cache.sweep().await, 0);
    }

    #[tokio::test]
    async fn test_session_user_lookup() {
        let cache = RoomStateCache::new(short_ttl());
        let mut snapshot = RoomSnapshot::new("ROOM1", GameState::new());
        snapshot
            .session_to_user
            .insert("sess-1".into(), "alice".into());
        cache.save(snapshot).await;

        assert_eq!(
            cache.session_user("ROOM1", "sess-1").await.as_deref(),
            Some("alice")
        );
        assert!(cache.session_user("ROOM1", "sess-2").await.is_none());
        assert!(cache.session_user("ROOM1", "").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resave_preserves_created_at() {
        let cache = RoomStateCache::new(short_ttl());
        cache.save(RoomSnapshot::new("ROOM1", GameState::new())).await;
        let created = cache.get("ROOM1").await.unwrap().created_at;

        tokio::time::advance(Duration::from_secs(30)).await;
        cache.save(RoomSnapshot::new("ROOM1", GameState::new())).await;

        let back = cache.get("ROOM1").await.unwrap();
        assert_eq!(back.created_at, created);
        assert!(back.last_activity > created);
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = RoomStateCache::new(short_ttl());
        cache.save(RoomSnapshot::new("ROOM1", GameState::new())).await;
        cache.delete("ROOM1").await;
        assert!(cache.get("ROOM1").await.is_none());
    }
}
