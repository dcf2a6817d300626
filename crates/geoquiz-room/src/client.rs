//! Attached-client bookkeeping.

use std::sync::atomic::{AtomicU64, Ordering};

use geoquiz_protocol::{GameMode, RoomType, ServerMessage};
use tokio::sync::mpsc;

/// Process-unique id for one WebSocket connection. A player who
/// reconnects gets a new id; identity across connections is the
/// session id, not this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

impl ClientId {
    pub fn next() -> Self {
        Self(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Outbound queue capacity per client. A client that can't drain this
/// many messages is effectively gone and gets detached.
pub const CLIENT_QUEUE_SIZE: usize = 256;

/// Sender half of a client's outbound queue; the write pump owns the
/// receiver.
pub type ClientSender = mpsc::Sender<ServerMessage>;

/// Room settings a joining connection may request. Only the first
/// writer's settings take effect; later joins carry them as no-ops.
#[derive(Debug, Clone, Default)]
pub struct RequestedSettings {
    pub game_mode: Option<GameMode>,
    pub room_type: Option<RoomType>,
    pub total_rounds: Option<u32>,
    pub round_secs: Option<u32>,
}

/// A join request handed to the room actor.
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub id: ClientId,
    pub username: String,
    /// Empty for clients that never obtained a session.
    pub session_id: String,
    pub avatar_url: String,
    pub settings: RequestedSettings,
    pub sender: ClientSender,
}

/// One attached connection, as the room actor sees it.
#[derive(Debug)]
pub(crate) struct ConnectedClient {
    pub id: ClientId,
    pub username: String,
    pub session_id: String,
    pub avatar_url: String,
    pub sender: ClientSender,
}
