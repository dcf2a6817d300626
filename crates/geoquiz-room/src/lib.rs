//! Room actors, hub registry, and the reconnection cache.
//!
//! The shape of the crate:
//!
//! - [`Hub`] — spawns and tracks rooms, one actor task per room.
//! - [`RoomHandle`] — cloneable address of a room; all interaction goes
//!   through it.
//! - [`RoomStateCache`] — TTL-bounded snapshots for reconnection.
//! - [`AccountStore`] — seam to whatever persistence the server wires in.

mod account;
mod cache;
mod client;
mod config;
mod error;
mod hub;
mod room;

pub use account::{winners, AccountError, AccountStore, NoopAccountStore};
pub use cache::{spawn_sweeper, RoomSnapshot, RoomStateCache};
pub use client::{ClientId, ClientSender, JoinRequest, RequestedSettings, CLIENT_QUEUE_SIZE};
pub use config::{CacheConfig, RoomConfig, RoundEndPolicy};
pub use error::RoomError;
pub use hub::Hub;
pub use room::{CommandOutcome, RejectReason, RoomHandle, RoomInfo};
