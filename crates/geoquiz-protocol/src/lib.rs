//! Wire protocol for Geoquiz.
//!
//! This crate defines the "language" spoken between the browser and the
//! room engine:
//!
//! - **State** ([`GameState`], [`Question`] and their enums) — the
//!   authoritative game document a room owns and snapshots onto the wire.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`]) — every typed
//!   `{type, payload}` envelope that travels over a connection.
//! - **Codec** ([`encode`], [`decode`]) — JSON conversion with a single
//!   error type.
//!
//! The protocol layer knows nothing about connections, rooms, or timers —
//! it only defines shapes. The exact JSON produced here is a contract
//! with the client; the tests in `messages.rs` pin it down.

mod codec;
mod error;
mod messages;
mod state;

pub use codec::{decode, encode};
pub use error::ProtocolError;
pub use messages::{ClientMessage, PublicRoomEntry, ServerMessage};
pub use state::{
    GameMode, GameState, GameStatus, MapMode, Question, QuestionType, RoomType,
};
