//! WebSocket front end for Geoquiz.
//!
//! One TCP listener, one task per connection, all game logic behind
//! [`geoquiz_room::Hub`]. The server's own job is small: upgrade the
//! socket, parse the query parameters, join the room, and pump frames.

mod error;
mod params;
mod pump;
mod server;

pub use error::ServerError;
pub use params::{ConnectParams, ParamError};
pub use server::GeoquizServer;
