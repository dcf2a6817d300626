//! Top-level server errors.

use geoquiz_countries::CountryError;
use geoquiz_room::RoomError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Country(#[from] CountryError),
}
