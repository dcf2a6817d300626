//! Typed wire messages.
//!
//! Every frame is a JSON object of the form `{"type": ..., "payload": ...}`.
//! Serde's adjacently-tagged representation produces exactly that shape,
//! so the enums below *are* the wire contract. Commands with no payload
//! (`start_game`, `restart_game`, `close_room`) omit the `payload` key.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::state::{GameMode, GameState, GameStatus, MapMode, RoomType};

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Everything a connected player can ask a room to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Host starts the game.
    StartGame,

    /// A guess for the current question (or a free-paint attempt).
    SubmitAnswer {
        answer: String,
        /// Milliseconds the player took to answer; drives scoring.
        #[serde(default)]
        response_time_ms: u64,
    },

    /// Lobby/in-game chat.
    ChatMessage { message: String },

    /// Host switches the WORLD_MAP sub-mode. Defaults to FREE when the
    /// payload carries no explicit mode.
    SetMapMode {
        #[serde(default)]
        map_mode: MapMode,
    },

    /// Host changes the round count before the game starts.
    SetRounds { rounds: u32 },

    /// Player picks a map color.
    ColorSelected { color: String },

    /// Host resets the game.
    RestartGame,

    /// Host tears the room down.
    CloseRoom,
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// Everything a room broadcasts (or sends to a single client).
///
/// The ordering of related messages is part of the contract: a correct
/// answer always produces `answer_submitted` → (`country_painted`) →
/// `score_update`, in that order, with nothing interleaved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Lobby roster and settings snapshot, sent on every membership or
    /// configuration change.
    RoomUpdate {
        players: Vec<String>,
        current_count: usize,
        status: GameStatus,
        current_round: u32,
        owner: String,
        game_mode: GameMode,
        room_type: RoomType,
        map_mode: MapMode,
        total_rounds: u32,
        player_colors: HashMap<String, String>,
        player_avatars: HashMap<String, String>,
    },

    PlayerJoined {
        player_name: String,
        current_count: usize,
    },

    PlayerLeft {
        player_name: String,
        current_count: usize,
    },

    /// Full state snapshot at the start of a round (also sent to late
    /// joiners so their view catches up).
    RoundStarted(GameState),

    TimerUpdate {
        time_remaining: u32,
    },

    AnswerSubmitted {
        player: String,
        is_correct: bool,
        country_name: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        country_code: Option<String>,
    },

    /// A country was permanently attributed to a player.
    CountryPainted {
        country_code: String,
        country_name: String,
        player: String,
        painted_countries: HashMap<String, String>,
        player_colors: HashMap<String, String>,
    },

    ScoreUpdate {
        scores: HashMap<String, u32>,
    },

    RoundEnded {
        scores: HashMap<String, u32>,
        current_round: u32,
        correct_answer: String,
        #[serde(skip_serializing_if = "std::ops::Not::not", default)]
        is_last_round: bool,
    },

    /// Final state after the last round.
    GameCompleted(GameState),

    /// FREE-paint session opened (no rounds, no timer).
    GameStarted(GameState),

    /// Host reset the game back to the lobby.
    GameRestarted(GameState),

    /// Chat relay with a server-side RFC 3339 timestamp.
    ChatMessage {
        player_name: String,
        message: String,
        timestamp: String,
    },

    /// Targeted rejection: the requested color is already held.
    ColorRejected {
        error: String,
        color: String,
    },

    /// Targeted rejection: this session is already live in the room.
    SessionCollision {
        message: String,
        username: String,
    },

    RoomClosed {
        message: String,
    },

    RoomExpired {
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Lobby discovery
// ---------------------------------------------------------------------------

/// One row in the public-room listing exposed to the lobby endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicRoomEntry {
    pub code: String,
    pub host: String,
    pub players: usize,
    pub max_players: usize,
    pub mode: GameMode,
}

#[cfg(test)]
mod tests {
    //! The JSON shapes below are a contract with the web client — a
    //! mismatch means the browser silently renders nothing.

    use super::*;
    use crate::{decode, encode};

    #[test]
    fn test_client_message_no_payload_decodes() {
        let msg: ClientMessage = decode(r#"{"type":"start_game"}"#).unwrap();
        assert_eq!(msg, ClientMessage::StartGame);

        let msg: ClientMessage = decode(r#"{"type":"close_room"}"#).unwrap();
        assert_eq!(msg, ClientMessage::CloseRoom);
    }

    #[test]
    fn test_submit_answer_decodes() {
        let msg: ClientMessage = decode(
            r#"{"type":"submit_answer","payload":{"answer":"France","response_time_ms":2000}}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::SubmitAnswer {
                answer: "France".into(),
                response_time_ms: 2000,
            }
        );
    }

    #[test]
    fn test_submit_answer_missing_time_defaults_to_zero() {
        let msg: ClientMessage =
            decode(r#"{"type":"submit_answer","payload":{"answer":"France"}}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::SubmitAnswer {
                answer: "France".into(),
                response_time_ms: 0,
            }
        );
    }

    #[test]
    fn test_set_map_mode_defaults_to_free() {
        let msg: ClientMessage =
            decode(r#"{"type":"set_map_mode","payload":{}}"#).unwrap();
        assert_eq!(msg, ClientMessage::SetMapMode { map_mode: MapMode::Free });

        let msg: ClientMessage =
            decode(r#"{"type":"set_map_mode","payload":{"map_mode":"TIMED"}}"#).unwrap();
        assert_eq!(msg, ClientMessage::SetMapMode { map_mode: MapMode::Timed });
    }

    #[test]
    fn test_set_rounds_decodes() {
        let msg: ClientMessage =
            decode(r#"{"type":"set_rounds","payload":{"rounds":15}}"#).unwrap();
        assert_eq!(msg, ClientMessage::SetRounds { rounds: 15 });
    }

    #[test]
    fn test_unknown_message_type_is_an_error() {
        let result: Result<ClientMessage, _> =
            decode(r#"{"type":"fly_to_moon","payload":{"speed":9000}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_garbage_is_an_error() {
        let result: Result<ClientMessage, _> = decode("not json at all");
        assert!(result.is_err());
    }

    #[test]
    fn test_server_message_envelope_shape() {
        let msg = ServerMessage::TimerUpdate { time_remaining: 7 };
        let json: serde_json::Value =
            serde_json::from_str(&encode(&msg).unwrap()).unwrap();
        assert_eq!(json["type"], "timer_update");
        assert_eq!(json["payload"]["time_remaining"], 7);
    }

    #[test]
    fn test_answer_submitted_omits_missing_country_code() {
        let msg = ServerMessage::AnswerSubmitted {
            player: "alice".into(),
            is_correct: false,
            country_name: "France".into(),
            country_code: None,
        };
        let json: serde_json::Value =
            serde_json::from_str(&encode(&msg).unwrap()).unwrap();
        assert_eq!(json["payload"]["is_correct"], false);
        assert!(json["payload"].get("country_code").is_none());
    }

    #[test]
    fn test_round_ended_omits_is_last_round_when_false() {
        let msg = ServerMessage::RoundEnded {
            scores: HashMap::new(),
            current_round: 2,
            correct_answer: "France".into(),
            is_last_round: false,
        };
        let json: serde_json::Value =
            serde_json::from_str(&encode(&msg).unwrap()).unwrap();
        assert!(json["payload"].get("is_last_round").is_none());

        let msg = ServerMessage::RoundEnded {
            scores: HashMap::new(),
            current_round: 10,
            correct_answer: "France".into(),
            is_last_round: true,
        };
        let json: serde_json::Value =
            serde_json::from_str(&encode(&msg).unwrap()).unwrap();
        assert_eq!(json["payload"]["is_last_round"], true);
    }

    #[test]
    fn test_round_started_payload_is_the_state_object() {
        let state = GameState::new();
        let msg = ServerMessage::RoundStarted(state);
        let json: serde_json::Value =
            serde_json::from_str(&encode(&msg).unwrap()).unwrap();
        assert_eq!(json["type"], "round_started");
        assert_eq!(json["payload"]["status"], "waiting");
        assert_eq!(json["payload"]["total_rounds"], 10);
    }

    #[test]
    fn test_server_message_round_trips() {
        let msg = ServerMessage::SessionCollision {
            message: "This session is already active in this room".into(),
            username: "alice".into(),
        };
        let back: ServerMessage = decode(&encode(&msg).unwrap()).unwrap();
        assert_eq!(msg, back);

        // State-carrying variants compare too.
        let mut state = GameState::new();
        state.scores.insert("alice".into(), 95);
        let msg = ServerMessage::RoundStarted(state);
        let back: ServerMessage = decode(&encode(&msg).unwrap()).unwrap();
        assert_eq!(msg, back);
    }

    #[test]
    fn test_public_room_entry_shape() {
        let entry = PublicRoomEntry {
            code: "ABC12".into(),
            host: "alice".into(),
            players: 2,
            max_players: 6,
            mode: GameMode::Flag,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["code"], "ABC12");
        assert_eq!(json["mode"], "FLAG");
        assert_eq!(json["max_players"], 6);
    }
}
