//! The game-state document.
//!
//! One [`GameState`] per room, owned exclusively by that room's actor.
//! It serializes to the JSON shape the client renders from; a handful of
//! fields are server-internal bookkeeping and never leave the process
//! (`#[serde(skip)]`).

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Lifecycle status of a game.
///
/// ```text
/// waiting → in_progress → completed
///     \________ closed ________/      (terminal, reachable from anywhere)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    #[default]
    Waiting,
    InProgress,
    Completed,
    Closed,
}

impl GameStatus {
    /// Whether the room is in its lobby phase and can accept a start.
    pub fn is_waiting(self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// Whether a game is actively running.
    pub fn is_in_progress(self) -> bool {
        matches!(self, Self::InProgress)
    }

    /// Whether the room has been torn down.
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// What kind of question the room asks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameMode {
    /// Identify a country from its flag.
    #[default]
    Flag,
    /// Identify or paint countries on a world map.
    WorldMap,
}

/// Who can find and join the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomType {
    /// One player, starts alone.
    #[default]
    Single,
    /// Invite-only, needs at least two players.
    Private,
    /// Listed in the lobby, needs at least two players.
    Public,
}

impl RoomType {
    /// Minimum attached players required to start a game.
    pub fn min_players(self) -> usize {
        match self {
            Self::Single => 1,
            Self::Private | Self::Public => 2,
        }
    }
}

/// Sub-mode for [`GameMode::WorldMap`] games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MapMode {
    /// Discrete timed rounds with one highlighted country each.
    Timed,
    /// No rounds — players paint countries at will until restart/close.
    #[default]
    Free,
}

/// The question type tag sent to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    FlagGuess,
    MapGuess,
}

/// One round's question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub flag_code: String,
    pub country_name: String,
    pub country_code: String,
    /// Round length in seconds.
    pub time_limit: u32,
}

/// The authoritative state of one game session.
///
/// All mutation happens inside the owning room actor; everything else
/// sees value copies (broadcast snapshots, cache entries).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub status: GameStatus,
    pub current_round: u32,
    pub total_rounds: u32,
    pub game_mode: GameMode,
    pub room_type: RoomType,
    pub map_mode: MapMode,
    pub owner: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub question: Option<Question>,
    /// username → score. Entries only ever grow within a game.
    pub scores: HashMap<String, u32>,
    pub time_remaining: u32,
    /// country code → username of the player who painted it.
    pub painted_countries: HashMap<String, String>,
    /// Highlighted country for TIMED map rounds.
    pub current_country: Option<String>,
    /// username → chosen color, unique per room.
    pub player_colors: HashMap<String, String>,

    // Server-internal bookkeeping — never serialized.
    /// Players who answered correctly this round.
    #[serde(skip)]
    pub answered: HashSet<String>,
    #[serde(skip)]
    pub round_active: bool,
    /// Codes already drawn this game (no repeats).
    #[serde(skip)]
    pub used_countries: HashSet<String>,
}

impl GameState {
    /// A fresh lobby-state document with the default ten rounds.
    pub fn new() -> Self {
        Self {
            status: GameStatus::Waiting,
            current_round: 0,
            total_rounds: 10,
            game_mode: GameMode::default(),
            room_type: RoomType::default(),
            map_mode: MapMode::default(),
            owner: String::new(),
            question: None,
            scores: HashMap::new(),
            time_remaining: 0,
            painted_countries: HashMap::new(),
            current_country: None,
            player_colors: HashMap::new(),
            answered: HashSet::new(),
            round_active: false,
            used_countries: HashSet::new(),
        }
    }

    /// Whether this game runs without discrete rounds.
    pub fn is_free_paint(&self) -> bool {
        self.game_mode == GameMode::WorldMap && self.map_mode == MapMode::Free
    }

    /// Whether correct answers paint the map in this mode.
    pub fn paints_map(&self) -> bool {
        self.game_mode == GameMode::WorldMap
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
