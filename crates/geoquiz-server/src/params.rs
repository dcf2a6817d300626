//! Connection parameters.
//!
//! Everything about a join rides on the upgrade request's query string:
//! `ws://host/ws?room=AB12&username=alice&type=PUBLIC&mode=FLAG`.
//! `room` and `username` are required; everything else has a default.
//! A `token` marks the connection as authenticated — guests get their
//! round count capped.

use geoquiz_protocol::{GameMode, RoomType};
use geoquiz_room::{RequestedSettings, RoomConfig};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParamError {
    #[error("missing required parameter `{0}`")]
    Missing(&'static str),
}

/// Parsed and sanitized join parameters.
#[derive(Debug, Clone)]
pub struct ConnectParams {
    pub room_code: String,
    pub username: String,
    /// Empty when the client has no session.
    pub session_id: String,
    pub authenticated: bool,
    pub settings: RequestedSettings,
}

impl ConnectParams {
    pub fn parse(query: &str, config: &RoomConfig) -> Result<Self, ParamError> {
        let mut room_code = None;
        let mut username = None;
        let mut session_id = String::new();
        let mut authenticated = false;
        let mut game_mode = None;
        let mut room_type = None;
        let mut rounds = None;
        let mut timeout = None;

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = percent_decode(value);
            match key {
                "room" => room_code = non_empty(value),
                "username" => username = non_empty(value),
                "session" => session_id = value,
                "token" => authenticated = !value.is_empty(),
                "mode" => {
                    game_mode = match value.as_str() {
                        "FLAG" => Some(GameMode::Flag),
                        "WORLD_MAP" => Some(GameMode::WorldMap),
                        _ => None,
                    }
                }
                "type" => {
                    room_type = match value.as_str() {
                        "SINGLE" => Some(RoomType::Single),
                        "PRIVATE" => Some(RoomType::Private),
                        "PUBLIC" => Some(RoomType::Public),
                        _ => None,
                    }
                }
                "rounds" => rounds = value.parse::<u32>().ok().filter(|r| *r > 0),
                "timeout" => timeout = value.parse::<u32>().ok(),
                _ => {}
            }
        }

        let room_code = room_code.ok_or(ParamError::Missing("room"))?;
        let username = username.ok_or(ParamError::Missing("username"))?;

        if !authenticated {
            rounds = rounds.map(|r| r.min(config.guest_round_cap));
        }

        Ok(Self {
            room_code,
            username,
            session_id,
            authenticated,
            settings: RequestedSettings {
                game_mode,
                room_type,
                total_rounds: rounds,
                round_secs: timeout,
            },
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// Minimal percent-decoding: `+` to space, `%XX` hex pairs to bytes.
/// Invalid escapes pass through untouched.
fn percent_decode(s: &str) -> String {
    let mut out = Vec::with_capacity(s.len());
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 3 <= bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit() =>
            {
                let hi = hex_value(bytes[i + 1]);
                let lo = hex_value(bytes[i + 2]);
                out.push(hi << 4 | lo);
                i += 3;
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}
