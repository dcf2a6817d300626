//! Room and cache tuning knobs.

use std::time::Duration;

/// When a timed round ends early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundEndPolicy {
    /// The first correct answer deactivates the round; the round ends
    /// after a short grace so slower clients see the final broadcasts.
    #[default]
    FirstCorrectEnds,
    /// The round stays open until every attached player has answered
    /// correctly (or the timer expires).
    AllAnswered,
}

/// Per-room behavior. One value is shared by every room the hub spawns.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Advertised capacity in the public listing.
    pub max_players: usize,
    /// Round length in seconds when the creator doesn't pick one.
    pub default_round_secs: u32,
    /// Inclusive bounds for a creator-supplied round length.
    pub round_secs_range: (u32, u32),
    /// Round cap for unauthenticated players.
    pub guest_round_cap: u32,
    pub round_end_policy: RoundEndPolicy,
    /// Delay between a round going inactive and its end-of-round
    /// broadcasts, so in-flight answers drain.
    pub answer_grace: Duration,
    /// Gap between `round_ended` and the next `round_started`.
    pub round_gap: Duration,
    /// Gap between the last `round_ended` and `game_completed`.
    pub completion_gap: Duration,
    /// How long to let a `room_closed` notice flush before connections
    /// are force-closed.
    pub close_flush: Duration,
    /// Consecutive rounds ending with zero attached clients before the
    /// room tears itself down.
    pub inactive_round_limit: u32,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 6,
            default_round_secs: 15,
            round_secs_range: (10, 60),
            guest_round_cap: 20,
            round_end_policy: RoundEndPolicy::default(),
            answer_grace: Duration::from_secs(2),
            round_gap: Duration::from_secs(3),
            completion_gap: Duration::from_secs(4),
            close_flush: Duration::from_millis(100),
            inactive_round_limit: 3,
        }
    }
}

impl RoomConfig {
    /// Clamps a client-requested round length into the allowed range.
    pub fn clamp_round_secs(&self, requested: u32) -> u32 {
        requested.clamp(self.round_secs_range.0, self.round_secs_range.1)
    }
}

/// Reconnection-cache tuning.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long a snapshot stays restorable after its last activity.
    pub ttl: Duration,
    /// How often the background sweeper evicts expired snapshots.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(5 * 60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_game_tuning() {
        let config = RoomConfig::default();
        assert_eq!(config.default_round_secs, 15);
        assert_eq!(config.inactive_round_limit, 3);
        assert_eq!(config.answer_grace, Duration::from_secs(2));
        assert_eq!(config.round_end_policy, RoundEndPolicy::FirstCorrectEnds);
    }

    #[test]
    fn test_round_secs_clamping() {
        let config = RoomConfig::default();
        assert_eq!(config.clamp_round_secs(5), 10);
        assert_eq!(config.clamp_round_secs(30), 30);
        assert_eq!(config.clamp_round_secs(600), 60);
    }
}
