//! Account-store seam.
//!
//! Rooms never talk to persistence directly — they go through this
//! trait, so the server can plug in a real backend while tests and the
//! default binary run with the no-op store.

use std::collections::HashMap;

/// Errors from an account backend.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("account store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence operations the game needs from a user-account backend.
pub trait AccountStore: Send + Sync + 'static {
    /// Avatar URL for a username, if the account has one.
    fn find_avatar_url(
        &self,
        username: &str,
    ) -> impl std::future::Future<Output = Option<String>> + Send;

    /// Records a finished game: final scores and the winning usernames.
    /// Fired and forgotten by the room — a failure is logged, never
    /// surfaced to players.
    fn apply_game_result(
        &self,
        scores: &HashMap<String, u32>,
        winners: &[String],
    ) -> impl std::future::Future<Output = Result<(), AccountError>> + Send;
}

/// Store used when no account backend is configured: no avatars, game
/// results dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAccountStore;

impl AccountStore for NoopAccountStore {
    async fn find_avatar_url(&self, _username: &str) -> Option<String> {
        None
    }

    async fn apply_game_result(
        &self,
        _scores: &HashMap<String, u32>,
        _winners: &[String],
    ) -> Result<(), AccountError> {
        Ok(())
    }
}

/// Usernames holding the maximum score, when that maximum is positive.
/// A 0-0 game has no winner.
pub fn winners(scores: &HashMap<String, u32>) -> Vec<String> {
    let top = scores.values().copied().max().unwrap_or(0);
    if top == 0 {
        return Vec::new();
    }
    let mut names: Vec<String> = scores
        .iter()
        .filter(|(_, score)| **score == top)
        .map(|(name, _)| name.clone())
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_winner() {
        let scores = HashMap::from([
            ("alice".to_string(), 90),
            ("bob".to_string(), 25),
        ]);
        assert_eq!(winners(&scores), vec!["alice"]);
    }

    #[test]
    fn test_tied_winners() {
        let scores = HashMap::from([
            ("alice".to_string(), 50),
            ("bob".to_string(), 50),
            ("carol".to_string(), 10),
        ]);
        assert_eq!(winners(&scores), vec!["alice", "bob"]);
    }

    #[test]
    fn test_scoreless_game_has_no_winner() {
        let scores = HashMap::from([("alice".to_string(), 0)]);
        assert!(winners(&scores).is_empty());
        assert!(winners(&HashMap::new()).is_empty());
    }
}
