//! Error types for the room layer.

/// Errors crossing the room/hub API boundary.
///
/// Note that most *gameplay* rejections are not errors — they come back
/// as [`crate::CommandOutcome::Rejected`] with a reason, because a
/// non-owner pressing "start" is normal traffic, not a fault.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room actor is gone (torn down or mailbox closed). Also
    /// covers a command that was queued but never answered because the
    /// actor stopped first.
    #[error("room {0} is unavailable")]
    Unavailable(String),
}
