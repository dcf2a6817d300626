//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire messages.
///
/// A `Decode` error on an inbound frame is normal operation (clients can
/// send garbage); the read pump logs it and drops the frame. An `Encode`
/// error on an outbound message is a bug — every server type serializes.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into JSON).
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Deserialization failed — malformed JSON, unknown message type,
    /// or a payload that doesn't match the declared type.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),
}
