//! JSON codec helpers.
//!
//! The wire format is plain JSON text frames — human-readable, directly
//! inspectable in browser DevTools, and the format the web client speaks.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Serializes a message to its JSON wire form.
pub fn encode<T: Serialize>(value: &T) -> Result<String, ProtocolError> {
    serde_json::to_string(value).map_err(ProtocolError::Encode)
}

/// Parses a JSON wire frame into a typed message.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::Decode)
}
