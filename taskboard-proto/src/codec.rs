//! JSON encoding for the persisted board.
//!
//! [`decode`] is strict: it only accepts the current schema. Loading data
//! of unknown vintage goes through [`crate::migrate`] instead.

use crate::board::BoardState;

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Encodes a [`BoardState`] into JSON bytes.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the state cannot be serialized.
pub fn encode(state: &BoardState) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(state).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a current-schema [`BoardState`] from JSON bytes.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the bytes are not a current-schema board.
pub fn decode(bytes: &[u8]) -> Result<BoardState, CodecError> {
    serde_json::from_slice(bytes).map_err(|e| CodecError::Serialization(e.to_string()))
}
