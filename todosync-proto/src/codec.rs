//! JSON encode/decode helpers shared by the durable store and transports.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Encodes a value as pretty-printed JSON bytes.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the value cannot be serialized.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec_pretty(value).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a value from JSON bytes.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the bytes are not valid JSON for `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    serde_json::from_slice(bytes).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Converts a value into a [`serde_json::Value`] request body.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the value cannot be serialized.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<serde_json::Value, CodecError> {
    serde_json::to_value(value).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a typed value out of a parsed response body.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the value does not match `T`.
pub fn from_value<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, CodecError> {
    serde_json::from_value(value).map_err(|e| CodecError::Serialization(e.to_string()))
}
