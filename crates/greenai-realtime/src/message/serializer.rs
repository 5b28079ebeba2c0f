//! JSON serialization for WebSocket messages.

use greenai_core::error::AppError;

use super::types::{InboundMessage, OutboundMessage};
use super::validator::validate_inbound;

/// Serialize an outbound message to JSON
pub fn serialize_outbound(msg: &OutboundMessage) -> Result<String, AppError> {
    Ok(serde_json::to_string(msg)?)
}

/// Validate and deserialize an inbound message from JSON
pub fn deserialize_inbound(text: &str) -> Result<InboundMessage, AppError> {
    validate_inbound(text)?;
    serde_json::from_str(text)
        .map_err(|e| AppError::validation(format!("Failed to parse message: {e}")))
}
