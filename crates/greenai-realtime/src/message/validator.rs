//! Message validation rules.

use greenai_core::error::AppError;
use greenai_core::types::RoomId;

/// Maximum allowed message size in bytes.
const MAX_MESSAGE_SIZE: usize = 16_384;

/// Maximum room id length.
const MAX_ROOM_ID_LEN: usize = 128;

/// Largest notification page a client may request.
pub const MAX_PAGE_LIMIT: usize = 100;

/// Validates a raw inbound frame before parsing.
pub fn validate_inbound(raw: &str) -> Result<(), AppError> {
    if raw.len() > MAX_MESSAGE_SIZE {
        return Err(AppError::validation(format!(
            "Message exceeds maximum size of {} bytes",
            MAX_MESSAGE_SIZE
        )));
    }

    if raw.trim().is_empty() {
        return Err(AppError::validation("Empty message"));
    }

    Ok(())
}

/// Validates room id format.
pub fn validate_room_id(room_id: &RoomId) -> Result<(), AppError> {
    let id = room_id.as_str();
    if id.is_empty() || id.len() > MAX_ROOM_ID_LEN {
        return Err(AppError::validation("Invalid room id length"));
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == ':' || c == '-' || c == '_')
    {
        return Err(AppError::validation("Room id contains invalid characters"));
    }

    Ok(())
}

/// Clamps a requested notification page size into the accepted range.
pub fn clamp_page_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_PAGE_LIMIT)
}
