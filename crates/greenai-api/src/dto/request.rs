//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use greenai_core::error::AppError;

/// Body of the usage check endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UsageCheckRequest {
    /// Resource type, e.g. `ai_queries`.
    #[validate(length(min = 1, max = 64, message = "Resource is required"))]
    pub resource: String,
}

/// Body of the usage track endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UsageTrackRequest {
    /// Resource type, e.g. `ai_queries`.
    #[validate(length(min = 1, max = 64, message = "Resource is required"))]
    pub resource: String,
    /// Uses to record.
    #[serde(default = "default_amount")]
    #[validate(range(min = 1, max = 1000))]
    pub amount: u64,
}

fn default_amount() -> u64 {
    1
}

/// Runs `validator` checks and maps failures to a validation error.
pub fn validated<T: Validate>(body: T) -> Result<T, AppError> {
    body.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_amount_defaults_to_one() {
        let req: UsageTrackRequest = serde_json::from_str(r#"{"resource":"ai_queries"}"#).unwrap();
        assert_eq!(req.amount, 1);
        assert!(validated(req).is_ok());
    }

    #[test]
    fn test_empty_resource_and_zero_amount_rejected() {
        let check = UsageCheckRequest {
            resource: String::new(),
        };
        assert!(validated(check).is_err());

        let track = UsageTrackRequest {
            resource: "ai_queries".to_string(),
            amount: 0,
        };
        assert!(validated(track).is_err());
    }
}
