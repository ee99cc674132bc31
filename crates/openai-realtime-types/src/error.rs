use serde::{Deserialize, Serialize};
use std::fmt;

/// An error reported by the server inside an `error` event or a failed
/// input audio transcription. Informational: it never ends the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error category, e.g. `invalid_request_error`.
    #[serde(rename = "type")]
    pub error_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    /// Offending parameter, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    /// Id of the client event that caused the error, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({}): {}", self.error_type, code, self.message),
            None => write!(f, "{}: {}", self.error_type, self.message),
        }
    }
}

impl std::error::Error for ServerError {}

/// Failure to map a wire frame to a typed event.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Malformed event JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Event is missing the `type` discriminator")]
    MissingType,
    #[error("Unknown event type: {0}")]
    UnknownType(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_display() {
        let error = ServerError {
            error_type: "invalid_request_error".to_string(),
            code: Some("invalid_value".to_string()),
            message: "bad".to_string(),
            param: None,
            event_id: None,
        };
        assert_eq!(
            format!("{}", error),
            "invalid_request_error (invalid_value): bad"
        );
    }

    #[test]
    fn test_codec_error_display() {
        assert_eq!(
            format!("{}", CodecError::UnknownType("foo.bar".to_string())),
            "Unknown event type: foo.bar"
        );
        assert_eq!(
            format!("{}", CodecError::MissingType),
            "Event is missing the `type` discriminator"
        );
    }
}
