use openai_realtime_types::CodecError;
use tokio_tungstenite::tungstenite;

/// Errors surfaced by the transport and the conversation.
///
/// `Transport`, `Decode` and `UnexpectedFrame` end the event sequence they
/// appear in; the only remedy is a new connection. Server-reported problems
/// are not errors here: they arrive as [`openai_realtime_types::ServerError`]
/// on the conversation's error channel.
#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    #[error("WebSocket transport error: {0}")]
    Transport(#[from] tungstenite::Error),
    #[error("Failed to decode server event: {0}")]
    Decode(#[from] CodecError),
    #[error("Unexpected {0} frame from server")]
    UnexpectedFrame(&'static str),
    #[error("Realtime session is closed")]
    Closed,
    #[error(transparent)]
    ConversationState(#[from] ConversationStateError),
    #[error("Invalid connection request: {0}")]
    InvalidRequest(String),
}

impl RealtimeError {
    /// True for malformed or unrecognized frames.
    pub fn is_protocol_decode(&self) -> bool {
        matches!(self, RealtimeError::Decode(_) | RealtimeError::UnexpectedFrame(_))
    }
}

/// A local precondition was violated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversationStateError {
    #[error("No session has been established yet")]
    SessionNotFound,
    #[error("Connection ended before a session was established")]
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!("{}", RealtimeError::from(ConversationStateError::SessionNotFound)),
            "No session has been established yet"
        );
        assert_eq!(
            format!("{}", RealtimeError::UnexpectedFrame("binary")),
            "Unexpected binary frame from server"
        );
    }

    #[test]
    fn test_protocol_decode_classification() {
        assert!(RealtimeError::UnexpectedFrame("binary").is_protocol_decode());
        assert!(RealtimeError::Decode(CodecError::MissingType).is_protocol_decode());
        assert!(!RealtimeError::Closed.is_protocol_decode());
    }
}
