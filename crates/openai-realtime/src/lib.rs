//! Client for the OpenAI Realtime API.
//!
//! [`RealtimeSession`] owns the WebSocket and yields decoded server events.
//! [`Conversation`] consumes those events and keeps an observable
//! [`ConversationState`] up to date, while exposing the outbound operations.

pub mod config;
pub mod conversation;
pub mod error;
pub mod id;
pub mod state;
pub mod transport;

pub use config::{ConfigError, CredentialProvider, RealtimeConfig};
pub use conversation::{Conversation, ERROR_BUFFER, ErrorStream};
pub use error::{ConversationStateError, RealtimeError};
pub use state::{Applied, ConversationState, DropReason};
pub use transport::{EventStream, RealtimeSession};

pub use openai_realtime_types as types;
