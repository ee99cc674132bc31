//! Typed wire model for the OpenAI Realtime protocol.
//!
//! Every frame is a flat JSON object discriminated by its `type` field.
//! [`encode`] and [`decode`] are the codec boundary: audio is base64 on the
//! wire and raw bytes in memory.

pub mod audio;
pub mod error;
pub mod events;
pub mod item;
pub mod response;
pub mod session;

pub use error::{CodecError, ServerError};
pub use events::{ClientEvent, ServerEvent};
pub use item::{Content, FunctionCall, FunctionCallOutput, Item, ItemStatus, Message, Role};
pub use response::{Response, ResponseConfig, ResponseStatus};
pub use session::{
    AudioFormat, InputAudioTranscription, MaxOutputTokens, Modality, Session, Tool, ToolChoice,
    TurnDetection, TurnDetectionType, Voice,
};

/// Encodes a client event into a single text frame.
pub fn encode(event: &ClientEvent) -> Result<String, CodecError> {
    Ok(serde_json::to_string(event)?)
}

/// Decodes one text frame into a server event.
///
/// The frame is parsed once into a JSON value, its `type` is read, and the
/// value is then decoded into the matching variant.
pub fn decode(text: &str) -> Result<ServerEvent, CodecError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    ServerEvent::from_value(value)
}
