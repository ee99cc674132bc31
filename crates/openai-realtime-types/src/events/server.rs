//! Events received from the server.
//!
//! Decoding is two-pass: the `type` discriminator is read first, then the
//! whole object is decoded into that variant's payload struct. An unknown
//! discriminator is an error, not a skip.

use crate::{
    audio::base64_bytes,
    error::{CodecError, ServerError},
    item::{Content, Item},
    response::{RateLimit, Response},
    session::Session,
};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;

macro_rules! server_events {
    ($( $(#[$meta:meta])* $wire:literal => $variant:ident($payload:ty), )*) => {
        /// Inbound event. Every payload carries the server-generated
        /// `event_id`.
        #[derive(Debug, Clone, PartialEq, Serialize)]
        #[serde(tag = "type")]
        pub enum ServerEvent {
            $(
                $(#[$meta])*
                #[serde(rename = $wire)]
                $variant($payload),
            )*
        }

        impl ServerEvent {
            /// The wire `type` of this event.
            pub fn kind(&self) -> &'static str {
                match self {
                    $( ServerEvent::$variant(_) => $wire, )*
                }
            }

            /// Server-generated id of this event.
            pub fn event_id(&self) -> &str {
                match self {
                    $( ServerEvent::$variant(event) => &event.event_id, )*
                }
            }

            /// Decodes a JSON object whose `type` has already been parsed
            /// into a `Value`.
            pub fn from_value(value: Value) -> Result<Self, CodecError> {
                let kind = value
                    .get("type")
                    .and_then(Value::as_str)
                    .ok_or(CodecError::MissingType)?
                    .to_owned();
                match kind.as_str() {
                    $( $wire => Ok(ServerEvent::$variant(payload(value)?)), )*
                    _ => Err(CodecError::UnknownType(kind)),
                }
            }
        }
    };
}

fn payload<T: DeserializeOwned>(value: Value) -> Result<T, CodecError> {
    Ok(serde_json::from_value(value)?)
}

server_events! {
    "error" => Error(ErrorEvent),
    "session.created" => SessionCreated(SessionCreatedEvent),
    "session.updated" => SessionUpdated(SessionUpdatedEvent),
    "conversation.created" => ConversationCreated(ConversationCreatedEvent),
    "conversation.item.created" => ConversationItemCreated(ConversationItemCreatedEvent),
    "conversation.item.deleted" => ConversationItemDeleted(ConversationItemDeletedEvent),
    "conversation.item.truncated" => ConversationItemTruncated(ConversationItemTruncatedEvent),
    "conversation.item.input_audio_transcription.delta" =>
        InputAudioTranscriptionDelta(InputAudioTranscriptionDeltaEvent),
    "conversation.item.input_audio_transcription.completed" =>
        InputAudioTranscriptionCompleted(InputAudioTranscriptionCompletedEvent),
    "conversation.item.input_audio_transcription.failed" =>
        InputAudioTranscriptionFailed(InputAudioTranscriptionFailedEvent),
    "input_audio_buffer.committed" => InputAudioBufferCommitted(InputAudioBufferCommittedEvent),
    "input_audio_buffer.cleared" => InputAudioBufferCleared(InputAudioBufferClearedEvent),
    "input_audio_buffer.speech_started" =>
        InputAudioBufferSpeechStarted(InputAudioBufferSpeechStartedEvent),
    "input_audio_buffer.speech_stopped" =>
        InputAudioBufferSpeechStopped(InputAudioBufferSpeechStoppedEvent),
    "response.created" => ResponseCreated(ResponseCreatedEvent),
    "response.done" => ResponseDone(ResponseDoneEvent),
    "response.output_item.added" => ResponseOutputItemAdded(ResponseOutputItemEvent),
    "response.output_item.done" => ResponseOutputItemDone(ResponseOutputItemEvent),
    "response.content_part.added" => ResponseContentPartAdded(ResponseContentPartEvent),
    "response.content_part.done" => ResponseContentPartDone(ResponseContentPartEvent),
    "response.text.delta" => ResponseTextDelta(ResponseTextDeltaEvent),
    "response.text.done" => ResponseTextDone(ResponseTextDoneEvent),
    "response.audio_transcript.delta" => ResponseAudioTranscriptDelta(ResponseTextDeltaEvent),
    "response.audio_transcript.done" => ResponseAudioTranscriptDone(ResponseAudioTranscriptDoneEvent),
    "response.audio.delta" => ResponseAudioDelta(ResponseAudioDeltaEvent),
    "response.audio.done" => ResponseAudioDone(ResponseAudioDoneEvent),
    "response.function_call_arguments.delta" =>
        ResponseFunctionCallArgumentsDelta(ResponseFunctionCallArgumentsDeltaEvent),
    "response.function_call_arguments.done" =>
        ResponseFunctionCallArgumentsDone(ResponseFunctionCallArgumentsDoneEvent),
    "rate_limits.updated" => RateLimitsUpdated(RateLimitsUpdatedEvent),
}

impl<'de> Deserialize<'de> for ServerEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;
        let value = Value::deserialize(deserializer)?;
        ServerEvent::from_value(value).map_err(D::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    #[serde(default)]
    pub event_id: String,
    pub error: ServerError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCreatedEvent {
    #[serde(default)]
    pub event_id: String,
    pub session: Session,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdatedEvent {
    #[serde(default)]
    pub event_id: String,
    pub session: Session,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationInfo {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationCreatedEvent {
    #[serde(default)]
    pub event_id: String,
    pub conversation: ConversationInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationItemCreatedEvent {
    #[serde(default)]
    pub event_id: String,
    /// Ordering hint. The conversation always appends regardless.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_item_id: Option<String>,
    pub item: Item,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationItemDeletedEvent {
    #[serde(default)]
    pub event_id: String,
    pub item_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationItemTruncatedEvent {
    #[serde(default)]
    pub event_id: String,
    pub item_id: String,
    pub content_index: usize,
    pub audio_end_ms: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputAudioTranscriptionDeltaEvent {
    #[serde(default)]
    pub event_id: String,
    pub item_id: String,
    pub content_index: usize,
    pub delta: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputAudioTranscriptionCompletedEvent {
    #[serde(default)]
    pub event_id: String,
    pub item_id: String,
    pub content_index: usize,
    pub transcript: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputAudioTranscriptionFailedEvent {
    #[serde(default)]
    pub event_id: String,
    pub item_id: String,
    pub content_index: usize,
    pub error: ServerError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputAudioBufferCommittedEvent {
    #[serde(default)]
    pub event_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_item_id: Option<String>,
    pub item_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputAudioBufferClearedEvent {
    #[serde(default)]
    pub event_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputAudioBufferSpeechStartedEvent {
    #[serde(default)]
    pub event_id: String,
    pub audio_start_ms: u32,
    pub item_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputAudioBufferSpeechStoppedEvent {
    #[serde(default)]
    pub event_id: String,
    pub audio_end_ms: u32,
    pub item_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseCreatedEvent {
    #[serde(default)]
    pub event_id: String,
    pub response: Response,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseDoneEvent {
    #[serde(default)]
    pub event_id: String,
    pub response: Response,
}

/// Payload of `response.output_item.added` and `response.output_item.done`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseOutputItemEvent {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub response_id: String,
    #[serde(default)]
    pub output_index: usize,
    pub item: Item,
}

/// Payload of `response.content_part.added` and `response.content_part.done`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseContentPartEvent {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub response_id: String,
    pub item_id: String,
    #[serde(default)]
    pub output_index: usize,
    pub content_index: usize,
    pub part: Content,
}

/// Payload of `response.text.delta` and `response.audio_transcript.delta`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseTextDeltaEvent {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub response_id: String,
    pub item_id: String,
    #[serde(default)]
    pub output_index: usize,
    pub content_index: usize,
    pub delta: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseTextDoneEvent {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub response_id: String,
    pub item_id: String,
    #[serde(default)]
    pub output_index: usize,
    pub content_index: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseAudioTranscriptDoneEvent {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub response_id: String,
    pub item_id: String,
    #[serde(default)]
    pub output_index: usize,
    pub content_index: usize,
    pub transcript: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseAudioDeltaEvent {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub response_id: String,
    pub item_id: String,
    #[serde(default)]
    pub output_index: usize,
    pub content_index: usize,
    #[serde(with = "base64_bytes")]
    pub delta: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseAudioDoneEvent {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub response_id: String,
    pub item_id: String,
    #[serde(default)]
    pub output_index: usize,
    pub content_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFunctionCallArgumentsDeltaEvent {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub response_id: String,
    pub item_id: String,
    #[serde(default)]
    pub output_index: usize,
    #[serde(default)]
    pub call_id: String,
    pub delta: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFunctionCallArgumentsDoneEvent {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub response_id: String,
    pub item_id: String,
    #[serde(default)]
    pub output_index: usize,
    #[serde(default)]
    pub call_id: String,
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitsUpdatedEvent {
    #[serde(default)]
    pub event_id: String,
    pub rate_limits: Vec<RateLimit>,
}
