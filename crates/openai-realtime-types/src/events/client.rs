//! Events sent from the client to the server.

use crate::{audio::base64_bytes, item::Item, response::ResponseConfig, session::Session};
use serde::{Deserialize, Serialize, Serializer};

/// Outbound event. Encodes to a flat JSON object whose `type` field names
/// the variant, with the variant's fields alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "session.update")]
    SessionUpdate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        /// The server rejects a session carrying its own id, so it is
        /// always stripped on encode.
        #[serde(serialize_with = "serialize_session_without_id")]
        session: Session,
    },
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        #[serde(with = "base64_bytes")]
        audio: Vec<u8>,
    },
    #[serde(rename = "input_audio_buffer.commit")]
    InputAudioBufferCommit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
    },
    #[serde(rename = "input_audio_buffer.clear")]
    InputAudioBufferClear {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
    },
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        previous_item_id: Option<String>,
        item: Item,
    },
    #[serde(rename = "conversation.item.truncate")]
    ConversationItemTruncate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        item_id: String,
        content_index: usize,
        audio_end_ms: u32,
    },
    #[serde(rename = "conversation.item.delete")]
    ConversationItemDelete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        item_id: String,
    },
    #[serde(rename = "response.create")]
    ResponseCreate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response: Option<ResponseConfig>,
    },
    #[serde(rename = "response.cancel")]
    ResponseCancel {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
    },
}

fn serialize_session_without_id<S: Serializer>(
    session: &Session,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    if session.id.is_some() {
        session.without_id().serialize(serializer)
    } else {
        session.serialize(serializer)
    }
}

impl ClientEvent {
    pub fn session_update(session: &Session) -> Self {
        ClientEvent::SessionUpdate {
            event_id: None,
            session: session.without_id(),
        }
    }

    pub fn append_audio(audio: Vec<u8>) -> Self {
        ClientEvent::InputAudioBufferAppend {
            event_id: None,
            audio,
        }
    }

    pub fn commit_audio() -> Self {
        ClientEvent::InputAudioBufferCommit { event_id: None }
    }

    pub fn clear_audio() -> Self {
        ClientEvent::InputAudioBufferClear { event_id: None }
    }

    pub fn create_item(item: Item) -> Self {
        ClientEvent::ConversationItemCreate {
            event_id: None,
            previous_item_id: None,
            item,
        }
    }

    pub fn truncate_item(item_id: impl Into<String>, content_index: usize, audio_end_ms: u32) -> Self {
        ClientEvent::ConversationItemTruncate {
            event_id: None,
            item_id: item_id.into(),
            content_index,
            audio_end_ms,
        }
    }

    pub fn delete_item(item_id: impl Into<String>) -> Self {
        ClientEvent::ConversationItemDelete {
            event_id: None,
            item_id: item_id.into(),
        }
    }

    pub fn create_response(response: Option<ResponseConfig>) -> Self {
        ClientEvent::ResponseCreate {
            event_id: None,
            response,
        }
    }

    pub fn cancel_response() -> Self {
        ClientEvent::ResponseCancel { event_id: None }
    }

    /// Sets the client-side correlation id echoed back in server errors.
    pub fn with_event_id(mut self, id: impl Into<String>) -> Self {
        let slot = match &mut self {
            ClientEvent::SessionUpdate { event_id, .. }
            | ClientEvent::InputAudioBufferAppend { event_id, .. }
            | ClientEvent::InputAudioBufferCommit { event_id }
            | ClientEvent::InputAudioBufferClear { event_id }
            | ClientEvent::ConversationItemCreate { event_id, .. }
            | ClientEvent::ConversationItemTruncate { event_id, .. }
            | ClientEvent::ConversationItemDelete { event_id, .. }
            | ClientEvent::ResponseCreate { event_id, .. }
            | ClientEvent::ResponseCancel { event_id } => event_id,
        };
        *slot = Some(id.into());
        self
    }

    pub fn event_id(&self) -> Option<&str> {
        match self {
            ClientEvent::SessionUpdate { event_id, .. }
            | ClientEvent::InputAudioBufferAppend { event_id, .. }
            | ClientEvent::InputAudioBufferCommit { event_id }
            | ClientEvent::InputAudioBufferClear { event_id }
            | ClientEvent::ConversationItemCreate { event_id, .. }
            | ClientEvent::ConversationItemTruncate { event_id, .. }
            | ClientEvent::ConversationItemDelete { event_id, .. }
            | ClientEvent::ResponseCreate { event_id, .. }
            | ClientEvent::ResponseCancel { event_id } => event_id.as_deref(),
        }
    }

    /// The wire `type` of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientEvent::SessionUpdate { .. } => "session.update",
            ClientEvent::InputAudioBufferAppend { .. } => "input_audio_buffer.append",
            ClientEvent::InputAudioBufferCommit { .. } => "input_audio_buffer.commit",
            ClientEvent::InputAudioBufferClear { .. } => "input_audio_buffer.clear",
            ClientEvent::ConversationItemCreate { .. } => "conversation.item.create",
            ClientEvent::ConversationItemTruncate { .. } => "conversation.item.truncate",
            ClientEvent::ConversationItemDelete { .. } => "conversation.item.delete",
            ClientEvent::ResponseCreate { .. } => "response.create",
            ClientEvent::ResponseCancel { .. } => "response.cancel",
        }
    }
}
