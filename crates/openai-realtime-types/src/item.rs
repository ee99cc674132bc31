//! Conversation items and their content parts.

use crate::audio::base64_bytes;
use serde::{Deserialize, Serialize};

/// One entry of a conversation: a message, a function call, or the output
/// of a function call. Identity is the item id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Item {
    Message(Message),
    FunctionCall(FunctionCall),
    FunctionCallOutput(FunctionCallOutput),
}

impl Item {
    pub fn id(&self) -> &str {
        match self {
            Item::Message(message) => &message.id,
            Item::FunctionCall(call) => &call.id,
            Item::FunctionCallOutput(output) => &output.id,
        }
    }

    pub fn status(&self) -> ItemStatus {
        match self {
            Item::Message(message) => message.status,
            Item::FunctionCall(call) => call.status,
            Item::FunctionCallOutput(output) => output.status,
        }
    }

    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Item::Message(message) => Some(message),
            _ => None,
        }
    }

    pub fn as_function_call(&self) -> Option<&FunctionCall> {
        match self {
            Item::FunctionCall(call) => Some(call),
            _ => None,
        }
    }
}

/// Lifecycle status of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    InProgress,
    #[default]
    Completed,
    Incomplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub status: ItemStatus,
    pub role: Role,
    #[serde(default)]
    pub content: Vec<Content>,
}

impl Message {
    pub fn new(id: impl Into<String>, role: Role, content: Vec<Content>) -> Self {
        Self {
            id: id.into(),
            status: ItemStatus::Completed,
            role,
            content,
        }
    }

    /// Concatenated text of all text parts, or audio transcripts when the
    /// message carries audio instead.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| part.text().or_else(|| part.transcript()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub id: String,
    #[serde(default)]
    pub status: ItemStatus,
    pub call_id: String,
    pub name: String,
    /// JSON-encoded arguments, possibly partial while streaming.
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallOutput {
    pub id: String,
    #[serde(default)]
    pub status: ItemStatus,
    pub call_id: String,
    pub output: String,
}

impl FunctionCallOutput {
    pub fn new(id: impl Into<String>, call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: ItemStatus::Completed,
            call_id: call_id.into(),
            output: output.into(),
        }
    }
}

/// A content part of a message, addressed by its position in
/// [`Message::content`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text {
        #[serde(default)]
        text: String,
    },
    InputText {
        #[serde(default)]
        text: String,
    },
    Audio {
        #[serde(default, with = "base64_bytes")]
        audio: Vec<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transcript: Option<String>,
    },
    InputAudio {
        #[serde(default, with = "base64_bytes")]
        audio: Vec<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transcript: Option<String>,
    },
}

impl Content {
    pub fn text_part(text: impl Into<String>) -> Self {
        Content::Text { text: text.into() }
    }

    pub fn input_text(text: impl Into<String>) -> Self {
        Content::InputText { text: text.into() }
    }

    pub fn audio_part(audio: Vec<u8>, transcript: Option<String>) -> Self {
        Content::Audio { audio, transcript }
    }

    pub fn input_audio(audio: Vec<u8>, transcript: Option<String>) -> Self {
        Content::InputAudio { audio, transcript }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Content::Text { text } | Content::InputText { text } => Some(text),
            Content::Audio { .. } | Content::InputAudio { .. } => None,
        }
    }

    pub fn transcript(&self) -> Option<&str> {
        match self {
            Content::Audio { transcript, .. } | Content::InputAudio { transcript, .. } => {
                transcript.as_deref()
            }
            Content::Text { .. } | Content::InputText { .. } => None,
        }
    }

    pub fn audio(&self) -> Option<&[u8]> {
        match self {
            Content::Audio { audio, .. } | Content::InputAudio { audio, .. } => Some(audio),
            Content::Text { .. } | Content::InputText { .. } => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Content::Text { .. } | Content::InputText { .. })
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, Content::Audio { .. } | Content::InputAudio { .. })
    }
}
