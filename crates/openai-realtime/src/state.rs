//! Conversation state and the reducer that folds server events into it.
//!
//! [`ConversationState::apply`] is a pure function of the current state and
//! one event. Deltas accumulate into the addressed content part; `done`
//! events overwrite it with the authoritative value. Events that reference a
//! missing item, an out-of-range content index, or a part of the wrong kind
//! are dropped without touching state.

use openai_realtime_types::{
    Content, FunctionCall, Item, Message, ServerError, ServerEvent, Session,
};

/// Observable state of one conversation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationState {
    /// Server-assigned conversation id.
    pub id: Option<String>,
    pub session: Option<Session>,
    /// Items in arrival order.
    pub entries: Vec<Item>,
    pub connected: bool,
}

/// Outcome of applying one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// State changed.
    Updated,
    /// The event carries nothing the conversation tracks.
    Ignored,
    /// The event targeted something that does not exist or has another shape.
    Dropped(DropReason),
    /// The server reported an error; state is untouched.
    ServerError(ServerError),
}

impl Applied {
    pub fn is_updated(&self) -> bool {
        matches!(self, Applied::Updated)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    ItemNotFound,
    NotAMessage,
    NotAFunctionCall,
    IndexOutOfBounds,
    WrongContentKind,
}

impl ConversationState {
    /// Entries that are messages, in order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().filter_map(Item::as_message)
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.entries.iter().find(|item| item.id() == id)
    }

    /// Applies one server event.
    pub fn apply(&mut self, event: ServerEvent) -> Applied {
        match event {
            ServerEvent::SessionCreated(e) => {
                self.connected = true;
                self.session = Some(e.session);
                Applied::Updated
            }
            ServerEvent::SessionUpdated(e) => {
                self.session = Some(e.session);
                Applied::Updated
            }
            ServerEvent::ConversationCreated(e) => {
                self.id = Some(e.conversation.id);
                Applied::Updated
            }
            ServerEvent::ConversationItemCreated(e) => {
                self.entries.push(e.item);
                Applied::Updated
            }
            ServerEvent::ConversationItemDeleted(e) => match self.position(&e.item_id) {
                Some(index) => {
                    self.entries.remove(index);
                    Applied::Updated
                }
                None => Applied::Dropped(DropReason::ItemNotFound),
            },
            ServerEvent::ResponseContentPartAdded(e) => {
                self.with_message(&e.item_id, |message| {
                    if e.content_index > message.content.len() {
                        return Err(DropReason::IndexOutOfBounds);
                    }
                    message.content.insert(e.content_index, e.part);
                    Ok(())
                })
            }
            ServerEvent::ResponseContentPartDone(e) => {
                self.with_part(&e.item_id, e.content_index, |part| {
                    *part = e.part;
                    Ok(())
                })
            }
            ServerEvent::ResponseTextDelta(e) => {
                self.with_part(&e.item_id, e.content_index, |part| match part {
                    Content::Text { text } | Content::InputText { text } => {
                        text.push_str(&e.delta);
                        Ok(())
                    }
                    _ => Err(DropReason::WrongContentKind),
                })
            }
            ServerEvent::ResponseTextDone(e) => {
                self.with_part(&e.item_id, e.content_index, |part| {
                    *part = match part {
                        Content::InputText { .. } => Content::InputText { text: e.text },
                        _ => Content::Text { text: e.text },
                    };
                    Ok(())
                })
            }
            ServerEvent::ResponseAudioTranscriptDelta(e) => {
                self.with_part(&e.item_id, e.content_index, |part| match part {
                    Content::Audio { transcript, .. } | Content::InputAudio { transcript, .. } => {
                        transcript.get_or_insert_with(String::new).push_str(&e.delta);
                        Ok(())
                    }
                    _ => Err(DropReason::WrongContentKind),
                })
            }
            ServerEvent::ResponseAudioTranscriptDone(e) => {
                self.set_transcript(&e.item_id, e.content_index, e.transcript)
            }
            ServerEvent::InputAudioTranscriptionCompleted(e) => {
                self.set_transcript(&e.item_id, e.content_index, e.transcript)
            }
            ServerEvent::ResponseAudioDelta(e) => {
                self.with_part(&e.item_id, e.content_index, |part| match part {
                    Content::Audio { audio, .. } | Content::InputAudio { audio, .. } => {
                        audio.extend_from_slice(&e.delta);
                        Ok(())
                    }
                    _ => Err(DropReason::WrongContentKind),
                })
            }
            ServerEvent::ResponseFunctionCallArgumentsDelta(e) => {
                self.with_function_call(&e.item_id, |call| call.arguments.push_str(&e.delta))
            }
            ServerEvent::ResponseFunctionCallArgumentsDone(e) => {
                self.with_function_call(&e.item_id, |call| call.arguments = e.arguments)
            }
            ServerEvent::InputAudioTranscriptionFailed(e) => Applied::ServerError(e.error),
            ServerEvent::Error(e) => Applied::ServerError(e.error),
            ServerEvent::ConversationItemTruncated(_)
            | ServerEvent::InputAudioTranscriptionDelta(_)
            | ServerEvent::InputAudioBufferCommitted(_)
            | ServerEvent::InputAudioBufferCleared(_)
            | ServerEvent::InputAudioBufferSpeechStarted(_)
            | ServerEvent::InputAudioBufferSpeechStopped(_)
            | ServerEvent::ResponseCreated(_)
            | ServerEvent::ResponseDone(_)
            | ServerEvent::ResponseOutputItemAdded(_)
            | ServerEvent::ResponseOutputItemDone(_)
            | ServerEvent::ResponseAudioDone(_)
            | ServerEvent::RateLimitsUpdated(_) => Applied::Ignored,
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|item| item.id() == id)
    }

    fn with_message(
        &mut self,
        item_id: &str,
        f: impl FnOnce(&mut Message) -> Result<(), DropReason>,
    ) -> Applied {
        let Some(index) = self.position(item_id) else {
            return Applied::Dropped(DropReason::ItemNotFound);
        };
        let Item::Message(message) = &mut self.entries[index] else {
            return Applied::Dropped(DropReason::NotAMessage);
        };
        match f(message) {
            Ok(()) => Applied::Updated,
            Err(reason) => Applied::Dropped(reason),
        }
    }

    fn with_part(
        &mut self,
        item_id: &str,
        content_index: usize,
        f: impl FnOnce(&mut Content) -> Result<(), DropReason>,
    ) -> Applied {
        self.with_message(item_id, |message| {
            let part = message
                .content
                .get_mut(content_index)
                .ok_or(DropReason::IndexOutOfBounds)?;
            f(part)
        })
    }

    fn set_transcript(&mut self, item_id: &str, content_index: usize, value: String) -> Applied {
        self.with_part(item_id, content_index, |part| match part {
            Content::Audio { transcript, .. } | Content::InputAudio { transcript, .. } => {
                *transcript = Some(value);
                Ok(())
            }
            _ => Err(DropReason::WrongContentKind),
        })
    }

    fn with_function_call(&mut self, item_id: &str, f: impl FnOnce(&mut FunctionCall)) -> Applied {
        let Some(index) = self.position(item_id) else {
            return Applied::Dropped(DropReason::ItemNotFound);
        };
        match &mut self.entries[index] {
            Item::FunctionCall(call) => {
                f(call);
                Applied::Updated
            }
            _ => Applied::Dropped(DropReason::NotAFunctionCall),
        }
    }
}
