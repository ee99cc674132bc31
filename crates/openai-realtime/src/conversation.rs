//! A conversation bound to one realtime session.
//!
//! A dedicated task drains the session's event stream and folds each event
//! into [`ConversationState`] in arrival order. Readers see snapshots through
//! a `watch` channel; server-reported errors go to a separate stream.

use crate::{
    config::CredentialProvider,
    error::{ConversationStateError, RealtimeError},
    id,
    state::{Applied, ConversationState},
    transport::{EventStream, RealtimeSession},
};
use futures_util::{Stream, StreamExt, stream};
use openai_realtime_types::{
    ClientEvent, Content, FunctionCallOutput, Item, Message, ResponseConfig, Role, ServerError,
    Session,
};
use std::{
    pin::Pin,
    sync::{Arc, Mutex as StdMutex, PoisonError},
};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Instrument, debug, error, info, info_span, warn};

/// Server errors kept for a caller that has not taken [`Conversation::errors`]
/// yet. Further errors are logged and discarded until there is room.
pub const ERROR_BUFFER: usize = 64;

/// Errors the server reported while the conversation kept running.
pub type ErrorStream = Pin<Box<dyn Stream<Item = ServerError> + Send>>;

pub struct Conversation {
    transport: Arc<RealtimeSession>,
    state: watch::Receiver<ConversationState>,
    errors: StdMutex<Option<mpsc::Receiver<ServerError>>>,
    reducer: JoinHandle<()>,
}

impl Conversation {
    /// Opens a new session and starts a conversation on it.
    pub async fn connect(provider: &dyn CredentialProvider) -> Result<Self, RealtimeError> {
        let transport = RealtimeSession::connect(provider).await?;
        Ok(Self::new(transport))
    }

    /// Starts consuming `transport`'s events. The session's event stream is
    /// taken here, so it must not have been taken before.
    pub fn new(transport: RealtimeSession) -> Self {
        let transport = Arc::new(transport);
        let events = transport.events();
        let (state_tx, state_rx) = watch::channel(ConversationState::default());
        let (errors_tx, errors_rx) = mpsc::channel(ERROR_BUFFER);

        let reducer = tokio::spawn(
            run_reducer(events, Publisher(state_tx), errors_tx)
                .instrument(info_span!("conversation")),
        );

        Self {
            transport,
            state: state_rx,
            errors: StdMutex::new(Some(errors_rx)),
            reducer,
        }
    }

    /// Resolves once `session.created` has been applied. Fails if the event
    /// stream ends first.
    pub async fn wait_connected(&self) -> Result<(), RealtimeError> {
        let mut rx = self.state.clone();
        match rx.wait_for(|state| state.connected).await {
            Ok(_) => Ok(()),
            Err(_) => Err(ConversationStateError::Disconnected.into()),
        }
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> ConversationState {
        self.state.borrow().clone()
    }

    /// Change notifications. Every applied mutation marks the value changed.
    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.state.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    /// Takes the stream of server-reported errors. Only the first call gets
    /// errors, including up to [`ERROR_BUFFER`] reported before it.
    pub fn errors(&self) -> ErrorStream {
        match self
            .errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            Some(rx) => Box::pin(ReceiverStream::new(rx)),
            None => Box::pin(stream::empty()),
        }
    }

    pub fn transport(&self) -> &Arc<RealtimeSession> {
        &self.transport
    }

    /// Sends any client event as-is.
    pub async fn send(&self, event: &ClientEvent) -> Result<(), RealtimeError> {
        self.transport.send(event).await
    }

    /// Applies `mutate` to a copy of the current session and sends it as a
    /// `session.update`. The server-assigned id is never sent back.
    pub async fn update_session<F>(&self, mutate: F) -> Result<(), RealtimeError>
    where
        F: FnOnce(&mut Session) + Send,
    {
        let mut session = self
            .state
            .borrow()
            .session
            .clone()
            .ok_or(ConversationStateError::SessionNotFound)?;
        mutate(&mut session);
        self.transport
            .send(&ClientEvent::session_update(&session))
            .await
    }

    /// Adds a text message with a fresh item id. A `response.create` follows
    /// only when `response` is given.
    pub async fn send_text(
        &self,
        role: Role,
        text: impl Into<String>,
        response: Option<ResponseConfig>,
    ) -> Result<(), RealtimeError> {
        let part = match role {
            Role::Assistant => Content::text_part(text),
            Role::User | Role::System => Content::input_text(text),
        };
        let item = Item::Message(Message::new(id::item_id(), role, vec![part]));
        self.transport.send(&ClientEvent::create_item(item)).await?;

        if let Some(config) = response {
            self.transport
                .send(&ClientEvent::create_response(Some(config)))
                .await?;
        }
        Ok(())
    }

    /// Appends audio to the input buffer, committing it when `commit` is set.
    pub async fn send_audio_delta(&self, audio: Vec<u8>, commit: bool) -> Result<(), RealtimeError> {
        self.transport
            .send(&ClientEvent::append_audio(audio))
            .await?;
        if commit {
            self.transport.send(&ClientEvent::commit_audio()).await?;
        }
        Ok(())
    }

    pub async fn send_function_result(
        &self,
        output: FunctionCallOutput,
    ) -> Result<(), RealtimeError> {
        self.transport
            .send(&ClientEvent::create_item(Item::FunctionCallOutput(output)))
            .await
    }

    pub async fn cancel_response(&self) -> Result<(), RealtimeError> {
        self.transport.send(&ClientEvent::cancel_response()).await
    }

    pub async fn delete_item(&self, item_id: impl Into<String>) -> Result<(), RealtimeError> {
        self.transport
            .send(&ClientEvent::delete_item(item_id))
            .await
    }

    /// Closes the session and waits for the reducer to finish. Safe to call
    /// more than once.
    pub async fn close(&self) {
        self.transport.close().await;
        let mut rx = self.state.clone();
        while rx.changed().await.is_ok() {}
    }
}

impl Drop for Conversation {
    fn drop(&mut self) {
        self.reducer.abort();
    }
}

/// The reducer's handle on the published state. Dropping it, whether the
/// task finished or was aborted, leaves observers with `connected == false`.
struct Publisher(watch::Sender<ConversationState>);

impl Drop for Publisher {
    fn drop(&mut self) {
        self.0.send_if_modified(|current| std::mem::replace(&mut current.connected, false));
    }
}

async fn run_reducer(
    mut events: EventStream,
    state: Publisher,
    errors: mpsc::Sender<ServerError>,
) {
    while let Some(next) = events.next().await {
        let event = match next {
            Ok(event) => event,
            Err(e) => {
                error!(error = %e, "Conversation event stream failed.");
                break;
            }
        };

        let kind = event.kind();
        let mut applied = Applied::Ignored;
        state.0.send_if_modified(|current| {
            applied = current.apply(event);
            applied.is_updated()
        });

        match applied {
            Applied::ServerError(e) => {
                warn!(error = %e, "Server reported an error.");
                if let Err(mpsc::error::TrySendError::Full(e)) = errors.try_send(e) {
                    debug!(error = %e, "Error buffer full, discarding server error.");
                }
            }
            Applied::Dropped(reason) => {
                debug!(kind, ?reason, "Dropped event with no matching target.");
            }
            Applied::Updated | Applied::Ignored => {}
        }
    }

    info!("Conversation ended.");
}
