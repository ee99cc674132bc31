//! Owns one WebSocket connection to the realtime endpoint.
//!
//! A background reader task decodes every inbound frame and forwards it to a
//! single-consumer event stream. The first error it yields is also the last
//! element of that stream. Writes go through a shared, locked sink so
//! concurrent senders never interleave frames.

use crate::{
    config::{CredentialProvider, build_request},
    error::RealtimeError,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt, stream};
use openai_realtime_types::{ClientEvent, ServerEvent, decode, encode};
use std::{
    pin::Pin,
    sync::{
        Arc, Mutex as StdMutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_tungstenite::{
    WebSocketStream, connect_async,
    tungstenite::{
        self, Message,
        handshake::client::Request,
        protocol::{CloseFrame, frame::coding::CloseCode},
    },
};
use tracing::{Instrument, debug, error, info, info_span};

/// Decoded inbound events. Ends after the connection closes or right after
/// the first error element.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<ServerEvent, RealtimeError>> + Send>>;

type WsSink = Pin<Box<dyn Sink<Message, Error = tungstenite::Error> + Send>>;
type EventReceiver = mpsc::UnboundedReceiver<Result<ServerEvent, RealtimeError>>;
type DisconnectCallback = Box<dyn FnOnce() + Send>;

enum HookState {
    Armed(Option<DisconnectCallback>),
    Fired,
}

/// One-shot disconnect notification shared by the session and its reader.
#[derive(Clone)]
struct DisconnectHook(Arc<StdMutex<HookState>>);

impl DisconnectHook {
    fn new() -> Self {
        Self(Arc::new(StdMutex::new(HookState::Armed(None))))
    }

    /// Stores the callback, or runs it right away if the connection is
    /// already gone. A later registration replaces an earlier one.
    fn register(&self, callback: DisconnectCallback) {
        let mut state = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, HookState::Fired) {
            drop(state);
            callback();
            return;
        }
        *state = HookState::Armed(Some(callback));
    }

    fn fire(&self) {
        let previous = std::mem::replace(
            &mut *self.0.lock().unwrap_or_else(PoisonError::into_inner),
            HookState::Fired,
        );
        if let HookState::Armed(Some(callback)) = previous {
            callback();
        }
    }
}

/// A live connection to the realtime endpoint.
pub struct RealtimeSession {
    sink: Arc<Mutex<WsSink>>,
    events: StdMutex<Option<EventReceiver>>,
    reader: JoinHandle<()>,
    closed: Arc<AtomicBool>,
    hook: DisconnectHook,
}

impl RealtimeSession {
    /// Connects using the endpoint, model and credential from `provider`.
    pub async fn connect(provider: &dyn CredentialProvider) -> Result<Self, RealtimeError> {
        let request = build_request(provider)?;
        Self::connect_with_request(request).await
    }

    /// Connects with a prepared upgrade request.
    pub async fn connect_with_request(request: Request) -> Result<Self, RealtimeError> {
        let uri = request.uri().clone();
        let (ws_stream, _) = connect_async(request).await?;
        info!(%uri, "Connected to realtime endpoint.");
        Ok(Self::from_stream(ws_stream))
    }

    /// Wraps an already-upgraded WebSocket. Must be called inside a Tokio
    /// runtime; the reader task starts immediately.
    pub fn from_stream<S>(ws_stream: WebSocketStream<S>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (sink, stream) = ws_stream.split();
        let sink: Arc<Mutex<WsSink>> = Arc::new(Mutex::new(Box::pin(sink)));
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let hook = DisconnectHook::new();

        let reader = tokio::spawn(
            read_loop(stream, tx, sink.clone(), closed.clone(), hook.clone())
                .instrument(info_span!("realtime_reader")),
        );

        Self {
            sink,
            events: StdMutex::new(Some(rx)),
            reader,
            closed,
            hook,
        }
    }

    /// Encodes `event` and writes it as one text frame.
    pub async fn send(&self, event: &ClientEvent) -> Result<(), RealtimeError> {
        let text = encode(event)?;
        let mut sink = self.sink.lock().await;
        if self.is_closed() {
            return Err(RealtimeError::Closed);
        }
        debug!(kind = event.kind(), "Sending client event.");
        sink.send(Message::Text(text)).await?;
        Ok(())
    }

    /// Takes the inbound event stream. Only the first call gets events;
    /// later calls return an already-finished stream.
    pub fn events(&self) -> EventStream {
        match self
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            Some(rx) => Box::pin(UnboundedReceiverStream::new(rx)),
            None => Box::pin(stream::empty()),
        }
    }

    /// Registers a callback run exactly once when the connection ends, for
    /// any reason. If it has already ended the callback runs immediately.
    pub fn on_disconnect<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.hook.register(Box::new(callback));
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Closes the connection with a going-away code and ends the event
    /// stream. Calling it again is a no-op.
    pub async fn close(&self) {
        self.reader.abort();
        drop(
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("Closing realtime session.");
            close_sink(&self.sink).await;
        }
        self.hook.fire();
    }
}

impl Drop for RealtimeSession {
    fn drop(&mut self) {
        self.reader.abort();
        if !self.closed.swap(true, Ordering::SeqCst) {
            // Without a runtime the socket is simply dropped.
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                let sink = self.sink.clone();
                handle.spawn(async move { close_sink(&sink).await });
            }
        }
        self.hook.fire();
    }
}

fn going_away() -> Message {
    Message::Close(Some(CloseFrame {
        code: CloseCode::Away,
        reason: "going away".into(),
    }))
}

async fn close_sink(sink: &Mutex<WsSink>) {
    let mut sink = sink.lock().await;
    if let Err(e) = sink.send(going_away()).await {
        debug!(error = %e, "Close frame not sent.");
    }
    let _ = sink.close().await;
}

/// What the reader does with one inbound frame.
#[derive(Debug)]
enum Inbound {
    Event(Result<ServerEvent, RealtimeError>),
    Skip,
    Closed(Option<CloseFrame<'static>>),
}

fn classify(frame: Result<Message, tungstenite::Error>) -> Inbound {
    match frame {
        Ok(Message::Text(text)) => Inbound::Event(decode(&text).map_err(RealtimeError::from)),
        Ok(Message::Binary(_)) => Inbound::Event(Err(RealtimeError::UnexpectedFrame("binary"))),
        Ok(Message::Frame(_)) => Inbound::Event(Err(RealtimeError::UnexpectedFrame("raw"))),
        Ok(Message::Ping(_) | Message::Pong(_)) => Inbound::Skip,
        Ok(Message::Close(close)) => Inbound::Closed(close),
        Err(e) => Inbound::Event(Err(RealtimeError::from(e))),
    }
}

async fn read_loop<St>(
    mut stream: St,
    tx: mpsc::UnboundedSender<Result<ServerEvent, RealtimeError>>,
    sink: Arc<Mutex<WsSink>>,
    closed: Arc<AtomicBool>,
    hook: DisconnectHook,
) where
    St: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        match classify(frame) {
            Inbound::Skip => continue,
            Inbound::Closed(close) => {
                info!(?close, "Server closed the connection.");
                break;
            }
            Inbound::Event(Ok(event)) => {
                debug!(kind = event.kind(), event_id = event.event_id(), "Received server event.");
                let _ = tx.send(Ok(event));
            }
            Inbound::Event(Err(e)) => {
                error!(error = %e, "Realtime event stream failed.");
                let _ = tx.send(Err(e));
                break;
            }
        }
    }
    let already_closed = closed.swap(true, Ordering::SeqCst);
    drop(tx);
    if !already_closed {
        close_sink(&sink).await;
    }
    hook.fire();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter_hook(hook: &DisconnectHook, count: &Arc<AtomicUsize>) {
        let count = count.clone();
        hook.register(Box::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        }));
    }

    #[test]
    fn test_hook_fires_once() {
        let hook = DisconnectHook::new();
        let count = Arc::new(AtomicUsize::new(0));
        counter_hook(&hook, &count);

        hook.fire();
        hook.fire();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_hook_registered_after_fire_runs_immediately() {
        let hook = DisconnectHook::new();
        hook.fire();

        let count = Arc::new(AtomicUsize::new(0));
        counter_hook(&hook, &count);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        hook.fire();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_hook_later_registration_replaces_earlier() {
        let hook = DisconnectHook::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        counter_hook(&hook, &first);
        counter_hook(&hook, &second);

        hook.fire();

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_classify_frames() {
        assert!(matches!(classify(Ok(Message::Ping(vec![1]))), Inbound::Skip));
        assert!(matches!(classify(Ok(Message::Pong(vec![]))), Inbound::Skip));
        assert!(matches!(
            classify(Ok(going_away())),
            Inbound::Closed(Some(CloseFrame { code: CloseCode::Away, .. }))
        ));
        assert!(matches!(classify(Ok(Message::Close(None))), Inbound::Closed(None)));
        assert!(matches!(
            classify(Ok(Message::Binary(vec![0]))),
            Inbound::Event(Err(RealtimeError::UnexpectedFrame("binary")))
        ));
        assert!(matches!(
            classify(Ok(Message::Text("{oops".to_string()))),
            Inbound::Event(Err(RealtimeError::Decode(_)))
        ));
        assert!(matches!(
            classify(Ok(Message::Text(
                r#"{"type":"input_audio_buffer.cleared","event_id":"e"}"#.to_string()
            ))),
            Inbound::Event(Ok(ServerEvent::InputAudioBufferCleared(_)))
        ));
        assert!(matches!(
            classify(Err(tungstenite::Error::ConnectionClosed)),
            Inbound::Event(Err(RealtimeError::Transport(_)))
        ));
    }
}
