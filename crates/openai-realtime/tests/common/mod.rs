#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use openai_realtime::{RealtimeConfig, RealtimeSession};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, timeout};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderMap;

pub const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub uri: String,
    pub headers: HeaderMap,
}

/// In-process WebSocket endpoint accepting a single client. Frames pushed
/// with [`FakeServer::push`] are written to the client in order; frames the
/// client sends are collected for [`FakeServer::next_message`].
pub struct FakeServer {
    pub base_url: String,
    request: Arc<Mutex<Option<CapturedRequest>>>,
    outgoing: mpsc::UnboundedSender<Message>,
    incoming: mpsc::UnboundedReceiver<Message>,
    handle: JoinHandle<()>,
}

impl FakeServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let addr = listener
            .local_addr()
            .expect("resolved local listener address");
        let base_url = format!("ws://{addr}/v1/realtime");

        let request = Arc::new(Mutex::new(None));
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();
        let (incoming_tx, incoming) = mpsc::unbounded_channel::<Message>();

        let captured = Arc::clone(&request);
        let handle = tokio::spawn(async move {
            let Ok((socket, _)) = listener.accept().await else {
                return;
            };
            let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                *captured.lock().unwrap() = Some(CapturedRequest {
                    uri: req.uri().to_string(),
                    headers: req.headers().clone(),
                });
                Ok(resp)
            };
            let Ok(ws) = accept_hdr_async(socket, callback).await else {
                return;
            };
            let (mut sink, mut stream) = ws.split();

            loop {
                tokio::select! {
                    outgoing = outgoing_rx.recv() => match outgoing {
                        Some(message) => {
                            if sink.send(message).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                    incoming = stream.next() => match incoming {
                        Some(Ok(message)) => {
                            let _ = incoming_tx.send(message);
                        }
                        _ => break,
                    },
                }
            }
        });

        Self {
            base_url,
            request,
            outgoing,
            incoming,
            handle,
        }
    }

    pub fn config(&self) -> RealtimeConfig {
        RealtimeConfig::new("sk-test")
            .with_api_base(self.base_url.clone())
            .with_model("gpt-test")
    }

    pub async fn connect(&self) -> RealtimeSession {
        RealtimeSession::connect(&self.config())
            .await
            .expect("client should connect to the fake server")
    }

    pub fn request(&self) -> CapturedRequest {
        self.request
            .lock()
            .unwrap()
            .clone()
            .expect("handshake should have been captured")
    }

    pub fn push(&self, message: Message) {
        self.outgoing
            .send(message)
            .expect("fake server task should be running");
    }

    pub fn push_json(&self, value: Value) {
        self.push(Message::Text(value.to_string()));
    }

    /// Next frame from the client, or `None` once the connection is gone.
    pub async fn next_message(&mut self) -> Option<Message> {
        timeout(WAIT, self.incoming.recv())
            .await
            .expect("timed out waiting for a client frame")
    }

    /// Next text frame from the client, parsed as JSON.
    pub async fn next_json(&mut self) -> Value {
        loop {
            match self.next_message().await {
                Some(Message::Text(text)) => {
                    return serde_json::from_str(&text).expect("client frame should be JSON");
                }
                Some(Message::Ping(_) | Message::Pong(_)) => continue,
                other => panic!("expected a text frame, got {:?}", other),
            }
        }
    }

    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn session_created() -> Value {
    json!({
        "type": "session.created",
        "event_id": "event_1",
        "session": {
            "id": "sess_1",
            "object": "realtime.session",
            "model": "gpt-test",
            "modalities": ["text", "audio"],
            "instructions": "",
            "voice": "alloy",
            "input_audio_format": "pcm16",
            "output_audio_format": "pcm16",
            "turn_detection": {"type": "server_vad", "threshold": 0.5},
            "tools": [],
            "tool_choice": "auto",
            "temperature": 0.8,
            "max_response_output_tokens": "inf"
        }
    })
}

pub fn assistant_message(id: &str) -> Value {
    json!({
        "type": "conversation.item.created",
        "event_id": format!("evt_{id}"),
        "item": {
            "id": id,
            "type": "message",
            "status": "in_progress",
            "role": "assistant",
            "content": [{"type": "text", "text": ""}]
        }
    })
}
