mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::{FakeServer, WAIT, session_created};
use futures_util::StreamExt;
use openai_realtime::RealtimeError;
use openai_realtime::types::{ClientEvent, Content, Item, Message, Role, ServerEvent};
use serde_json::json;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

#[tokio::test]
async fn handshake_carries_model_and_headers() {
    let server = FakeServer::start().await;
    let session = server.connect().await;

    let request = server.request();
    assert_eq!(request.uri, "/v1/realtime?model=gpt-test");
    assert_eq!(request.headers["authorization"], "Bearer sk-test");
    assert_eq!(request.headers["openai-beta"], "realtime=v1");

    session.close().await;
}

#[tokio::test]
async fn events_arrive_decoded_and_in_order() {
    let server = FakeServer::start().await;
    let session = server.connect().await;
    let mut events = session.events();

    server.push_json(session_created());
    server.push_json(json!({
        "type": "conversation.created",
        "event_id": "event_2",
        "conversation": {"id": "conv_1", "object": "realtime.conversation"}
    }));

    let first = timeout(WAIT, events.next()).await.unwrap().unwrap().unwrap();
    let second = timeout(WAIT, events.next()).await.unwrap().unwrap().unwrap();

    assert!(matches!(first, ServerEvent::SessionCreated(_)));
    match second {
        ServerEvent::ConversationCreated(e) => assert_eq!(e.conversation.id, "conv_1"),
        other => panic!("expected conversation.created, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_frame_ends_the_stream() {
    let server = FakeServer::start().await;
    let session = server.connect().await;
    let mut events = session.events();

    server.push(WsMessage::Text("{not json".to_string()));
    server.push_json(session_created());

    let first = timeout(WAIT, events.next()).await.unwrap();
    assert!(matches!(first, Some(Err(RealtimeError::Decode(_)))));

    // The valid frame sent right after must never be observed.
    let rest = timeout(WAIT, events.next()).await.unwrap();
    assert!(rest.is_none());
    assert!(session.is_closed());
}

#[tokio::test]
async fn unknown_event_type_ends_the_stream() {
    let server = FakeServer::start().await;
    let session = server.connect().await;
    let mut events = session.events();

    server.push_json(json!({"type": "response.teleport", "event_id": "e"}));

    let first = timeout(WAIT, events.next()).await.unwrap().unwrap();
    assert!(first.unwrap_err().is_protocol_decode());
    assert!(timeout(WAIT, events.next()).await.unwrap().is_none());
}

#[tokio::test]
async fn binary_frame_is_a_protocol_violation() {
    let server = FakeServer::start().await;
    let session = server.connect().await;
    let mut events = session.events();

    server.push(WsMessage::Binary(vec![1, 2, 3]));

    let first = timeout(WAIT, events.next()).await.unwrap();
    assert!(matches!(
        first,
        Some(Err(RealtimeError::UnexpectedFrame("binary")))
    ));
    assert!(timeout(WAIT, events.next()).await.unwrap().is_none());
}

#[tokio::test]
async fn ping_frames_are_skipped() {
    let server = FakeServer::start().await;
    let session = server.connect().await;
    let mut events = session.events();

    server.push(WsMessage::Ping(vec![7]));
    server.push_json(session_created());

    let first = timeout(WAIT, events.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(first.kind(), "session.created");
}

#[tokio::test]
async fn second_subscription_sees_nothing() {
    let server = FakeServer::start().await;
    let session = server.connect().await;
    let _first = session.events();

    server.push_json(session_created());

    let mut second = session.events();
    assert!(timeout(WAIT, second.next()).await.unwrap().is_none());
}

#[tokio::test]
async fn server_close_ends_stream_and_fires_hook_once() {
    let server = FakeServer::start().await;
    let session = server.connect().await;
    let mut events = session.events();

    let calls = Arc::new(AtomicUsize::new(0));
    let (fired_tx, fired_rx) = oneshot::channel();
    {
        let calls = Arc::clone(&calls);
        session.on_disconnect(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            let _ = fired_tx.send(());
        });
    }

    server.push(WsMessage::Close(None));

    assert!(timeout(WAIT, events.next()).await.unwrap().is_none());
    timeout(WAIT, fired_rx).await.unwrap().unwrap();

    session.close().await;
    drop(session);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn hook_registered_after_close_runs_immediately() {
    let server = FakeServer::start().await;
    let session = server.connect().await;
    session.close().await;

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    session.on_disconnect(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn close_is_idempotent_and_sends_going_away() {
    let mut server = FakeServer::start().await;
    let session = server.connect().await;
    let mut events = session.events();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    session.on_disconnect(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    session.close().await;
    session.close().await;

    assert!(session.is_closed());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(timeout(WAIT, events.next()).await.unwrap().is_none());

    match server.next_message().await {
        Some(WsMessage::Close(Some(frame))) => assert_eq!(frame.code, CloseCode::Away),
        other => panic!("expected a going-away close frame, got {:?}", other),
    }

    let err = session.send(&ClientEvent::commit_audio()).await.unwrap_err();
    assert!(matches!(err, RealtimeError::Closed));
}

#[tokio::test]
async fn concurrent_sends_arrive_as_whole_frames() {
    let mut server = FakeServer::start().await;
    let session = Arc::new(server.connect().await);

    let mut tasks = Vec::new();
    for n in 0..16 {
        let session = Arc::clone(&session);
        tasks.push(tokio::spawn(async move {
            let item = Item::Message(Message::new(
                format!("item_{n}"),
                Role::User,
                vec![Content::input_text("x".repeat(4096))],
            ));
            session.send(&ClientEvent::create_item(item)).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let mut ids = Vec::new();
    for _ in 0..16 {
        let frame = server.next_json().await;
        assert_eq!(frame["type"], "conversation.item.create");
        assert_eq!(frame["item"]["content"][0]["text"].as_str().unwrap().len(), 4096);
        ids.push(frame["item"]["id"].as_str().unwrap().to_string());
    }
    ids.sort();
    let mut expected: Vec<String> = (0..16).map(|n| format!("item_{n}")).collect();
    expected.sort();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn dropping_the_session_fires_hook() {
    let server = FakeServer::start().await;
    let session = server.connect().await;

    let (fired_tx, fired_rx) = oneshot::channel();
    session.on_disconnect(move || {
        let _ = fired_tx.send(());
    });
    drop(session);

    timeout(WAIT, fired_rx).await.unwrap().unwrap();
}
