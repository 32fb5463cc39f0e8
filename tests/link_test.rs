//! Signaling Link Integration Tests
//!
//! Runs an in-process WebSocket endpoint standing in for the relay and
//! checks the wire behavior of the link: tagged JSON frames, the periodic
//! Ping, tolerance of unknown actions, and the shutdown handshake.

use futures::{SinkExt, StreamExt};
use peercast::domain::signaling::{SessionDescription, SignalMessage};
use peercast::interface::SignalingLink;
use serde_json::Value;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

const WAIT: Duration = Duration::from_secs(2);

async fn relay_endpoint() -> (String, JoinHandle<WebSocketStream<TcpStream>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let accept = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio_tungstenite::accept_async(stream).await.unwrap()
    });
    (url, accept)
}

struct LinkUnderTest {
    outbound: mpsc::UnboundedSender<SignalMessage>,
    inbound: mpsc::UnboundedReceiver<SignalMessage>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    relay: WebSocketStream<TcpStream>,
}

async fn start_link(ping_interval: Duration) -> LinkUnderTest {
    let (url, accept) = relay_endpoint().await;
    let link = SignalingLink::connect(&url)
        .await
        .unwrap()
        .with_ping_interval(ping_interval);
    let relay = accept.await.unwrap();

    let (outbound, outbound_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound) = mpsc::unbounded_channel();
    let (shutdown, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(link.run(outbound_rx, inbound_tx, shutdown_rx));

    LinkUnderTest {
        outbound,
        inbound,
        shutdown,
        task,
        relay,
    }
}

async fn next_text(relay: &mut WebSocketStream<TcpStream>) -> String {
    loop {
        let frame = tokio::time::timeout(WAIT, relay.next())
            .await
            .expect("relay should receive a frame")
            .expect("stream should stay open")
            .expect("frame should be well-formed");
        match frame {
            Message::Text(text) => return text,
            // The link may interleave transport frames; skip them
            _ => continue,
        }
    }
}

#[tokio::test]
async fn test_outbound_messages_are_tagged_json_frames() {
    let mut t = start_link(Duration::from_secs(60)).await;

    t.outbound.send(SignalMessage::Open).unwrap();
    assert_eq!(next_text(&mut t.relay).await, r#"{"action":"Open"}"#);

    t.outbound
        .send(SignalMessage::Sdp {
            sdp: SessionDescription::offer("v=0\r\n"),
        })
        .unwrap();
    let json: Value = serde_json::from_str(&next_text(&mut t.relay).await).unwrap();
    assert_eq!(json["action"], "Sdp");
    assert_eq!(json["sdp"]["type"], "offer");
    assert_eq!(json["sdp"]["sdp"], "v=0\r\n");

    t.shutdown.send(true).unwrap();
    t.task.await.unwrap();
}

#[tokio::test]
async fn test_inbound_frames_are_parsed_and_forwarded() {
    let mut t = start_link(Duration::from_secs(60)).await;

    t.relay
        .send(Message::Text(r#"{"action":"Offer"}"#.to_string()))
        .await
        .unwrap();
    let msg = tokio::time::timeout(WAIT, t.inbound.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(msg, SignalMessage::Offer);

    t.shutdown.send(true).unwrap();
    t.task.await.unwrap();
}

#[tokio::test]
async fn test_unknown_actions_are_discarded_without_dropping_the_link() {
    let mut t = start_link(Duration::from_secs(60)).await;

    t.relay
        .send(Message::Text(r#"{"action":"Dance"}"#.to_string()))
        .await
        .unwrap();
    t.relay
        .send(Message::Text(r#"not json"#.to_string()))
        .await
        .unwrap();
    t.relay
        .send(Message::Text(r#"{"action":"Close"}"#.to_string()))
        .await
        .unwrap();

    // Only the well-formed Close comes through
    let msg = tokio::time::timeout(WAIT, t.inbound.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(msg, SignalMessage::Close);

    t.shutdown.send(true).unwrap();
    t.task.await.unwrap();
}

#[tokio::test]
async fn test_ping_goes_out_on_the_configured_interval() {
    let mut t = start_link(Duration::from_millis(50)).await;

    assert_eq!(next_text(&mut t.relay).await, r#"{"action":"Ping"}"#);
    assert_eq!(next_text(&mut t.relay).await, r#"{"action":"Ping"}"#);

    t.shutdown.send(true).unwrap();
    t.task.await.unwrap();
}

#[tokio::test]
async fn test_transport_ping_gets_a_pong_reply() {
    let mut t = start_link(Duration::from_secs(60)).await;

    t.relay
        .send(Message::Ping(b"keepalive".to_vec()))
        .await
        .unwrap();
    let frame = tokio::time::timeout(WAIT, t.relay.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(frame, Message::Pong(b"keepalive".to_vec()));

    t.shutdown.send(true).unwrap();
    t.task.await.unwrap();
}

#[tokio::test]
async fn test_shutdown_flushes_queued_messages_before_closing() {
    let mut t = start_link(Duration::from_secs(60)).await;

    // The session queues its Close broadcast, then flips shutdown
    t.outbound.send(SignalMessage::Close).unwrap();
    t.shutdown.send(true).unwrap();

    assert_eq!(next_text(&mut t.relay).await, r#"{"action":"Close"}"#);
    t.task.await.unwrap();

    // The link closes the socket afterwards
    let end = tokio::time::timeout(WAIT, async {
        loop {
            match t.relay.next().await {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(_)) => break,
            }
        }
    })
    .await;
    assert!(end.is_ok());
}

#[tokio::test]
async fn test_relay_close_ends_the_inbound_channel() {
    let mut t = start_link(Duration::from_secs(60)).await;

    t.relay.send(Message::Close(None)).await.unwrap();

    let msg = tokio::time::timeout(WAIT, t.inbound.recv())
        .await
        .expect("inbound channel should close");
    assert_eq!(msg, None);
    t.task.await.unwrap();
}
