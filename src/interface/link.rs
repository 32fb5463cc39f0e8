//! WebSocket link to the signaling relay
//!
//! Owns the socket for its whole life: messages travel as JSON text frames,
//! an application-level Ping goes out on a fixed cadence, and transport
//! ping/pong frames are answered in place. When the link ends (either side),
//! the inbound channel closes and the session tears itself down.

use crate::domain::shared::error::SessionError;
use crate::domain::shared::result::Result;
use crate::domain::signaling::SignalMessage;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(5);

pub struct SignalingLink {
    sink: WsSink,
    source: WsSource,
    ping_interval: Duration,
}

impl SignalingLink {
    /// Open the WebSocket to the relay
    pub async fn connect(url: &str) -> Result<Self> {
        info!(%url, "connecting to signaling relay");
        let (ws, _) = connect_async(url)
            .await
            .map_err(|e| SessionError::Signaling(e.to_string()))?;
        let (sink, source) = ws.split();
        Ok(Self {
            sink,
            source,
            ping_interval: DEFAULT_PING_INTERVAL,
        })
    }

    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Pump messages until the socket drops, the session shuts down, or the
    /// outbound channel closes
    ///
    /// `inbound` is dropped on return, which is how the session learns the
    /// link is gone.
    pub async fn run(
        mut self,
        mut outbound: mpsc::UnboundedReceiver<SignalMessage>,
        inbound: mpsc::UnboundedSender<SignalMessage>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        // First tick is one period out; the relay does not expect an
        // immediate Ping
        let mut ping = tokio::time::interval_at(
            tokio::time::Instant::now() + self.ping_interval,
            self.ping_interval,
        );
        ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        // The session queues its Close broadcast before
                        // flipping shutdown; flush whatever is still waiting
                        while let Ok(msg) = outbound.try_recv() {
                            let _ = self.send(msg).await;
                        }
                        debug!("session shut down, closing link");
                        break;
                    }
                }
                _ = ping.tick() => {
                    if self.send(SignalMessage::Ping).await.is_err() {
                        break;
                    }
                }
                msg = outbound.recv() => {
                    let Some(msg) = msg else {
                        debug!("outbound channel closed");
                        break;
                    };
                    if self.send(msg).await.is_err() {
                        break;
                    }
                }
                frame = self.source.next() => {
                    let Some(frame) = frame else {
                        info!("relay closed the connection");
                        break;
                    };
                    let frame = match frame {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!(error = %e, "signaling link failed");
                            break;
                        }
                    };
                    match frame {
                        Message::Text(text) => {
                            match serde_json::from_str::<SignalMessage>(&text) {
                                Ok(msg) => {
                                    trace!(kind = msg.kind(), "relay message");
                                    if inbound.send(msg).is_err() {
                                        debug!("session gone, closing link");
                                        break;
                                    }
                                }
                                // Unknown actions and malformed frames are
                                // the relay's problem, not a reason to drop
                                Err(e) => warn!(error = %e, "discarding unparseable relay message"),
                            }
                        }
                        Message::Ping(payload) => {
                            let _ = self.sink.send(Message::Pong(payload)).await;
                        }
                        Message::Pong(_) => trace!("transport pong"),
                        Message::Close(_) => {
                            info!("relay sent close frame");
                            break;
                        }
                        _ => {}
                    }
                }
            }
        }

        // Best effort; the socket may already be gone
        let _ = self.sink.send(Message::Close(None)).await;
        let _ = self.sink.close().await;
    }

    async fn send(&mut self, msg: SignalMessage) -> Result<()> {
        let text = serde_json::to_string(&msg)
            .map_err(|e| SessionError::Internal(e.to_string()))?;
        self.sink.send(Message::Text(text)).await.map_err(|e| {
            warn!(error = %e, "failed to send on signaling link");
            SessionError::Signaling(e.to_string())
        })
    }
}
