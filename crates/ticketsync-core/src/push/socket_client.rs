use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{PushChannel, PushEvent};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::models::{OutboundFrame, PushMessage};

const EVENT_BUFFER: usize = 256;

type PushSocket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// How a connected session ended.
enum SessionEnd {
    /// Server closed or the stream errored; reconnect.
    Dropped,
    /// Every handle or the event receiver is gone; stop for good.
    Shutdown,
}

/// Sending half handed to the engine.
#[derive(Clone)]
pub struct PushHandle {
    open: Arc<AtomicBool>,
    outbound_tx: mpsc::UnboundedSender<String>,
}

impl PushChannel for PushHandle {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn send(&self, frame: &OutboundFrame) -> Result<(), SyncError> {
        if !self.is_open() {
            return Err(SyncError::ChannelClosed);
        }
        let text = serde_json::to_string(frame)?;
        self.outbound_tx
            .send(text)
            .map_err(|_| SyncError::ChannelClosed)
    }
}

/// WebSocket client for the push channel. Reconnects automatically if the
/// connection is lost.
pub struct SocketPushClient {
    url: String,
    auth_token: Option<String>,
    reconnect_delay: Duration,
}

impl SocketPushClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: None,
            reconnect_delay: SyncConfig::default().reconnect_delay(),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            url: config.push_url.clone(),
            auth_token: config.auth_token.clone(),
            reconnect_delay: config.reconnect_delay(),
        }
    }

    /// Start the connection loop on the current runtime.
    pub fn spawn(self) -> (PushHandle, mpsc::Receiver<PushEvent>, JoinHandle<()>) {
        let open = Arc::new(AtomicBool::new(false));
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);

        let handle = PushHandle {
            open: open.clone(),
            outbound_tx,
        };
        let task = tokio::spawn(self.run(open, outbound_rx, event_tx));
        (handle, event_rx, task)
    }

    async fn run(
        self,
        open: Arc<AtomicBool>,
        mut outbound_rx: mpsc::UnboundedReceiver<String>,
        event_tx: mpsc::Sender<PushEvent>,
    ) {
        loop {
            match self.connect().await {
                Ok(socket) => {
                    // Frames queued for a previous connection are meaningless now
                    while outbound_rx.try_recv().is_ok() {}

                    open.store(true, Ordering::SeqCst);
                    tracing::info!(url = %self.url, "push channel connected");
                    if event_tx.send(PushEvent::Connected).await.is_err() {
                        break;
                    }

                    let end = self.session(socket, &mut outbound_rx, &event_tx).await;
                    open.store(false, Ordering::SeqCst);

                    if matches!(end, SessionEnd::Shutdown) {
                        break;
                    }
                    tracing::warn!(url = %self.url, "push channel disconnected");
                    if event_tx.send(PushEvent::Disconnected).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(url = %self.url, error = %e, "push channel connect failed");
                }
            }

            if event_tx.is_closed() {
                break;
            }
            tokio::time::sleep(self.reconnect_delay).await;
        }
        open.store(false, Ordering::SeqCst);
        tracing::debug!("push channel loop stopped");
    }

    async fn connect(&self) -> Result<PushSocket, tokio_tungstenite::tungstenite::Error> {
        let mut request = self.url.as_str().into_client_request()?;
        if let Some(token) = &self.auth_token {
            match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    request.headers_mut().insert("Authorization", value);
                }
                Err(e) => tracing::warn!(error = %e, "auth token is not a valid header value"),
            }
        }
        let (socket, _response) = connect_async(request).await?;
        Ok(socket)
    }

    async fn session(
        &self,
        socket: PushSocket,
        outbound_rx: &mut mpsc::UnboundedReceiver<String>,
        event_tx: &mpsc::Sender<PushEvent>,
    ) -> SessionEnd {
        let (mut write, mut read) = socket.split();

        loop {
            tokio::select! {
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        let Some(message) = PushMessage::decode(text.as_str()) else {
                            tracing::trace!(frame = %text.as_str(), "dropping malformed push frame");
                            continue;
                        };
                        if event_tx.send(PushEvent::Message(message)).await.is_err() {
                            return SessionEnd::Shutdown;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return SessionEnd::Dropped,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "push channel read error");
                        return SessionEnd::Dropped;
                    }
                },
                outbound = outbound_rx.recv() => match outbound {
                    Some(text) => {
                        if let Err(e) = write.send(Message::Text(text.into())).await {
                            tracing::warn!(error = %e, "push channel write error");
                            return SessionEnd::Dropped;
                        }
                    }
                    None => {
                        let _ = write.close().await;
                        return SessionEnd::Shutdown;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_refuses_while_closed() {
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
        let handle = PushHandle {
            open: Arc::new(AtomicBool::new(false)),
            outbound_tx,
        };

        let frame = OutboundFrame::connect(&[1, 2]);
        assert!(matches!(handle.send(&frame), Err(SyncError::ChannelClosed)));

        handle.open.store(true, Ordering::SeqCst);
        handle.send(&frame).unwrap();
        assert_eq!(
            outbound_rx.try_recv().unwrap(),
            r#"{"type":"connect","data":{"ticket_id":[1,2]}}"#
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_stays_closed() {
        let mut client = SocketPushClient::new("ws://127.0.0.1:9/ws");
        client.reconnect_delay = Duration::from_millis(10);
        let (handle, event_rx, task) = client.spawn();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_open());

        drop(event_rx);
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("loop should stop once the receiver is gone")
            .unwrap();
    }
}
