//! JSON-lines game gateway over TCP
//!
//! Speaks newline-delimited JSON to a game gateway process that holds the
//! actual game-protocol session.
//!
//! Client frames: `login`, `chat`, `quit`.
//! Server frames: `spawn`, `chat`, `kicked`, `error`, `end`. Unknown frame
//! types are ignored so the gateway can add events without breaking us.

use super::{GameConnector, GameLink, GameSession, TransportEvent};
use crate::config::{AuthMode, ConnectionConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default TCP connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest accepted frame, in bytes
pub const MAX_FRAME_LENGTH: usize = 64 * 1024;

const EVENT_BUFFER: usize = 256;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame<'a> {
    Login {
        username: &'a str,
        auth: AuthMode,
        #[serde(skip_serializing_if = "Option::is_none")]
        version: Option<&'a str>,
    },
    Chat {
        text: &'a str,
    },
    Quit,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerFrame {
    Spawn,
    Chat {
        text: String,
    },
    Kicked {
        #[serde(default)]
        reason: serde_json::Value,
    },
    Error {
        message: String,
    },
    End,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, PartialEq)]
enum Decoded {
    Event(TransportEvent),
    End,
    Ignore,
}

fn encode(frame: &ClientFrame<'_>) -> Result<String> {
    serde_json::to_string(frame).map_err(|e| Error::Transport(format!("encode failed: {}", e)))
}

fn decode(line: &str) -> Decoded {
    let line = line.trim();
    if line.is_empty() {
        return Decoded::Ignore;
    }
    match serde_json::from_str::<ServerFrame>(line) {
        Ok(ServerFrame::Spawn) => Decoded::Event(TransportEvent::Spawned),
        Ok(ServerFrame::Chat { text }) => Decoded::Event(TransportEvent::ChatLine(text)),
        Ok(ServerFrame::Kicked { reason }) => {
            Decoded::Event(TransportEvent::Kicked(reason_text(&reason)))
        }
        Ok(ServerFrame::Error { message }) => Decoded::Event(TransportEvent::Error(message)),
        Ok(ServerFrame::End) => Decoded::End,
        Ok(ServerFrame::Unknown) => Decoded::Ignore,
        Err(e) => Decoded::Event(TransportEvent::Error(format!("malformed frame: {}", e))),
    }
}

/// Kick reasons are often chat components; keep strings, serialize the rest
fn reason_text(reason: &serde_json::Value) -> String {
    match reason {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "no reason given".to_string(),
        other => other.to_string(),
    }
}

/// [`GameConnector`] for a JSON-lines game gateway
#[derive(Debug, Clone)]
pub struct JsonLineConnector {
    connect_timeout: Duration,
}

impl JsonLineConnector {
    /// Create a connector with the default timeout
    #[must_use]
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Set the TCP connect timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for JsonLineConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GameConnector for JsonLineConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<GameSession> {
        let address = config.address();
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&address))
            .await
            .map_err(|_| Error::Transport(format!("connect to {} timed out", address)))?
            .map_err(|e| Error::Transport(format!("connect to {} failed: {}", address, e)))?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!(bot = %config.name, error = %e, "Could not set TCP_NODELAY");
        }

        let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_FRAME_LENGTH));
        let login = encode(&ClientFrame::Login {
            username: &config.credentials.username,
            auth: config.credentials.auth,
            version: config.protocol_version_hint.as_deref(),
        })?;
        framed
            .send(login)
            .await
            .map_err(|e| Error::Transport(format!("login to {} failed: {}", address, e)))?;

        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let alive = Arc::new(AtomicBool::new(true));
        let cancel = CancellationToken::new();

        tokio::spawn(run_session(
            framed,
            outbound_rx,
            event_tx,
            alive.clone(),
            cancel.clone(),
            config.name.clone(),
        ));

        let link = LineLink {
            outbound: outbound_tx,
            alive,
            cancel,
        };
        Ok(GameSession::new(Box::new(link), event_rx))
    }
}

async fn run_session(
    mut framed: Framed<TcpStream, LinesCodec>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    events: mpsc::Sender<TransportEvent>,
    alive: Arc<AtomicBool>,
    cancel: CancellationToken,
    bot: String,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                if let Ok(quit) = encode(&ClientFrame::Quit) {
                    let _ = framed.send(quit).await;
                }
                debug!(bot = %bot, "Game session closed locally");
                break;
            }
            Some(line) = outbound.recv() => {
                if let Err(e) = framed.send(line).await {
                    warn!(bot = %bot, error = %e, "Game gateway write failed");
                    let _ = events.send(TransportEvent::Error(format!("write failed: {}", e))).await;
                    break;
                }
            }
            frame = framed.next() => match frame {
                Some(Ok(line)) => match decode(&line) {
                    Decoded::Event(event) => {
                        if events.send(event).await.is_err() {
                            break;
                        }
                    }
                    Decoded::End => break,
                    Decoded::Ignore => {}
                },
                Some(Err(e)) => {
                    let _ = events.send(TransportEvent::Error(format!("read failed: {}", e))).await;
                    break;
                }
                None => break,
            }
        }
    }

    alive.store(false, Ordering::SeqCst);
    let _ = events.send(TransportEvent::Disconnected).await;
}

struct LineLink {
    outbound: mpsc::UnboundedSender<String>,
    alive: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl GameLink for LineLink {
    fn send_chat_line(&self, text: &str) -> Result<()> {
        if !self.is_alive() {
            return Err(Error::Transport("session is closed".to_string()));
        }
        let line = encode(&ClientFrame::Chat { text })?;
        self.outbound
            .send(line)
            .map_err(|_| Error::Transport("session is closed".to_string()))
    }

    fn close(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.cancel.cancel();
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst) && !self.cancel.is_cancelled()
    }
}

impl Drop for LineLink {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    #[test]
    fn test_decode_frames() {
        assert_eq!(
            decode(r#"{"type":"spawn"}"#),
            Decoded::Event(TransportEvent::Spawned)
        );
        assert_eq!(
            decode(r#"{"type":"chat","text":"<Steve> hi"}"#),
            Decoded::Event(TransportEvent::ChatLine("<Steve> hi".to_string()))
        );
        assert_eq!(
            decode(r#"{"type":"kicked","reason":"Server closed"}"#),
            Decoded::Event(TransportEvent::Kicked("Server closed".to_string()))
        );
        assert_eq!(
            decode(r#"{"type":"kicked","reason":{"text":"banned"}}"#),
            Decoded::Event(TransportEvent::Kicked(r#"{"text":"banned"}"#.to_string()))
        );
        assert_eq!(decode(r#"{"type":"end"}"#), Decoded::End);
        assert_eq!(decode(r#"{"type":"health","hp":20}"#), Decoded::Ignore);
        assert_eq!(decode("   "), Decoded::Ignore);
        assert!(matches!(
            decode("not json"),
            Decoded::Event(TransportEvent::Error(_))
        ));
    }

    #[test]
    fn test_encode_login() {
        let line = encode(&ClientFrame::Login {
            username: "fisher",
            auth: AuthMode::Offline,
            version: None,
        })
        .unwrap();
        assert_eq!(line, r#"{"type":"login","username":"fisher","auth":"offline"}"#);
    }

    #[tokio::test]
    async fn test_session_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let gateway = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read, mut write) = socket.into_split();
            let mut lines = BufReader::new(read).lines();

            let login = lines.next_line().await.unwrap().unwrap();
            assert!(login.contains("\"username\":\"fisher\""));
            assert!(login.contains("\"version\":\"1.20.4\""));

            write
                .write_all(
                    b"{\"type\":\"spawn\"}\n{\"type\":\"chat\",\"text\":\"<Steve> hi\"}\n{\"type\":\"kicked\",\"reason\":\"AFK\"}\n",
                )
                .await
                .unwrap();

            let chat = lines.next_line().await.unwrap().unwrap();
            assert_eq!(chat, r#"{"type":"chat","text":"/list"}"#);
            // Dropping the socket ends the session
        });

        let mut config = ConnectionConfig::new("Fisher-1", "127.0.0.1", "fisher").with_port(port);
        config.protocol_version_hint = Some("1.20.4".to_string());

        let connector = JsonLineConnector::new().with_connect_timeout(Duration::from_secs(2));
        let mut session = connector.connect(&config).await.unwrap();

        assert_eq!(session.events.recv().await, Some(TransportEvent::Spawned));
        assert_eq!(
            session.events.recv().await,
            Some(TransportEvent::ChatLine("<Steve> hi".to_string()))
        );
        assert_eq!(
            session.events.recv().await,
            Some(TransportEvent::Kicked("AFK".to_string()))
        );
        assert!(session.link.is_alive());
        session.link.send_chat_line("/list").unwrap();

        gateway.await.unwrap();
        assert_eq!(
            session.events.recv().await,
            Some(TransportEvent::Disconnected)
        );
        assert!(!session.link.is_alive());
        assert!(session.link.send_chat_line("late").is_err());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nobody listens on
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = ConnectionConfig::new("a", "127.0.0.1", "u").with_port(port);
        let err = JsonLineConnector::new().connect(&config).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn test_close_marks_link_dead() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let gateway = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut lines = BufReader::new(socket).lines();
            let _login = lines.next_line().await.unwrap();
            lines.next_line().await.unwrap()
        });

        let config = ConnectionConfig::new("a", "127.0.0.1", "u").with_port(port);
        let mut session = JsonLineConnector::new().connect(&config).await.unwrap();
        session.link.close();
        assert!(!session.link.is_alive());

        let quit = gateway.await.unwrap();
        assert_eq!(quit.as_deref(), Some(r#"{"type":"quit"}"#));
        assert_eq!(
            session.events.recv().await,
            Some(TransportEvent::Disconnected)
        );
    }
}
