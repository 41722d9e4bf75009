//! Stroke replication: wire events and the relay client.
//!
//! Two event kinds are enough to keep peers convergent: a stroke is either
//! added whole or deleted by identity. Events from one peer arrive in send
//! order over its single relay connection (FIFO per peer); events from
//! different peers touch different [`StrokeId`]s and commute.

use crate::stroke::{Stroke, StrokeId};
use serde::{Deserialize, Serialize};

/// A replicated document edit.
///
/// `page` and `layer` address the target by position in the shared document;
/// the stroke payload itself is container-ignorant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrokeEvent {
    /// A peer committed a new stroke.
    Added {
        page: usize,
        layer: usize,
        stroke: Stroke,
    },
    /// A peer erased a stroke.
    Deleted {
        page: usize,
        layer: usize,
        id: StrokeId,
    },
}

/// Messages sent to the relay server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a shared session
    Join { room: String },
    /// Leave the current session
    Leave,
    /// A document edit to broadcast
    Edit { event: StrokeEvent },
}

/// Messages received from the relay server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirm session join
    Joined {
        room: String,
        peer_count: usize,
        /// Edits made before this peer joined, in original order
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        history: Vec<StrokeEvent>,
    },
    /// Peer joined the session
    PeerJoined { peer_id: String },
    /// Peer left the session
    PeerLeft { peer_id: String },
    /// Edit from another peer
    Edit { from: String, event: StrokeEvent },
    /// Error message
    Error { message: String },
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Events surfaced to the application loop by the relay client.
///
/// All variants are recoverable: connection failures and disconnects leave
/// the local document untouched, and retrying is a user action.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Connected to the relay
    Connected,
    /// Disconnected from the relay (mid-session or after `disconnect`)
    Disconnected,
    /// Joined a session; `history` replays edits this peer missed
    JoinedRoom {
        room: String,
        peer_count: usize,
        history: Vec<StrokeEvent>,
    },
    /// A peer joined the session
    PeerJoined { peer_id: String },
    /// A peer left the session
    PeerLeft { peer_id: String },
    /// An edit from another peer, to be applied to the document
    EditReceived { from: String, event: StrokeEvent },
    /// Transient error (connect or send failure)
    Error { message: String },
}

fn session_event(msg: ServerMessage) -> SessionEvent {
    match msg {
        ServerMessage::Joined {
            room,
            peer_count,
            history,
        } => SessionEvent::JoinedRoom {
            room,
            peer_count,
            history,
        },
        ServerMessage::PeerJoined { peer_id } => SessionEvent::PeerJoined { peer_id },
        ServerMessage::PeerLeft { peer_id } => SessionEvent::PeerLeft { peer_id },
        ServerMessage::Edit { from, event } => SessionEvent::EditReceived { from, event },
        ServerMessage::Error { message } => SessionEvent::Error { message },
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native_client {
    use super::*;
    use std::net::TcpStream;
    use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;
    use tungstenite::stream::MaybeTlsStream;
    use tungstenite::{Message, connect};
    use url::Url;

    const READ_TIMEOUT: Duration = Duration::from_millis(50);
    const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Put a short read timeout on the underlying TCP stream, plain or TLS,
    /// so the relay thread keeps draining the command channel instead of
    /// parking in `read`.
    fn set_stream_timeouts(stream: &MaybeTlsStream<TcpStream>) {
        let tcp = match stream {
            MaybeTlsStream::Plain(tcp) => tcp,
            MaybeTlsStream::Rustls(tls) => tls.get_ref(),
            #[allow(unreachable_patterns)]
            _ => return,
        };
        let _ = tcp.set_read_timeout(Some(READ_TIMEOUT));
        let _ = tcp.set_write_timeout(Some(WRITE_TIMEOUT));
    }

    /// Commands sent to the relay thread.
    enum RelayCommand {
        Send(String),
        Close,
    }

    /// Relay client for native platforms.
    ///
    /// Runs the socket on a background thread; the application loop drains
    /// [`SessionEvent`]s via `poll_events`, so pointer tracking never blocks
    /// on the network.
    pub struct RelayClient {
        state: ConnectionState,
        events: Vec<SessionEvent>,
        cmd_tx: Option<Sender<RelayCommand>>,
        event_rx: Option<Receiver<SessionEvent>>,
        _thread: Option<JoinHandle<()>>,
    }

    impl RelayClient {
        /// Create a new disconnected client.
        pub fn new() -> Self {
            Self {
                state: ConnectionState::Disconnected,
                events: Vec::new(),
                cmd_tx: None,
                event_rx: None,
                _thread: None,
            }
        }

        /// Connect to a relay server.
        pub fn connect(&mut self, url: &str) -> Result<(), String> {
            if self.cmd_tx.is_some() {
                return Err("Already connected".to_string());
            }

            let parsed_url = Url::parse(url).map_err(|e| format!("Invalid URL: {}", e))?;
            if parsed_url.scheme() != "ws" && parsed_url.scheme() != "wss" {
                return Err(format!("Invalid WebSocket URL scheme: {}", parsed_url.scheme()));
            }

            self.state = ConnectionState::Connecting;

            let (cmd_tx, cmd_rx) = channel::<RelayCommand>();
            let (event_tx, event_rx) = channel::<SessionEvent>();

            let url = url.to_string();

            let handle = thread::spawn(move || {
                log::info!("relay thread: connecting to {}", url);

                match connect(&url) {
                    Ok((mut socket, response)) => {
                        log::info!("relay connected, status: {}", response.status());
                        let _ = event_tx.send(SessionEvent::Connected);

                        set_stream_timeouts(socket.get_ref());

                        loop {
                            match cmd_rx.try_recv() {
                                Ok(RelayCommand::Send(msg)) => {
                                    if let Err(e) = socket.send(Message::Text(msg)) {
                                        log::error!("relay send error: {}", e);
                                        break;
                                    }
                                }
                                Ok(RelayCommand::Close) => {
                                    let _ = socket.close(None);
                                    break;
                                }
                                Err(TryRecvError::Disconnected) => break,
                                Err(TryRecvError::Empty) => {}
                            }

                            match socket.read() {
                                Ok(Message::Text(txt)) => {
                                    match serde_json::from_str::<ServerMessage>(&txt) {
                                        Ok(msg) => {
                                            let _ = event_tx.send(session_event(msg));
                                        }
                                        Err(e) => {
                                            log::warn!("unparseable relay message: {}", e);
                                        }
                                    }
                                }
                                Ok(Message::Ping(data)) => {
                                    let _ = socket.send(Message::Pong(data));
                                }
                                Ok(Message::Close(_)) => break,
                                Ok(_) => {}
                                Err(tungstenite::Error::Io(ref e))
                                    if e.kind() == std::io::ErrorKind::WouldBlock
                                        || e.kind() == std::io::ErrorKind::TimedOut =>
                                {
                                    continue;
                                }
                                Err(e) => {
                                    log::error!("relay read error: {}", e);
                                    break;
                                }
                            }
                        }

                        let _ = event_tx.send(SessionEvent::Disconnected);
                    }
                    Err(e) => {
                        log::error!("relay connection failed: {}", e);
                        let _ = event_tx.send(SessionEvent::Error {
                            message: format!("Connection failed: {}", e),
                        });
                    }
                }
            });

            self.cmd_tx = Some(cmd_tx);
            self.event_rx = Some(event_rx);
            self._thread = Some(handle);

            Ok(())
        }

        /// Disconnect from the relay.
        pub fn disconnect(&mut self) {
            if let Some(tx) = self.cmd_tx.take() {
                let _ = tx.send(RelayCommand::Close);
            }
            self.event_rx = None;
            self._thread = None;
            self.state = ConnectionState::Disconnected;
        }

        /// Request to join a session.
        pub fn join_room(&self, room: &str) -> Result<(), String> {
            self.send_message(&ClientMessage::Join {
                room: room.to_string(),
            })
        }

        /// Request to leave the current session.
        pub fn leave_room(&self) -> Result<(), String> {
            self.send_message(&ClientMessage::Leave)
        }

        /// Broadcast a local edit. Called at gesture end, in commit order.
        pub fn send_event(&self, event: &StrokeEvent) -> Result<(), String> {
            self.send_message(&ClientMessage::Edit {
                event: event.clone(),
            })
        }

        fn send_message(&self, msg: &ClientMessage) -> Result<(), String> {
            let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
            if let Some(ref tx) = self.cmd_tx {
                tx.send(RelayCommand::Send(json))
                    .map_err(|e| format!("Send failed: {}", e))
            } else {
                Err("Not connected".to_string())
            }
        }

        /// Poll for pending events (non-blocking), in arrival order.
        pub fn poll_events(&mut self) -> Vec<SessionEvent> {
            if let Some(ref rx) = self.event_rx {
                while let Ok(event) = rx.try_recv() {
                    match &event {
                        SessionEvent::Connected => self.state = ConnectionState::Connected,
                        SessionEvent::Disconnected => self.state = ConnectionState::Disconnected,
                        SessionEvent::Error { .. } => self.state = ConnectionState::Error,
                        _ => {}
                    }
                    self.events.push(event);
                }
            }

            std::mem::take(&mut self.events)
        }

        /// Get current connection state.
        pub fn state(&self) -> ConnectionState {
            self.state
        }

        pub fn is_connected(&self) -> bool {
            self.state == ConnectionState::Connected
        }
    }

    impl Default for RelayClient {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Drop for RelayClient {
        fn drop(&mut self) {
            self.disconnect();
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::net::TcpListener;

        #[test]
        fn test_timeouts_set_on_connected_stream() {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let tcp = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
            let stream = MaybeTlsStream::Plain(tcp);

            set_stream_timeouts(&stream);

            let MaybeTlsStream::Plain(tcp) = &stream else {
                unreachable!()
            };
            assert_eq!(tcp.read_timeout().unwrap(), Some(READ_TIMEOUT));
            assert_eq!(tcp.write_timeout().unwrap(), Some(WRITE_TIMEOUT));
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native_client::RelayClient;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::stroke::{PeerId, StrokeIdGen};
    use kurbo::Point;

    fn sample_stroke() -> Stroke {
        let ids = StrokeIdGen::new(PeerId(9));
        Stroke::new(
            ids.next_id(),
            Color::black(),
            2.0,
            vec![Point::new(10.0, 10.0), Point::new(20.0, 10.0)],
        )
    }

    #[test]
    fn test_event_roundtrip() {
        let event = StrokeEvent::Added {
            page: 3,
            layer: 0,
            stroke: sample_stroke(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: StrokeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn test_delete_event_carries_identity_only() {
        let stroke = sample_stroke();
        let event = StrokeEvent::Deleted {
            page: 0,
            layer: 0,
            id: stroke.id(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("points"));
        let back: StrokeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn test_client_message_serialize() {
        let msg = ClientMessage::Join {
            room: "seminar".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("join"));
        assert!(json.contains("seminar"));
    }

    #[test]
    fn test_server_message_deserialize_without_history() {
        let json = r#"{"type":"joined","room":"seminar","peer_count":2}"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        match msg {
            ServerMessage::Joined {
                room,
                peer_count,
                history,
            } => {
                assert_eq!(room, "seminar");
                assert_eq!(peer_count, 2);
                assert!(history.is_empty());
            }
            _ => panic!("wrong message type"),
        }
    }

    #[test]
    fn test_edit_message_nests_event() {
        let msg = ClientMessage::Edit {
            event: StrokeEvent::Deleted {
                page: 1,
                layer: 0,
                id: sample_stroke().id(),
            },
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"edit""#));
        assert!(json.contains(r#""type":"deleted""#));
        assert!(json.contains(r#""page":1"#));
    }
}
