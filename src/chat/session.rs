//! Transport Session
//!
//! Wraps a single connection attempt to the assistant backend. Handles the
//! `{message}` / `{response}` JSON framing and guarantees the socket handle is
//! released on every exit path (explicit close, remote close, error or drop).

use crate::chat::error::{ChatError, TransportError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Identifier of one connection attempt within a controller
pub type SessionId = u64;

/// Close code for a normal, intentional closure
pub const NORMAL_CLOSURE: u16 = 1000;
/// Close code reported when the connection dropped without a close frame
pub const ABNORMAL_CLOSURE: u16 = 1006;
/// Close code reported when a close frame carried no status
pub const NO_STATUS_RECEIVED: u16 = 1005;

/// Lifecycle phase of a transport session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Created, no connection attempted yet
    Idle,
    /// Connection attempt in progress
    Connecting,
    /// Server acknowledged the connection
    Open,
    /// Close requested, handle being released
    Closing,
    /// Terminal; a new session is required to reconnect
    Closed,
}

impl ConnectionState {
    /// Whether the session counts as live (Connecting or Open)
    pub fn is_live(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Open)
    }
}

/// Handle to an underlying duplex connection
pub trait Socket {
    /// Transmit one text frame
    fn send_text(&mut self, text: String) -> Result<(), TransportError>;
    /// Close the connection with the given close code
    fn close(&mut self, code: u16);
}

/// Starts connection attempts
///
/// `connect` only initiates the attempt; the server acknowledgement arrives
/// later as a transport event for the same session id.
pub trait Connector {
    /// Socket type produced by this connector
    type Socket: Socket;

    /// Begin connecting `session` to `endpoint`
    fn connect(&mut self, session: SessionId, endpoint: &str)
        -> Result<Self::Socket, TransportError>;
}

/// Frame sent to the assistant backend
#[derive(Debug, Serialize)]
pub struct OutboundFrame<'a> {
    /// User utterance
    pub message: &'a str,
}

/// Frame received from the assistant backend
#[derive(Debug, Deserialize)]
pub struct InboundFrame {
    /// Assistant reply text
    pub response: String,
}

/// Encode a user utterance as an outbound frame
pub fn encode_outbound(message: &str) -> Result<String, ChatError> {
    serde_json::to_string(&OutboundFrame { message })
        .map_err(|e| ChatError::SendFailure(format!("Failed to serialize frame: {}", e)))
}

/// Decode an inbound frame into the assistant reply text
pub fn decode_inbound(text: &str) -> Result<String, ChatError> {
    serde_json::from_str::<InboundFrame>(text)
        .map(|frame| frame.response)
        .map_err(|e| ChatError::MalformedMessage(e.to_string()))
}

/// One connection attempt and its socket handle
pub struct TransportSession<S: Socket> {
    id: SessionId,
    endpoint: String,
    state: ConnectionState,
    socket: Option<S>,
    dropped_frames: u64,
}

impl<S: Socket> TransportSession<S> {
    /// Create an idle session for `endpoint`
    pub fn new(id: SessionId, endpoint: impl Into<String>) -> Self {
        Self {
            id,
            endpoint: endpoint.into(),
            state: ConnectionState::Idle,
            socket: None,
            dropped_frames: 0,
        }
    }

    /// Session identifier
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current lifecycle phase
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Number of inbound frames dropped as malformed
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    /// Start connecting
    ///
    /// No-op when already Connecting or Open. A connector failure moves the
    /// session straight to Closed.
    pub fn open<C>(&mut self, connector: &mut C) -> Result<(), ChatError>
    where
        C: Connector<Socket = S>,
    {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Open => {
                debug!(session_id = self.id, "Session already live, ignoring open");
                Ok(())
            }
            ConnectionState::Closing | ConnectionState::Closed => Err(ChatError::SessionClosed),
            ConnectionState::Idle => {
                self.state = ConnectionState::Connecting;
                match connector.connect(self.id, &self.endpoint) {
                    Ok(socket) => {
                        debug!(
                            session_id = self.id,
                            endpoint = %self.endpoint,
                            "Connection attempt started"
                        );
                        self.socket = Some(socket);
                        Ok(())
                    }
                    Err(e) => {
                        self.state = ConnectionState::Closed;
                        Err(ChatError::Connection(e.to_string()))
                    }
                }
            }
        }
    }

    /// Record the server acknowledgement
    ///
    /// Returns true if the session moved from Connecting to Open.
    pub fn mark_open(&mut self) -> bool {
        if self.state == ConnectionState::Connecting {
            self.state = ConnectionState::Open;
            info!(session_id = self.id, endpoint = %self.endpoint, "Assistant connection open");
            true
        } else {
            false
        }
    }

    /// Send a user utterance as `{"message": ...}`
    pub fn send(&mut self, payload: &str) -> Result<(), ChatError> {
        if self.state != ConnectionState::Open {
            return Err(ChatError::NotConnected);
        }
        let frame = encode_outbound(payload)?;
        let socket = self.socket.as_mut().ok_or(ChatError::NotConnected)?;
        socket
            .send_text(frame)
            .map_err(|e| ChatError::SendFailure(e.to_string()))
    }

    /// Parse an inbound frame
    ///
    /// Malformed frames are logged, counted and dropped.
    pub fn receive(&mut self, text: &str) -> Option<String> {
        match decode_inbound(text) {
            Ok(response) => Some(response),
            Err(e) => {
                self.dropped_frames += 1;
                warn!(
                    session_id = self.id,
                    error = %e,
                    dropped_frames = self.dropped_frames,
                    "Dropping malformed frame"
                );
                None
            }
        }
    }

    /// Close the session locally and release the socket
    pub fn close(&mut self, code: u16) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.state = ConnectionState::Closing;
        if let Some(mut socket) = self.socket.take() {
            socket.close(code);
        }
        self.state = ConnectionState::Closed;
        debug!(session_id = self.id, code, "Session closed locally");
    }

    /// Record a remote close or transport error
    pub fn mark_closed(&mut self) {
        // The remote side is gone; dropping the handle is all that is left.
        self.socket = None;
        self.state = ConnectionState::Closed;
    }
}

impl<S: Socket> Drop for TransportSession<S> {
    fn drop(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            socket.close(NORMAL_CLOSURE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Wire {
        connects: usize,
        sent: Vec<String>,
        closes: Vec<u16>,
        fail_connect: bool,
        fail_send: bool,
    }

    struct TestSocket(Rc<RefCell<Wire>>);

    impl Socket for TestSocket {
        fn send_text(&mut self, text: String) -> Result<(), TransportError> {
            let mut wire = self.0.borrow_mut();
            if wire.fail_send {
                return Err(TransportError::ChannelClosed);
            }
            wire.sent.push(text);
            Ok(())
        }

        fn close(&mut self, code: u16) {
            self.0.borrow_mut().closes.push(code);
        }
    }

    struct TestConnector(Rc<RefCell<Wire>>);

    impl Connector for TestConnector {
        type Socket = TestSocket;

        fn connect(&mut self, _: SessionId, _: &str) -> Result<TestSocket, TransportError> {
            let mut wire = self.0.borrow_mut();
            if wire.fail_connect {
                return Err(TransportError::ConnectFailed("refused".to_string()));
            }
            wire.connects += 1;
            Ok(TestSocket(self.0.clone()))
        }
    }

    fn setup() -> (Rc<RefCell<Wire>>, TestConnector, TransportSession<TestSocket>) {
        let wire = Rc::new(RefCell::new(Wire::default()));
        let connector = TestConnector(wire.clone());
        let session = TransportSession::new(1, "ws://localhost:8000/ws");
        (wire, connector, session)
    }

    #[test]
    fn test_open_transitions_to_connecting() {
        let (wire, mut connector, mut session) = setup();
        assert_eq!(session.state(), ConnectionState::Idle);
        session.open(&mut connector).unwrap();
        assert_eq!(session.state(), ConnectionState::Connecting);
        assert!(session.mark_open());
        assert_eq!(session.state(), ConnectionState::Open);
        assert_eq!(wire.borrow().connects, 1);
    }

    #[test]
    fn test_open_is_noop_while_live() {
        let (wire, mut connector, mut session) = setup();
        session.open(&mut connector).unwrap();
        session.open(&mut connector).unwrap();
        session.mark_open();
        session.open(&mut connector).unwrap();
        assert_eq!(wire.borrow().connects, 1);
    }

    #[test]
    fn test_closed_session_cannot_reopen() {
        let (_wire, mut connector, mut session) = setup();
        session.open(&mut connector).unwrap();
        session.close(NORMAL_CLOSURE);
        assert_eq!(session.open(&mut connector), Err(ChatError::SessionClosed));
    }

    #[test]
    fn test_connect_failure_closes_session() {
        let (wire, mut connector, mut session) = setup();
        wire.borrow_mut().fail_connect = true;
        let result = session.open(&mut connector);
        assert!(matches!(result, Err(ChatError::Connection(_))));
        assert_eq!(session.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_send_requires_open() {
        let (wire, mut connector, mut session) = setup();
        assert_eq!(session.send("hello"), Err(ChatError::NotConnected));
        session.open(&mut connector).unwrap();
        assert_eq!(session.send("hello"), Err(ChatError::NotConnected));
        session.mark_open();
        session.send("hello").unwrap();
        assert_eq!(wire.borrow().sent, vec![r#"{"message":"hello"}"#.to_string()]);
    }

    #[test]
    fn test_send_failure_is_reported() {
        let (wire, mut connector, mut session) = setup();
        session.open(&mut connector).unwrap();
        session.mark_open();
        wire.borrow_mut().fail_send = true;
        assert!(matches!(session.send("hello"), Err(ChatError::SendFailure(_))));
    }

    #[test]
    fn test_receive_parses_response() {
        let (_wire, _connector, mut session) = setup();
        assert_eq!(
            session.receive(r#"{"response":"Here are pasta ingredients..."}"#),
            Some("Here are pasta ingredients...".to_string())
        );
        assert_eq!(session.dropped_frames(), 0);
    }

    #[test]
    fn test_malformed_frames_are_dropped_and_counted() {
        let (_wire, _connector, mut session) = setup();
        assert_eq!(session.receive("not json"), None);
        assert_eq!(session.receive(r#"{"reply":"wrong field"}"#), None);
        assert_eq!(session.receive(r#"{"response":42}"#), None);
        assert_eq!(session.dropped_frames(), 3);
    }

    #[test]
    fn test_close_releases_socket_once() {
        let (wire, mut connector, mut session) = setup();
        session.open(&mut connector).unwrap();
        session.close(NORMAL_CLOSURE);
        session.close(NORMAL_CLOSURE);
        assert_eq!(session.state(), ConnectionState::Closed);
        assert_eq!(wire.borrow().closes, vec![NORMAL_CLOSURE]);
    }

    #[test]
    fn test_drop_releases_socket() {
        let (wire, mut connector, mut session) = setup();
        session.open(&mut connector).unwrap();
        session.mark_open();
        drop(session);
        assert_eq!(wire.borrow().closes, vec![NORMAL_CLOSURE]);
    }

    #[test]
    fn test_remote_close_does_not_echo_close() {
        let (wire, mut connector, mut session) = setup();
        session.open(&mut connector).unwrap();
        session.mark_open();
        session.mark_closed();
        assert_eq!(session.state(), ConnectionState::Closed);
        drop(session);
        assert!(wire.borrow().closes.is_empty());
    }

    #[test]
    fn test_outbound_encoding_escapes() {
        let frame = encode_outbound("say \"hi\"").unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["message"], "say \"hi\"");
    }
}
