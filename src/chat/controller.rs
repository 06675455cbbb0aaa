//! Chat Controller
//!
//! Coordinates the message store, the transport session and the reconnect
//! supervisor. The controller is event driven: the UI calls `open`, `close`,
//! `submit` and `manual_reconnect`, and the runtime feeds transport and timer
//! notifications through `handle_transport` and `handle_timer`. All calls for
//! one controller are serialized by its owner.

use crate::chat::error::ChatError;
use crate::chat::message::{ChatMessage, MessageRole, MessageStore};
use crate::chat::session::{
    ConnectionState, Connector, SessionId, TransportSession, ABNORMAL_CLOSURE, NORMAL_CLOSURE,
};
use crate::chat::supervisor::{ReconnectSupervisor, RetryDecision, RetryPolicy, Scheduler, TimerId};
use chrono::Local;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Notice shown when the connection fails while a reply is awaited
pub const CONNECTION_ERROR_NOTICE: &str =
    "Sorry, I'm having trouble connecting. Please make sure the server is running and try again.";
/// Notice shown when a message could not be transmitted
pub const SEND_ERROR_NOTICE: &str =
    "Sorry, I encountered an error sending your message. Please try again.";
/// Notice shown when the reply timeout elapses
pub const REPLY_TIMEOUT_NOTICE: &str =
    "Sorry, the assistant is taking too long to respond. Please try again.";

/// User-visible connection badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatStatus {
    /// A session is open
    Connected,
    /// Connecting, or a reconnect is scheduled
    Reconnecting,
    /// No session and nothing scheduled
    Disconnected,
}

/// Notification from the transport layer about one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Server acknowledged the connection
    Opened {
        /// Session the event belongs to
        session: SessionId,
    },
    /// A text frame arrived
    Frame {
        /// Session the event belongs to
        session: SessionId,
        /// Raw frame text
        text: String,
    },
    /// The remote side closed the connection
    Closed {
        /// Session the event belongs to
        session: SessionId,
        /// Close code (1006 when the connection dropped)
        code: u16,
    },
    /// The connection failed
    Error {
        /// Session the event belongs to
        session: SessionId,
        /// Human-readable cause
        detail: String,
    },
}

impl TransportEvent {
    /// Session the event belongs to
    pub fn session(&self) -> SessionId {
        match self {
            TransportEvent::Opened { session }
            | TransportEvent::Frame { session, .. }
            | TransportEvent::Closed { session, .. }
            | TransportEvent::Error { session, .. } => *session,
        }
    }
}

/// Controller configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Assistant WebSocket endpoint
    pub endpoint: String,
    /// Automatic reconnect policy
    pub retry: RetryPolicy,
    /// How long to wait for a reply before giving up (None = forever)
    pub reply_timeout: Option<Duration>,
    /// Reject submissions until an identity is set
    pub require_identity: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://localhost:8000/ws".to_string(),
            retry: RetryPolicy::default(),
            reply_timeout: Some(Duration::from_secs(120)),
            require_identity: false,
        }
    }
}

/// Top-level coordinator of one chat window
pub struct ChatController<C: Connector, T: Scheduler> {
    config: ChatConfig,
    connector: C,
    scheduler: T,
    store: MessageStore,
    session: Option<TransportSession<C::Socket>>,
    sessions_started: SessionId,
    supervisor: ReconnectSupervisor,
    awaiting_reply: bool,
    reply_timer: Option<TimerId>,
    identity: Option<String>,
    dropped_frames: u64,
    last_close_code: Option<u16>,
}

impl<C: Connector, T: Scheduler> ChatController<C, T> {
    /// Create a controller; no connection is attempted until `open`
    pub fn new(config: ChatConfig, connector: C, scheduler: T) -> Self {
        let supervisor = ReconnectSupervisor::new(config.retry);
        Self {
            config,
            connector,
            scheduler,
            store: MessageStore::new(),
            session: None,
            sessions_started: 0,
            supervisor,
            awaiting_reply: false,
            reply_timer: None,
            identity: None,
            dropped_frames: 0,
            last_close_code: None,
        }
    }

    /// Messages in display order
    pub fn messages(&self) -> &[ChatMessage] {
        self.store.messages()
    }

    /// Badge to show in the UI
    pub fn status(&self) -> ChatStatus {
        match self.connection_state() {
            ConnectionState::Open => ChatStatus::Connected,
            ConnectionState::Connecting => ChatStatus::Reconnecting,
            _ if self.supervisor.has_pending() => ChatStatus::Reconnecting,
            _ => ChatStatus::Disconnected,
        }
    }

    /// State of the current session (Idle before the first attempt)
    pub fn connection_state(&self) -> ConnectionState {
        match &self.session {
            Some(session) => session.state(),
            None if self.sessions_started == 0 => ConnectionState::Idle,
            None => ConnectionState::Closed,
        }
    }

    /// Whether the user may force a reconnect
    ///
    /// Only an attempt already in flight blocks it; a scheduled retry does not.
    pub fn can_manual_reconnect(&self) -> bool {
        self.connection_state() != ConnectionState::Connecting
    }

    /// Whether a submission is waiting for its reply
    pub fn is_awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    /// Consecutive automatic reconnect attempts
    pub fn attempt_count(&self) -> u32 {
        self.supervisor.attempt_count()
    }

    /// Whether automatic reconnects gave up
    pub fn retries_exhausted(&self) -> bool {
        self.supervisor.is_exhausted()
    }

    /// Malformed inbound frames dropped over the controller's lifetime
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
            + self
                .session
                .as_ref()
                .map_or(0, |session| session.dropped_frames())
    }

    /// Close code of the most recent session end
    pub fn last_close_code(&self) -> Option<u16> {
        self.last_close_code
    }

    /// Set or clear the signed-in identity
    pub fn set_identity(&mut self, identity: Option<String>) {
        self.identity = identity;
    }

    /// Connect unless a session is already Connecting or Open
    pub fn open(&mut self) {
        if self.has_live_session() {
            debug!("Chat session already live, ignoring open");
            return;
        }
        self.supervisor.cancel(&mut self.scheduler);
        self.start_session();
    }

    /// Tear down: cancel every timer and close the live session
    pub fn close(&mut self) {
        self.supervisor.cancel(&mut self.scheduler);
        self.cancel_reply_timer();
        self.awaiting_reply = false;
        if let Some(mut session) = self.session.take() {
            session.close(NORMAL_CLOSURE);
            self.dropped_frames += session.dropped_frames();
            info!(session_id = session.id(), "Chat session closed by user");
        }
        self.last_close_code = Some(NORMAL_CLOSURE);
    }

    /// Drop the current session, reset retries and connect immediately
    pub fn manual_reconnect(&mut self) {
        info!(
            attempts = self.supervisor.attempt_count(),
            "Manual reconnect requested"
        );
        if let Some(mut session) = self.session.take() {
            session.close(NORMAL_CLOSURE);
            self.dropped_frames += session.dropped_frames();
        }
        if self.awaiting_reply {
            self.fail_in_flight(CONNECTION_ERROR_NOTICE);
        }
        self.supervisor.manual_reset(&mut self.scheduler);
        self.start_session();
    }

    /// Send a user message
    ///
    /// Validation failures leave the store untouched. A transmission failure
    /// still records the user message followed by an error notice.
    pub fn submit(&mut self, text: &str) -> Result<(), ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyInput);
        }
        if self.config.require_identity && self.identity.is_none() {
            return Err(ChatError::SignInRequired);
        }
        if self.awaiting_reply || self.connection_state() != ConnectionState::Open {
            return Err(ChatError::NotReady);
        }

        self.store.append(MessageRole::User, text, Local::now());
        self.awaiting_reply = true;

        let sent = match self.session.as_mut() {
            Some(session) => session.send(text),
            None => Err(ChatError::NotConnected),
        };
        match sent {
            Ok(()) => {
                debug!(len = text.len(), "User message sent");
                self.arm_reply_timer();
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to send chat message");
                self.fail_in_flight(SEND_ERROR_NOTICE);
                Err(match e {
                    ChatError::SendFailure(_) => e,
                    other => ChatError::SendFailure(other.to_string()),
                })
            }
        }
    }

    /// Apply a transport notification
    ///
    /// Events for sessions that were already discarded are ignored.
    pub fn handle_transport(&mut self, event: TransportEvent) {
        let current = self.session.as_ref().map(|session| session.id());
        if current != Some(event.session()) {
            debug!(
                event_session = event.session(),
                current_session = ?current,
                "Ignoring event from stale session"
            );
            return;
        }

        match event {
            TransportEvent::Opened { .. } => {
                let opened = self
                    .session
                    .as_mut()
                    .is_some_and(|session| session.mark_open());
                if opened {
                    self.supervisor.on_open();
                }
            }
            TransportEvent::Frame { text, .. } => {
                let reply = self
                    .session
                    .as_mut()
                    .and_then(|session| session.receive(&text));
                if let Some(reply) = reply {
                    self.store.append(MessageRole::Assistant, reply, Local::now());
                    self.awaiting_reply = false;
                    self.cancel_reply_timer();
                }
            }
            TransportEvent::Closed { code, .. } => {
                info!(code, "Assistant connection closed by remote");
                self.end_session(code);
            }
            TransportEvent::Error { detail, .. } => {
                warn!(error = %detail, "Assistant connection error");
                self.end_session(ABNORMAL_CLOSURE);
            }
        }
    }

    /// Apply a timer notification
    pub fn handle_timer(&mut self, timer: TimerId) {
        if self.reply_timer == Some(timer) {
            self.reply_timer = None;
            if self.awaiting_reply {
                warn!("Timed out waiting for assistant reply");
                self.fail_in_flight(REPLY_TIMEOUT_NOTICE);
            }
            return;
        }
        if self.supervisor.take_due(timer) && !self.has_live_session() {
            debug!(attempt = self.supervisor.attempt_count(), "Reconnect timer fired");
            self.start_session();
        }
    }

    fn has_live_session(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.state().is_live())
    }

    fn start_session(&mut self) {
        if let Some(stale) = self.session.take() {
            self.dropped_frames += stale.dropped_frames();
        }
        self.sessions_started += 1;
        let mut session = TransportSession::new(self.sessions_started, self.config.endpoint.clone());
        let result = session.open(&mut self.connector);
        self.session = Some(session);
        if let Err(e) = result {
            warn!(error = %e, "Failed to start assistant connection");
            self.end_session(ABNORMAL_CLOSURE);
        }
    }

    fn end_session(&mut self, code: u16) {
        if let Some(mut session) = self.session.take() {
            session.mark_closed();
            self.dropped_frames += session.dropped_frames();
        }
        self.last_close_code = Some(code);
        if self.awaiting_reply {
            self.fail_in_flight(CONNECTION_ERROR_NOTICE);
        }
        match self
            .supervisor
            .on_session_closed(code, false, &mut self.scheduler)
        {
            RetryDecision::Scheduled { attempt, delay } => {
                debug!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");
            }
            RetryDecision::Suppressed => {}
            RetryDecision::Exhausted => {
                warn!("Assistant disconnected; manual reconnect required");
            }
        }
    }

    fn fail_in_flight(&mut self, notice: &str) {
        self.awaiting_reply = false;
        self.cancel_reply_timer();
        self.store.append(MessageRole::Assistant, notice, Local::now());
    }

    fn arm_reply_timer(&mut self) {
        self.cancel_reply_timer();
        if let Some(timeout) = self.config.reply_timeout {
            self.reply_timer = Some(self.scheduler.schedule(timeout));
        }
    }

    fn cancel_reply_timer(&mut self) {
        if let Some(timer) = self.reply_timer.take() {
            self.scheduler.cancel(timer);
        }
    }
}

impl<C: Connector, T: Scheduler> Drop for ChatController<C, T> {
    fn drop(&mut self) {
        self.close();
    }
}
