//! Tokio driver for the chat controller
//!
//! Runs a `ChatController` on a background task with a tokio-tungstenite
//! connector and a tokio timer scheduler. The UI talks to it through a
//! `ChatHandle`: commands go in over an mpsc channel and snapshots come back
//! over a watch channel, followed by a repaint request.

use crate::chat::controller::{ChatConfig, ChatController, ChatStatus, TransportEvent};
use crate::chat::error::TransportError;
use crate::chat::message::ChatMessage;
use crate::chat::session::{
    Connector, SessionId, Socket, ABNORMAL_CLOSURE, NORMAL_CLOSURE, NO_STATUS_RECEIVED,
};
use crate::chat::supervisor::{Scheduler, TimerId};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Notification delivered to the driver task
#[derive(Debug)]
pub enum DriverEvent {
    /// Something happened on a connection
    Transport(TransportEvent),
    /// A scheduled timer elapsed
    Timer(TimerId),
}

/// Request sent from the UI to the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Chat window opened
    Open,
    /// Chat window closed
    Close,
    /// Send a user message
    Submit(String),
    /// User pressed the reconnect button
    Reconnect,
    /// Sign in or out
    SetIdentity(Option<String>),
    /// Stop the driver task
    Shutdown,
}

/// Read-only view of the controller for rendering
#[derive(Debug, Clone)]
pub struct ChatSnapshot {
    /// Messages in display order
    pub messages: Vec<ChatMessage>,
    /// Connection badge
    pub status: ChatStatus,
    /// Whether input is blocked on a reply
    pub awaiting_reply: bool,
    /// Whether the Reconnect button is usable
    pub reconnect_enabled: bool,
    /// Consecutive automatic reconnect attempts
    pub attempt_count: u32,
    /// Whether automatic reconnects gave up
    pub retries_exhausted: bool,
    /// Malformed frames dropped so far
    pub dropped_frames: u64,
    /// Close code of the most recent session end
    pub last_close_code: Option<u16>,
    /// Last rejected submission, shown under the input box
    pub last_error: Option<String>,
}

impl Default for ChatSnapshot {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            status: ChatStatus::Disconnected,
            awaiting_reply: false,
            reconnect_enabled: true,
            attempt_count: 0,
            retries_exhausted: false,
            dropped_frames: 0,
            last_close_code: None,
            last_error: None,
        }
    }
}

enum Outbound {
    Text(String),
    Close(u16),
}

/// Socket handle backed by a connection task
pub struct WsSocket {
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl Socket for WsSocket {
    fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.outbound
            .send(Outbound::Text(text))
            .map_err(|_| TransportError::ChannelClosed)
    }

    fn close(&mut self, code: u16) {
        // The task may already be gone after a remote close.
        let _ = self.outbound.send(Outbound::Close(code));
    }
}

/// Connector that spawns one tokio-tungstenite task per session
pub struct WsConnector {
    runtime: Handle,
    events: mpsc::UnboundedSender<DriverEvent>,
}

impl WsConnector {
    /// Create a connector reporting to `events`
    pub fn new(runtime: Handle, events: mpsc::UnboundedSender<DriverEvent>) -> Self {
        Self { runtime, events }
    }
}

impl Connector for WsConnector {
    type Socket = WsSocket;

    fn connect(&mut self, session: SessionId, endpoint: &str) -> Result<WsSocket, TransportError> {
        if !(endpoint.starts_with("ws://") || endpoint.starts_with("wss://")) {
            return Err(TransportError::ConnectFailed(format!(
                "Unsupported endpoint: {}",
                endpoint
            )));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.runtime.spawn(run_connection(
            session,
            endpoint.to_string(),
            rx,
            self.events.clone(),
        ));
        Ok(WsSocket { outbound: tx })
    }
}

fn report(events: &mpsc::UnboundedSender<DriverEvent>, event: TransportEvent) {
    if events.send(DriverEvent::Transport(event)).is_err() {
        debug!("Chat driver gone, dropping transport event");
    }
}

async fn run_connection(
    session: SessionId,
    url: String,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<DriverEvent>,
) {
    debug!(session_id = session, url = %url, "Connecting to assistant");

    // Only a close request (or a dropped handle) can arrive before the handshake.
    let stream = tokio::select! {
        result = connect_async(url.as_str()) => match result {
            Ok((stream, _response)) => stream,
            Err(e) => {
                report(&events, TransportEvent::Error { session, detail: e.to_string() });
                return;
            }
        },
        _ = outbound.recv() => {
            debug!(session_id = session, "Connection abandoned before open");
            return;
        }
    };

    report(&events, TransportEvent::Opened { session });
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            command = outbound.recv() => {
                let code = match command {
                    Some(Outbound::Text(text)) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            report(&events, TransportEvent::Error { session, detail: e.to_string() });
                            break;
                        }
                        continue;
                    }
                    Some(Outbound::Close(code)) => code,
                    None => NORMAL_CLOSURE,
                };
                let frame = CloseFrame {
                    code: CloseCode::from(code),
                    reason: "".into(),
                };
                if let Err(e) = write.send(Message::Close(Some(frame))).await {
                    debug!(session_id = session, error = %e, "Close frame not delivered");
                }
                break;
            }
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    report(&events, TransportEvent::Frame { session, text });
                }
                Some(Ok(Message::Close(frame))) => {
                    let code = frame.map_or(NO_STATUS_RECEIVED, |f| u16::from(f.code));
                    report(&events, TransportEvent::Closed { session, code });
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    report(&events, TransportEvent::Error { session, detail: e.to_string() });
                    break;
                }
                None => {
                    report(&events, TransportEvent::Closed { session, code: ABNORMAL_CLOSURE });
                    break;
                }
            }
        }
    }
    debug!(session_id = session, "Connection task finished");
}

/// Scheduler backed by tokio sleep tasks
pub struct TokioScheduler {
    runtime: Handle,
    events: mpsc::UnboundedSender<DriverEvent>,
    next_id: TimerId,
    timers: HashMap<TimerId, JoinHandle<()>>,
}

impl TokioScheduler {
    /// Create a scheduler reporting to `events`
    pub fn new(runtime: Handle, events: mpsc::UnboundedSender<DriverEvent>) -> Self {
        Self {
            runtime,
            events,
            next_id: 0,
            timers: HashMap::new(),
        }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        self.timers.retain(|_, handle| !handle.is_finished());
        self.next_id += 1;
        let id = self.next_id;
        let events = self.events.clone();
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(DriverEvent::Timer(id));
        });
        self.timers.insert(id, handle);
        id
    }

    fn cancel(&mut self, timer: TimerId) {
        if let Some(handle) = self.timers.remove(&timer) {
            handle.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}

type LiveController = ChatController<WsConnector, TokioScheduler>;
type Repaint = Arc<dyn Fn() + Send + Sync>;

/// UI-side handle to a running chat driver
pub struct ChatHandle {
    commands: mpsc::UnboundedSender<ChatCommand>,
    snapshot: watch::Receiver<ChatSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl ChatHandle {
    /// Spawn a driver on `runtime`
    ///
    /// `repaint` is invoked after every snapshot update.
    pub fn spawn<F>(runtime: &Handle, config: ChatConfig, repaint: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(ChatSnapshot::default());

        let controller = ChatController::new(
            config,
            WsConnector::new(runtime.clone(), event_tx.clone()),
            TokioScheduler::new(runtime.clone(), event_tx),
        );
        let task = runtime.spawn(drive(
            controller,
            command_rx,
            event_rx,
            snapshot_tx,
            Arc::new(repaint),
        ));

        Self {
            commands: command_tx,
            snapshot: snapshot_rx,
            task: Some(task),
        }
    }

    /// Queue a command for the driver
    pub fn send(&self, command: ChatCommand) {
        if self.commands.send(command).is_err() {
            warn!("Chat driver is not running");
        }
    }

    /// Latest published state
    pub fn snapshot(&self) -> ChatSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver for snapshot updates
    #[allow(dead_code)] // The window polls `snapshot`; tests await changes
    pub fn subscribe(&self) -> watch::Receiver<ChatSnapshot> {
        self.snapshot.clone()
    }

    /// Stop the driver, closing any connection and cancelling timers
    pub fn shutdown(&mut self) -> Option<JoinHandle<()>> {
        let _ = self.commands.send(ChatCommand::Shutdown);
        self.task.take()
    }
}

impl Drop for ChatHandle {
    fn drop(&mut self) {
        let _ = self.commands.send(ChatCommand::Shutdown);
    }
}

fn snapshot_of(controller: &LiveController, last_error: &Option<String>) -> ChatSnapshot {
    ChatSnapshot {
        messages: controller.messages().to_vec(),
        status: controller.status(),
        awaiting_reply: controller.is_awaiting_reply(),
        reconnect_enabled: controller.can_manual_reconnect(),
        attempt_count: controller.attempt_count(),
        retries_exhausted: controller.retries_exhausted(),
        dropped_frames: controller.dropped_frames(),
        last_close_code: controller.last_close_code(),
        last_error: last_error.clone(),
    }
}

async fn drive(
    mut controller: LiveController,
    mut commands: mpsc::UnboundedReceiver<ChatCommand>,
    mut events: mpsc::UnboundedReceiver<DriverEvent>,
    snapshot: watch::Sender<ChatSnapshot>,
    repaint: Repaint,
) {
    info!("Chat driver started");
    let mut last_error: Option<String> = None;

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(ChatCommand::Open) => controller.open(),
                Some(ChatCommand::Close) => controller.close(),
                Some(ChatCommand::Reconnect) => controller.manual_reconnect(),
                Some(ChatCommand::SetIdentity(identity)) => controller.set_identity(identity),
                Some(ChatCommand::Submit(text)) => {
                    last_error = controller.submit(&text).err().map(|e| e.to_string());
                }
                Some(ChatCommand::Shutdown) | None => break,
            },
            Some(event) = events.recv() => match event {
                DriverEvent::Transport(event) => controller.handle_transport(event),
                DriverEvent::Timer(timer) => controller.handle_timer(timer),
            },
        }
        snapshot.send_replace(snapshot_of(&controller, &last_error));
        repaint();
    }

    controller.close();
    snapshot.send_replace(snapshot_of(&controller, &last_error));
    repaint();
    info!("Chat driver stopped");
}
