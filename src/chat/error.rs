//! Chat-specific error types
//!
//! Errors raised by the chat core. Transport failures are contained by the
//! controller and turned into status changes; only the local validation
//! errors are ever returned to the UI.

use thiserror::Error;

/// Errors that can occur in the chat connection lifecycle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// Transport failed to establish or dropped unexpectedly
    #[error("Connection error: {0}")]
    Connection(String),

    /// Inbound frame could not be parsed or lacked the `response` field
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// Submitted text was empty after trimming
    #[error("Message cannot be empty")]
    EmptyInput,

    /// No open session, or a previous reply is still outstanding
    #[error("Assistant is not ready for a new message")]
    NotReady,

    /// Identity gating is enabled and nobody is signed in
    #[error("Sign in to chat with the assistant")]
    SignInRequired,

    /// Session is not in the `Open` state
    #[error("Session is not connected")]
    NotConnected,

    /// Session reached `Closed` and cannot be reopened
    #[error("Session is closed")]
    SessionClosed,

    /// Transmitting a frame failed
    #[error("Failed to send message: {0}")]
    SendFailure(String),
}

/// Error reported by a socket or connector implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connection attempt could not be started
    #[error("Failed to start connection: {0}")]
    ConnectFailed(String),

    /// The connection task is gone and can no longer carry frames
    #[error("Connection channel closed")]
    ChannelClosed,
}
