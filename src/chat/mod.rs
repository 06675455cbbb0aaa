// Chat connection lifecycle
// Message store, transport session, reconnect supervisor and the controller
// tying them together, plus the tokio driver used by the GUI

pub mod controller;
pub mod error;
pub mod message;
pub mod runtime;
pub mod session;
pub mod supervisor;

pub use controller::{ChatConfig, ChatStatus};
pub use message::{ChatMessage, MessageRole};
pub use runtime::{ChatCommand, ChatHandle, ChatSnapshot};
