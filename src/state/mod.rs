// State management module
// Handles catalog view state and UI preferences

pub mod app_state;

pub use app_state::{AppState, RequestId};
