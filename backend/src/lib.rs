//! Recipe Cart Backend Library
//!
//! This library exposes modules for testing and external use.
//! The main binary is in `src/main.rs`.

pub mod api;
pub mod app;
pub mod assistant;
pub mod catalog;
pub mod config;
pub mod error;
/// Application state management
///
/// Shared catalog, completion client and configuration handles.
pub mod state;
pub mod websocket;
