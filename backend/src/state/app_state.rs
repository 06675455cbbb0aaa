// Application state management
// Shared handles passed to every request handler

use crate::assistant::CompletionClient;
use crate::catalog::CatalogDb;
use crate::config::Config;
use std::sync::Arc;

/// Main application state
/// Cheap to clone; every field is reference counted
#[derive(Clone)]
pub struct AppState {
    /// Product catalog
    pub catalog: Arc<CatalogDb>,
    /// Source of assistant replies
    pub assistant: Arc<dyn CompletionClient>,
    /// Loaded configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new application state
    pub fn new(catalog: CatalogDb, assistant: Arc<dyn CompletionClient>, config: Config) -> Self {
        Self {
            catalog: Arc::new(catalog),
            assistant,
            config: Arc::new(config),
        }
    }

    /// Maximum conversation length for new assistant connections
    pub fn history_limit(&self) -> usize {
        self.config.chat.history_limit
    }
}
