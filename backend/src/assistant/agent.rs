//! Tool-calling loop behind each assistant reply
//!
//! The model may answer directly or ask for catalog tools first. Tool
//! requests and results only live for the duration of one reply; the
//! conversation history keeps just the shopper's message and the final text.

use crate::assistant::completion::{ChatTurn, Completion, CompletionClient, ToolDefinition};
use crate::assistant::tools::CatalogTools;
use crate::catalog::CatalogDb;
use crate::error::AppError;
use std::sync::Arc;
use tracing::{debug, warn};

/// Completion rounds that may request tools before a plain answer is forced
pub const MAX_TOOL_ROUNDS: usize = 5;

/// Completion client paired with the catalog tools it may call
#[derive(Clone)]
pub struct ShoppingAgent {
    client: Arc<dyn CompletionClient>,
    tools: CatalogTools,
    definitions: Arc<Vec<ToolDefinition>>,
}

impl ShoppingAgent {
    /// Agent answering with `client` and looking products up in `catalog`
    pub fn new(client: Arc<dyn CompletionClient>, catalog: Arc<CatalogDb>) -> Self {
        Self {
            client,
            tools: CatalogTools::new(catalog),
            definitions: Arc::new(CatalogTools::definitions()),
        }
    }

    /// Produce the reply to the last turn of `history`
    pub async fn reply(&self, history: Vec<ChatTurn>) -> Result<String, AppError> {
        let mut messages = history;

        for round in 1..=MAX_TOOL_ROUNDS {
            let calls = match self
                .client
                .complete_with_tools(&messages, &self.definitions)
                .await?
            {
                Completion::Text(text) => return Ok(text),
                Completion::ToolCalls(calls) => calls,
            };

            debug!(round, calls = calls.len(), "Running tool calls");
            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                let output = self.tools.execute(self.client.as_ref(), call).await;
                results.push(ChatTurn::tool_result(call.id.clone(), output));
            }
            messages.push(ChatTurn::tool_request(calls));
            messages.extend(results);
        }

        warn!(rounds = MAX_TOOL_ROUNDS, "Tool round limit reached, asking for a plain answer");
        self.client.complete(&messages).await
    }
}
