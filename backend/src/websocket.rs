//! Assistant WebSocket channel
//!
//! Each connection owns a fresh conversation. Clients send
//! `{"message": "..."}` and receive `{"response": "..."}` for every accepted
//! message. Replies may consult the catalog through the assistant's tools.
//! Supports ping/pong for connection keepalive.

use crate::assistant::{Conversation, ShoppingAgent};
use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Reply sent when the completion service fails
pub const ERROR_RESPONSE: &str = "Sorry, an error occurred. Please try again.";

/// Interval between keepalive pings
pub const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Frame sent by the client
#[derive(Debug, Serialize, Deserialize)]
pub struct ClientMessage {
    /// Shopper's utterance
    pub message: String,
}

/// Frame sent to the client
#[derive(Debug, Serialize, Deserialize)]
pub struct AssistantReply {
    /// Assistant reply text
    pub response: String,
}

/// WebSocket upgrade handler
///
/// # Arguments
/// * `ws` - WebSocket upgrade request
/// * `state` - Application state holding the catalog and completion client
///
/// # Returns
/// * `Response` - HTTP response initiating WebSocket connection
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

// Handle one assistant connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();

    info!(%connection_id, "Assistant client connected");

    // Use a channel to send messages from receiver to sender
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Message>();

    // Task to forward messages from channel to sender
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = sender.send(msg).await {
                error!("Failed to send message: {}", e);
                break;
            }
        }
    });

    // Task to send periodic pings
    let ping_tx = tx.clone();
    let mut ping_task = tokio::spawn(async move {
        loop {
            tokio::time::sleep(PING_INTERVAL).await;
            if ping_tx.send(Message::Ping(vec![])).is_err() {
                break;
            }
        }
    });

    // Receive messages and answer them in order
    let agent = ShoppingAgent::new(state.assistant.clone(), state.catalog.clone());
    let history_limit = state.history_limit();
    let mut recv_task = tokio::spawn(async move {
        let mut conversation = Conversation::new(history_limit);
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    let Some(message) = parse_client_message(&text) else {
                        continue;
                    };
                    let response = respond(&agent, &mut conversation, message).await;
                    let Some(frame) = encode_reply(&response) else {
                        continue;
                    };
                    if tx.send(Message::Text(frame)).is_err() {
                        break;
                    }
                }
                Ok(Message::Close(_)) => {
                    info!(%connection_id, "Assistant client disconnected");
                    break;
                }
                Ok(Message::Pong(_)) => {
                    // Client responded to ping
                }
                Err(e) => {
                    warn!(%connection_id, "WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for any task to complete
    tokio::select! {
        _ = &mut send_task => {
            ping_task.abort();
            recv_task.abort();
        }
        _ = &mut ping_task => {
            send_task.abort();
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
            ping_task.abort();
        }
    }

    info!(%connection_id, "Assistant connection closed");
}

/// Extract the utterance from a client frame
///
/// Malformed frames and blank messages are logged and ignored.
pub fn parse_client_message(text: &str) -> Option<String> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(frame) if !frame.message.trim().is_empty() => Some(frame.message),
        Ok(_) => {
            debug!("Ignoring empty message");
            None
        }
        Err(e) => {
            warn!(error = %e, "Ignoring malformed frame");
            None
        }
    }
}

/// Serialize a reply frame
pub fn encode_reply(response: &str) -> Option<String> {
    serde_json::to_string(&AssistantReply {
        response: response.to_string(),
    })
    .map_err(|e| error!("Failed to serialize reply: {}", e))
    .ok()
}

/// Produce the reply to one user message
///
/// On failure the user turn is dropped from the history so the next attempt
/// starts from a consistent conversation.
pub async fn respond(
    agent: &ShoppingAgent,
    conversation: &mut Conversation,
    message: String,
) -> String {
    conversation.push_user(message);
    match agent.reply(conversation.messages()).await {
        Ok(reply) => {
            conversation.push_assistant(reply.clone());
            reply
        }
        Err(e) => {
            error!(error = %e, "Completion failed");
            conversation.pop_user();
            ERROR_RESPONSE.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::{ChatTurn, CompletionClient};
    use crate::catalog::CatalogDb;
    use crate::error::AppError;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    struct ScriptedClient {
        replies: Mutex<Vec<Result<String, AppError>>>,
        seen: Mutex<Vec<usize>>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Result<String, AppError>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, messages: &[ChatTurn]) -> Result<String, AppError> {
            self.seen.lock().unwrap().push(messages.len());
            self.replies.lock().unwrap().remove(0)
        }
    }

    async fn agent_with(client: Arc<ScriptedClient>) -> (ShoppingAgent, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("catalog.db");
        let catalog = CatalogDb::new(db_path.to_str().unwrap()).await.unwrap();
        (ShoppingAgent::new(client, Arc::new(catalog)), dir)
    }

    #[test]
    fn test_parse_client_message() {
        assert_eq!(
            parse_client_message(r#"{"message": "pasta ingredients"}"#),
            Some("pasta ingredients".to_string())
        );
        assert_eq!(parse_client_message(r#"{"message": "   "}"#), None);
        assert_eq!(parse_client_message(r#"{"text": "hello"}"#), None);
        assert_eq!(parse_client_message("not json"), None);
    }

    #[test]
    fn test_encode_reply() {
        let frame = encode_reply("Here are pasta ingredients...").unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["response"], "Here are pasta ingredients...");
    }

    #[tokio::test]
    async fn test_respond_records_history() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok("Spaghetti and tomatoes".to_string()),
            Ok("Add basil".to_string()),
        ]));
        let (agent, _dir) = agent_with(client.clone()).await;
        let mut conversation = Conversation::new(40);

        assert_eq!(
            respond(&agent, &mut conversation, "pasta".to_string()).await,
            "Spaghetti and tomatoes"
        );
        respond(&agent, &mut conversation, "anything else?".to_string()).await;

        // system + user, then system + user + assistant + user
        assert_eq!(*client.seen.lock().unwrap(), vec![2, 4]);
        assert_eq!(conversation.len(), 4);
    }

    #[tokio::test]
    async fn test_respond_failure_rolls_back_user_turn() {
        let client = Arc::new(ScriptedClient::new(vec![
            Err(AppError::Completion("HTTP 500".to_string())),
            Ok("Flour, yeast, mozzarella".to_string()),
        ]));
        let (agent, _dir) = agent_with(client.clone()).await;
        let mut conversation = Conversation::new(40);

        assert_eq!(
            respond(&agent, &mut conversation, "pizza".to_string()).await,
            ERROR_RESPONSE
        );
        assert!(conversation.is_empty());

        respond(&agent, &mut conversation, "pizza".to_string()).await;
        assert_eq!(*client.seen.lock().unwrap(), vec![2, 2]);
    }
}
