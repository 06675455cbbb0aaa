//! Shopping assistant
//!
//! Conversation history and the completion client, plus the catalog tools
//! the model may call while producing a reply.

pub mod agent;
pub mod completion;
pub mod conversation;
pub mod tools;

pub use agent::{ShoppingAgent, MAX_TOOL_ROUNDS};
pub use completion::{
    ChatTurn, Completion, CompletionClient, FunctionCall, OpenAiCompatibleClient, ToolCall,
    ToolDefinition, TurnRole,
};
pub use conversation::{Conversation, SYSTEM_PROMPT};
pub use tools::{CatalogTools, ProductOption, RecipeIngredients};
