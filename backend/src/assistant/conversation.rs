//! Conversation history for one assistant connection

use crate::assistant::completion::{ChatTurn, TurnRole};
use std::collections::VecDeque;

/// System prompt sent at the start of every conversation
pub const SYSTEM_PROMPT: &str = "You are a friendly recipe shopping assistant for an online grocery store. \
Guide the shopper one step at a time.\n\
1. When a dish is mentioned, call extract_recipe_ingredients, then list the ingredients and \
offer to start with the first one. Do not look anything else up yet.\n\
2. For the ingredient the shopper agrees to, call check_ingredient_availability for that ONE \
ingredient and present the products as a numbered list with brand and price.\n\
3. If nothing is available or the shopper dislikes the options, call search_alternatives.\n\
4. Use get_product_details_for_comparison or get_nutrition_comparison when asked to compare.\n\
Only mention products returned by the tools and keep answers short. \
If a request has nothing to do with cooking or groceries, politely steer the conversation back.";

/// Bounded message history
///
/// The system prompt is always kept; older user and assistant turns are
/// dropped first once `limit` is exceeded.
#[derive(Debug, Clone)]
pub struct Conversation {
    system: ChatTurn,
    turns: VecDeque<ChatTurn>,
    limit: usize,
}

impl Conversation {
    /// Start a conversation with the default system prompt
    pub fn new(limit: usize) -> Self {
        Self::with_system_prompt(SYSTEM_PROMPT, limit)
    }

    /// Start a conversation with a custom system prompt
    pub fn with_system_prompt(prompt: impl Into<String>, limit: usize) -> Self {
        Self {
            system: ChatTurn::new(TurnRole::System, prompt),
            turns: VecDeque::new(),
            limit: limit.max(2),
        }
    }

    /// Record a user message
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(ChatTurn::new(TurnRole::User, content));
    }

    /// Record an assistant reply
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(ChatTurn::new(TurnRole::Assistant, content));
    }

    /// Remove the most recent turn if it is a user message
    ///
    /// Used when the completion for that message failed.
    pub fn pop_user(&mut self) -> Option<ChatTurn> {
        match self.turns.back() {
            Some(turn) if turn.role == TurnRole::User => self.turns.pop_back(),
            _ => None,
        }
    }

    /// Full message list to send to the completion service
    pub fn messages(&self) -> Vec<ChatTurn> {
        std::iter::once(self.system.clone())
            .chain(self.turns.iter().cloned())
            .collect()
    }

    /// Number of non-system turns
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether no user or assistant turn was recorded yet
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn push(&mut self, turn: ChatTurn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.limit {
            self.turns.pop_front();
        }
    }
}
