use crate::config::HistoryPolicy;
use crate::types::{Message, Role};

/// Conversation state carried across user turns.
///
/// Under [`HistoryPolicy::PerTurn`] nothing is carried and every input starts
/// fresh. Under [`HistoryPolicy::Accumulate`] the messages of each completed
/// turn become the starting point of the next one. A turn that fails or is
/// cancelled is never committed.
#[derive(Debug, Clone)]
pub struct Session {
    policy: HistoryPolicy,
    messages: Vec<Message>,
}

impl Session {
    pub fn new(policy: HistoryPolicy) -> Self {
        Self {
            policy,
            messages: Vec::new(),
        }
    }

    pub fn policy(&self) -> HistoryPolicy {
        self.policy
    }

    /// Committed history.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of completed user turns currently held.
    pub fn turn_count(&self) -> usize {
        self.messages.iter().filter(|m| m.role == Role::User).count()
    }

    /// Starting history for a new turn with the given user input.
    pub fn begin_turn(&self, input: &str) -> Vec<Message> {
        let mut history = match self.policy {
            HistoryPolicy::PerTurn => Vec::new(),
            HistoryPolicy::Accumulate => self.messages.clone(),
        };
        history.push(Message::user(input));
        history
    }

    /// Record the full history of a finished turn.
    pub fn commit(&mut self, history: Vec<Message>) {
        if self.policy == HistoryPolicy::Accumulate {
            self.messages = history;
        }
    }

    /// Drop all committed history.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
