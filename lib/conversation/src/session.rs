//! Conversation records.
//!
//! A conversation tracks one session's message history and the state the
//! concierge left it in.

use crate::message::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use steward_core::SessionId;

/// Where a conversation stands after its latest exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// Newly created; nothing has been routed yet.
    #[default]
    Greeting,
    /// Last message was a document search.
    Searching,
    /// Last message started a task.
    InTask,
    /// Last message was a general question.
    Answering,
    /// Last message was empty; no workflow ran.
    Idle,
}

impl ConversationState {
    /// Returns the wire name of the state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Searching => "searching",
            Self::InTask => "in_task",
            Self::Answering => "answering",
            Self::Idle => "idle",
        }
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One session's conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Session identifier.
    pub session_id: SessionId,
    /// Current state.
    pub state: ConversationState,
    /// Messages in order, user and assistant interleaved.
    pub messages: Vec<Message>,
    /// When the conversation was created.
    pub created_at: DateTime<Utc>,
    /// When the conversation last changed.
    pub last_active_at: DateTime<Utc>,
}

impl Conversation {
    /// Creates an empty conversation in the greeting state.
    #[must_use]
    pub fn new(session_id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            state: ConversationState::Greeting,
            messages: Vec::new(),
            created_at: now,
            last_active_at: now,
        }
    }

    /// Appends a user message and its reply, then moves to `state`.
    pub fn record_exchange(&mut self, user: Message, reply: Message, state: ConversationState) {
        self.messages.push(user);
        self.messages.push(reply);
        self.state = state;
        self.last_active_at = Utc::now();
    }

    /// Returns the number of messages.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Returns the last message, if any.
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Returns at most the `window` most recent messages, oldest first.
    #[must_use]
    pub fn recent(&self, window: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(window);
        &self.messages[start..]
    }
}
