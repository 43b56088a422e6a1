//! Conversation storage.

use crate::error::StoreError;
use crate::message::Message;
use crate::session::{Conversation, ConversationState};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use steward_core::SessionId;
use tracing::debug;

/// Idle time after which a session is dropped, unless configured.
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 60;

/// Maximum number of live sessions, unless configured.
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

/// Trait for conversation storage.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Gets a conversation by session ID.
    async fn get(&self, session_id: &SessionId) -> Result<Option<Conversation>, StoreError>;

    /// Appends one exchange and sets the state, creating the conversation if
    /// it does not exist. The whole exchange is applied at once.
    async fn record_exchange(
        &self,
        session_id: &SessionId,
        user: Message,
        reply: Message,
        state: ConversationState,
    ) -> Result<Conversation, StoreError>;

    /// Drops a conversation. Returns whether one existed.
    async fn clear(&self, session_id: &SessionId) -> Result<bool, StoreError>;

    /// Drops conversations idle past the TTL. Returns how many were dropped.
    async fn evict_expired(&self) -> Result<usize, StoreError>;
}

/// Keeps conversations in process memory.
///
/// Sessions idle longer than the TTL are treated as gone and removed on the
/// next eviction pass. When a new session pushes the store over capacity,
/// the least recently active sessions are dropped.
#[derive(Debug)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<SessionId, Conversation>>,
    ttl: Duration,
    max_sessions: usize,
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryConversationStore {
    /// Creates a store with the default TTL and capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            ttl: Duration::minutes(DEFAULT_SESSION_TTL_MINUTES),
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    /// Sets the idle TTL.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the capacity. Zero is treated as one.
    #[must_use]
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    /// Returns the number of stored sessions, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.conversations
            .read()
            .map(|c| c.len())
            .unwrap_or_default()
    }

    /// Returns whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, conversation: &Conversation, now: DateTime<Utc>) -> bool {
        now - conversation.last_active_at > self.ttl
    }

    /// Drops every session that is expired as of `now`.
    pub(crate) fn evict_expired_at(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut conversations = self.conversations.write().map_err(storage_failed)?;
        let before = conversations.len();
        conversations.retain(|_, c| !self.is_expired(c, now));
        Ok(before - conversations.len())
    }

    fn evict_over_capacity(&self, conversations: &mut HashMap<SessionId, Conversation>) {
        while conversations.len() > self.max_sessions {
            let oldest = conversations
                .values()
                .min_by_key(|c| c.last_active_at)
                .map(|c| c.session_id.clone());
            let Some(oldest) = oldest else { break };
            debug!(session_id = %oldest, "evicting least recently active session");
            conversations.remove(&oldest);
        }
    }
}

fn storage_failed<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::StorageFailed {
        reason: e.to_string(),
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get(&self, session_id: &SessionId) -> Result<Option<Conversation>, StoreError> {
        let conversations = self.conversations.read().map_err(storage_failed)?;
        Ok(conversations
            .get(session_id)
            .filter(|c| !self.is_expired(c, Utc::now()))
            .cloned())
    }

    async fn record_exchange(
        &self,
        session_id: &SessionId,
        user: Message,
        reply: Message,
        state: ConversationState,
    ) -> Result<Conversation, StoreError> {
        let mut conversations = self.conversations.write().map_err(storage_failed)?;
        let now = Utc::now();

        let conversation = conversations
            .entry(session_id.clone())
            .and_modify(|c| {
                if self.is_expired(c, now) {
                    *c = Conversation::new(session_id.clone());
                }
            })
            .or_insert_with(|| Conversation::new(session_id.clone()));
        conversation.record_exchange(user, reply, state);
        let snapshot = conversation.clone();

        self.evict_over_capacity(&mut *conversations);
        Ok(snapshot)
    }

    async fn clear(&self, session_id: &SessionId) -> Result<bool, StoreError> {
        let mut conversations = self.conversations.write().map_err(storage_failed)?;
        Ok(conversations.remove(session_id).is_some())
    }

    async fn evict_expired(&self) -> Result<usize, StoreError> {
        self.evict_expired_at(Utc::now())
    }
}
