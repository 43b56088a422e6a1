//! Conversation handling for steward.
//!
//! This crate provides:
//!
//! - **Concierge**: classifies each message and routes it to a workflow
//! - **Conversation Store**: per-session history and state, with eviction
//! - **Intent Classifier**: the routing decision behind a trait

pub mod concierge;
pub mod error;
pub mod intent;
pub mod message;
pub mod session;
pub mod store;

pub use concierge::{Citation, Concierge, ConciergeConfig, ConciergeResponse};
pub use error::{ConciergeError, StoreError};
pub use intent::{Intent, IntentClassifier, IntentContext, KeywordIntentClassifier};
pub use message::{Message, MessageRole};
pub use session::{Conversation, ConversationState};
pub use store::{ConversationStore, InMemoryConversationStore};
