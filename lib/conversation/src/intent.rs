//! Intent classification.

use crate::message::Message;
use crate::session::ConversationState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Keywords that mark a document search, matched case-insensitively.
pub const DOCUMENT_SEARCH_KEYWORDS: &[&str] = &["find", "search", "documents"];

/// Keywords that mark a task request, matched case-insensitively.
pub const TASK_REQUEST_KEYWORDS: &[&str] = &["help me", "build", "create", "plan"];

/// The classified purpose of a user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Look something up in the document collection.
    DocumentSearch,
    /// Plan and carry out a multi-step task.
    TaskRequest,
    /// Anything else; answered directly.
    SimpleQuery,
}

impl Intent {
    /// Returns the wire name of the intent.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DocumentSearch => "document_search",
            Self::TaskRequest => "task_request",
            Self::SimpleQuery => "simple_query",
        }
    }

    /// Returns the state a conversation moves to after this intent.
    #[must_use]
    pub fn next_state(&self) -> ConversationState {
        match self {
            Self::DocumentSearch => ConversationState::Searching,
            Self::TaskRequest => ConversationState::InTask,
            Self::SimpleQuery => ConversationState::Answering,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a classifier may know about the conversation so far.
#[derive(Debug, Clone, Copy)]
pub struct IntentContext<'a> {
    /// State after the previous exchange.
    pub state: ConversationState,
    /// Most recent messages, oldest first.
    pub history: &'a [Message],
}

/// Trait for intent classifiers.
pub trait IntentClassifier: Send + Sync {
    /// Classifies a non-empty user message.
    fn classify(&self, message: &str, context: &IntentContext<'_>) -> Intent;
}

/// Classifies by keyword. Document search keywords win over task keywords;
/// anything unmatched is a simple query. Context is not consulted.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordIntentClassifier;

impl KeywordIntentClassifier {
    /// Creates the classifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl IntentClassifier for KeywordIntentClassifier {
    fn classify(&self, message: &str, _context: &IntentContext<'_>) -> Intent {
        let lowered = message.to_lowercase();
        let matches = |keywords: &[&str]| keywords.iter().any(|k| lowered.contains(k));

        if matches(DOCUMENT_SEARCH_KEYWORDS) {
            Intent::DocumentSearch
        } else if matches(TASK_REQUEST_KEYWORDS) {
            Intent::TaskRequest
        } else {
            Intent::SimpleQuery
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(message: &str) -> Intent {
        let context = IntentContext {
            state: ConversationState::Greeting,
            history: &[],
        };
        KeywordIntentClassifier::new().classify(message, &context)
    }

    #[test]
    fn classifies_the_three_intents() {
        assert_eq!(classify("find SBA loan documents"), Intent::DocumentSearch);
        assert_eq!(
            classify("help me create a business plan"),
            Intent::TaskRequest
        );
        assert_eq!(classify("what is SBA"), Intent::SimpleQuery);
    }

    #[test]
    fn matching_ignores_case() {
        assert_eq!(classify("SEARCH for grants"), Intent::DocumentSearch);
        assert_eq!(classify("Build me a website"), Intent::TaskRequest);
    }

    #[test]
    fn document_search_wins_over_task_request() {
        assert_eq!(
            classify("help me find a plan template"),
            Intent::DocumentSearch
        );
    }

    #[test]
    fn keywords_match_as_substrings() {
        // "planet" contains "plan".
        assert_eq!(classify("how far is the nearest planet"), Intent::TaskRequest);
    }

    #[test]
    fn intent_sets_next_state() {
        assert_eq!(
            Intent::DocumentSearch.next_state(),
            ConversationState::Searching
        );
        assert_eq!(Intent::TaskRequest.next_state(), ConversationState::InTask);
        assert_eq!(
            Intent::SimpleQuery.next_state(),
            ConversationState::Answering
        );
    }
}
