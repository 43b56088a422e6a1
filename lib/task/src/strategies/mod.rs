//! Built-in step strategies.
//!
//! - `document_search` steps: [`DocumentSearchStrategy`]
//! - `task_decomposition` steps: [`TaskDecompositionStrategy`] first, with
//!   [`OutlineDecompositionStrategy`] as the offline fallback

mod decomposition;
mod document_search;

pub use decomposition::{OutlineDecompositionStrategy, TaskDecompositionStrategy};
pub use document_search::{DEFAULT_SEARCH_LIMIT, DocumentSearchStrategy};
