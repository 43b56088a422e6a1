//! Document search for steward.
//!
//! This crate provides:
//!
//! - **DocumentSearch**: the seam used to query a document collection
//! - **InMemoryIndex**: a term-overlap index loaded from a JSON corpus

pub mod error;
pub mod index;
pub mod search;

pub use error::SearchError;
pub use index::{CorpusDocument, InMemoryIndex};
pub use search::{DocumentSearch, SearchHit, SourceMetadata};
