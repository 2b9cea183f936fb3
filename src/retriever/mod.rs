//! Retrieval backends over a video store.

mod keyword;
mod semantic;

pub use keyword::KeywordRetriever;
pub use semantic::SemanticRetriever;
