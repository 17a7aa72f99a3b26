//! Search queries, result items and multi-indexer aggregation.

mod aggregator;
mod item;
mod query;
mod rewrite;
mod seen;

pub use aggregator::*;
pub use item::*;
pub use query::*;
pub use rewrite::LinkRewriter;
pub use seen::{MemorySeenStore, SeenStore};
