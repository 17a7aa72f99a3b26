//! Torrent indexer abstraction.
//!
//! An `Indexer` produces pages of results for a query and can fetch the
//! files it links to. The `IndexerRegistry` maps request selectors to
//! indexers.

mod caps;
mod jackett;
mod registry;
mod types;

pub use caps::*;
pub use jackett::JackettIndexer;
pub use registry::*;
pub use types::*;
