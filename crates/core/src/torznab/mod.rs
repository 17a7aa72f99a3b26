//! Torznab protocol: request parsing, feed and caps encoding, and the
//! responder that ties authentication, resolution, caching and search
//! together.

mod caps;
mod encode;
mod error;
mod request;
mod responder;

pub use caps::caps_xml;
pub use encode::{encode_feed, EncodeError, EncodedFeed};
pub use error::TorznabError;
pub use request::{FeedFormat, TorznabRequest};
pub use responder::{FeedCache, TorznabOutcome, TorznabResponder};
