//! Document retrieval for cairn.
//!
//! [`fetch::Fetcher`] is the seam the manifest cache depends on; the default
//! [`fetch::DocumentFetcher`] speaks http(s) through a shared, timeout bounded
//! `ureq` agent and copies `file://` documents from disk.

pub mod error;
pub mod fetch;
pub mod http_client;
pub mod utils;

pub use error::FetchError;
pub use fetch::{DocumentFetcher, Fetcher};
