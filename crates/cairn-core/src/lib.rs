//! Manifest cache synchronizer.
//!
//! [`cache::ManifestCache`] resolves remote sources into a flat directory of validated
//! manifest documents and reports the outcome of every step in a
//! [`report::SourceReport`].

use error::CairnError;

pub mod cache;
pub mod error;
mod lock;
pub mod report;

pub use cache::ManifestCache;
pub use report::{
    Failure, FailureKind, PackageOutcome, PackageReport, PackageStatus, RemoteOutcome,
    RemoteState, SourceReport, SourceStatus, StatusReport, SyncReport,
};

pub type CairnResult<T> = std::result::Result<T, CairnError>;
