//! Structured outcomes of sync and status operations.

use std::path::PathBuf;

use cairn_config::remote::RemoteSource;
use serde::Serialize;

use crate::error::CairnError;

/// Which step of caching a document went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// The document could not be retrieved.
    Fetch,
    /// The document was retrieved but does not have the expected shape.
    Validation,
    /// The document could not be moved into the cache.
    Storage,
}

/// A failed step, kept as text so reports can be cloned and serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub reason: String,
}

impl From<&CairnError> for Failure {
    fn from(err: &CairnError) -> Self {
        let kind = match err {
            CairnError::Fetch(_) => FailureKind::Fetch,
            CairnError::Validation(_) => FailureKind::Validation,
            _ => FailureKind::Storage,
        };

        Self {
            kind,
            reason: err.to_string(),
        }
    }
}

/// What happened to a source's remote manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum RemoteOutcome {
    Cached {
        /// Name declared by the remote manifest itself, if any.
        name: Option<String>,
        packages: usize,
    },
    FetchFailed {
        reason: String,
    },
    ValidationFailed {
        reason: String,
    },
}

impl RemoteOutcome {
    fn from_failure(failure: Failure) -> Self {
        match failure.kind {
            FailureKind::Validation => {
                RemoteOutcome::ValidationFailed {
                    reason: failure.reason,
                }
            }
            FailureKind::Fetch | FailureKind::Storage => {
                RemoteOutcome::FetchFailed {
                    reason: failure.reason,
                }
            }
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, RemoteOutcome::Cached { .. })
    }
}

/// What happened to one package listed by a remote manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum PackageOutcome {
    Cached {
        path: PathBuf,
        version: Option<String>,
    },
    Failed {
        failure: Failure,
    },
    /// Not attempted because an earlier package failed under fail-fast.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageReport {
    pub pack_id: String,
    pub manifest_uri: String,
    #[serde(flatten)]
    pub outcome: PackageOutcome,
}

/// Everything `sync_one` did for a single remote source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub uri: String,
    pub name: Option<String>,
    pub remote_file: PathBuf,
    pub remote: RemoteOutcome,
    pub packages: Vec<PackageReport>,
}

impl SourceReport {
    pub(crate) fn new(source: &RemoteSource, remote_file: PathBuf) -> Self {
        Self {
            uri: source.uri.clone(),
            name: source.name.clone(),
            remote_file,
            remote: RemoteOutcome::Cached {
                name: None,
                packages: 0,
            },
            packages: Vec::new(),
        }
    }

    pub(crate) fn remote_failed(&mut self, failure: Failure) {
        self.remote = RemoteOutcome::from_failure(failure);
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.uri)
    }

    /// `true` if the remote manifest and every package it lists were cached.
    pub fn is_complete(&self) -> bool {
        self.remote.is_cached()
            && self
                .packages
                .iter()
                .all(|p| matches!(p.outcome, PackageOutcome::Cached { .. }))
    }

    pub fn cached_count(&self) -> usize {
        self.count(|outcome| matches!(outcome, PackageOutcome::Cached { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|outcome| matches!(outcome, PackageOutcome::Failed { .. }))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|outcome| matches!(outcome, PackageOutcome::Skipped))
    }

    fn count(&self, predicate: impl Fn(&PackageOutcome) -> bool) -> usize {
        self.packages.iter().filter(|p| predicate(&p.outcome)).count()
    }
}

/// Reports for a batch of sources, in the order the sources were given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub sources: Vec<SourceReport>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.sources.iter().all(SourceReport::is_complete)
    }

    /// Sources that were not fully cached.
    pub fn incomplete(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources.iter().filter(|s| !s.is_complete())
    }

    pub fn cached_packages(&self) -> usize {
        self.sources.iter().map(SourceReport::cached_count).sum()
    }

    pub fn failed_packages(&self) -> usize {
        self.sources.iter().map(SourceReport::failed_count).sum()
    }
}

/// Whether a package's manifest is present in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageStatus {
    pub pack_id: String,
    pub cached: bool,
}

/// On-disk state of a source's remote manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum RemoteState {
    Missing,
    Invalid { reason: String },
    Present { packages: Vec<PackageStatus> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceStatus {
    pub uri: String,
    pub name: Option<String>,
    pub remote_file: PathBuf,
    #[serde(flatten)]
    pub state: RemoteState,
}

impl SourceStatus {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.uri)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub sources: Vec<SourceStatus>,
}
