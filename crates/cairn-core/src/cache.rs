//! The manifest cache orchestrator.
//!
//! A sync walks a two level hierarchy. Each remote source serves a remote manifest,
//! which is cached as `remote_<digest(uri)>.xml`; every package it lists points at a
//! package manifest, cached as `package_<pack_id>.xml`. All files live flat in the
//! cache root.
//!
//! Every document is fetched into a `.part` staging file, validated there and only
//! then renamed over its destination, so a failed attempt never replaces a
//! previously cached file.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
};

use cairn_config::{
    config::{Config, FailurePolicy},
    remote::RemoteSource,
};
use cairn_dl::{DocumentFetcher, Fetcher};
use cairn_events::{CairnEvent, EventSinkHandle, NullSink, PackageStage, SyncStage};
use cairn_registry::{validate, ManifestShape, PackageManifest, PackageRef, RemoteManifest};
use cairn_utils::{
    fs::{commit_staged, ensure_dir_exists, safe_remove, staging_path, STAGING_SUFFIX},
    hash::digest_str,
};
use rayon::prelude::*;
use tracing::{debug, info, trace, warn};

use crate::{
    error::{CairnError, ErrorContext},
    lock::PathLocks,
    report::{
        Failure, PackageOutcome, PackageReport, PackageStatus, RemoteOutcome, RemoteState,
        SourceReport, SourceStatus, StatusReport, SyncReport,
    },
    CairnResult,
};

/// A disk-backed cache of remote and package manifests.
pub struct ManifestCache {
    root: PathBuf,
    fetcher: Arc<dyn Fetcher>,
    events: EventSinkHandle,
    policy: FailurePolicy,
    parallel_limit: Option<usize>,
    locks: PathLocks,
}

impl ManifestCache {
    /// Opens the cache rooted at `root`, creating the directory and its ancestors if
    /// needed.
    ///
    /// Staging files left behind by an interrupted run are removed.
    ///
    /// # Errors
    ///
    /// Fails if `root` cannot be created, is not a directory, or cannot be listed.
    pub fn new(root: impl Into<PathBuf>) -> CairnResult<Self> {
        let root = root.into();
        ensure_dir_exists(&root)?;
        sweep_staging_files(&root)?;
        debug!(root = %root.display(), "opened manifest cache");

        Ok(Self {
            root,
            fetcher: Arc::new(DocumentFetcher),
            events: Arc::new(NullSink),
            policy: FailurePolicy::default(),
            parallel_limit: None,
            locks: PathLocks::default(),
        })
    }

    /// Opens the cache at `root` for inspection only.
    ///
    /// Nothing on disk is touched: a missing root is not created and staging files are
    /// left in place. Use this for [`status`](Self::status) while a sync may be running.
    pub fn read_only(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            fetcher: Arc::new(DocumentFetcher),
            events: Arc::new(NullSink),
            policy: FailurePolicy::default(),
            parallel_limit: None,
            locks: PathLocks::default(),
        }
    }

    /// Opens the cache described by `config`: its cache path, failure policy and
    /// parallelism.
    pub fn from_config(config: &Config) -> CairnResult<Self> {
        let cache = Self::new(config.get_cache_path()?)?.with_policy(config.failure_policy());

        Ok(if config.is_parallel() {
            cache.with_parallel_limit(config.parallel_limit())
        } else {
            cache
        })
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_events(mut self, events: EventSinkHandle) -> Self {
        self.events = events;
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Syncs up to `limit` sources at once in [`sync_many`](Self::sync_many).
    pub fn with_parallel_limit(mut self, limit: usize) -> Self {
        self.parallel_limit = Some(limit.max(1));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Path of the cached remote manifest for `uri`.
    pub fn remote_file(&self, uri: &str) -> PathBuf {
        self.root.join(format!("remote_{}.xml", digest_str(uri)))
    }

    /// Path of the cached package manifest for `pack_id`.
    ///
    /// Pack ids coming out of a validated remote manifest are always safe file name
    /// components.
    pub fn package_file(&self, pack_id: &str) -> PathBuf {
        self.root.join(format!("package_{pack_id}.xml"))
    }

    fn emit(&self, source: &RemoteSource, stage: SyncStage) {
        self.events.emit(CairnEvent::SyncProgress {
            source: source.uri.clone(),
            stage,
        });
    }

    fn emit_package(&self, source: &RemoteSource, pack_id: &str, stage: PackageStage) {
        self.emit(
            source,
            SyncStage::Package {
                pack_id: pack_id.to_string(),
                stage,
            },
        );
    }

    /// Fetches `uri` into the staging file for `dest`, validates it as `S` and commits
    /// it over `dest`.
    ///
    /// On any failure the staging file is removed and `dest` is left as it was.
    fn cache_document<S: ManifestShape>(
        &self,
        uri: &str,
        dest: &Path,
        on_fetched: impl FnOnce(),
    ) -> CairnResult<S> {
        self.locks.with_lock(dest, || {
            let staged = staging_path(dest);

            let result = self
                .fetcher
                .fetch(uri, &staged)
                .map_err(CairnError::from)
                .and_then(|bytes| {
                    trace!(uri, bytes, staged = %staged.display(), "fetched document");
                    on_fetched();
                    Ok(validate::<S, _>(&staged)?)
                })
                .and_then(|document| {
                    commit_staged(&staged, dest)?;
                    Ok(document)
                });

            if result.is_err() {
                if let Err(err) = safe_remove(&staged) {
                    warn!("Failed to discard {}: {err}", staged.display());
                }
            }

            result
        })
    }

    /// Syncs one remote source: its remote manifest, then every package it lists.
    ///
    /// Never fails; every outcome is recorded in the returned report.
    pub fn sync_one(&self, source: &RemoteSource) -> SourceReport {
        let remote_file = self.remote_file(&source.uri);
        let mut report = SourceReport::new(source, remote_file.clone());

        debug!(
            uri = source.uri,
            remote_file = %remote_file.display(),
            "syncing remote source"
        );
        self.emit(source, SyncStage::FetchingRemote);

        let manifest = match self.cache_document::<RemoteManifest>(&source.uri, &remote_file, || {
            self.emit(source, SyncStage::ValidatingRemote)
        }) {
            Ok(manifest) => manifest,
            Err(err) => {
                warn!("[{}] {err}", source.display_name());
                self.emit(
                    source,
                    SyncStage::Failed {
                        reason: err.to_string(),
                    },
                );
                report.remote_failed(Failure::from(&err));
                return report;
            }
        };

        report.remote = RemoteOutcome::Cached {
            name: manifest.name.clone(),
            packages: manifest.packages.len(),
        };
        report.packages = self.sync_packages(source, &manifest.packages);

        self.emit(
            source,
            SyncStage::Complete {
                cached: report.cached_count() as u32,
                failed: report.failed_count() as u32,
            },
        );

        report
    }

    fn sync_packages(&self, source: &RemoteSource, packages: &[PackageRef]) -> Vec<PackageReport> {
        let mut reports = Vec::with_capacity(packages.len());
        let mut halted = false;

        for package in packages {
            let outcome = if halted {
                self.emit_package(source, &package.pack_id, PackageStage::Skipped);
                PackageOutcome::Skipped
            } else {
                let outcome = self.sync_package(source, package);
                if matches!(outcome, PackageOutcome::Failed { .. })
                    && self.policy == FailurePolicy::FailFast
                {
                    debug!(
                        uri = source.uri,
                        pack_id = package.pack_id,
                        "fail-fast: skipping remaining packages"
                    );
                    halted = true;
                }
                outcome
            };

            reports.push(PackageReport {
                pack_id: package.pack_id.clone(),
                manifest_uri: package.manifest_uri.clone(),
                outcome,
            });
        }

        reports
    }

    fn sync_package(&self, source: &RemoteSource, package: &PackageRef) -> PackageOutcome {
        let dest = self.package_file(&package.pack_id);
        self.emit_package(source, &package.pack_id, PackageStage::Fetching);

        match self.cache_document::<PackageManifest>(&package.manifest_uri, &dest, || {
            self.emit_package(source, &package.pack_id, PackageStage::Validating)
        }) {
            Ok(manifest) => {
                trace!(pack_id = package.pack_id, "package manifest cached");
                self.emit_package(source, &package.pack_id, PackageStage::Cached);
                PackageOutcome::Cached {
                    path: dest,
                    version: manifest.version,
                }
            }
            Err(err) => {
                warn!("[{}] {}: {err}", source.display_name(), package.pack_id);
                self.emit_package(
                    source,
                    &package.pack_id,
                    PackageStage::Failed {
                        reason: err.to_string(),
                    },
                );
                PackageOutcome::Failed {
                    failure: Failure::from(&err),
                }
            }
        }
    }

    /// Syncs every source, in parallel when a parallel limit is set.
    ///
    /// A failing source never stops the others. Reports come back in the order of
    /// `sources`.
    pub fn sync_many(&self, sources: &[RemoteSource]) -> SyncReport {
        let total = sources.len() as u32;
        let completed = AtomicU32::new(0);
        let failed = AtomicU32::new(0);

        let run = |source: &RemoteSource| {
            let report = self.sync_one(source);
            if !report.is_complete() {
                failed.fetch_add(1, Ordering::Relaxed);
            }
            self.events.emit(CairnEvent::BatchProgress {
                completed: completed.fetch_add(1, Ordering::Relaxed) + 1,
                total,
                failed: failed.load(Ordering::Relaxed),
            });
            report
        };

        let sources: Vec<SourceReport> = match self.parallel_limit {
            Some(limit) if sources.len() > 1 => {
                match rayon::ThreadPoolBuilder::new().num_threads(limit).build() {
                    Ok(pool) => pool.install(|| sources.par_iter().map(run).collect()),
                    Err(err) => {
                        warn!("Failed to start sync workers, syncing sequentially: {err}");
                        sources.iter().map(run).collect()
                    }
                }
            }
            _ => sources.iter().map(run).collect(),
        };

        let report = SyncReport {
            sources,
        };
        info!(
            "Synced {} of {} sources ({} packages cached, {} failed)",
            report.sources.iter().filter(|s| s.is_complete()).count(),
            total,
            report.cached_packages(),
            report.failed_packages()
        );

        report
    }

    /// Reports what is currently cached for each source without touching the network.
    pub fn status(&self, sources: &[RemoteSource]) -> StatusReport {
        let sources = sources
            .iter()
            .map(|source| {
                let remote_file = self.remote_file(&source.uri);

                let state = if !remote_file.is_file() {
                    RemoteState::Missing
                } else {
                    match validate::<RemoteManifest, _>(&remote_file) {
                        Ok(manifest) => {
                            RemoteState::Present {
                                packages: manifest
                                    .packages
                                    .iter()
                                    .map(|package| {
                                        PackageStatus {
                                            pack_id: package.pack_id.clone(),
                                            cached: self.package_file(&package.pack_id).is_file(),
                                        }
                                    })
                                    .collect(),
                            }
                        }
                        Err(err) => {
                            RemoteState::Invalid {
                                reason: err.to_string(),
                            }
                        }
                    }
                };

                SourceStatus {
                    uri: source.uri.clone(),
                    name: source.name.clone(),
                    remote_file,
                    state,
                }
            })
            .collect();

        StatusReport {
            sources,
        }
    }
}

/// Removes `*.part` files directly under `root`.
fn sweep_staging_files(root: &Path) -> CairnResult<()> {
    let entries =
        fs::read_dir(root).with_context(|| format!("reading cache directory {}", root.display()))?;

    for entry in entries {
        let path = entry
            .with_context(|| format!("reading cache directory {}", root.display()))?
            .path();
        let is_staged = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(STAGING_SUFFIX));

        if is_staged && path.is_file() {
            trace!(path = %path.display(), "removing stale staging file");
            safe_remove(&path)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };

    use cairn_dl::FetchError;
    use cairn_events::CollectorSink;
    use tempfile::{tempdir, TempDir};

    use super::*;
    use crate::report::FailureKind;

    /// In-memory fetcher serving canned documents; unknown URIs fail with HTTP 404.
    #[derive(Default)]
    struct ScriptedFetcher {
        documents: Mutex<HashMap<String, String>>,
        requests: Mutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn serve(&self, uri: &str, body: &str) {
            self.documents
                .lock()
                .unwrap()
                .insert(uri.to_string(), body.to_string());
        }

        fn forget(&self, uri: &str) {
            self.documents.lock().unwrap().remove(uri);
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Fetcher for ScriptedFetcher {
        fn fetch(&self, uri: &str, dest: &Path) -> Result<u64, FetchError> {
            self.requests.lock().unwrap().push(uri.to_string());
            let body = self.documents.lock().unwrap().get(uri).cloned();

            match body {
                Some(body) => {
                    fs::write(dest, &body).map_err(|err| {
                        FetchError::Io {
                            action: "write",
                            path: dest.to_path_buf(),
                            source: err,
                        }
                    })?;
                    Ok(body.len() as u64)
                }
                None => {
                    Err(FetchError::HttpStatus {
                        status: 404,
                        uri: uri.to_string(),
                    })
                }
            }
        }
    }

    const REMOTE: &str = "https://example.org/remote.xml";

    fn remote_xml(ids: &[&str]) -> String {
        let entries: String = ids
            .iter()
            .map(|id| format!(r#"<package id="{id}" manifest="https://example.org/{id}.xml"/>"#))
            .collect();
        format!("<remote>{entries}</remote>")
    }

    fn package_xml(id: &str) -> String {
        format!(r#"<package id="{id}"><version>1.0</version></package>"#)
    }

    fn serve_packages(fetcher: &ScriptedFetcher, ids: &[&str]) {
        for id in ids {
            fetcher.serve(&format!("https://example.org/{id}.xml"), &package_xml(id));
        }
    }

    fn setup() -> (TempDir, Arc<ScriptedFetcher>, ManifestCache) {
        let dir = tempdir().unwrap();
        let fetcher = Arc::new(ScriptedFetcher::default());
        let cache = ManifestCache::new(dir.path().join("cache"))
            .unwrap()
            .with_fetcher(fetcher.clone());
        (dir, fetcher, cache)
    }

    fn cache_entries(cache: &ManifestCache) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(cache.root())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_new_creates_empty_root() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("a").join("b").join("cache");

        let cache = ManifestCache::new(&root).unwrap();

        assert!(root.is_dir());
        assert!(cache_entries(&cache).is_empty());
    }

    #[test]
    fn test_new_fails_on_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("occupied");
        fs::write(&file, "x").unwrap();

        let result = ManifestCache::new(&file);
        assert!(matches!(result, Err(CairnError::FileSystemError(_))));
    }

    #[test]
    fn test_new_sweeps_staging_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("package_a.xml.part"), "partial").unwrap();
        fs::write(dir.path().join("package_a.xml"), package_xml("a")).unwrap();

        let cache = ManifestCache::new(dir.path()).unwrap();
        assert_eq!(cache_entries(&cache), vec!["package_a.xml"]);
    }

    #[test]
    fn test_file_naming_is_deterministic() {
        let (_dir, fetcher, cache) = setup();
        fetcher.serve(REMOTE, &remote_xml(&["a"]));
        serve_packages(&fetcher, &["a"]);

        let source = RemoteSource::new(REMOTE);
        let first = cache.sync_one(&source);
        let after_first = cache_entries(&cache);
        let second = cache.sync_one(&source);

        assert_eq!(first.remote_file, second.remote_file);
        assert_eq!(after_first, cache_entries(&cache));
        assert_eq!(
            first.remote_file,
            cache.root().join(format!("remote_{}.xml", digest_str(REMOTE)))
        );
        assert_eq!(
            cache.package_file("a"),
            cache.root().join("package_a.xml")
        );
    }

    #[test]
    fn test_sync_one_caches_everything() {
        let (_dir, fetcher, cache) = setup();
        fetcher.serve(REMOTE, &remote_xml(&["a", "b"]));
        serve_packages(&fetcher, &["a", "b"]);

        let report = cache.sync_one(&RemoteSource::new(REMOTE));

        assert!(report.is_complete());
        assert_eq!(
            report.remote,
            RemoteOutcome::Cached {
                name: None,
                packages: 2
            }
        );
        assert_eq!(report.cached_count(), 2);
        assert!(matches!(
            &report.packages[0].outcome,
            PackageOutcome::Cached { version: Some(v), .. } if v == "1.0"
        ));
        assert!(cache.package_file("a").is_file());
        assert!(cache.package_file("b").is_file());
        assert!(cache_entries(&cache).iter().all(|name| !name.ends_with(".part")));
    }

    #[test]
    fn test_remote_fetch_failure_writes_nothing() {
        let (_dir, fetcher, cache) = setup();
        serve_packages(&fetcher, &["a"]);

        let report = cache.sync_one(&RemoteSource::new(REMOTE));

        assert!(matches!(report.remote, RemoteOutcome::FetchFailed { .. }));
        assert!(report.packages.is_empty());
        assert!(cache_entries(&cache).is_empty());
        assert_eq!(fetcher.requests(), vec![REMOTE.to_string()]);
    }

    #[test]
    fn test_remote_validation_failure_writes_nothing() {
        let (_dir, fetcher, cache) = setup();
        fetcher.serve(REMOTE, "<html><body>Not Found</body></html>");
        serve_packages(&fetcher, &["a"]);

        let report = cache.sync_one(&RemoteSource::new(REMOTE));

        assert!(matches!(
            report.remote,
            RemoteOutcome::ValidationFailed { .. }
        ));
        assert!(report.packages.is_empty());
        assert!(cache_entries(&cache).is_empty());
    }

    #[test]
    fn test_invalid_remote_keeps_previous_file() {
        let (_dir, fetcher, cache) = setup();
        let source = RemoteSource::new(REMOTE);
        fetcher.serve(REMOTE, &remote_xml(&[]));
        assert!(cache.sync_one(&source).is_complete());
        let before = fs::read_to_string(cache.remote_file(REMOTE)).unwrap();

        fetcher.serve(REMOTE, "<remote><broken");
        let report = cache.sync_one(&source);

        assert!(!report.is_complete());
        assert_eq!(fs::read_to_string(cache.remote_file(REMOTE)).unwrap(), before);
    }

    #[test]
    fn test_best_effort_continues_past_failure() {
        let (_dir, fetcher, cache) = setup();
        fetcher.serve(REMOTE, &remote_xml(&["p1", "p2", "p3"]));
        serve_packages(&fetcher, &["p1", "p3"]);

        let report = cache.sync_one(&RemoteSource::new(REMOTE));

        assert_eq!(cache.policy(), FailurePolicy::BestEffort);
        assert!(matches!(report.packages[0].outcome, PackageOutcome::Cached { .. }));
        assert!(matches!(
            &report.packages[1].outcome,
            PackageOutcome::Failed { failure } if failure.kind == FailureKind::Fetch
        ));
        assert!(matches!(report.packages[2].outcome, PackageOutcome::Cached { .. }));
        assert!(cache.package_file("p1").is_file());
        assert!(!cache.package_file("p2").exists());
        assert!(cache.package_file("p3").is_file());
    }

    #[test]
    fn test_fail_fast_skips_remaining_packages() {
        let (_dir, fetcher, cache) = setup();
        let cache = cache.with_policy(FailurePolicy::FailFast);
        fetcher.serve(REMOTE, &remote_xml(&["p1", "p2", "p3"]));
        serve_packages(&fetcher, &["p1", "p3"]);

        let report = cache.sync_one(&RemoteSource::new(REMOTE));

        assert!(matches!(report.packages[0].outcome, PackageOutcome::Cached { .. }));
        assert!(matches!(report.packages[1].outcome, PackageOutcome::Failed { .. }));
        assert_eq!(report.packages[2].outcome, PackageOutcome::Skipped);
        assert!(cache.package_file("p1").is_file());
        assert!(!cache.package_file("p3").exists());
        assert!(!fetcher
            .requests()
            .contains(&"https://example.org/p3.xml".to_string()));
    }

    #[test]
    fn test_package_validation_failure() {
        let (_dir, fetcher, cache) = setup();
        fetcher.serve(REMOTE, &remote_xml(&["a"]));
        fetcher.serve("https://example.org/a.xml", "<remote/>");

        let report = cache.sync_one(&RemoteSource::new(REMOTE));

        assert!(matches!(
            &report.packages[0].outcome,
            PackageOutcome::Failed { failure } if failure.kind == FailureKind::Validation
        ));
        assert!(!cache.package_file("a").exists());
        assert!(!staging_path(cache.package_file("a")).exists());
    }

    #[test]
    fn test_sync_many_isolates_sources() {
        let (_dir, fetcher, cache) = setup();
        let good = "https://good.example/remote.xml";
        fetcher.serve(good, &remote_xml(&["a", "b"]));
        serve_packages(&fetcher, &["a", "b"]);

        let report = cache.sync_many(&[RemoteSource::new(REMOTE), RemoteSource::new(good)]);

        assert_eq!(report.sources.len(), 2);
        assert!(!report.sources[0].is_complete());
        assert!(report.sources[1].is_complete());
        assert_eq!(report.sources[1].cached_count(), 2);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_sync_many_parallel_keeps_order() {
        let (_dir, fetcher, cache) = setup();
        let cache = cache.with_parallel_limit(4);

        let sources: Vec<_> = (0..6)
            .map(|i| {
                let uri = format!("https://r{i}.example/remote.xml");
                let id = format!("pkg{i}");
                fetcher.serve(&uri, &remote_xml(&[id.as_str()]));
                serve_packages(&fetcher, &[id.as_str()]);
                RemoteSource::new(uri)
            })
            .collect();

        let report = cache.sync_many(&sources);

        assert!(report.is_complete());
        let uris: Vec<_> = report.sources.iter().map(|s| s.uri.clone()).collect();
        let expected: Vec<_> = sources.iter().map(|s| s.uri.clone()).collect();
        assert_eq!(uris, expected);
        assert_eq!(report.cached_packages(), 6);
    }

    #[test]
    fn test_resync_keeps_stale_package_files() {
        let (_dir, fetcher, cache) = setup();
        let source = RemoteSource::new(REMOTE);
        fetcher.serve(REMOTE, &remote_xml(&["old", "kept"]));
        serve_packages(&fetcher, &["old", "kept", "new"]);
        cache.sync_one(&source);

        fetcher.serve(REMOTE, &remote_xml(&["kept", "new"]));
        fetcher.serve("https://example.org/kept.xml", "<package><version>2.0</version></package>");
        let report = cache.sync_one(&source);

        assert!(report.is_complete());
        let remote = fs::read_to_string(cache.remote_file(REMOTE)).unwrap();
        assert!(!remote.contains("old"));
        assert!(cache.package_file("new").is_file());
        assert!(fs::read_to_string(cache.package_file("kept"))
            .unwrap()
            .contains("2.0"));
        // Packages that vanished from the remote stay cached.
        assert!(cache.package_file("old").is_file());
    }

    #[test]
    fn test_events_follow_pipeline() {
        let (_dir, fetcher, cache) = setup();
        let collector = Arc::new(CollectorSink::default());
        let cache = cache.with_events(collector.clone());
        fetcher.serve(REMOTE, &remote_xml(&["a"]));
        serve_packages(&fetcher, &["a"]);

        cache.sync_many(&[RemoteSource::new(REMOTE)]);

        let stages: Vec<_> = collector
            .events()
            .into_iter()
            .filter_map(|event| {
                match event {
                    CairnEvent::SyncProgress {
                        stage, ..
                    } => Some(stage),
                    _ => None,
                }
            })
            .collect();

        let package = |stage| {
            SyncStage::Package {
                pack_id: "a".to_string(),
                stage,
            }
        };
        assert_eq!(
            stages,
            vec![
                SyncStage::FetchingRemote,
                SyncStage::ValidatingRemote,
                package(PackageStage::Fetching),
                package(PackageStage::Validating),
                package(PackageStage::Cached),
                SyncStage::Complete {
                    cached: 1,
                    failed: 0
                },
            ]
        );
        assert!(matches!(
            collector.events().last(),
            Some(CairnEvent::BatchProgress {
                completed: 1,
                total: 1,
                failed: 0
            })
        ));
    }

    #[test]
    fn test_status_is_read_only() {
        let (_dir, fetcher, cache) = setup();
        let source = RemoteSource::new(REMOTE).with_name("example");
        fetcher.serve(REMOTE, &remote_xml(&["a", "b"]));
        serve_packages(&fetcher, &["a", "b"]);
        cache.sync_one(&source);
        fs::remove_file(cache.package_file("b")).unwrap();
        fetcher.forget(REMOTE);
        let requests = fetcher.requests().len();

        let status = cache.status(&[source, RemoteSource::new("https://absent/r.xml")]);

        assert_eq!(fetcher.requests().len(), requests);
        assert_eq!(status.sources[0].display_name(), "example");
        assert_eq!(
            status.sources[0].state,
            RemoteState::Present {
                packages: vec![
                    PackageStatus {
                        pack_id: "a".into(),
                        cached: true
                    },
                    PackageStatus {
                        pack_id: "b".into(),
                        cached: false
                    },
                ]
            }
        );
        assert_eq!(status.sources[1].state, RemoteState::Missing);
    }

    #[test]
    fn test_read_only_status_leaves_disk_untouched() {
        let (dir, fetcher, cache) = setup();
        let source = RemoteSource::new(REMOTE);
        fetcher.serve(REMOTE, &remote_xml(&["a"]));
        serve_packages(&fetcher, &["a"]);
        cache.sync_one(&source);

        let in_flight = cache.root().join("package_b.xml.part");
        fs::write(&in_flight, "partial").unwrap();

        let status = ManifestCache::read_only(cache.root()).status(&[source.clone()]);
        assert!(in_flight.exists());
        assert!(matches!(status.sources[0].state, RemoteState::Present { .. }));

        let absent = dir.path().join("never-created");
        let status = ManifestCache::read_only(&absent).status(&[source]);
        assert!(!absent.exists());
        assert_eq!(status.sources[0].state, RemoteState::Missing);
    }

    #[test]
    fn test_status_reports_invalid_remote() {
        let (_dir, _fetcher, cache) = setup();
        fs::write(cache.remote_file(REMOTE), "garbage").unwrap();

        let status = cache.status(&[RemoteSource::new(REMOTE)]);
        assert!(matches!(
            status.sources[0].state,
            RemoteState::Invalid { .. }
        ));
    }

    #[test]
    fn test_file_uri_fixtures_with_document_fetcher() {
        let dir = tempdir().unwrap();
        let fixtures = dir.path().join("fixtures");
        fs::create_dir(&fixtures).unwrap();

        let package_path = fixtures.join("core.xml");
        fs::write(&package_path, package_xml("core")).unwrap();
        let remote_path = fixtures.join("remote.xml");
        fs::write(
            &remote_path,
            format!(
                r#"<remote name="local"><package><id>core</id><manifest>file://{}</manifest></package></remote>"#,
                package_path.display()
            ),
        )
        .unwrap();

        let cache = ManifestCache::new(dir.path().join("cache")).unwrap();
        let uri = format!("file://{}", remote_path.display());
        let report = cache.sync_one(&RemoteSource::new(&uri));

        assert!(report.is_complete(), "{report:?}");
        assert_eq!(
            report.remote,
            RemoteOutcome::Cached {
                name: Some("local".into()),
                packages: 1
            }
        );
        assert_eq!(
            fs::read_to_string(cache.package_file("core")).unwrap(),
            package_xml("core")
        );
    }
}
