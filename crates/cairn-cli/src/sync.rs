use std::{collections::HashMap, sync::Arc};

use cairn_config::{
    config::{get_config, FailurePolicy},
    remote::RemoteSource,
};
use cairn_core::{
    error::CairnError, CairnResult, ManifestCache, PackageOutcome, RemoteOutcome, RemoteState,
    SourceReport, StatusReport, SyncReport,
};
use cairn_events::{ChannelSink, EventSinkHandle, NullSink};
use nu_ansi_term::Color::{Cyan, Green, Red, Yellow};
use tracing::{debug, info, warn};

use crate::{
    progress::{self, spawn_event_handler},
    utils::{print_json, progress_enabled, select_sources, Colored, Icons},
};

pub struct SyncOptions {
    pub uris: Vec<String>,
    pub fail_fast: bool,
    pub parallel: bool,
    pub json: bool,
}

/// Syncs the selected sources. Returns `true` if every source was fully cached.
pub async fn sync_sources(options: SyncOptions) -> CairnResult<bool> {
    let config = get_config();
    let sources = select_sources(&config, &options.uris);

    if sources.is_empty() {
        warn!("No remotes configured. Add one to the config file or pass a URI.");
        return Ok(true);
    }

    let mut cache = ManifestCache::from_config(&config)?;
    if options.fail_fast {
        cache = cache.with_policy(FailurePolicy::FailFast);
    }
    if options.parallel {
        cache = cache.with_parallel_limit(config.parallel_limit());
    }

    let show_progress = progress_enabled() && !options.json;
    let progress_guard = if show_progress {
        let (sink, receiver) = ChannelSink::new();
        let events: EventSinkHandle = Arc::new(sink);
        cache = cache.with_events(events);
        Some(spawn_event_handler(receiver, display_names(&sources)))
    } else {
        cache = cache.with_events(Arc::new(NullSink));
        None
    };

    // The cache owns the only event sender; it is dropped when the blocking task ends.
    let report = tokio::task::spawn_blocking(move || cache.sync_many(&sources))
        .await
        .map_err(|err| CairnError::Custom(format!("sync task failed: {err}")))?;

    if let Some(guard) = progress_guard {
        guard.finish();
    }
    progress::stop();

    if options.json {
        print_json(
            serde_json::to_value(&report)
                .map_err(|err| CairnError::Custom(format!("serializing report: {err}")))?,
        );
    } else {
        print_sync_report(&report, !show_progress);
    }

    Ok(report.is_complete())
}

fn display_names(sources: &[RemoteSource]) -> HashMap<String, String> {
    sources
        .iter()
        .filter_map(|source| Some((source.uri.clone(), source.name.clone()?)))
        .collect()
}

fn print_sync_report(report: &SyncReport, per_source: bool) {
    if per_source {
        for source in &report.sources {
            print_source_line(source);
        }
    }

    for source in report.incomplete() {
        for package in &source.packages {
            if let PackageOutcome::Failed {
                failure,
            } = &package.outcome
            {
                info!(
                    "  {} {}#{}: {}",
                    Colored(Red, Icons::CROSS),
                    Colored(Cyan, source.display_name()),
                    package.pack_id,
                    failure.reason
                );
            }
        }
        let skipped = source.skipped_count();
        if skipped > 0 {
            info!(
                "  {} {}: {skipped} packages skipped after a failure",
                Colored(Yellow, Icons::SKIPPED),
                Colored(Cyan, source.display_name())
            );
        }
    }
}

fn print_source_line(source: &SourceReport) {
    match &source.remote {
        RemoteOutcome::Cached {
            ..
        } => {
            let icon = if source.is_complete() {
                Colored(Green, Icons::CHECK)
            } else {
                Colored(Yellow, Icons::WARNING)
            };
            info!(
                " {icon} {}: {} cached, {} failed",
                Colored(Cyan, source.display_name()),
                source.cached_count(),
                source.failed_count()
            );
        }
        RemoteOutcome::FetchFailed {
            reason,
        }
        | RemoteOutcome::ValidationFailed {
            reason,
        } => {
            info!(
                " {} {}: {}",
                Colored(Red, Icons::CROSS),
                Colored(Cyan, source.display_name()),
                Colored(Red, reason)
            );
        }
    }
}

/// Prints what is cached for the selected sources.
pub fn show_status(uris: &[String], json: bool) -> CairnResult<()> {
    let config = get_config();
    let sources = select_sources(&config, uris);
    let cache = ManifestCache::read_only(config.get_cache_path()?);
    let report = cache.status(&sources);

    if json {
        print_json(
            serde_json::to_value(&report)
                .map_err(|err| CairnError::Custom(format!("serializing status: {err}")))?,
        );
    } else {
        print_status_report(&report);
    }

    Ok(())
}

fn print_status_report(report: &StatusReport) {
    if report.sources.is_empty() {
        info!("No remotes configured.");
        return;
    }

    for source in &report.sources {
        let name = Colored(Cyan, source.display_name());
        match &source.state {
            RemoteState::Missing => {
                info!("{} {name}: not cached", Icons::NOT_CACHED);
            }
            RemoteState::Invalid {
                reason,
            } => {
                info!("{} {name}: {}", Colored(Red, Icons::CROSS), Colored(Red, reason));
            }
            RemoteState::Present {
                packages,
            } => {
                let cached = packages.iter().filter(|p| p.cached).count();
                info!(
                    "{} {name}: {cached}/{} packages cached",
                    Colored(Green, Icons::CHECK),
                    packages.len()
                );
                for package in packages {
                    let icon = if package.cached {
                        Colored(Green, Icons::CHECK)
                    } else {
                        Colored(Yellow, Icons::NOT_CACHED)
                    };
                    info!("    {icon} {}", package.pack_id);
                }
            }
        }
        debug!("  {} {}", Icons::ARROW, source.remote_file.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_skip_unnamed() {
        let sources = vec![
            RemoteSource::new("https://a/r.xml").with_name("a"),
            RemoteSource::new("https://b/r.xml"),
        ];

        let names = display_names(&sources);
        assert_eq!(names.len(), 1);
        assert_eq!(names["https://a/r.xml"], "a");
    }
}
