use std::{
    collections::HashMap,
    sync::{mpsc::Receiver, Arc, LazyLock},
    time::Duration,
};

use cairn_events::{CairnEvent, PackageStage, SyncStage};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use nu_ansi_term::Color::{Cyan, Green, Red, Yellow};

use crate::utils::{progress_enabled, Colored, Icons};

/// Shared MultiProgress instance for suspend/stop from other modules.
static MULTI: LazyLock<Arc<MultiProgress>> = LazyLock::new(|| Arc::new(MultiProgress::new()));

/// Pause progress display, run the closure, then resume.
pub fn suspend<F: FnOnce()>(f: F) {
    MULTI.suspend(f);
}

/// Stop and clear all progress bars.
pub fn stop() {
    MULTI.clear().ok();
}

/// Owns the background thread started by [`spawn_event_handler`].
pub struct ProgressGuard {
    handle: Option<std::thread::JoinHandle<()>>,
}

impl ProgressGuard {
    /// Waits for the handler thread to drain the remaining events.
    ///
    /// Every sender of the channel (the cache's event sink) must already be dropped,
    /// otherwise this blocks forever.
    pub fn finish(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}").unwrap()
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = if progress_enabled() {
        MULTI.add(ProgressBar::new_spinner())
    } else {
        MULTI.add(ProgressBar::hidden())
    };
    pb.set_style(spinner_style());
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn stage_message(name: &str, stage: &SyncStage) -> Option<String> {
    let msg = match stage {
        SyncStage::FetchingRemote => format!("{name}: fetching remote manifest"),
        SyncStage::ValidatingRemote => format!("{name}: validating remote manifest"),
        SyncStage::Package {
            pack_id,
            stage,
        } => {
            match stage {
                PackageStage::Fetching => format!("{name}: fetching {pack_id}"),
                PackageStage::Validating => format!("{name}: validating {pack_id}"),
                PackageStage::Cached | PackageStage::Skipped | PackageStage::Failed { .. } => {
                    return None
                }
            }
        }
        SyncStage::Complete {
            ..
        }
        | SyncStage::Failed {
            ..
        } => return None,
    };
    Some(msg)
}

/// Spawns a thread that renders sync events as one spinner per source plus a batch
/// counter.
///
/// `names` maps source URIs to the names shown to the user; unmapped sources are shown
/// by URI.
pub fn spawn_event_handler(
    receiver: Receiver<CairnEvent>,
    names: HashMap<String, String>,
) -> ProgressGuard {
    let handle = std::thread::spawn(move || {
        let mut sync_jobs: HashMap<String, ProgressBar> = HashMap::new();
        let mut batch_job: Option<ProgressBar> = None;

        while let Ok(event) = receiver.recv() {
            match event {
                CairnEvent::SyncProgress {
                    source,
                    stage,
                } => {
                    let name = names.get(&source).cloned().unwrap_or_else(|| source.clone());

                    match stage {
                        SyncStage::Complete {
                            cached,
                            failed,
                        } => {
                            if let Some(pb) = sync_jobs.remove(&source) {
                                pb.finish_and_clear();
                            }
                            let (icon, status) = if failed > 0 {
                                (
                                    Colored(Yellow, Icons::WARNING),
                                    format!("{cached} cached, {failed} failed"),
                                )
                            } else {
                                (Colored(Green, Icons::CHECK), format!("{cached} cached"))
                            };
                            MULTI.suspend(|| {
                                eprintln!(" {icon} {}: {status}", Colored(Cyan, &name));
                            });
                        }
                        SyncStage::Failed {
                            reason,
                        } => {
                            if let Some(pb) = sync_jobs.remove(&source) {
                                pb.finish_and_clear();
                            }
                            MULTI.suspend(|| {
                                eprintln!(
                                    " {} {}: {}",
                                    Colored(Red, Icons::CROSS),
                                    Colored(Cyan, &name),
                                    Colored(Red, &reason)
                                );
                            });
                        }
                        stage => {
                            if let Some(msg) = stage_message(&name, &stage) {
                                let pb = sync_jobs
                                    .entry(source)
                                    .or_insert_with(|| create_spinner(&msg));
                                pb.set_message(msg);
                            }
                        }
                    }
                }

                CairnEvent::BatchProgress {
                    completed,
                    total,
                    failed,
                } => {
                    let fail_msg = if failed > 0 {
                        format!(" ({failed} incomplete)")
                    } else {
                        String::new()
                    };
                    let msg = format!("Progress: {completed}/{total}{fail_msg}");
                    let pb = batch_job.get_or_insert_with(|| create_spinner(&msg));
                    pb.set_message(msg);
                }

                _ => {}
            }
        }

        if let Some(pb) = batch_job.take() {
            pb.finish_and_clear();
        }
        for (_, pb) in sync_jobs {
            pb.finish_and_clear();
        }
    });

    ProgressGuard {
        handle: Some(handle),
    }
}
