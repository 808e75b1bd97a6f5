use std::sync::{
    mpsc::{self, Receiver, Sender},
    Mutex,
};

use tracing::{debug, warn};

use crate::{CairnEvent, PackageStage, SyncStage};

/// Trait for consuming events.
///
/// Each frontend provides its own implementation.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: CairnEvent);
}

/// Channel-based event sink.
///
/// Sends events through a standard mpsc channel. The receiver end can be polled by any
/// consumer (progress renderer, test harness, etc.).
pub struct ChannelSink {
    sender: Sender<CairnEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, Receiver<CairnEvent>) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                sender,
            },
            receiver,
        )
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: CairnEvent) {
        let _ = self.sender.send(event);
    }
}

/// No-op event sink for tests or headless operation.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: CairnEvent) {}
}

/// Forwards events to `tracing`, for frontends without a progress display.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: CairnEvent) {
        match event {
            CairnEvent::SyncProgress {
                source,
                stage,
            } => {
                match stage {
                    SyncStage::FetchingRemote => debug!("[{source}] fetching remote manifest"),
                    SyncStage::ValidatingRemote => {
                        debug!("[{source}] validating remote manifest")
                    }
                    SyncStage::Package {
                        pack_id,
                        stage,
                    } => {
                        match stage {
                            PackageStage::Failed {
                                reason,
                            } => warn!("[{source}] {pack_id}: {reason}"),
                            PackageStage::Skipped => debug!("[{source}] {pack_id}: skipped"),
                            other => debug!("[{source}] {pack_id}: {other:?}"),
                        }
                    }
                    SyncStage::Complete {
                        cached,
                        failed,
                    } => debug!("[{source}] complete: {cached} cached, {failed} failed"),
                    SyncStage::Failed {
                        reason,
                    } => warn!("[{source}] {reason}"),
                }
            }
            CairnEvent::BatchProgress {
                completed,
                total,
                failed,
            } => debug!("{completed}/{total} sources processed ({failed} failed)"),
            CairnEvent::SettingChanged {
                record,
                field,
            } => debug!("setting {} of {record} changed", field.as_str()),
        }
    }
}

/// Collector sink that stores all events for inspection.
///
/// Useful in tests to verify that expected events were emitted.
#[derive(Default)]
pub struct CollectorSink {
    events: Mutex<Vec<CairnEvent>>,
}

impl CollectorSink {
    pub fn events(&self) -> Vec<CairnEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for CollectorSink {
    fn emit(&self, event: CairnEvent) {
        self.events.lock().unwrap().push(event);
    }
}
