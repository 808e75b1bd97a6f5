/// All event types emitted by cairn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CairnEvent {
    /// Progress of a single remote source through the sync pipeline.
    SyncProgress { source: String, stage: SyncStage },
    /// Overall progress of a batch sync.
    BatchProgress {
        completed: u32,
        total: u32,
        failed: u32,
    },
    /// A field of an observed settings record changed.
    SettingChanged { record: String, field: SettingField },
}

/// Stages of syncing one remote source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStage {
    /// Downloading the remote manifest.
    FetchingRemote,
    /// Checking the remote manifest's structure.
    ValidatingRemote,
    /// Work on one package listed by the remote manifest.
    Package { pack_id: String, stage: PackageStage },
    /// The source finished; counts cover packages only.
    Complete { cached: u32, failed: u32 },
    /// The remote manifest itself could not be cached.
    Failed { reason: String },
}

/// Stages of caching one package manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageStage {
    Fetching,
    Validating,
    Cached,
    Failed { reason: String },
    /// Not attempted because an earlier package failed under fail-fast.
    Skipped,
}

/// Fields of a hook settings record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingField {
    Active,
    Name,
    Target,
    Config,
}

impl SettingField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingField::Active => "Active",
            SettingField::Name => "Name",
            SettingField::Target => "Target",
            SettingField::Config => "Config",
        }
    }
}
