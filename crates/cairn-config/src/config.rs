use std::{
    collections::HashSet,
    fmt, fs,
    path::PathBuf,
    sync::{LazyLock, RwLock},
    time::Duration,
};

use cairn_utils::{
    path::{resolve_path, xdg_cache_home, xdg_config_home},
    time::parse_duration,
};
use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};
use toml_edit::{DocumentMut, Item};
use tracing::info;

use crate::{
    annotations::{annotate_fields, annotate_first_entry},
    error::{ConfigError, Result},
    remote::RemoteSource,
};

pub const DEFAULT_FETCH_TIMEOUT: &str = "30s";
pub const DEFAULT_PARALLEL_LIMIT: u32 = 4;

/// What a sync does with the rest of a package list once one package fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Record the failure and keep going with the next package.
    #[default]
    BestEffort,
    /// Stop at the first failing package; the rest are skipped.
    FailFast,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::BestEffort => write!(f, "best-effort"),
            FailurePolicy::FailFast => write!(f, "fail-fast"),
        }
    }
}

/// Application's configuration
#[derive(Clone, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct Config {
    /// Directory holding cached manifests.
    /// Default: $XDG_CACHE_HOME/cairn
    pub cache_path: Option<String>,

    /// How long a single fetch may take (e.g., "30s", "2m").
    /// Default: "30s"
    pub fetch_timeout: Option<String>,

    /// What to do when one package of a remote fails: "best-effort" or "fail-fast".
    /// Default: "best-effort"
    pub failure_policy: Option<FailurePolicy>,

    /// If true, remote sources are synced concurrently.
    /// Default: false
    pub parallel: Option<bool>,

    /// Maximum number of remote sources synced at once when `parallel` is enabled.
    /// Default: 4
    pub parallel_limit: Option<u32>,

    /// File storing hook settings records.
    /// Default: hooks.toml next to this config file
    pub hooks_path: Option<String>,

    /// Remote sources synced by `cairn sync`.
    #[serde(default)]
    pub remotes: Vec<RemoteSource>,
}

pub static CONFIG: LazyLock<RwLock<Option<Config>>> = LazyLock::new(|| RwLock::new(None));

pub static CONFIG_PATH: LazyLock<RwLock<PathBuf>> = LazyLock::new(|| {
    RwLock::new(match std::env::var("CAIRN_CONFIG") {
        Ok(path_str) => PathBuf::from(path_str),
        Err(_) => xdg_config_home().join("cairn").join("config.toml"),
    })
});

pub fn init() -> Result<()> {
    let config = Config::new()?;
    let mut global_config = CONFIG.write().unwrap();
    *global_config = Some(config);
    Ok(())
}

/// Points the global configuration at a different file. Takes effect on the next `init`.
pub fn set_config_path(path: PathBuf) {
    *CONFIG_PATH.write().unwrap() = path;
}

pub fn get_config() -> Config {
    {
        let config_guard = CONFIG.read().unwrap();
        if let Some(config) = config_guard.as_ref() {
            return config.clone();
        }
    }

    let mut config_guard = CONFIG.write().unwrap();
    config_guard
        .get_or_insert_with(|| Config::default_config::<&str>(&[]))
        .clone()
}

impl Config {
    pub fn default_config<T: AsRef<str>>(remotes: &[T]) -> Self {
        Self {
            cache_path: Some(format!("{}/cairn", xdg_cache_home().display())),
            fetch_timeout: Some(DEFAULT_FETCH_TIMEOUT.to_string()),
            failure_policy: Some(FailurePolicy::default()),
            parallel: Some(false),
            parallel_limit: Some(DEFAULT_PARALLEL_LIMIT),
            hooks_path: None,
            remotes: remotes
                .iter()
                .map(|uri| RemoteSource::new(uri.as_ref()))
                .collect(),
        }
    }

    /// Creates a new configuration by loading it from the configuration file.
    /// If the configuration file is not found, it uses the default configuration.
    pub fn new() -> Result<Self> {
        let config_path = CONFIG_PATH.read().unwrap().to_path_buf();

        let mut config = match fs::read_to_string(&config_path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Self::default_config::<&str>(&[])
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.resolve()?;

        Ok(config)
    }

    /// Validates the loaded values and fills in defaults for unset fields.
    pub fn resolve(&mut self) -> Result<()> {
        let timeout = self
            .fetch_timeout
            .get_or_insert_with(|| DEFAULT_FETCH_TIMEOUT.to_string());
        if !matches!(parse_duration(timeout), Some(d) if !d.is_zero()) {
            return Err(ConfigError::InvalidTimeout(timeout.clone()));
        }

        if self.parallel_limit == Some(0) {
            return Err(ConfigError::InvalidParallelLimit);
        }
        self.parallel_limit.get_or_insert(DEFAULT_PARALLEL_LIMIT);
        self.parallel.get_or_insert(false);
        self.failure_policy.get_or_insert_with(FailurePolicy::default);

        let mut seen_remotes = HashSet::new();

        for (index, remote) in self.remotes.iter_mut().enumerate() {
            let trimmed = remote.uri.trim();
            if trimmed.is_empty() {
                return Err(ConfigError::EmptyRemoteUri(index));
            }
            if trimmed.len() != remote.uri.len() {
                remote.uri = trimmed.to_string();
            }
            if !seen_remotes.insert(remote.uri.clone()) {
                return Err(ConfigError::DuplicateRemote(remote.uri.clone()));
            }
        }

        Ok(())
    }

    pub fn get_cache_path(&self) -> Result<PathBuf> {
        if let Ok(env_path) = std::env::var("CAIRN_CACHE") {
            return Ok(resolve_path(&env_path)?);
        }
        if let Some(cache_path) = &self.cache_path {
            return Ok(resolve_path(cache_path)?);
        }
        Ok(xdg_cache_home().join("cairn"))
    }

    pub fn get_hooks_path(&self) -> Result<PathBuf> {
        if let Some(hooks_path) = &self.hooks_path {
            return Ok(resolve_path(hooks_path)?);
        }
        let config_path = CONFIG_PATH.read().unwrap().to_path_buf();
        Ok(config_path
            .parent()
            .map(|dir| dir.join("hooks.toml"))
            .unwrap_or_else(|| PathBuf::from("hooks.toml")))
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
            .as_deref()
            .and_then(parse_duration)
            .or_else(|| parse_duration(DEFAULT_FETCH_TIMEOUT))
            .unwrap_or(Duration::from_secs(30))
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy.unwrap_or_default()
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel.unwrap_or(false)
    }

    pub fn parallel_limit(&self) -> usize {
        self.parallel_limit.unwrap_or(DEFAULT_PARALLEL_LIMIT).max(1) as usize
    }

    pub fn get_remote(&self, uri: &str) -> Option<&RemoteSource> {
        self.remotes.iter().find(|remote| remote.uri == uri)
    }

    pub fn to_annotated_document(&self) -> Result<DocumentMut> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut doc = toml_string.parse::<DocumentMut>()?;

        annotate_fields::<Config>(doc.as_table_mut());
        if let Some(remotes) = doc
            .get_mut("remotes")
            .and_then(Item::as_array_of_tables_mut)
        {
            annotate_first_entry::<RemoteSource>(remotes);
        }

        Ok(doc)
    }
}

pub fn generate_default_config<T: AsRef<str>>(remotes: &[T]) -> Result<PathBuf> {
    let config_path = CONFIG_PATH.read().unwrap().to_path_buf();

    if config_path.exists() {
        return Err(ConfigError::ConfigAlreadyExists);
    }

    let def_config = Config::default_config(remotes);
    let annotated_doc = def_config.to_annotated_document()?;

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&config_path, annotated_doc.to_string())?;
    info!(
        "Default configuration file generated with documentation at: {}",
        config_path.display()
    );
    Ok(config_path)
}
