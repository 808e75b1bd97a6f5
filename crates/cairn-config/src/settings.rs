//! Hook settings records.
//!
//! A hook record is a flat set of four string values (`Active`, `Name`, `Target` and
//! `Config`) kept in a TOML document as `[hooks.<id>]` tables. Records are append-only:
//! every save writes a freshly named table and never edits an existing one.

use std::{
    fs,
    path::{Path, PathBuf},
};

use cairn_events::{CairnEvent, EventSinkHandle, SettingField};
use cairn_utils::fs::ensure_dir_exists;
use documented::{Documented, DocumentedFields};
use serde::Serialize;
use toml_edit::{value, DocumentMut, Item, Table};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::{
    annotations::annotate_entry,
    error::{ConfigError, Result},
};

const HOOKS_TABLE: &str = "hooks";

/// A hook settings record.
///
/// Every value is stored as a string; `Active` reads `true` or `false`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Documented, DocumentedFields)]
#[serde(rename_all = "PascalCase")]
pub struct HookSettings {
    /// Whether the hook is applied.
    pub active: bool,

    /// Name of the hook.
    pub name: String,

    /// Executable or path the hook applies to.
    pub target: String,

    /// Configuration file handed to the hook.
    pub config: String,
}

impl HookSettings {
    /// Reads a record from its table, defaulting anything missing or unreadable.
    fn from_table(table: &Table) -> Self {
        let text = |key: &str| {
            table
                .get(key)
                .and_then(Item::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let active = match table.get("Active") {
            Some(item) => {
                item.as_bool()
                    .or_else(|| item.as_str().and_then(parse_bool))
                    .unwrap_or(false)
            }
            None => false,
        };

        Self {
            active,
            name: text("Name"),
            target: text("Target"),
            config: text("Config"),
        }
    }

    fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.insert("Active", value(self.active.to_string()));
        table.insert("Name", value(&self.name));
        table.insert("Target", value(&self.target));
        table.insert("Config", value(&self.config));
        table
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Persistent storage for hook settings records.
pub trait SettingsStore: Send + Sync {
    /// Returns every stored record, in storage order.
    fn load(&self) -> Result<Vec<HookSettings>>;

    /// Stores `settings` as a new record and returns the record's id.
    fn save(&self, settings: &HookSettings) -> Result<String>;
}

/// [`SettingsStore`] backed by a TOML file.
pub struct TomlSettingsStore {
    path: PathBuf,
}

impl TomlSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<DocumentMut> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content.parse::<DocumentMut>()?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(DocumentMut::new()),
            Err(err) => Err(ConfigError::IoError(err)),
        }
    }

    /// Returns every stored record together with its id.
    pub fn records(&self) -> Result<Vec<(String, HookSettings)>> {
        let doc = self.read_document()?;

        let Some(hooks) = doc.get(HOOKS_TABLE) else {
            return Ok(Vec::new());
        };
        let hooks = hooks
            .as_table_like()
            .ok_or_else(|| ConfigError::InvalidHooksFile(self.path.display().to_string()))?;

        let records = hooks
            .iter()
            .filter_map(|(id, item)| {
                match item.as_table() {
                    Some(table) => Some((id.to_string(), HookSettings::from_table(table))),
                    None => {
                        trace!("skipping non-table hook entry {id}");
                        None
                    }
                }
            })
            .collect();

        Ok(records)
    }
}

impl SettingsStore for TomlSettingsStore {
    fn load(&self) -> Result<Vec<HookSettings>> {
        Ok(self
            .records()?
            .into_iter()
            .map(|(_, settings)| settings)
            .collect())
    }

    fn save(&self, settings: &HookSettings) -> Result<String> {
        let mut doc = self.read_document()?;

        if doc.get(HOOKS_TABLE).is_none() {
            let mut hooks = Table::new();
            hooks.set_implicit(true);
            doc.insert(HOOKS_TABLE, Item::Table(hooks));
        }
        let hooks = doc[HOOKS_TABLE]
            .as_table_mut()
            .ok_or_else(|| ConfigError::InvalidHooksFile(self.path.display().to_string()))?;

        let mut record = settings.to_table();
        if hooks.is_empty() {
            annotate_entry::<HookSettings>(&mut record);
        }

        let id = Uuid::new_v4().simple().to_string();
        hooks.insert(&id, Item::Table(record));

        if let Some(parent) = self.path.parent() {
            ensure_dir_exists(parent)?;
        }
        fs::write(&self.path, doc.to_string())?;

        debug!("saved hook record {id} to {}", self.path.display());
        Ok(id)
    }
}

/// A hook record that reports every field assignment to an event sink.
pub struct ObservableHook {
    record: String,
    settings: HookSettings,
    events: EventSinkHandle,
}

impl ObservableHook {
    pub fn new(record: impl Into<String>, settings: HookSettings, events: EventSinkHandle) -> Self {
        Self {
            record: record.into(),
            settings,
            events,
        }
    }

    pub fn record(&self) -> &str {
        &self.record
    }

    pub fn settings(&self) -> &HookSettings {
        &self.settings
    }

    pub fn into_settings(self) -> HookSettings {
        self.settings
    }

    fn changed(&self, field: SettingField) {
        self.events.emit(CairnEvent::SettingChanged {
            record: self.record.clone(),
            field,
        });
    }

    pub fn active(&self) -> bool {
        self.settings.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.settings.active = active;
        self.changed(SettingField::Active);
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.settings.name = name.into();
        self.changed(SettingField::Name);
    }

    pub fn target(&self) -> &str {
        &self.settings.target
    }

    pub fn set_target(&mut self, target: impl Into<String>) {
        self.settings.target = target.into();
        self.changed(SettingField::Target);
    }

    pub fn config(&self) -> &str {
        &self.settings.config
    }

    pub fn set_config(&mut self, config: impl Into<String>) {
        self.settings.config = config.into();
        self.changed(SettingField::Config);
    }
}
