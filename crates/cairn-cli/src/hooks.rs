use std::sync::Arc;

use cairn_config::{
    config::get_config,
    settings::{HookSettings, ObservableHook, SettingsStore, TomlSettingsStore},
};
use cairn_core::{error::CairnError, CairnResult};
use cairn_events::TracingSink;
use nu_ansi_term::Color::{Cyan, Green, Red};
use serde_json::json;
use tracing::{debug, info};

use crate::utils::{print_json, Colored, Icons};

fn open_store() -> CairnResult<TomlSettingsStore> {
    Ok(TomlSettingsStore::new(get_config().get_hooks_path()?))
}

pub fn list_hooks(json: bool) -> CairnResult<()> {
    let store = open_store()?;
    let records = store.records()?;

    if json {
        let records: Vec<_> = records
            .iter()
            .map(|(id, settings)| json!({ "id": id, "settings": settings }))
            .collect();
        print_json(serde_json::Value::Array(records));
        return Ok(());
    }

    if records.is_empty() {
        info!("No hooks stored in {}", store.path().display());
        return Ok(());
    }

    for (id, settings) in &records {
        let state = if settings.active {
            Colored(Green, Icons::CHECK)
        } else {
            Colored(Red, Icons::CROSS)
        };
        info!(
            "{state} {} {} {}{}",
            Colored(Cyan, &settings.name),
            Icons::ARROW,
            settings.target,
            if settings.config.is_empty() {
                String::new()
            } else {
                format!(" ({})", settings.config)
            }
        );
        debug!("  id: {id}");
    }

    Ok(())
}

pub struct NewHook {
    pub name: String,
    pub target: String,
    pub config: String,
    pub active: bool,
}

pub fn add_hook(hook: NewHook) -> CairnResult<()> {
    let name = hook.name.trim();
    if name.is_empty() {
        return Err(CairnError::Custom("Hook name cannot be empty".into()));
    }

    let store = open_store()?;

    let mut record = ObservableHook::new("new", HookSettings::default(), Arc::new(TracingSink));
    record.set_name(name);
    record.set_target(hook.target.trim());
    record.set_config(hook.config.trim());
    record.set_active(hook.active);

    let id = store.save(record.settings())?;
    info!(
        "{} Stored hook {} as {id} in {}",
        Colored(Green, Icons::CHECK),
        Colored(Cyan, record.name()),
        store.path().display()
    );

    Ok(())
}
