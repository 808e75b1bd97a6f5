use std::{
    fmt::Display,
    sync::{LazyLock, RwLock},
};

use cairn_config::{config::Config, remote::RemoteSource};
use cairn_core::{error::CairnError, CairnResult};
use nu_ansi_term::Color;
use serde_json::Value;
use ureq::http::{HeaderMap, HeaderName, HeaderValue};

pub struct Icons;

impl Icons {
    pub const ARROW: &str = "→";
    pub const CHECK: &str = "✓";
    pub const CROSS: &str = "✗";
    pub const NOT_CACHED: &str = "○";
    pub const SKIPPED: &str = "–";
    pub const WARNING: &str = "⚠";
}

pub static COLOR: LazyLock<RwLock<bool>> = LazyLock::new(|| RwLock::new(true));
pub static PROGRESS: LazyLock<RwLock<bool>> = LazyLock::new(|| RwLock::new(true));

pub fn progress_enabled() -> bool {
    *PROGRESS.read().unwrap()
}

pub struct Colored<T: Display>(pub Color, pub T);

impl<T: Display> Display for Colored<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let color = COLOR.read().unwrap();
        if *color {
            write!(f, "{}", self.0.prefix())?;
            self.1.fmt(f)?;
            write!(f, "{}", self.0.suffix())
        } else {
            self.1.fmt(f)
        }
    }
}

/// Picks the sources named on the command line, or every configured remote if none are.
///
/// A URI that is not configured is synced as an unnamed source.
pub fn select_sources(config: &Config, uris: &[String]) -> Vec<RemoteSource> {
    if uris.is_empty() {
        return config.remotes.clone();
    }

    uris.iter()
        .map(|uri| {
            let uri = uri.trim();
            config
                .get_remote(uri)
                .cloned()
                .unwrap_or_else(|| RemoteSource::new(uri))
        })
        .collect()
}

/// Parses `Name: value` header arguments.
pub fn parse_headers(headers: &[String]) -> CairnResult<HeaderMap> {
    headers
        .iter()
        .map(|header| {
            let invalid = || CairnError::Custom(format!("Invalid header '{header}'"));
            let (key, value) = header.split_once(':').ok_or_else(invalid)?;
            let key = HeaderName::try_from(key.trim()).map_err(|_| invalid())?;
            let value = HeaderValue::try_from(value.trim()).map_err(|_| invalid())?;
            Ok((key, value))
        })
        .collect()
}

/// Prints `value` as pretty JSON on stdout.
pub fn print_json(value: Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
    );
}
