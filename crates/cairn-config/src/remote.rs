use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};

/// Defines a remote source that publishes a remote manifest.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct RemoteSource {
    /// URI of the remote manifest (http, https or file).
    pub uri: String,

    /// Optional display name used in logs and reports.
    pub name: Option<String>,
}

impl RemoteSource {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name shown to the user: the configured name, or the URI itself.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.uri)
    }
}
