use cairn_utils::error::{FileSystemError, PathError};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(cairn_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(cairn_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Configuration file already exists")]
    #[diagnostic(
        code(cairn_config::already_exists),
        help("Remove the existing config file or use a different location")
    )]
    ConfigAlreadyExists,

    #[error("Remote source #{0} has an empty URI")]
    #[diagnostic(
        code(cairn_config::empty_remote_uri),
        help("Every [[remotes]] entry needs a non-empty `uri`")
    )]
    EmptyRemoteUri(usize),

    #[error("Duplicate remote source: {0}")]
    #[diagnostic(
        code(cairn_config::duplicate_remote),
        help("Each remote URI may only be listed once")
    )]
    DuplicateRemote(String),

    #[error("Invalid fetch timeout: {0}")]
    #[diagnostic(
        code(cairn_config::invalid_timeout),
        help("Use a duration such as \"30s\", \"2m\" or \"1h\"")
    )]
    InvalidTimeout(String),

    #[error("parallel_limit must be at least 1")]
    #[diagnostic(code(cairn_config::invalid_parallel_limit))]
    InvalidParallelLimit,

    #[error("IO error: {0}")]
    #[diagnostic(code(cairn_config::io))]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    FileSystem(#[from] FileSystemError),

    #[error("Failed to parse TOML: {0}")]
    #[diagnostic(code(cairn_config::toml))]
    Toml(#[from] toml_edit::TomlError),

    #[error("`hooks` in {0} is not a table")]
    #[diagnostic(
        code(cairn_config::invalid_hooks_file),
        help("Hook records must be stored as [hooks.<id>] tables")
    )]
    InvalidHooksFile(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
