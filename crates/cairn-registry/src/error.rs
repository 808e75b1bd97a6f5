//! Error types for the registry crate.
//!
//! [`ValidationError`] is raised whenever a fetched document does not have the
//! structure its shape demands.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// A document was read but does not match its expected shape.
#[derive(Error, Diagnostic, Debug)]
pub enum ValidationError {
    #[error("Error while reading {}: {source}", path.display())]
    #[diagnostic(code(cairn_registry::io))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed XML in {}: {reason}", path.display())]
    #[diagnostic(
        code(cairn_registry::malformed),
        help("The document may be truncated or not XML at all")
    )]
    Malformed { path: PathBuf, reason: String },

    #[error("Expected <{expected}> root element in {}, found <{found}>", path.display())]
    #[diagnostic(
        code(cairn_registry::unexpected_root),
        help("Check that the URI points at the right kind of manifest")
    )]
    UnexpectedRoot {
        path: PathBuf,
        expected: &'static str,
        found: String,
    },

    #[error("Unexpected <{found}> inside <{parent}> in {}", path.display())]
    #[diagnostic(code(cairn_registry::unexpected_element))]
    UnexpectedElement {
        path: PathBuf,
        parent: &'static str,
        found: String,
    },

    #[error("Unexpected text inside <{parent}> in {}", path.display())]
    #[diagnostic(code(cairn_registry::unexpected_text))]
    UnexpectedText { path: PathBuf, parent: &'static str },

    #[error("Package entry #{index} in {} is missing `{field}`", path.display())]
    #[diagnostic(
        code(cairn_registry::missing_field),
        help("Every package entry needs an `id` and a `manifest` URI")
    )]
    MissingField {
        path: PathBuf,
        index: usize,
        field: &'static str,
    },

    #[error("Invalid package id `{pack_id}` in {}", path.display())]
    #[diagnostic(
        code(cairn_registry::invalid_pack_id),
        help("Package ids may only contain ASCII letters, digits, `.`, `_` and `-`")
    )]
    InvalidPackId { path: PathBuf, pack_id: String },

    #[error("Duplicate package id `{pack_id}` in {}", path.display())]
    #[diagnostic(code(cairn_registry::duplicate_pack_id))]
    DuplicatePackId { path: PathBuf, pack_id: String },
}

/// A specialized Result type for registry operations.
pub type Result<T> = std::result::Result<T, ValidationError>;
