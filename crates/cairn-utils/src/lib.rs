//! Shared helpers for the cairn workspace.
//!
//! Everything here is leaf-level: digesting identifiers into stable file
//! names, staging and committing cache files, resolving user supplied paths,
//! and parsing human friendly durations.

pub mod error;
pub mod fs;
pub mod hash;
pub mod path;
pub mod time;
