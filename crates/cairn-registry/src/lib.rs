//! Manifest shapes and validation for cairn.
//!
//! This crate knows what a remote manifest and a package manifest look like
//! and turns cached XML files into typed values, rejecting anything that does
//! not match.
//!
//! # Overview
//!
//! - [`RemoteManifest`]: root `<remote>`, an ordered list of [`PackageRef`]s
//! - [`PackageManifest`]: root `<package>`, opaque apart from a few descriptive fields
//!
//! # Example
//!
//! ```no_run
//! use cairn_registry::{validate, PackageManifest, RemoteManifest};
//!
//! fn inspect() -> cairn_registry::Result<()> {
//!     let remote: RemoteManifest = validate("/cache/remote_ab.xml")?;
//!     for package in &remote.packages {
//!         let path = format!("/cache/package_{}.xml", package.pack_id);
//!         let manifest: PackageManifest = validate(path)?;
//!         println!("{:?}", manifest.version);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod manifest;
pub mod validate;

pub use error::{Result, ValidationError};
pub use manifest::{is_valid_pack_id, PackageManifest, PackageRef, RemoteManifest};
pub use validate::{validate, validate_str, ManifestShape};
