//! Remote and package manifest shapes.
//!
//! A remote manifest lists the packages a provider offers:
//!
//! ```xml
//! <remote name="example">
//!   <package id="core-shaders" manifest="https://example.org/core.xml"/>
//!   <package>
//!     <id>extras</id>
//!     <manifest>https://example.org/extras.xml</manifest>
//!   </package>
//! </remote>
//! ```
//!
//! Each package manifest is a `<package>` document whose contents are opaque to the
//! cache beyond a handful of descriptive fields.

use std::collections::HashSet;

use serde::Serialize;
use xot::Node;

use crate::{
    error::{Result, ValidationError},
    validate::{ManifestShape, XmlDocument},
};

/// Returns `true` if `pack_id` can be embedded in a cache file name.
///
/// Only ASCII letters, digits, `.`, `_` and `-` are allowed, and `..` may not appear, so
/// an id can never introduce a path separator or a parent reference.
pub fn is_valid_pack_id(pack_id: &str) -> bool {
    !pack_id.is_empty()
        && !pack_id.contains("..")
        && pack_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// A package entry listed by a remote manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageRef {
    pub pack_id: String,
    pub manifest_uri: String,
}

/// The validated document served by a remote source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemoteManifest {
    pub name: Option<String>,
    pub packages: Vec<PackageRef>,
}

impl ManifestShape for RemoteManifest {
    const ROOT: &'static str = "remote";

    fn from_root(doc: &mut XmlDocument, root: Node) -> Result<Self> {
        let name = doc.field(root, "name");
        let mut packages = Vec::new();
        let mut seen = HashSet::new();

        for (index, child) in doc
            .child_elements(root, Self::ROOT)?
            .into_iter()
            .enumerate()
        {
            let element = doc.element_name(child).unwrap_or_default();
            if element == "name" {
                continue;
            }
            if element != "package" {
                return Err(ValidationError::UnexpectedElement {
                    path: doc.path().to_path_buf(),
                    parent: Self::ROOT,
                    found: element,
                });
            }

            let pack_id = doc.field(child, "id").ok_or_else(|| {
                ValidationError::MissingField {
                    path: doc.path().to_path_buf(),
                    index,
                    field: "id",
                }
            })?;

            if !is_valid_pack_id(&pack_id) {
                return Err(ValidationError::InvalidPackId {
                    path: doc.path().to_path_buf(),
                    pack_id,
                });
            }

            let manifest_uri = doc.field(child, "manifest").ok_or_else(|| {
                ValidationError::MissingField {
                    path: doc.path().to_path_buf(),
                    index,
                    field: "manifest",
                }
            })?;

            // Cache file names must stay distinct on case-insensitive filesystems.
            if !seen.insert(pack_id.to_ascii_lowercase()) {
                return Err(ValidationError::DuplicatePackId {
                    path: doc.path().to_path_buf(),
                    pack_id,
                });
            }

            packages.push(PackageRef {
                pack_id,
                manifest_uri,
            });
        }

        Ok(Self {
            name,
            packages,
        })
    }
}

/// The validated document describing a single package.
///
/// Only descriptive fields are extracted; everything else in the document is kept on
/// disk untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageManifest {
    pub id: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
}

impl ManifestShape for PackageManifest {
    const ROOT: &'static str = "package";

    fn from_root(doc: &mut XmlDocument, root: Node) -> Result<Self> {
        // Rejects stray text at the top level; child elements are opaque.
        doc.child_elements(root, Self::ROOT)?;

        Ok(Self {
            id: doc.field(root, "id"),
            name: doc.field(root, "name"),
            version: doc.field(root, "version"),
            description: doc.field(root, "description"),
        })
    }
}
