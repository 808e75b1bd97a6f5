//! Structural validation of cached XML documents.
//!
//! A document is parsed with `xot` into an [`XmlDocument`] and then handed to a
//! [`ManifestShape`], which either builds its typed value or rejects the tree.

use std::{fs, path::Path};

use tracing::trace;
use xot::{Node, Xot};

use crate::error::{Result, ValidationError};

/// A typed document that can be recognised from an XML tree.
pub trait ManifestShape: Sized {
    /// Local name of the required root element.
    const ROOT: &'static str;

    /// Builds the typed value from the root element of `doc`.
    fn from_root(doc: &mut XmlDocument, root: Node) -> Result<Self>;
}

/// Parsed XML tree plus the path it was read from, used for error reporting.
pub struct XmlDocument {
    xot: Xot,
    path: std::path::PathBuf,
}

impl XmlDocument {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of an element node, or `None` for any other node kind.
    ///
    /// Manifests use no XML namespace. An element in any namespace is rendered as
    /// `{uri}local` so it never matches a plain manifest name.
    pub fn element_name(&self, node: Node) -> Option<String> {
        self.xot.element(node).map(|element| {
            match self.xot.name_ns_str(element.name()) {
                (local, "") => local.to_string(),
                (local, uri) => format!("{{{uri}}}{local}"),
            }
        })
    }

    /// Child elements of `node`, in document order.
    ///
    /// Comments, processing instructions and whitespace-only text are skipped. Any other
    /// text directly inside `node` is rejected.
    pub fn child_elements(&self, node: Node, parent: &'static str) -> Result<Vec<Node>> {
        let mut elements = Vec::new();

        for child in self.xot.children(node) {
            if self.xot.is_element(child) {
                elements.push(child);
            } else if let Some(text) = self.xot.text_str(child) {
                if !text.trim().is_empty() {
                    return Err(ValidationError::UnexpectedText {
                        path: self.path.clone(),
                        parent,
                    });
                }
            }
        }

        Ok(elements)
    }

    /// Reads a field given either as an attribute or as a child element's text.
    ///
    /// Like [`element_name`](Self::element_name), only un-namespaced attributes and
    /// elements match. Values are trimmed; empty values count as absent.
    pub fn field(&mut self, node: Node, name: &str) -> Option<String> {
        let name_id = self.xot.add_name(name);

        let from_attribute = self
            .xot
            .get_attribute(node, name_id)
            .map(|value| value.trim().to_string());

        let value = from_attribute.or_else(|| {
            self.xot
                .children(node)
                .find(|child| {
                    self.xot
                        .element(*child)
                        .is_some_and(|element| element.name() == name_id)
                })
                .and_then(|child| self.xot.text_content_str(child))
                .map(|text| text.trim().to_string())
        });

        value.filter(|v| !v.is_empty())
    }
}

/// Parses `content` and checks it against shape `S`.
///
/// `path` is only used to label errors.
pub fn validate_str<S: ManifestShape>(content: &str, path: &Path) -> Result<S> {
    let mut xot = Xot::new();

    let root = xot.parse(content).map_err(|err| {
        ValidationError::Malformed {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    })?;

    let element = xot.document_element(root).map_err(|err| {
        ValidationError::Malformed {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    })?;

    let mut doc = XmlDocument {
        xot,
        path: path.to_path_buf(),
    };

    let found = doc.element_name(element).unwrap_or_default();
    if found != S::ROOT {
        return Err(ValidationError::UnexpectedRoot {
            path: path.to_path_buf(),
            expected: S::ROOT,
            found,
        });
    }

    S::from_root(&mut doc, element)
}

/// Reads the file at `path` and checks it against shape `S`.
///
/// # Errors
///
/// * [`ValidationError::Read`] if the file cannot be read as UTF-8
/// * any structural [`ValidationError`] raised by the shape
///
/// # Example
///
/// ```no_run
/// use cairn_registry::{validate, RemoteManifest};
///
/// let manifest: RemoteManifest = validate("/cache/remote_ab.xml").unwrap();
/// for package in &manifest.packages {
///     println!("{} -> {}", package.pack_id, package.manifest_uri);
/// }
/// ```
pub fn validate<S: ManifestShape, P: AsRef<Path>>(path: P) -> Result<S> {
    let path = path.as_ref();
    trace!(path = %path.display(), root = S::ROOT, "validating document");

    let content = fs::read_to_string(path).map_err(|err| {
        ValidationError::Read {
            path: path.to_path_buf(),
            source: err,
        }
    })?;

    validate_str(&content, path)
}
