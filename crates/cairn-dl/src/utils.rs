use std::path::PathBuf;

use url::Url;

use crate::error::FetchError;

/// Where a document URI points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Remote document reachable over http or https.
    Http(Url),
    /// Document on the local filesystem.
    File(PathBuf),
}

/// Classifies a URI into a [`Location`].
///
/// `http://` and `https://` URIs are fetched over the network, `file://` URIs and bare
/// absolute paths are read from disk. Any other scheme is rejected.
pub fn resolve_location(uri: &str) -> Result<Location, FetchError> {
    let uri = uri.trim();

    if uri.starts_with('/') {
        return Ok(Location::File(PathBuf::from(uri)));
    }

    let url = Url::parse(uri).map_err(|source| {
        FetchError::InvalidUri {
            uri: uri.to_string(),
            source,
        }
    })?;

    match url.scheme() {
        "http" | "https" => Ok(Location::Http(url)),
        "file" => {
            url.to_file_path()
                .map(Location::File)
                .map_err(|_| {
                    FetchError::UnsupportedScheme {
                        uri: uri.to_string(),
                        scheme: "file".to_string(),
                    }
                })
        }
        scheme => {
            Err(FetchError::UnsupportedScheme {
                uri: uri.to_string(),
                scheme: scheme.to_string(),
            })
        }
    }
}
