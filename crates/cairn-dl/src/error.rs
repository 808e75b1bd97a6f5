use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Transport level failure while retrieving a document.
#[derive(Error, Diagnostic, Debug)]
pub enum FetchError {
    #[error("Invalid URI: {uri}")]
    #[diagnostic(
        code(cairn_dl::invalid_uri),
        help("Use an absolute http(s):// or file:// URI, or a local path")
    )]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unsupported URI scheme `{scheme}` in {uri}")]
    #[diagnostic(
        code(cairn_dl::unsupported_scheme),
        help("Supported schemes are http, https and file")
    )]
    UnsupportedScheme { uri: String, scheme: String },

    #[error("Timed out fetching {uri}")]
    #[diagnostic(
        code(cairn_dl::timeout),
        help("Raise `fetch_timeout` in the configuration or check the remote host")
    )]
    Timeout { uri: String },

    #[error("Network error fetching {uri}: {source}")]
    #[diagnostic(
        code(cairn_dl::network),
        help("Check your internet connection or try again later")
    )]
    Network {
        uri: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("HTTP {status}: {uri}")]
    #[diagnostic(code(cairn_dl::http_status))]
    HttpStatus { status: u16, uri: String },

    #[error("Failed to {action} `{}`: {source}", path.display())]
    #[diagnostic(code(cairn_dl::io), help("Check file permissions and disk space"))]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Converts a `ureq::Error` raised while fetching `uri` into the matching variant.
    ///
    /// Status code errors become [`FetchError::HttpStatus`], timeouts (including socket
    /// reads that timed out) become [`FetchError::Timeout`], everything else is kept as
    /// [`FetchError::Network`].
    ///
    /// # Examples
    ///
    /// ```
    /// use cairn_dl::error::FetchError;
    ///
    /// let err = FetchError::from_ureq("https://example.org/r.xml", ureq::Error::StatusCode(404));
    /// assert!(matches!(err, FetchError::HttpStatus { status: 404, .. }));
    /// ```
    pub fn from_ureq(uri: &str, err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(status) => {
                Self::HttpStatus {
                    status,
                    uri: uri.to_string(),
                }
            }
            ureq::Error::Timeout(_) => {
                Self::Timeout {
                    uri: uri.to_string(),
                }
            }
            ureq::Error::Io(err) if err.kind() == std::io::ErrorKind::TimedOut => {
                Self::Timeout {
                    uri: uri.to_string(),
                }
            }
            other => {
                Self::Network {
                    uri: uri.to_string(),
                    source: Box::new(other),
                }
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_http_status() {
        let err = FetchError::HttpStatus {
            status: 404,
            uri: "https://example.com/notfound".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("HTTP 404"));
        assert!(msg.contains("https://example.com/notfound"));
    }

    #[test]
    fn test_from_ureq_status_code() {
        let err = FetchError::from_ureq("https://example.com", ureq::Error::StatusCode(503));
        assert!(matches!(err, FetchError::HttpStatus { status: 503, .. }));
    }

    #[test]
    fn test_from_ureq_timeouts() {
        let err = FetchError::from_ureq(
            "https://example.com",
            ureq::Error::Timeout(ureq::Timeout::RecvBody),
        );
        assert!(matches!(err, FetchError::Timeout { .. }));

        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "read timed out");
        let err = FetchError::from_ureq("https://example.com", ureq::Error::Io(io));
        assert!(matches!(err, FetchError::Timeout { .. }));
    }

    #[test]
    fn test_from_ureq_wrapped_in_io_error() {
        let io = ureq::Error::Timeout(ureq::Timeout::Global).into_io();
        let err = FetchError::from_ureq("https://example.com", ureq::Error::from(io));
        assert!(matches!(err, FetchError::Timeout { .. }));
    }

    #[test]
    fn test_from_ureq_connection_failed() {
        let err = FetchError::from_ureq("https://example.com", ureq::Error::ConnectionFailed);
        match err {
            FetchError::Network { uri, .. } => assert_eq!(uri, "https://example.com"),
            other => panic!("expected Network error variant, got {other:?}"),
        }
    }

    #[test]
    fn test_io_error_has_source() {
        let err = FetchError::Io {
            action: "write",
            path: PathBuf::from("/cache/remote.xml"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "Failed to write `/cache/remote.xml`: denied");
        assert!(std::error::Error::source(&err).is_some());
    }
}
