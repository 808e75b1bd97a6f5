use std::{
    fs::{self, File},
    io::{self, BufWriter, Read as _, Write as _},
    path::{Path, PathBuf},
};

use tracing::{debug, trace};

use crate::{
    error::FetchError,
    http_client::SHARED_AGENT,
    utils::{resolve_location, Location},
};

/// Retrieves a document by URI and writes it to a local path.
///
/// Implementations must overwrite `dest` if it already exists and must not leave a
/// partially written `dest` behind on success. The return value is the number of bytes
/// written.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, uri: &str, dest: &Path) -> Result<u64, FetchError>;
}

/// Default [`Fetcher`] backed by the shared HTTP agent and the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentFetcher;

impl Fetcher for DocumentFetcher {
    fn fetch(&self, uri: &str, dest: &Path) -> Result<u64, FetchError> {
        Fetch::new(uri).output(dest).execute()
    }
}

/// A single document retrieval.
pub struct Fetch {
    pub uri: String,
    pub output: Option<PathBuf>,
}

impl Fetch {
    /// Creates a new `Fetch` for the given URI.
    ///
    /// # Examples
    ///
    /// ```
    /// use cairn_dl::fetch::Fetch;
    ///
    /// let fetch = Fetch::new("https://example.org/remote.xml").output("/tmp/remote.xml");
    /// assert_eq!(fetch.uri, "https://example.org/remote.xml");
    /// ```
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            output: None,
        }
    }

    /// Sets the destination file. Any existing file at this path is replaced.
    pub fn output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Performs the fetch and returns the number of bytes written.
    ///
    /// The parent directory of the destination must already exist.
    ///
    /// # Errors
    ///
    /// * [`FetchError::InvalidUri`] / [`FetchError::UnsupportedScheme`] for URIs that can't
    ///   be fetched
    /// * [`FetchError::HttpStatus`], [`FetchError::Timeout`], [`FetchError::Network`] for
    ///   transport failures
    /// * [`FetchError::Io`] if the source can't be read or the destination can't be written
    pub fn execute(self) -> Result<u64, FetchError> {
        let output = match self.output {
            Some(ref output) => output.clone(),
            None => {
                return Err(FetchError::Io {
                    action: "resolve destination for",
                    path: PathBuf::from(&self.uri),
                    source: io::Error::new(io::ErrorKind::InvalidInput, "no output path set"),
                })
            }
        };

        match resolve_location(&self.uri)? {
            Location::Http(url) => self.fetch_http(url.as_str(), &output),
            Location::File(path) => self.copy_local(&path, &output),
        }
    }

    fn fetch_http(&self, url: &str, output: &Path) -> Result<u64, FetchError> {
        debug!("Fetching {}", url);

        let resp = SHARED_AGENT
            .get(url)
            .call()
            .map_err(|err| FetchError::from_ureq(&self.uri, err))?;

        if !resp.status().is_success() {
            return Err(FetchError::HttpStatus {
                status: resp.status().as_u16(),
                uri: self.uri.clone(),
            });
        }

        let mut reader = resp.into_body().into_reader();
        let mut writer = BufWriter::new(create_file(output)?);
        let mut buf = [0u8; 8192];
        let mut written = 0u64;

        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(FetchError::from_ureq(&self.uri, ureq::Error::from(err))),
            };
            writer.write_all(&buf[..n]).map_err(|err| {
                FetchError::Io {
                    action: "write",
                    path: output.to_path_buf(),
                    source: err,
                }
            })?;
            written += n as u64;
        }

        writer.flush().map_err(|err| {
            FetchError::Io {
                action: "flush",
                path: output.to_path_buf(),
                source: err,
            }
        })?;

        trace!(bytes = written, path = %output.display(), "fetched document");
        Ok(written)
    }

    fn copy_local(&self, source: &Path, output: &Path) -> Result<u64, FetchError> {
        debug!("Copying {}", source.display());

        if source == output {
            return fs::metadata(source).map(|meta| meta.len()).map_err(|err| {
                FetchError::Io {
                    action: "read",
                    path: source.to_path_buf(),
                    source: err,
                }
            });
        }

        let mut reader = File::open(source).map_err(|err| {
            FetchError::Io {
                action: "open",
                path: source.to_path_buf(),
                source: err,
            }
        })?;
        let mut writer = create_file(output)?;

        let written = io::copy(&mut reader, &mut writer).map_err(|err| {
            FetchError::Io {
                action: "write",
                path: output.to_path_buf(),
                source: err,
            }
        })?;

        trace!(bytes = written, path = %output.display(), "copied document");
        Ok(written)
    }
}

fn create_file(path: &Path) -> Result<File, FetchError> {
    File::create(path).map_err(|err| {
        FetchError::Io {
            action: "create",
            path: path.to_path_buf(),
            source: err,
        }
    })
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Write},
        net::TcpListener,
        thread,
        time::Duration,
    };

    use serial_test::serial;
    use tempfile::tempdir;

    use crate::http_client::{configure_http_client, DEFAULT_TIMEOUT};

    use super::*;

    /// Serves a single canned HTTP response on a local port and returns its URL.
    fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                let response = format!(
                    "{status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        format!("http://{addr}/remote.xml")
    }

    #[test]
    fn test_fetch_local_file_overwrites() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source.xml");
        let dest = dir.path().join("dest.xml");
        fs::write(&source, "<remote/>").unwrap();
        fs::write(&dest, "stale content that is longer").unwrap();

        let uri = format!("file://{}", source.display());
        let written = DocumentFetcher.fetch(&uri, &dest).unwrap();

        assert_eq!(written, 9);
        assert_eq!(fs::read_to_string(&dest).unwrap(), "<remote/>");
    }

    #[test]
    fn test_fetch_missing_local_file() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("missing.xml");
        let dest = dir.path().join("dest.xml");

        let err = DocumentFetcher
            .fetch(source.to_str().unwrap(), &dest)
            .unwrap_err();
        assert!(matches!(err, FetchError::Io { action: "open", .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn test_fetch_unwritable_destination() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source.xml");
        fs::write(&source, "<remote/>").unwrap();
        let dest = dir.path().join("no-such-dir").join("dest.xml");

        let err = DocumentFetcher
            .fetch(source.to_str().unwrap(), &dest)
            .unwrap_err();
        assert!(matches!(err, FetchError::Io { action: "create", .. }));
    }

    #[test]
    fn test_fetch_without_output() {
        let err = Fetch::new("file:///tmp/remote.xml").execute().unwrap_err();
        assert!(matches!(err, FetchError::Io { .. }));
    }

    /// Sends headers and the first part of a body, then stalls.
    fn serve_stalled_body() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                let _ = stream.write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n<remote>",
                );
                let _ = stream.flush();
                thread::sleep(Duration::from_secs(3));
            }
        });

        format!("http://{addr}/remote.xml")
    }

    #[test]
    #[serial]
    fn test_fetch_http_body_timeout() {
        let url = serve_stalled_body();
        let dir = tempdir().unwrap();
        let dest = dir.path().join("remote.xml");

        configure_http_client(|cfg| cfg.timeout = Some(Duration::from_millis(300)));
        let result = DocumentFetcher.fetch(&url, &dest);
        configure_http_client(|cfg| cfg.timeout = Some(DEFAULT_TIMEOUT));

        match result {
            Err(FetchError::Timeout { uri }) => assert_eq!(uri, url),
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[test]
    #[serial]
    fn test_fetch_http_success() {
        let url = serve_once("HTTP/1.1 200 OK", "<remote></remote>");
        let dir = tempdir().unwrap();
        let dest = dir.path().join("remote.xml");

        let written = DocumentFetcher.fetch(&url, &dest).unwrap();

        assert_eq!(written, 17);
        assert_eq!(fs::read_to_string(&dest).unwrap(), "<remote></remote>");
    }

    #[test]
    #[serial]
    fn test_fetch_http_status_error() {
        let url = serve_once("HTTP/1.1 404 Not Found", "missing");
        let dir = tempdir().unwrap();
        let dest = dir.path().join("remote.xml");

        let err = DocumentFetcher.fetch(&url, &dest).unwrap_err();

        assert!(matches!(err, FetchError::HttpStatus { status: 404, .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn test_fetch_unsupported_scheme() {
        let dir = tempdir().unwrap();
        let err = DocumentFetcher
            .fetch("ftp://example.org/remote.xml", &dir.path().join("x.xml"))
            .unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedScheme { .. }));
    }
}
