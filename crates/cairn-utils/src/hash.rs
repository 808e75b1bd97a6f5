/// Number of hex characters in a digest produced by [`digest_str`].
pub const DIGEST_HEX_LEN: usize = 64;

/// Digests an identifier into a stable, fixed-length lowercase hex string.
///
/// The digest is only used to derive file names from identifiers such as URIs; it is not
/// an integrity check. The same input always yields the same output across runs and
/// platforms. The default implementation uses the `blake3` crate.
///
/// # Example
///
/// ```
/// use cairn_utils::hash::{digest_str, DIGEST_HEX_LEN};
///
/// let name = digest_str("https://example.org/remote.xml");
/// assert_eq!(name.len(), DIGEST_HEX_LEN);
/// assert_eq!(name, digest_str("https://example.org/remote.xml"));
/// ```
pub fn digest_str(input: &str) -> String {
    blake3::hash(input.as_bytes()).to_hex().to_string()
}
