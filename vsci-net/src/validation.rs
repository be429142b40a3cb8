// vsci-net/src/validation.rs
use url::Url;
use vsci_common::error::{Result, VsciError};

const FALLBACK_FILENAME: &str = "download.tar.gz";

/// Validates a URL, ensuring it uses an HTTP(S) scheme.
pub fn validate_url(url_str: &str) -> Result<Url> {
    let url = Url::parse(url_str)
        .map_err(|e| VsciError::InvalidInput(format!("Failed to parse URL '{url_str}': {e}")))?;
    match url.scheme() {
        "https" | "http" => Ok(url),
        other => Err(VsciError::InvalidInput(format!(
            "Invalid URL scheme for '{url_str}': must be http or https, but got '{other}'"
        ))),
    }
}

/// The last non-empty path segment of `url`, or `download.tar.gz` when there is none.
pub fn file_name_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
        .map(|s| s.to_string())
        .filter(|s| !s.contains(std::path::is_separator) && s != ".." && s != ".")
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}
