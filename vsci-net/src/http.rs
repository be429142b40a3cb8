// vsci-net/src/http.rs
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use tracing::{debug, error, warn};
use vsci_common::error::{Result, VsciError};

use crate::validation::validate_url;

const CONNECT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT_STRING: &str = "vsci tarball installer (Rust)";
const CHUNK_SIZE: usize = 64 * 1024;

/// Downloads `url` into `dest_path`, calling `on_progress(received, total)`
/// after every chunk. The body is streamed into a hidden sibling file first
/// and renamed into place once complete. Returns the number of bytes written.
pub fn fetch(
    url: &str,
    dest_path: &Path,
    on_progress: &mut dyn FnMut(u64, Option<u64>),
) -> Result<u64> {
    validate_url(url)?;
    let client = build_http_client()?;

    let temp_filename = format!(
        ".{}.download",
        dest_path.file_name().unwrap_or_default().to_string_lossy()
    );
    let temp_path = dest_path.with_file_name(temp_filename);
    debug!("Downloading {} to temporary path {}", url, temp_path.display());

    let result = download_to(&client, url, &temp_path, on_progress).and_then(|written| {
        fs::rename(&temp_path, dest_path).map_err(|e| {
            VsciError::NetworkFailure(
                url.to_string(),
                format!(
                    "Failed to move {} to {}: {e}",
                    temp_path.display(),
                    dest_path.display()
                ),
            )
        })?;
        Ok(written)
    });

    if result.is_err() && temp_path.exists() {
        if let Err(e) = fs::remove_file(&temp_path) {
            warn!(
                "Could not remove partial download {}: {}",
                temp_path.display(),
                e
            );
        }
    }
    result
}

fn build_http_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        // No overall timeout: large tarballs may legitimately take a long time.
        .timeout(None)
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| VsciError::Config(format!("Failed to build HTTP client: {e}")))
}

fn download_to(
    client: &Client,
    url: &str,
    temp_path: &Path,
    on_progress: &mut dyn FnMut(u64, Option<u64>),
) -> Result<u64> {
    let mut response = client.get(url).send().map_err(|e| {
        debug!("HTTP request failed for {url}: {e}");
        VsciError::NetworkFailure(url.to_string(), format!("HTTP request failed: {e}"))
    })?;
    let status = response.status();
    debug!("Received HTTP status: {} for {}", status, url);

    if !status.is_success() {
        error!("HTTP error {} for URL {}", status, url);
        let reason = match status {
            StatusCode::NOT_FOUND => "Resource not found (404)".to_string(),
            StatusCode::FORBIDDEN => "Access forbidden (403)".to_string(),
            other => format!("HTTP error {other}"),
        };
        return Err(VsciError::NetworkFailure(url.to_string(), reason));
    }

    let total = response.content_length().filter(|len| *len > 0);
    let mut file = File::create(temp_path).map_err(|e| {
        VsciError::NetworkFailure(
            url.to_string(),
            format!("Failed to create {}: {e}", temp_path.display()),
        )
    })?;

    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut received: u64 = 0;
    loop {
        let read = response.read(&mut buffer).map_err(|e| {
            VsciError::NetworkFailure(url.to_string(), format!("Failed to read body: {e}"))
        })?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read]).map_err(|e| {
            VsciError::NetworkFailure(
                url.to_string(),
                format!("Failed to write {}: {e}", temp_path.display()),
            )
        })?;
        received += read as u64;
        on_progress(received, total);
    }
    file.flush()?;
    debug!("Finished writing {} bytes from {}", received, url);
    Ok(received)
}

/// Maps a byte count into the lower half (0–50) of overall progress.
pub fn download_progress_percent(received: u64, total: Option<u64>) -> Option<u8> {
    match total {
        Some(total) if total > 0 => {
            let scaled = received.min(total).saturating_mul(50) / total;
            Some(scaled as u8)
        }
        _ => None,
    }
}
