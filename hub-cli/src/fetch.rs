//! Download model artifacts into a local cache.

use std::{
    ffi::OsString,
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use hub_utils::timing_guard;
use log::{debug, info};
use sha2::{Digest, Sha256};

const FALLBACK_FILE_NAME: &str = "model.onnx";
const URL_KEY_BYTES: usize = 8;

/// Where `url` is stored inside `cache_dir`.
///
/// The file name is a digest of the whole URL followed by the last path segment when that
/// segment looks like a file name (`a1b2c3d4e5f60718-CNN.onnx`). Share links whose last
/// segment is not a file name (`.../d/<id>/view`) use `model.onnx` after the digest.
pub fn cached_artifact_path(url: &str, cache_dir: &Path) -> PathBuf {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let name = without_query
        .rsplit('/')
        .next()
        .map(str::trim)
        .filter(|segment| segment.contains('.') && !segment.contains(':'))
        .unwrap_or(FALLBACK_FILE_NAME);
    cache_dir.join(format!("{}-{name}", url_key(url)))
}

fn url_key(url: &str) -> String {
    let digest = Sha256::digest(url.trim().as_bytes());
    digest[..URL_KEY_BYTES]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Return the cached copy of `url`, downloading it first when absent.
///
/// The body is streamed to a `.part` file next to the target and renamed into place.
pub fn fetch_cached(url: &str, cache_dir: &Path) -> Result<PathBuf> {
    let target = cached_artifact_path(url, cache_dir);
    if target.is_file() {
        debug!("Using cached model {}", target.display());
        return Ok(target);
    }

    fs::create_dir_all(cache_dir)
        .with_context(|| format!("failed to create cache directory {}", cache_dir.display()))?;

    let _guard = timing_guard("hub_cli::fetch_model", log::Level::Info);
    info!("Downloading {url} to {}", target.display());

    let partial = partial_path(&target);
    let result = download_to(url, &partial);
    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    let bytes = result?;

    fs::rename(&partial, &target).with_context(|| {
        format!(
            "failed to move {} into place at {}",
            partial.display(),
            target.display()
        )
    })?;
    info!("Cached {bytes} bytes at {}", target.display());
    Ok(target)
}

fn download_to(url: &str, destination: &Path) -> Result<u64> {
    let response = ureq::get(url)
        .call()
        .with_context(|| format!("failed to fetch {url}"))?;
    let mut reader = response.into_reader();
    let mut file = File::create(destination)
        .with_context(|| format!("failed to create {}", destination.display()))?;
    let bytes = io::copy(&mut reader, &mut file)
        .with_context(|| format!("failed to download {url}"))?;
    file.sync_all()
        .with_context(|| format!("failed to flush {}", destination.display()))?;
    anyhow::ensure!(bytes > 0, "download from {url} was empty");
    Ok(bytes)
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from(FALLBACK_FILE_NAME));
    name.push(".part");
    target.with_file_name(name)
}
