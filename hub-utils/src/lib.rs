//! Common helpers shared across the prediction hub crates.

/// Persisted settings shared by the CLI and library consumers.
pub mod config;
/// Image decoding, resizing, and array conversion.
pub mod image_utils;
/// Instrumentation helpers for optional performance tracing.
pub mod telemetry;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::LevelFilter;

pub use image_utils::{decode_image, load_image, resize_exact, to_nhwc_array};
pub use telemetry::{
    TimingGuard, configure as configure_telemetry, telemetry_allows, telemetry_enabled,
    telemetry_level, timing_guard, timing_guard_if,
};

/// Log target used by [`telemetry`] guards.
pub const TELEMETRY_TARGET: &str = "hub::telemetry";

/// Initialize logging once for binaries and tests.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` applies. Repeated calls are harmless.
pub fn init_logging(default_filter: LevelFilter) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter.as_str()),
    );
    builder.filter_module(TELEMETRY_TARGET, LevelFilter::Trace);

    // A second init (tests, embedding hosts) is not an error.
    let _ = builder.try_init();
    Ok(())
}

/// Validate that a path exists and resolve it to an absolute path.
pub fn normalize_path<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    anyhow::ensure!(path.exists(), "path does not exist: {}", path.display());
    path.canonicalize()
        .with_context(|| format!("failed to canonicalize {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn normalize_path_rejects_missing_files() {
        let dir = tempdir().expect("tempdir");
        let missing = dir.path().join("nope.json");
        let err = normalize_path(&missing).expect_err("missing path must fail");
        assert!(err.to_string().contains("path does not exist"));
    }

    #[test]
    fn normalize_path_returns_absolute_path() {
        let dir = tempdir().expect("tempdir");
        let file = dir.path().join("present.txt");
        std::fs::write(&file, b"x").expect("write");
        let resolved = normalize_path(&file).expect("resolve");
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("present.txt"));
    }

    #[test]
    fn init_logging_is_idempotent() {
        init_logging(LevelFilter::Warn).expect("first init");
        init_logging(LevelFilter::Debug).expect("second init");
    }
}
