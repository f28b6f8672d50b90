//! Configuration file loading
//!
//! Each AIVI module reads an optional TOML file from the platform config
//! directory (`~/.config/aivi/<module>.toml` on Linux) and overlays
//! environment variables on top of it. This module provides the shared
//! path resolution and load/write primitives; each crate defines its own
//! typed TOML structure.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Resolve the TOML config file path for a module (e.g. "aivi-vt").
///
/// Falls back to `./<module>.toml` when no platform config directory can
/// be determined (containers, stripped-down environments).
pub fn config_file_path(module: &str) -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("aivi").join(format!("{module}.toml")))
        .unwrap_or_else(|| PathBuf::from(format!("{module}.toml")))
}

/// Load a typed TOML config from `path`.
///
/// A missing file is not an error: returns `Ok(None)` so callers can fall
/// through to environment variables and compiled defaults.
pub fn load_toml_file<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let parsed = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    tracing::debug!(path = %path.display(), "loaded TOML config");
    Ok(Some(parsed))
}

/// Write a typed TOML config to `path`, creating parent directories.
pub fn write_toml_file<T: Serialize>(config: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    std::fs::write(path, content)?;

    tracing::info!(path = %path.display(), "wrote TOML config");
    Ok(())
}
