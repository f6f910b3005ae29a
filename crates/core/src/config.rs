//! Configuration loading for package definitions
//!
//! Deserialization and validation are separate steps: serde fills a raw
//! layer, then [`Config::load`] applies documented defaults exactly once
//! and produces immutable [`Package`] values.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::package::{BuildConfig, Package, derive_version, is_path_safe};
use crate::{CoreError, Result};

/// Validated configuration for one build invocation
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory archives are published under, when set in the file
    pub output_path: Option<PathBuf>,
    /// Root directory for clones and staging trees, when set in the file
    pub temp_path: Option<PathBuf>,
    /// Packages in configuration order
    pub packages: Vec<Package>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    output_path: Option<PathBuf>,
    temp_path: Option<PathBuf>,
    #[serde(default)]
    packages: Vec<RawPackage>,
}

#[derive(Debug, Deserialize)]
struct RawPackage {
    name: String,
    source_url: String,
    #[serde(rename = "ref")]
    git_ref: String,
    version: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(rename = "build", default = "default_build_number")]
    build_number: u32,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    is_release: bool,
    build_command: Option<String>,
    binary_path: Option<String>,
    binaries: Option<Vec<String>>,
    #[serde(default)]
    build_config: BuildConfig,
}

fn default_build_number() -> u32 {
    1
}

fn default_enabled() -> bool {
    true
}

impl Config {
    /// Load and validate a configuration file.
    ///
    /// A missing file, malformed JSON, a missing required field, or an
    /// invalid field value is a fatal configuration error; no build work
    /// happens afterwards.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoreError::ConfigNotFound(path.to_path_buf())
            } else {
                CoreError::ConfigRead {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let raw: RawConfig = serde_json::from_str(&data)?;

        let packages = raw
            .packages
            .into_iter()
            .map(validate_package)
            .collect::<Result<Vec<_>>>()?;

        info!(count = packages.len(), path = %path.display(), "loaded configuration");

        Ok(Config {
            output_path: raw.output_path,
            temp_path: raw.temp_path,
            packages,
        })
    }
}

fn validate_package(raw: RawPackage) -> Result<Package> {
    if !is_path_safe(&raw.name) {
        return Err(CoreError::InvalidPackage {
            name: raw.name,
            message: "name must be a non-empty, filesystem-safe identifier".to_string(),
        });
    }
    if raw.git_ref.is_empty() {
        return Err(CoreError::InvalidPackage {
            name: raw.name,
            message: "ref must not be empty".to_string(),
        });
    }

    let version = raw
        .version
        .unwrap_or_else(|| derive_version(&raw.git_ref));
    if version.contains('/') || version.contains('\\') {
        return Err(CoreError::InvalidPackage {
            name: raw.name,
            message: format!("version '{}' must not contain path separators", version),
        });
    }

    // The generic strategy installs exactly one binary; require its
    // location up front rather than after a wasted clone and build.
    if raw.build_command.as_deref().is_some_and(|c| !c.is_empty())
        && raw.binary_path.is_none()
        && !raw.is_release
    {
        return Err(CoreError::InvalidPackage {
            name: raw.name,
            message: "binary_path is required when build_command is set".to_string(),
        });
    }

    let binaries = raw.binaries.unwrap_or_else(|| vec![raw.name.clone()]);

    Ok(Package {
        name: raw.name,
        source_url: raw.source_url,
        git_ref: raw.git_ref,
        version,
        description: raw.description,
        build_number: raw.build_number,
        enabled: raw.enabled,
        is_release: raw.is_release,
        build_command: raw.build_command,
        binary_path: raw.binary_path,
        binaries,
        build_config: raw.build_config,
    })
}
