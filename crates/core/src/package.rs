//! Package definitions and build configuration

use serde::Deserialize;
use std::collections::BTreeMap;

/// Build configuration consumed by the legacy Cargo strategy
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Cargo features to enable
    pub features: Vec<String>,
    /// Cross-compilation target triple
    pub target: Option<String>,
    /// Extra flags appended to the cargo invocation
    pub cargo_flags: Vec<String>,
    /// Environment variables merged over the parent environment
    pub env: BTreeMap<String, String>,
}

/// One buildable/distributable unit
///
/// Constructed once per run by [`crate::Config::load`] with all defaults
/// applied and all fields validated; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Package {
    /// Unique identifier; also the installed binary name and slack-desc label
    pub name: String,
    /// Upstream git repository URL
    pub source_url: String,
    /// The git ref (branch or tag) to check out
    pub git_ref: String,
    /// Package version, explicit or derived from the ref
    pub version: String,
    /// Free-text description, word-wrapped into the slack-desc
    pub description: String,
    /// Monotonic build number distinguishing rebuilds of the same version
    pub build_number: u32,
    /// Disabled packages are reported as skipped and never processed
    pub enabled: bool,
    /// Fetch a prebuilt release asset instead of building from source
    pub is_release: bool,
    /// Opaque shell line run by the generic build strategy
    pub build_command: Option<String>,
    /// Path of the produced executable, relative to the source tree
    pub binary_path: Option<String>,
    /// Binaries installed by the legacy Cargo strategy
    pub binaries: Vec<String>,
    /// Legacy Cargo build options
    pub build_config: BuildConfig,
}

impl Package {
    /// Directory name for staged documentation, `<name>-<version>`.
    pub fn doc_dir_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

/// Derive a package version from its git ref.
///
/// A leading `v` is stripped when immediately followed by a digit
/// (`v1.2.3` -> `1.2.3`); any other ref is used verbatim.
pub(crate) fn derive_version(git_ref: &str) -> String {
    match git_ref.strip_prefix('v') {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest.to_string(),
        _ => git_ref.to_string(),
    }
}

/// Check that a string is usable as a single path component.
pub(crate) fn is_path_safe(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains('/')
        && !value.contains('\\')
}
