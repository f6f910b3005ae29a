//! Error types for slackforge-core

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in core operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("config file '{0}' not found")]
    ConfigNotFound(PathBuf),

    #[error("failed to read config file '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in config file: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("invalid package '{name}': {message}")]
    InvalidPackage { name: String, message: String },

    #[error("package '{0}' not found in configuration")]
    PackageNotFound(String),

    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to clone '{url}': {stderr}")]
    Clone { url: String, stderr: String },

    #[error("build command failed with exit code {code:?}: {command}")]
    CommandFailed { command: String, code: Option<i32> },

    #[error("no build strategy claims package '{0}'")]
    NoBuilder(String),

    #[error("package '{0}' declares no binary_path")]
    NoBinaryPath(String),

    #[error("built binary not found at '{0}'")]
    BinaryNotFound(PathBuf),

    #[error("no binaries found in '{0}'")]
    NoBinaries(PathBuf),

    #[error("download failed for {url}: HTTP status {status}")]
    Download { url: String, status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
