//! slackforge-core: Core logic for slackforge
//!
//! This crate provides the package pipeline for slackforge: configuration
//! loading, source acquisition, build strategies, and Slackware archive
//! creation.

mod archive;
mod builder;
mod config;
mod error;
mod fetch;
mod package;
mod pipeline;

pub use archive::{archive_file_name, create_archive, create_metadata};
pub use builder::BuildStrategy;
pub use config::Config;
pub use error::CoreError;
pub use fetch::{clone_source, download_release, release_url};
pub use package::{BuildConfig, Package};
pub use pipeline::{Orchestrator, PackageReport, PackageStatus, RunReport, Stage};

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
