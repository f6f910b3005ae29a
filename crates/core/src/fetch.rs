//! Source acquisition: git checkouts and prebuilt release downloads

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

use crate::archive::archive_file_name;
use crate::package::Package;
use crate::{CoreError, Result};

/// Clone the package source into `<work_dir>/<name>`.
///
/// Performs a shallow, single-ref clone (`--branch <ref> --depth 1`) by
/// invoking the external `git` tool. A non-zero exit is a hard failure for
/// this package only; there is no retry.
pub fn clone_source(pkg: &Package, work_dir: &Path) -> Result<PathBuf> {
    let dest = work_dir.join(&pkg.name);

    info!(name = %pkg.name, url = %pkg.source_url, rev = %pkg.git_ref, "cloning repository");

    let output = Command::new("git")
        .arg("clone")
        .arg("--branch")
        .arg(&pkg.git_ref)
        .arg("--depth")
        .arg("1")
        .arg(&pkg.source_url)
        .arg(&dest)
        .output()
        .map_err(|e| CoreError::Spawn {
            program: "git".to_string(),
            source: e,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(CoreError::Clone {
            url: pkg.source_url.clone(),
            stderr,
        });
    }

    debug!(path = %dest.display(), "repository cloned");
    Ok(dest)
}

/// Construct the download URL for a release package.
///
/// `<source_url minus trailing .git>/releases/download/<ref>/<name>-<version>-linux64.tgz`
pub fn release_url(pkg: &Package) -> String {
    let base = pkg.source_url.trim_end_matches('/');
    let base = base.strip_suffix(".git").unwrap_or(base);
    format!(
        "{}/releases/download/{}/{}-{}-linux64.tgz",
        base, pkg.git_ref, pkg.name, pkg.version
    )
}

/// Download a prebuilt release asset directly into the output directory.
///
/// The asset lands under its final Slackware-convention file name; no
/// build, staging, or re-archival happens for release packages.
pub fn download_release(pkg: &Package, output_dir: &Path, arch: &str) -> Result<PathBuf> {
    let url = release_url(pkg);
    let dest = output_dir.join(archive_file_name(pkg, arch));

    info!(name = %pkg.name, url = %url, "downloading release asset");

    // Blocking client; redirects are followed by default.
    let response = reqwest::blocking::get(&url)?;
    if !response.status().is_success() {
        return Err(CoreError::Download {
            url,
            status: response.status().as_u16(),
        });
    }
    let bytes = response.bytes()?;

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(&dest)?;
    file.write_all(&bytes)?;

    info!(path = %dest.display(), "release downloaded");
    Ok(dest)
}
