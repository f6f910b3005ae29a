//! Build strategies: turning a checked-out source tree into staged artifacts
//!
//! A strategy installs binaries into the staging layout the archiver
//! expects: `usr/bin/<binary>` (mode 0755) and `usr/doc/<name>-<version>/`
//! for whichever of the conventional doc files the source tree carries.

use std::fs;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info, warn};

use crate::package::Package;
use crate::{CoreError, Result};

/// Doc files copied from the source tree root when present.
const DOC_FILES: &[&str] = &["README.md", "LICENSE", "CHANGELOG.md"];

/// The closed set of build strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStrategy {
    /// Runs the package's opaque shell command and installs `binary_path`.
    GenericCommand,
    /// Superseded Cargo-specific builder, still claiming Rust source trees
    /// that carry no explicit build command.
    CargoLegacy,
}

impl BuildStrategy {
    /// Select the strategy that claims this package, if any.
    ///
    /// Pure predicate over package fields and the source tree; candidates
    /// are scanned in declaration order and the first claim wins. `None`
    /// means the package fails deterministically without spawning anything.
    pub fn select(pkg: &Package, source_tree: &Path) -> Option<Self> {
        if pkg.build_command.as_deref().is_some_and(|c| !c.is_empty()) {
            return Some(BuildStrategy::GenericCommand);
        }
        if source_tree.join("Cargo.toml").exists() {
            return Some(BuildStrategy::CargoLegacy);
        }
        None
    }

    /// Build the package and install its artifacts into `staging_dir`.
    pub fn build(self, pkg: &Package, source_tree: &Path, staging_dir: &Path) -> Result<()> {
        match self {
            BuildStrategy::GenericCommand => build_generic(pkg, source_tree, staging_dir),
            BuildStrategy::CargoLegacy => build_cargo(pkg, source_tree, staging_dir),
        }
    }
}

/// Run the package's shell command, then install the single binary it is
/// required to have produced at `binary_path`.
fn build_generic(pkg: &Package, source_tree: &Path, staging_dir: &Path) -> Result<()> {
    let Some(command) = pkg.build_command.as_deref().filter(|c| !c.is_empty()) else {
        return Err(CoreError::NoBuilder(pkg.name.clone()));
    };
    run_shell(command, source_tree)?;

    let Some(binary_rel) = pkg.binary_path.as_deref() else {
        return Err(CoreError::NoBinaryPath(pkg.name.clone()));
    };

    // Existence is checked, not inferred from the command's exit code.
    let binary_src = source_tree.join(binary_rel);
    if !binary_src.is_file() {
        return Err(CoreError::BinaryNotFound(binary_src));
    }

    let bin_dir = staging_dir.join("usr").join("bin");
    fs::create_dir_all(&bin_dir)?;
    let dest = bin_dir.join(&pkg.name);
    fs::copy(&binary_src, &dest)?;
    set_executable(&dest)?;
    info!(name = %pkg.name, binary = %binary_rel, "installed binary");

    stage_docs(pkg, source_tree, staging_dir)
}

/// Release-mode cargo build with the package's legacy build options.
fn build_cargo(pkg: &Package, source_tree: &Path, staging_dir: &Path) -> Result<()> {
    let cfg = &pkg.build_config;

    let mut cmd = Command::new("cargo");
    cmd.arg("build").arg("--release").current_dir(source_tree);
    if !cfg.features.is_empty() {
        cmd.arg("--features").arg(cfg.features.join(","));
    }
    if let Some(target) = &cfg.target {
        cmd.arg("--target").arg(target);
    }
    cmd.args(&cfg.cargo_flags);
    for (key, value) in &cfg.env {
        cmd.env(key, value);
    }

    info!(name = %pkg.name, "building with cargo");
    let output = cmd.output().map_err(|e| CoreError::Spawn {
        program: "cargo".to_string(),
        source: e,
    })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            debug!(stderr = %stderr, "cargo stderr");
        }
        return Err(CoreError::CommandFailed {
            command: "cargo build --release".to_string(),
            code: output.status.code(),
        });
    }

    let release_dir = match &cfg.target {
        Some(target) => source_tree.join("target").join(target).join("release"),
        None => source_tree.join("target").join("release"),
    };

    let bin_dir = staging_dir.join("usr").join("bin");
    fs::create_dir_all(&bin_dir)?;

    let mut installed = 0usize;
    for binary in &pkg.binaries {
        let src = release_dir.join(binary);
        if src.is_file() {
            let dest = bin_dir.join(binary);
            fs::copy(&src, &dest)?;
            set_executable(&dest)?;
            info!(binary = %binary, "installed binary");
            installed += 1;
        } else {
            // A missing individual binary is a warning; the build fails
            // only when none of the requested binaries exists.
            warn!(binary = %binary, dir = %release_dir.display(), "binary not found");
        }
    }
    if installed == 0 {
        return Err(CoreError::NoBinaries(release_dir));
    }

    stage_docs(pkg, source_tree, staging_dir)
}

/// Run a shell line with the source tree as working directory and the
/// parent environment unmodified.
fn run_shell(command: &str, cwd: &Path) -> Result<()> {
    info!(cmd = %command, "running build command");

    let output = Command::new("/bin/sh")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .output()
        .map_err(|e| CoreError::Spawn {
            program: "/bin/sh".to_string(),
            source: e,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            debug!(stderr = %stderr, "build command stderr");
        }
        return Err(CoreError::CommandFailed {
            command: command.to_string(),
            code: output.status.code(),
        });
    }
    Ok(())
}

/// Copy conventional doc files into `usr/doc/<name>-<version>/`.
/// Missing docs are silently skipped.
fn stage_docs(pkg: &Package, source_tree: &Path, staging_dir: &Path) -> Result<()> {
    let doc_dir = staging_dir.join("usr").join("doc").join(pkg.doc_dir_name());
    fs::create_dir_all(&doc_dir)?;

    for doc in DOC_FILES {
        let src = source_tree.join(doc);
        if src.is_file() {
            fs::copy(&src, doc_dir.join(doc))?;
            debug!(doc, "staged documentation file");
        }
    }
    Ok(())
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}
