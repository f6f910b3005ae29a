//! The package pipeline: acquire, build, archive
//!
//! Strictly sequential: one package runs to completion before the next
//! begins, and one package's failure never affects the rest of the run.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::archive::{create_archive, create_metadata};
use crate::builder::BuildStrategy;
use crate::config::Config;
use crate::fetch::{clone_source, download_release};
use crate::package::Package;
use crate::{CoreError, Result};

/// Architecture label used in archive file names.
const DEFAULT_ARCH: &str = "x86_64";

/// Repository subdirectory the archives are published under (un-get layout).
const REPO_DIR: &str = "slackware64-current";

/// The pipeline stage a package failure occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Acquire,
    Build,
    Archive,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Acquire => "acquire",
            Stage::Build => "build",
            Stage::Archive => "archive",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal status of one package's pipeline.
#[derive(Debug, Clone)]
pub enum PackageStatus {
    /// Built from source and archived.
    Built { archive: PathBuf },
    /// Prebuilt release asset downloaded directly into the output tree.
    Downloaded { archive: PathBuf },
    /// Disabled in the configuration; nothing was run.
    Skipped,
    /// A stage failed; the reason is the rendered error.
    Failed { stage: Stage, reason: String },
}

impl PackageStatus {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            PackageStatus::Built { .. } | PackageStatus::Downloaded { .. }
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, PackageStatus::Failed { .. })
    }
}

/// Outcome for a single package.
#[derive(Debug, Clone)]
pub struct PackageReport {
    pub name: String,
    pub status: PackageStatus,
}

impl PackageReport {
    /// Human-readable description of the outcome.
    pub fn description(&self) -> String {
        match &self.status {
            PackageStatus::Built { archive } => {
                format!("built {}", file_name(archive))
            }
            PackageStatus::Downloaded { archive } => {
                format!("downloaded {}", file_name(archive))
            }
            PackageStatus::Skipped => "disabled, skipping".to_string(),
            PackageStatus::Failed { stage, reason } => {
                format!("failed during {}: {}", stage, reason)
            }
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Aggregated outcome of a run, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub reports: Vec<PackageReport>,
}

impl RunReport {
    pub fn succeeded_count(&self) -> usize {
        self.reports.iter().filter(|r| r.status.is_success()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.status, PackageStatus::Skipped))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.reports.iter().filter(|r| r.status.is_failure()).count()
    }

    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }
}

/// Drives the pipeline across the configured packages.
pub struct Orchestrator {
    packages: Vec<Package>,
    output_root: PathBuf,
    temp_root: PathBuf,
    arch: String,
}

impl Orchestrator {
    pub fn new(config: Config, output_root: PathBuf, temp_root: PathBuf) -> Self {
        Self {
            packages: config.packages,
            output_root,
            temp_root,
            arch: DEFAULT_ARCH.to_string(),
        }
    }

    /// The directory finished archives are published under.
    pub fn repo_root(&self) -> PathBuf {
        self.output_root.join(REPO_DIR)
    }

    /// Process every configured package in order.
    pub fn run_all(&self) -> RunReport {
        let mut report = RunReport::default();
        for pkg in &self.packages {
            report.reports.push(self.process(pkg));
        }
        report
    }

    /// Process exactly one package by name.
    pub fn run_one(&self, name: &str) -> Result<PackageReport> {
        let pkg = self
            .packages
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| CoreError::PackageNotFound(name.to_string()))?;
        Ok(self.process(pkg))
    }

    fn process(&self, pkg: &Package) -> PackageReport {
        if !pkg.enabled {
            info!(name = %pkg.name, "package disabled, skipping");
            return PackageReport {
                name: pkg.name.clone(),
                status: PackageStatus::Skipped,
            };
        }

        let temp_dir = self.temp_root.join(format!("{}-build", pkg.name));
        let status = match self.run_stages(pkg, &temp_dir) {
            Ok(status) => status,
            Err((stage, err)) => {
                warn!(name = %pkg.name, stage = %stage, error = %err, "package failed");
                PackageStatus::Failed {
                    stage,
                    reason: err.to_string(),
                }
            }
        };

        // Best-effort cleanup; removal errors are ignored.
        if temp_dir.exists() {
            debug!(path = %temp_dir.display(), "removing temporary directory");
            let _ = fs::remove_dir_all(&temp_dir);
        }

        PackageReport {
            name: pkg.name.clone(),
            status,
        }
    }

    fn run_stages(
        &self,
        pkg: &Package,
        temp_dir: &Path,
    ) -> std::result::Result<PackageStatus, (Stage, CoreError)> {
        let output_dir = self.repo_root().join(&pkg.name);
        fs::create_dir_all(&output_dir).map_err(|e| (Stage::Acquire, e.into()))?;

        // Release packages skip clone, build, and staging entirely: the
        // asset is already in final form.
        if pkg.is_release {
            let archive = download_release(pkg, &output_dir, &self.arch)
                .map_err(|e| (Stage::Acquire, e))?;
            return Ok(PackageStatus::Downloaded { archive });
        }

        fs::create_dir_all(temp_dir).map_err(|e| (Stage::Acquire, e.into()))?;
        let source_tree = clone_source(pkg, temp_dir).map_err(|e| (Stage::Acquire, e))?;

        let strategy = BuildStrategy::select(pkg, &source_tree)
            .ok_or_else(|| (Stage::Build, CoreError::NoBuilder(pkg.name.clone())))?;

        let staging_dir = temp_dir.join("install_staging");
        fs::create_dir_all(&staging_dir).map_err(|e| (Stage::Build, e.into()))?;
        strategy
            .build(pkg, &source_tree, &staging_dir)
            .map_err(|e| (Stage::Build, e))?;

        create_metadata(pkg, &staging_dir).map_err(|e| (Stage::Archive, e))?;
        let archive = create_archive(pkg, &staging_dir, &output_dir, &self.arch)
            .map_err(|e| (Stage::Archive, e))?;

        Ok(PackageStatus::Built { archive })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::BuildConfig;
    use std::process::Command;
    use tempfile::TempDir;

    fn package(name: &str, source_url: &str) -> Package {
        Package {
            name: name.to_string(),
            source_url: source_url.to_string(),
            git_ref: "v1.0.0".to_string(),
            version: "1.0.0".to_string(),
            description: "A test package.".to_string(),
            build_number: 1,
            enabled: true,
            is_release: false,
            build_command: None,
            binary_path: None,
            binaries: vec![name.to_string()],
            build_config: BuildConfig::default(),
        }
    }

    fn orchestrator(packages: Vec<Package>, root: &Path) -> Orchestrator {
        Orchestrator {
            packages,
            output_root: root.join("build"),
            temp_root: root.join("tmp"),
            arch: DEFAULT_ARCH.to_string(),
        }
    }

    fn git(dir: &Path, args: &[&str]) {
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .expect("git not available");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    /// Create a local upstream repository tagged v1.0.0.
    fn init_upstream(dir: &Path) -> PathBuf {
        let repo = dir.join("upstream");
        fs::create_dir_all(&repo).unwrap();
        fs::write(repo.join("README.md"), "upstream readme\n").unwrap();
        fs::write(repo.join("hello.sh"), "#!/bin/sh\necho hello\n").unwrap();

        git(&repo, &["init", "--quiet"]);
        git(&repo, &["add", "."]);
        git(
            &repo,
            &[
                "-c",
                "user.email=forge@example.com",
                "-c",
                "user.name=forge",
                "commit",
                "--quiet",
                "-m",
                "initial import",
            ],
        );
        git(&repo, &["tag", "v1.0.0"]);
        repo
    }

    #[test]
    fn test_disabled_package_is_never_touched() {
        let root = TempDir::new().unwrap();
        let mut pkg = package("idle", "/nonexistent/never-read");
        pkg.enabled = false;

        let orch = orchestrator(vec![pkg], root.path());
        let report = orch.run_all();

        assert_eq!(report.skipped_count(), 1);
        assert!(report.is_success());
        // No temp or output state was created for it
        assert!(!root.path().join("tmp/idle-build").exists());
        assert!(!orch.repo_root().join("idle").exists());
    }

    #[test]
    fn test_run_one_unknown_package() {
        let root = TempDir::new().unwrap();
        let orch = orchestrator(vec![], root.path());
        let result = orch.run_one("ghost");
        assert!(matches!(result, Err(CoreError::PackageNotFound(_))));
    }

    #[test]
    #[cfg(unix)]
    fn test_end_to_end_build() {
        let root = TempDir::new().unwrap();
        let upstream = init_upstream(root.path());

        let mut pkg = package("hello", upstream.to_str().unwrap());
        pkg.build_command = Some("mkdir -p out && cp hello.sh out/hello".to_string());
        pkg.binary_path = Some("out/hello".to_string());

        let orch = orchestrator(vec![pkg], root.path());
        let report = orch.run_all();

        assert!(report.is_success(), "{:?}", report);
        let archive = orch
            .repo_root()
            .join("hello")
            .join("hello-1.0.0-x86_64-1.tgz");
        assert!(archive.is_file());
        // Temp working directory was cleaned up
        assert!(!root.path().join("tmp/hello-build").exists());
    }

    #[test]
    #[cfg(unix)]
    fn test_failing_build_does_not_stop_the_run() {
        let root = TempDir::new().unwrap();
        let upstream = init_upstream(root.path());

        let mut bad = package("bad", upstream.to_str().unwrap());
        bad.build_command = Some("exit 1".to_string());
        bad.binary_path = Some("out/bad".to_string());

        let mut good = package("good", upstream.to_str().unwrap());
        good.build_command = Some("mkdir -p out && cp hello.sh out/good".to_string());
        good.binary_path = Some("out/good".to_string());

        let orch = orchestrator(vec![bad, good], root.path());
        let report = orch.run_all();

        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.succeeded_count(), 1);
        assert!(matches!(
            report.reports[0].status,
            PackageStatus::Failed {
                stage: Stage::Build,
                ..
            }
        ));
        assert!(!orch.repo_root().join("bad").join("bad-1.0.0-x86_64-1.tgz").exists());
        assert!(orch.repo_root().join("good").join("good-1.0.0-x86_64-1.tgz").is_file());
    }

    #[test]
    #[cfg(unix)]
    fn test_missing_binary_fails_and_cleans_up() {
        let root = TempDir::new().unwrap();
        let upstream = init_upstream(root.path());

        // The command succeeds but never creates out/bin/foo
        let mut pkg = package("foo", upstream.to_str().unwrap());
        pkg.build_command = Some("echo build".to_string());
        pkg.binary_path = Some("out/bin/foo".to_string());

        let orch = orchestrator(vec![pkg], root.path());
        let report = orch.run_all();

        assert_eq!(report.failed_count(), 1);
        assert!(matches!(
            report.reports[0].status,
            PackageStatus::Failed {
                stage: Stage::Build,
                ..
            }
        ));
        assert!(!orch.repo_root().join("foo").join("foo-1.0.0-x86_64-1.tgz").exists());
        assert!(!root.path().join("tmp/foo-build").exists());
    }

    #[test]
    fn test_clone_failure_reported_as_acquire() {
        let root = TempDir::new().unwrap();
        let mut pkg = package("gone", "/nonexistent/repository");
        pkg.build_command = Some("make".to_string());
        pkg.binary_path = Some("out/gone".to_string());

        let orch = orchestrator(vec![pkg], root.path());
        let report = orch.run_all();

        assert!(matches!(
            report.reports[0].status,
            PackageStatus::Failed {
                stage: Stage::Acquire,
                ..
            }
        ));
        assert!(!root.path().join("tmp/gone-build").exists());
    }

    #[test]
    fn test_no_builder_claim_fails_deterministically() {
        let root = TempDir::new().unwrap();
        let upstream = init_upstream(root.path());

        // No build_command and no Cargo.toml in the tree
        let pkg = package("plain", upstream.to_str().unwrap());

        let orch = orchestrator(vec![pkg], root.path());
        let report = orch.run_all();

        assert!(matches!(
            &report.reports[0].status,
            PackageStatus::Failed { stage: Stage::Build, reason } if reason.contains("no build strategy")
        ));
    }

    #[test]
    fn test_release_package_never_clones_or_builds() {
        let root = TempDir::new().unwrap();
        let mut pkg = package("rel", "file:///nonexistent/repo.git");
        pkg.is_release = true;

        let orch = orchestrator(vec![pkg], root.path());
        let report = orch.run_all();

        // The download fails (unreachable scheme), but in the acquire
        // stage: no temp directory, no clone, no staging ever existed.
        assert!(matches!(
            report.reports[0].status,
            PackageStatus::Failed {
                stage: Stage::Acquire,
                ..
            }
        ));
        assert!(!root.path().join("tmp/rel-build").exists());
    }
}
