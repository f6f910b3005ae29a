//! Slackware package creation: slack-desc metadata and .tgz archives
//!
//! The slack-desc layout is an external, bit-exact contract consumed by a
//! legacy installer; do not reformat the header or ruler literals.

use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::package::Package;
use crate::Result;

/// Column budget for the wrapped description text on each line.
const DESC_WIDTH: usize = 60;

/// A slack-desc carries exactly this many description lines.
const DESC_LINES: usize = 11;

const HEADER: &[&str] = &[
    "# HOW TO EDIT THIS FILE:",
    "# The \"handy ruler\" below makes it easier to edit a package description.",
    "# Line up the first '|' above the ':' following the base package name, and",
    "# the '|' on the right side marks the last column you can put a character in.",
    "# You must make exactly 11 lines for the formatting to be correct.  It's also",
    "# customary to leave one space after the ':'.",
];

const RULER: &str =
    "|-----handy-ruler------------------------------------------------------|";

/// Write `install/slack-desc` into the staging tree.
///
/// The ruler's first `|` is left-padded with `len(name) - 1` spaces so it
/// lines up one column past the `:` after the package name. Description
/// lines beyond the fixed count are silently dropped; unused lines are
/// `<name>:` with no trailing content.
pub fn create_metadata(pkg: &Package, staging_dir: &Path) -> Result<()> {
    let install_dir = staging_dir.join("install");
    fs::create_dir_all(&install_dir)?;

    let mut lines: Vec<String> = HEADER.iter().map(|l| (*l).to_string()).collect();
    lines.push(String::new());
    lines.push(format!("{}{}", " ".repeat(pkg.name.len() - 1), RULER));

    let wrapped = wrap_description(&pkg.description, DESC_WIDTH);
    for i in 0..DESC_LINES {
        match wrapped.get(i) {
            Some(text) => lines.push(format!("{}: {}", pkg.name, text)),
            None => lines.push(format!("{}:", pkg.name)),
        }
    }

    fs::write(install_dir.join("slack-desc"), lines.join("\n") + "\n")?;
    Ok(())
}

/// Greedy word wrap: keep appending words while the running line plus the
/// next word and its separating space fits the budget.
fn wrap_description(description: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in description.split_whitespace() {
        if current.len() + word.len() + 1 <= width {
            current.push_str(word);
            current.push(' ');
        } else {
            if !current.is_empty() {
                lines.push(current.trim_end().to_string());
            }
            current = format!("{} ", word);
        }
    }
    if !current.is_empty() {
        lines.push(current.trim_end().to_string());
    }
    lines
}

/// Archive file name, `<name>-<version>-<arch>-<build>.tgz`.
pub fn archive_file_name(pkg: &Package, arch: &str) -> String {
    format!(
        "{}-{}-{}-{}.tgz",
        pkg.name, pkg.version, arch, pkg.build_number
    )
}

/// Produce the `.tgz` archive for a staged install tree.
///
/// Entries are relative to `staging_dir` itself (`usr/bin/foo`,
/// `install/slack-desc`); the staging directory name never appears in the
/// archive. A failed write may leave a partial file behind; there is no
/// rollback.
pub fn create_archive(
    pkg: &Package,
    staging_dir: &Path,
    output_dir: &Path,
    arch: &str,
) -> Result<PathBuf> {
    let file_name = archive_file_name(pkg, arch);
    let output_file = output_dir.join(&file_name);

    info!(name = %pkg.name, archive = %file_name, "creating package archive");

    let file = File::create(&output_file)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all("", staging_dir)?;
    builder.into_inner()?.finish()?;

    info!(path = %output_file.display(), "package created");
    Ok(output_file)
}
