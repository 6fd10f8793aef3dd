use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use tracing::debug;

use crate::domain::impact::ChangeSet;
use crate::ports::DiffProvider;

/// [`DiffProvider`] backed by the `git` executable.
///
/// The changed paths are returned to the caller; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct GitDiffProvider {
    repo: PathBuf,
}

impl GitDiffProvider {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self { repo: repo.into() }
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }
}

impl DiffProvider for GitDiffProvider {
    fn changed_classes(&self, base: &str, head: &str) -> Result<ChangeSet> {
        // git -C <repo> diff --name-only <base> <head>
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo)
            .arg("diff")
            .arg("--name-only")
            .arg(base)
            .arg(head)
            .output()
            .context("Failed to execute 'git diff'. Is git installed?")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("git diff {}..{} failed: {}", base, head, stderr.trim());
        }

        let stdout = String::from_utf8(output.stdout).context("git diff output was not valid UTF-8")?;
        let changes = changes_from_listing(&stdout);
        debug!(
            "{} changed classes between {} and {} in {}",
            changes.len(),
            base,
            head,
            self.repo.display()
        );
        Ok(changes)
    }
}

/// One path per line; blank lines and non-source files are ignored.
pub fn changes_from_listing(listing: &str) -> ChangeSet {
    ChangeSet::from_paths(listing.lines().map(str::trim).filter(|l| !l.is_empty()))
}
