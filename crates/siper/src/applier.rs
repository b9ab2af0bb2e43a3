//! Privileged hosts file replacement
//!
//! The new content is computed unprivileged, staged in a private temp file,
//! and installed by a small generated shell script run through an
//! [`Elevator`]. The backup of the current content is written by this
//! process before elevating; the script only swaps the staged content in.
//!
//! Staged content and script are `NamedTempFile`s: they are removed when
//! dropped, so every exit path (success, refusal, failure, early `?`)
//! cleans up.

use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use siper_core::Paths;
use tempfile::{Builder, NamedTempFile};
use tracing::{debug, info, warn};

use crate::elevate::{Elevator, Outcome};
use crate::error::{BlockingError, Result};
use crate::hosts::{self, HostsFile};

/// Result of a successful install
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyReport {
    /// Sites now blocked by the file
    pub sites: usize,
    /// Managed lines dropped from the previous content
    pub removed_lines: usize,
}

pub struct PrivilegedApplier {
    hosts: HostsFile,
    backup: PathBuf,
    staging_dir: PathBuf,
    elevator: Box<dyn Elevator>,
}

impl PrivilegedApplier {
    pub fn new(paths: &Paths, elevator: Box<dyn Elevator>) -> Self {
        Self {
            hosts: HostsFile::new(&paths.hosts),
            backup: paths.backup_file(),
            staging_dir: std::env::temp_dir(),
            elevator,
        }
    }

    /// Stage temp files somewhere other than the system temp directory
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    pub fn hosts_path(&self) -> &Path {
        self.hosts.path()
    }

    /// Read the override file, elevating if needed
    pub fn read_hosts(&self) -> Result<String> {
        self.hosts.read(self.elevator.as_ref())
    }

    /// Install managed entries for exactly `sites`
    pub fn apply(&self, sites: &[String]) -> Result<ApplyReport> {
        info!(sites = sites.len(), hosts = %self.hosts.path().display(), "applying blocking");

        let current = self.read_hosts()?;
        let removed_lines = current.lines().filter(|l| l.contains(hosts::MARKER)).count();
        let next = hosts::rewrite(&current, sites);

        self.write_backup(&current)?;

        let staged = self.stage("siper-hosts-", "", &next)?;
        let script = install_script(self.hosts.path(), staged.path());
        let script = self.stage("siper-apply-", ".sh", &script)?;

        self.run_script(script.path())?;

        cleanup(staged);
        cleanup(script);

        info!(sites = sites.len(), removed_lines, "blocking applied");
        Ok(ApplyReport {
            sites: sites.len(),
            removed_lines,
        })
    }

    /// Remove every managed entry, keeping the rest of the file
    pub fn restore(&self) -> Result<ApplyReport> {
        self.apply(&[])
    }

    fn stage(&self, prefix: &str, suffix: &str, content: &str) -> Result<NamedTempFile> {
        stage_in(&self.staging_dir, prefix, suffix, content)
    }

    /// Save the pre-modification content as the backup
    ///
    /// Written unprivileged and renamed into place: the backup belongs to
    /// the invoking user, and a symlink at the backup path is replaced,
    /// never followed.
    fn write_backup(&self, content: &str) -> Result<()> {
        let dir = self.backup.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)
            .map_err(|e| BlockingError::io(format!("Failed to create {}", dir.display()), e))?;

        let file = stage_in(dir, ".hosts.backup-", "", content)?;
        file.persist(&self.backup).map_err(|e| {
            BlockingError::io(format!("Failed to write {}", self.backup.display()), e.error)
        })?;
        debug!(path = %self.backup.display(), bytes = content.len(), "hosts backup written");
        Ok(())
    }

    fn run_script(&self, script: &Path) -> Result<()> {
        let name = self.elevator.name();
        info!(elevator = name, script = %script.display(), "requesting elevation");

        let output = self
            .elevator
            .run(OsStr::new("/bin/sh"), &[script.as_os_str()])
            .map_err(|e| BlockingError::io(format!("Failed to start {}", name), e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(
            elevator = name,
            code = ?output.status.code(),
            stdout = %stdout.trim(),
            stderr = %stderr.trim(),
            "elevated script finished"
        );

        match self.elevator.classify(&output.status) {
            Outcome::Success => Ok(()),
            Outcome::Denied => {
                warn!(elevator = name, "elevation declined");
                Err(BlockingError::PermissionDenied(format!(
                    "{} did not authorize the change",
                    name
                )))
            }
            Outcome::Failed(code) => {
                warn!(elevator = name, ?code, "elevated script failed");
                Err(BlockingError::ApplyFailed {
                    code,
                    diagnostic: stderr.trim().to_string(),
                })
            }
        }
    }
}

/// Write `content` to a fresh private temp file in `dir`
fn stage_in(dir: &Path, prefix: &str, suffix: &str, content: &str) -> Result<NamedTempFile> {
    let mut file = Builder::new()
        .prefix(prefix)
        .suffix(suffix)
        .tempfile_in(dir)
        .map_err(|e| {
            BlockingError::io(format!("Failed to create temp file in {}", dir.display()), e)
        })?;
    file.write_all(content.as_bytes())
        .and_then(|_| file.flush())
        .map_err(|e| BlockingError::io(format!("Failed to write {}", file.path().display()), e))?;
    debug!(path = %file.path().display(), bytes = content.len(), "staged temp file");
    Ok(file)
}

/// Remove a staged file now, logging instead of failing
fn cleanup(file: NamedTempFile) {
    let path = file.path().to_path_buf();
    match file.close() {
        Ok(()) => debug!(path = %path.display(), "removed temp file"),
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove temp file"),
    }
}

/// Quote a path for a POSIX shell
fn quote(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', r"'\''"))
}

/// Shell script run with elevated rights
///
/// Writes into a sibling of the hosts file created with the original's
/// mode and owner, then renames it over the original. Where the rename is
/// impossible (bind-mounted hosts files) the content is written in place.
/// The steps run in a subshell and any failure exits 1, so the script never
/// reports the elevation helper's own exit codes.
fn install_script(hosts: &Path, staged: &Path) -> String {
    let next = PathBuf::from(format!("{}.siper-new", hosts.display()));
    let (hosts, staged, next) = (quote(hosts), quote(staged), quote(&next));
    format!(
        r#"#!/bin/sh
(
set -eu
echo "siper: installing new {hosts}"
cp -p -- {hosts} {next}
cat -- {staged} > {next}
mv -f -- {next} {hosts} || {{ cat -- {staged} > {hosts}; rm -f -- {next}; }}
)
status=$?
if [ "$status" -ne 0 ]; then
    rm -f -- {next}
    echo "siper: install failed with status $status" >&2
    exit 1
fi
echo "siper: done"
"#
    )
}
