//! Override file access
//!
//! Reads the hosts file and computes its rewritten content. Lines carrying
//! [`MARKER`] anywhere are owned by siper; everything else is preserved
//! byte-for-byte and in order.
//!
//! ```text
//! 127.0.0.1 localhost
//! 127.0.0.1 example.com # siper
//! 127.0.0.1 www.example.com # siper
//! ```

use std::ffi::OsStr;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::elevate::{Elevator, Outcome};
use crate::error::{BlockingError, Result};

/// Sole discriminator of managed lines
pub const MARKER: &str = "# siper";

/// Address blocked domains resolve to
pub const LOOPBACK: &str = "127.0.0.1";

/// Format one managed line for `domain`
pub fn managed_line(domain: &str) -> String {
    format!("{} {} {}", LOOPBACK, domain, MARKER)
}

/// True if any line of `content` is managed
pub fn has_managed_entries(content: &str) -> bool {
    content.contains(MARKER)
}

/// Compute new override content for `sites`
///
/// Removes every managed line, keeps unmanaged lines verbatim (line
/// endings included), then appends the bare and `www.` entry for each site
/// in iteration order. Pure: no I/O. Applying it twice with the same sites
/// yields the same bytes as applying it once.
pub fn rewrite<I, S>(content: &str, sites: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::with_capacity(content.len());
    for line in content.split_inclusive('\n') {
        if !line.contains(MARKER) {
            out.push_str(line);
        }
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }

    for site in sites {
        let site = site.as_ref();
        out.push_str(&managed_line(site));
        out.push('\n');
        out.push_str(&managed_line(&format!("www.{}", site)));
        out.push('\n');
    }
    out
}

/// Handle on the override file
#[derive(Debug, Clone)]
pub struct HostsFile {
    path: PathBuf,
}

impl HostsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current content
    ///
    /// When the file is not readable by this user the read is retried
    /// through `elevator`, since unmanaged lines must be preserved.
    pub fn read(&self, elevator: &dyn Elevator) -> Result<String> {
        debug!(path = %self.path.display(), "reading hosts file");
        fs::read_to_string(&self.path).or_else(|e| self.recover(e, elevator))
    }

    /// Retry a failed direct read through `elevator` if it was a permission error
    fn recover(&self, err: io::Error, elevator: &dyn Elevator) -> Result<String> {
        if err.kind() != ErrorKind::PermissionDenied {
            return Err(BlockingError::io(
                format!("Failed to read {}", self.path.display()),
                err,
            ));
        }
        warn!(
            path = %self.path.display(),
            elevator = elevator.name(),
            "hosts file not readable, retrying with elevation"
        );
        self.read_elevated(elevator)
    }

    fn read_elevated(&self, elevator: &dyn Elevator) -> Result<String> {
        let output = elevator
            .run(OsStr::new("cat"), &[self.path.as_os_str()])
            .map_err(|e| BlockingError::io(format!("Failed to start {}", elevator.name()), e))?;

        match elevator.classify(&output.status) {
            Outcome::Success => String::from_utf8(output.stdout).map_err(|_| {
                BlockingError::Io(format!("{} is not valid UTF-8", self.path.display()))
            }),
            Outcome::Denied => Err(BlockingError::PermissionDenied(format!(
                "reading {} was not authorized",
                self.path.display()
            ))),
            Outcome::Failed(code) => Err(BlockingError::Io(format!(
                "elevated read of {} failed (exit code {:?}): {}",
                self.path.display(),
                code,
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
        }
    }
}
