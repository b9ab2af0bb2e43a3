//! Standard paths used by siper

use std::path::{Path, PathBuf};

/// System name-resolution override file
pub const DEFAULT_HOSTS_FILE: &str = "/etc/hosts";

/// Standard siper paths
#[derive(Debug, Clone)]
pub struct Paths {
    /// Config directory (~/.config/siper)
    pub config: PathBuf,
    /// Override file that receives the managed entries (/etc/hosts)
    pub hosts: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("siper");

        Self {
            config,
            hosts: PathBuf::from(DEFAULT_HOSTS_FILE),
        }
    }

    /// Relocate every path under `root`, hosts file included
    pub fn with_root(root: &Path) -> Self {
        Self {
            config: root.join("config"),
            hosts: root.join("hosts"),
        }
    }

    /// Persisted configuration (config.json)
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.json")
    }

    /// Append-only focus session log
    pub fn history_file(&self) -> PathBuf {
        self.config.join("focus_history.jsonl")
    }

    /// Copy of the override file taken before each privileged apply
    pub fn backup_file(&self) -> PathBuf {
        self.config.join("hosts.backup")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let paths = Paths::new();
        assert_eq!(paths.hosts, PathBuf::from("/etc/hosts"));
        assert!(paths.config.ends_with("siper"));
        assert_eq!(paths.config_file().file_name().unwrap(), "config.json");
    }

    #[test]
    fn test_with_root() {
        let root = Path::new("/tmp/siper-test");
        let paths = Paths::with_root(root);
        assert_eq!(paths.hosts, root.join("hosts"));
        assert_eq!(paths.backup_file(), root.join("config/hosts.backup"));
        assert_eq!(paths.history_file(), root.join("config/focus_history.jsonl"));
    }
}
