//! Configuration and focus history storage
//!
//! - Config: ~/.config/siper/config.json
//! - Focus history: ~/.config/siper/focus_history.jsonl
//!
//! Reads happen once at startup on the caller's thread. Writes are queued
//! to a single writer thread and never block the caller; queue order is
//! write order. `flush` waits until everything queued so far is on disk.

use std::fs;
use std::io::{BufRead, BufReader, Write as _};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use siper_core::{Config, Paths};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::error::{BlockingError, Result};
use crate::session::FocusHistoryEntry;

enum Write {
    Config(Config),
    History(FocusHistoryEntry),
    /// Replies with the first write error since the previous flush
    Flush(oneshot::Sender<Option<String>>),
}

/// Serialization boundary for persisted state
///
/// Holds no live state of its own: it loads snapshots and writes the
/// snapshots it is given.
pub struct ConfigStore {
    config_file: PathBuf,
    history_file: PathBuf,
    queue: Option<mpsc::UnboundedSender<Write>>,
    writer: Option<JoinHandle<()>>,
}

impl ConfigStore {
    /// Create the config directory and start the writer thread
    pub fn open(paths: &Paths) -> Result<Self> {
        fs::create_dir_all(&paths.config).map_err(|e| {
            BlockingError::io(
                format!("Failed to create config directory {}", paths.config.display()),
                e,
            )
        })?;

        let config_file = paths.config_file();
        let history_file = paths.history_file();
        let (queue, rx) = mpsc::unbounded_channel();

        let writer = {
            let config_file = config_file.clone();
            let history_file = history_file.clone();
            std::thread::Builder::new()
                .name("siper-writer".to_string())
                .spawn(move || write_loop(rx, config_file, history_file))
                .map_err(|e| BlockingError::io("Failed to start writer thread", e))?
        };

        Ok(Self {
            config_file,
            history_file,
            queue: Some(queue),
            writer: Some(writer),
        })
    }

    /// Load the persisted config, defaults if absent
    ///
    /// An unreadable or corrupt file is moved aside to `config.json.corrupt`
    /// and defaults are used instead. The activation flag is then recovered
    /// from the hosts file by the next sync.
    pub fn load(&self) -> Config {
        match Config::load(&self.config_file) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    path = %self.config_file.display(),
                    error = %format!("{:#}", e),
                    "config unusable, starting from defaults"
                );
                self.set_aside();
                Config::default()
            }
        }
    }

    fn set_aside(&self) {
        let aside = self.config_file.with_extension("json.corrupt");
        match fs::rename(&self.config_file, &aside) {
            Ok(()) => warn!(path = %aside.display(), "kept unusable config"),
            Err(e) => warn!(error = %e, "could not move unusable config aside"),
        }
    }

    /// Load every recorded focus session, oldest first
    ///
    /// Unparseable lines are skipped with a warning.
    pub fn load_history(&self) -> Result<Vec<FocusHistoryEntry>> {
        let path = &self.history_file;
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(path)
            .map_err(|e| BlockingError::io(format!("Failed to open {}", path.display()), e))?;

        let mut entries = Vec::new();
        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| {
                BlockingError::io(format!("Failed to read line {} of focus history", line_num + 1), e)
            })?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<FocusHistoryEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(line = line_num + 1, error = %e, "skipping corrupt focus history entry"),
            }
        }

        entries.sort_by_key(|e| e.start);
        Ok(entries)
    }

    /// Queue a config snapshot for writing
    pub fn save(&self, config: Config) {
        self.enqueue(Write::Config(config));
    }

    /// Queue a focus history entry for appending
    pub fn append_history(&self, entry: FocusHistoryEntry) {
        self.enqueue(Write::History(entry));
    }

    /// Wait until every write queued so far has completed
    pub async fn flush(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.enqueue(Write::Flush(tx));
        match rx.await {
            Ok(None) => Ok(()),
            Ok(Some(err)) => Err(BlockingError::Io(err)),
            Err(_) => Err(BlockingError::Io("config writer has stopped".to_string())),
        }
    }

    fn enqueue(&self, write: Write) {
        let sent = self.queue.as_ref().map(|q| q.send(write).is_ok());
        if sent != Some(true) {
            error!("config writer has stopped, dropping write");
        }
    }
}

impl Drop for ConfigStore {
    fn drop(&mut self) {
        // Closing the queue lets the writer drain and exit
        self.queue.take();
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                error!("config writer panicked");
            }
        }
    }
}

fn write_loop(mut rx: mpsc::UnboundedReceiver<Write>, config_file: PathBuf, history_file: PathBuf) {
    let mut first_error: Option<String> = None;

    while let Some(write) = rx.blocking_recv() {
        let result = match write {
            Write::Config(config) => {
                debug!(
                    path = %config_file.display(),
                    sites = config.blocked_sites.len(),
                    active = config.is_active,
                    "writing config"
                );
                config.save(&config_file).map_err(|e| format!("{:#}", e))
            }
            Write::History(entry) => append_line(&history_file, &entry),
            Write::Flush(reply) => {
                let _ = reply.send(first_error.take());
                continue;
            }
        };

        if let Err(e) = result {
            error!(error = %e, "persisting state failed");
            first_error.get_or_insert(e);
        }
    }
    debug!("config writer exiting");
}

fn append_line(path: &Path, entry: &FocusHistoryEntry) -> std::result::Result<(), String> {
    debug!(path = %path.display(), minutes = entry.duration_minutes, "appending focus history");
    let line = serde_json::to_string(entry).map_err(|e| e.to_string())?;
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;
    writeln!(file, "{}", line).map_err(|e| format!("Failed to write {}: {}", path.display(), e))
}
