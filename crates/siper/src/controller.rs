//! Blocking controller
//!
//! The one object front-ends talk to. It owns the block-list, the
//! activation flag, the focus scheduler and the focus history; nothing else
//! mutates them. Privileged work runs on short-lived blocking workers that
//! receive an immutable snapshot of the site list and report back over a
//! single channel. The consumer applies those results in `next_event`.
//!
//! At most one privileged operation is in flight at a time. State only
//! changes after a worker confirms success; a refused or failed operation
//! leaves everything as it was.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use siper_core::{Config, Paths, ThemeMode};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::applier::{ApplyReport, PrivilegedApplier};
use crate::categories::Category;
use crate::elevate::Elevator;
use crate::error::{BlockingError, Result};
use crate::scheduler::{self, FocusScheduler};
use crate::session::{BlockingState, FocusHistoryEntry, FocusSession, SessionId};
use crate::site;
use crate::stats::FocusStats;
use crate::store::ConfigStore;
use crate::sync::{self as drift, Reconciliation};

const RESULT_CHANNEL_CAPACITY: usize = 16;

/// A privileged operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Enable,
    Disable,
    FocusStart,
    FocusEnd,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Enable => "enable",
            Operation::Disable => "disable",
            Operation::FocusStart => "focus start",
            Operation::FocusEnd => "focus end",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Messages from workers and timers to the consumer
pub(crate) enum WorkerResult {
    Applied {
        op: Operation,
        result: Result<ApplyReport>,
    },
    FocusExpired(SessionId),
}

/// Outcome of a privileged operation, for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Enabled { sites: usize },
    Disabled { cancelled_focus: bool },
    FocusStarted { minutes: u32, ends_at: DateTime<Utc> },
    FocusEnded { minutes: u32 },
    Failed { op: Operation, error: BlockingError },
}

/// Counts from adding a batch of sites
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkAddReport {
    pub source: String,
    pub added: usize,
    /// Already present or not a domain
    pub skipped: usize,
}

/// The privileged operation currently running
enum InFlight {
    Enable,
    /// Carries the focus session it cancelled, if any
    Disable { cancelled: Option<FocusSession> },
    FocusStart { minutes: u32 },
    FocusEnd { session: FocusSession },
}

impl InFlight {
    fn op(&self) -> Operation {
        match self {
            InFlight::Enable => Operation::Enable,
            InFlight::Disable { .. } => Operation::Disable,
            InFlight::FocusStart { .. } => Operation::FocusStart,
            InFlight::FocusEnd { .. } => Operation::FocusEnd,
        }
    }
}

pub struct BlockingController {
    sites: BTreeSet<String>,
    active: bool,
    theme: ThemeMode,
    language: String,
    history: Vec<FocusHistoryEntry>,
    store: ConfigStore,
    applier: Arc<PrivilegedApplier>,
    scheduler: FocusScheduler,
    in_flight: Option<InFlight>,
    deferred_expiry: Option<SessionId>,
    tx: mpsc::Sender<WorkerResult>,
    rx: mpsc::Receiver<WorkerResult>,
}

impl BlockingController {
    /// Build a controller from loaded state
    ///
    /// Site entries from the config are normalized; anything that does not
    /// normalize is dropped.
    pub fn new(
        config: Config,
        history: Vec<FocusHistoryEntry>,
        store: ConfigStore,
        applier: PrivilegedApplier,
    ) -> Self {
        let sites: BTreeSet<String> = config
            .blocked_sites
            .iter()
            .filter_map(|s| site::normalize(s))
            .collect();
        if sites.len() != config.blocked_sites.len() {
            debug!(
                loaded = config.blocked_sites.len(),
                kept = sites.len(),
                "normalized persisted site list"
            );
        }

        let (tx, rx) = mpsc::channel(RESULT_CHANNEL_CAPACITY);
        Self {
            sites,
            active: config.is_active,
            theme: config.theme_mode,
            language: config.language,
            history,
            store,
            applier: Arc::new(applier),
            scheduler: FocusScheduler::new(scheduler::MINUTE),
            in_flight: None,
            deferred_expiry: None,
            tx,
            rx,
        }
    }

    /// Load persisted state from `paths` and build a controller
    pub fn open(paths: &Paths, elevator: Box<dyn Elevator>) -> Result<Self> {
        let store = ConfigStore::open(paths)?;
        let config = store.load();
        let history = store.load_history()?;
        info!(
            sites = config.blocked_sites.len(),
            active = config.is_active,
            sessions = history.len(),
            "loaded configuration"
        );
        let applier = PrivilegedApplier::new(paths, elevator);
        Ok(Self::new(config, history, store, applier))
    }

    /// Scale the focus countdown: one session minute lasts `unit`
    pub fn with_focus_unit(mut self, unit: Duration) -> Self {
        self.scheduler = FocusScheduler::new(unit);
        self
    }

    // ---- Site list ----

    /// Add one site; returns the new total
    pub fn add_site(&mut self, raw: &str) -> Result<usize> {
        let site = site::parse(raw)?;
        if self.sites.contains(&site) {
            debug!(site = %site, "site already blocked");
            return Err(BlockingError::AlreadyBlocked(site));
        }
        info!(site = %site, "site added");
        self.sites.insert(site);
        self.persist();
        Ok(self.sites.len())
    }

    /// Remove a site if present; absent sites are not an error
    pub fn remove_site(&mut self, raw: &str) -> bool {
        let Some(site) = site::normalize(raw) else {
            return false;
        };
        let removed = self.sites.remove(&site);
        if removed {
            info!(site = %site, "site removed");
            self.persist();
        }
        removed
    }

    /// Empty the block-list; returns how many sites were removed
    pub fn clear_all(&mut self) -> usize {
        let removed = self.sites.len();
        self.sites.clear();
        info!(removed, "site list cleared");
        self.persist();
        removed
    }

    /// Add every site of `list` not already present
    ///
    /// A list that is entirely present is a zero-added report, not an error.
    pub fn bulk_add<I, S>(&mut self, source: &str, list: I) -> BulkAddReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = BulkAddReport {
            source: source.to_string(),
            added: 0,
            skipped: 0,
        };
        for raw in list {
            if let Some(site) = site::normalize(raw.as_ref()) {
                if self.sites.insert(site) {
                    report.added += 1;
                    continue;
                }
            }
            report.skipped += 1;
        }
        if report.added > 0 {
            self.persist();
        }
        info!(
            source,
            added = report.added,
            skipped = report.skipped,
            total = self.sites.len(),
            "bulk add"
        );
        report
    }

    pub fn add_category(&mut self, category: Category) -> BulkAddReport {
        self.bulk_add(category.as_str(), category.sites())
    }

    /// Set union with `list`; duplicates are skipped silently
    pub fn import_sites<I, S>(&mut self, list: I) -> BulkAddReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.bulk_add("import", list)
    }

    /// Import a bare JSON array of domain strings
    pub fn import_json(&mut self, json: &str) -> Result<BulkAddReport> {
        let list: Vec<String> = serde_json::from_str(json).map_err(|e| {
            BlockingError::InvalidInput(format!("expected a JSON array of domains: {}", e))
        })?;
        Ok(self.import_sites(list))
    }

    /// Snapshot of the block-list, sorted
    pub fn export_sites(&self) -> Vec<String> {
        self.sites.iter().cloned().collect()
    }

    pub fn export_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.export_sites())
            .map_err(|e| BlockingError::Io(format!("Failed to serialize site list: {}", e)))
    }

    pub fn sites(&self) -> impl Iterator<Item = &str> {
        self.sites.iter().map(String::as_str)
    }

    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    // ---- Privileged operations ----

    /// Start applying the current site list to the hosts file
    ///
    /// Also valid while active: re-applies the current list.
    pub fn enable(&mut self) -> Result<()> {
        self.ensure_idle_worker()?;
        self.ensure_sites()?;
        let sites = self.export_sites();
        self.dispatch(InFlight::Enable, sites);
        Ok(())
    }

    /// Start removing managed entries; cancels a running focus session
    pub fn disable(&mut self) -> Result<()> {
        self.ensure_idle_worker()?;
        let cancelled = self.scheduler.cancel();
        self.dispatch(InFlight::Disable { cancelled }, Vec::new());
        Ok(())
    }

    /// Start a timed block of `minutes`
    pub fn start_focus(&mut self, minutes: i64) -> Result<()> {
        let minutes = scheduler::validate_minutes(minutes)?;
        self.scheduler.ensure_idle()?;
        self.ensure_idle_worker()?;
        self.ensure_sites()?;
        let sites = self.export_sites();
        self.dispatch(InFlight::FocusStart { minutes }, sites);
        Ok(())
    }

    /// Wait for the next worker or timer result and apply it
    ///
    /// Returns `None` only if every sender is gone, which cannot happen
    /// while the controller is alive.
    pub async fn next_event(&mut self) -> Option<Event> {
        loop {
            let message = self.rx.recv().await?;
            if let Some(event) = self.handle(message) {
                return Some(event);
            }
        }
    }

    /// Wait for the privileged operation in flight, if any, and apply it
    pub async fn finish_pending(&mut self) -> Option<Event> {
        if self.busy().is_none() {
            return None;
        }
        self.next_event().await
    }

    /// Compare the hosts file against the activation flag and repair drift
    pub async fn sync(&mut self) -> Result<Reconciliation> {
        self.ensure_idle_worker()?;

        let applier = Arc::clone(&self.applier);
        let content = tokio::task::spawn_blocking(move || applier.read_hosts())
            .await
            .map_err(|e| BlockingError::Io(format!("hosts reader stopped: {}", e)))??;

        let reconciliation = drift::reconcile(&content, self.active);
        if reconciliation.drifted {
            warn!(
                persisted = self.active,
                actual = reconciliation.active,
                "hosts file drifted from saved state"
            );
            self.active = reconciliation.active;
            if !self.active {
                self.scheduler.cancel();
            }
            self.persist();
        } else {
            debug!(active = self.active, "hosts file in sync");
        }
        Ok(reconciliation)
    }

    // ---- State and preferences ----

    pub fn state(&self) -> BlockingState {
        BlockingState {
            active: self.active,
            focus_session: self.scheduler.session().cloned(),
        }
    }

    /// The privileged operation in flight, if any
    pub fn busy(&self) -> Option<Operation> {
        self.in_flight.as_ref().map(InFlight::op)
    }

    pub fn history(&self) -> &[FocusHistoryEntry] {
        &self.history
    }

    pub fn stats(&self) -> FocusStats {
        FocusStats::from_history(&self.history)
    }

    pub fn hosts_path(&self) -> &std::path::Path {
        self.applier.hosts_path()
    }

    pub fn theme(&self) -> ThemeMode {
        self.theme
    }

    pub fn set_theme(&mut self, theme: ThemeMode) {
        info!(from = %self.theme, to = %theme, "theme changed");
        self.theme = theme;
        self.persist();
    }

    /// Advance auto -> light -> dark -> auto
    pub fn cycle_theme(&mut self) -> ThemeMode {
        self.set_theme(self.theme.next());
        self.theme
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn set_language(&mut self, language: &str) -> Result<()> {
        let language = language.trim();
        if language.is_empty() {
            return Err(BlockingError::InvalidInput("empty language name".to_string()));
        }
        info!(from = %self.language, to = language, "language changed");
        self.language = language.to_string();
        self.persist();
        Ok(())
    }

    /// Wait until every queued write is on disk
    pub async fn flush(&self) -> Result<()> {
        self.store.flush().await
    }

    // ---- Internals ----

    fn ensure_idle_worker(&self) -> Result<()> {
        match self.busy() {
            Some(op) => {
                debug!(%op, "rejecting overlapping privileged operation");
                Err(BlockingError::OperationInProgress(op))
            }
            None => Ok(()),
        }
    }

    fn ensure_sites(&self) -> Result<()> {
        if self.sites.is_empty() {
            return Err(BlockingError::InvalidInput("no sites to block".to_string()));
        }
        Ok(())
    }

    fn snapshot(&self) -> Config {
        Config {
            blocked_sites: self.export_sites(),
            is_active: self.active,
            theme_mode: self.theme,
            language: self.language.clone(),
        }
    }

    /// Queue the current state for writing; returns once queued
    fn persist(&self) {
        self.store.save(self.snapshot());
    }

    fn dispatch(&mut self, job: InFlight, sites: Vec<String>) {
        let op = job.op();
        info!(%op, sites = sites.len(), "operation started");
        self.in_flight = Some(job);

        let applier = Arc::clone(&self.applier);
        let tx = self.tx.clone();
        tokio::task::spawn_blocking(move || {
            let result = if sites.is_empty() {
                applier.restore()
            } else {
                applier.apply(&sites)
            };
            if tx.blocking_send(WorkerResult::Applied { op, result }).is_err() {
                warn!(%op, "controller gone, dropping operation result");
            }
        });
    }

    fn handle(&mut self, message: WorkerResult) -> Option<Event> {
        match message {
            WorkerResult::FocusExpired(id) => {
                self.on_expired(id);
                None
            }
            WorkerResult::Applied { op, result } => {
                let Some(job) = self.in_flight.take() else {
                    warn!(%op, "result without an operation in flight");
                    return None;
                };
                let event = self.complete(job, result);
                if let Some(id) = self.deferred_expiry.take() {
                    self.on_expired(id);
                }
                Some(event)
            }
        }
    }

    fn on_expired(&mut self, id: SessionId) {
        if let Some(op) = self.busy() {
            debug!(id, %op, "deferring focus expiry until operation completes");
            self.deferred_expiry = Some(id);
            return;
        }
        if let Some(session) = self.scheduler.fire(id) {
            info!(id, minutes = session.duration_minutes, "focus session elapsed");
            self.dispatch(InFlight::FocusEnd { session }, Vec::new());
        }
    }

    fn complete(&mut self, job: InFlight, result: Result<ApplyReport>) -> Event {
        let op = job.op();
        let report = match result {
            Ok(report) => report,
            Err(error) => return self.fail(job, error),
        };

        let event = match job {
            InFlight::Enable => {
                self.active = true;
                Event::Enabled { sites: report.sites }
            }
            InFlight::FocusStart { minutes } => {
                self.active = true;
                let tx = self.tx.clone();
                match self.scheduler.arm(minutes, tx) {
                    Ok(session) => {
                        let entry = FocusHistoryEntry::from_session(session);
                        let ends_at = session.ends_at();
                        self.history.push(entry.clone());
                        self.store.append_history(entry);
                        Event::FocusStarted { minutes, ends_at }
                    }
                    Err(error) => {
                        // Blocking is applied; only the countdown is missing
                        self.persist();
                        error!(%op, %error, "focus timer could not be armed");
                        return Event::Failed { op, error };
                    }
                }
            }
            InFlight::Disable { cancelled } => {
                self.active = false;
                Event::Disabled {
                    cancelled_focus: cancelled.is_some(),
                }
            }
            InFlight::FocusEnd { session } => {
                self.active = false;
                Event::FocusEnded {
                    minutes: session.duration_minutes,
                }
            }
        };

        self.persist();
        info!(%op, sites = report.sites, removed = report.removed_lines, "operation finished");
        event
    }

    fn fail(&mut self, job: InFlight, error: BlockingError) -> Event {
        let op = job.op();
        error!(%op, %error, "operation failed");
        match job {
            InFlight::Disable {
                cancelled: Some(session),
            } => {
                // Still blocked: the countdown resumes toward its old deadline
                self.scheduler.rearm(session, self.tx.clone());
            }
            InFlight::FocusEnd { session } => {
                warn!(
                    id = session.id,
                    "focus session ended but blocking could not be removed; disable manually"
                );
            }
            _ => {}
        }
        Event::Failed { op, error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elevate::fake::{Refuse, Toggle};
    use crate::elevate::Direct;
    use crate::hosts::MARKER;
    use std::fs;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    const TICK: Duration = Duration::from_millis(5);

    struct Fixture {
        dir: TempDir,
        paths: Paths,
    }

    impl Fixture {
        fn new(hosts: &str) -> Self {
            let dir = TempDir::new().unwrap();
            let paths = Paths::with_root(dir.path());
            fs::write(&paths.hosts, hosts).unwrap();
            fs::create_dir_all(dir.path().join("staging")).unwrap();
            Self { dir, paths }
        }

        fn controller(&self, elevator: Box<dyn Elevator>) -> BlockingController {
            let store = ConfigStore::open(&self.paths).unwrap();
            let config = store.load();
            let history = store.load_history().unwrap();
            let applier = PrivilegedApplier::new(&self.paths, elevator)
                .with_staging_dir(self.dir.path().join("staging"));
            BlockingController::new(config, history, store, applier).with_focus_unit(TICK)
        }

        fn hosts(&self) -> String {
            fs::read_to_string(&self.paths.hosts).unwrap()
        }

        fn saved(&self) -> Config {
            Config::load(&self.paths.config_file()).unwrap()
        }
    }

    async fn event(controller: &mut BlockingController) -> Event {
        tokio::time::timeout(Duration::from_secs(10), controller.next_event())
            .await
            .expect("timed out waiting for event")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn test_add_site_normalizes() {
        let fx = Fixture::new("");
        let mut c = fx.controller(Box::new(Direct));

        assert_eq!(c.add_site("https://www.Example.com/page").unwrap(), 1);
        assert_eq!(c.export_sites(), vec!["example.com".to_string()]);
    }

    #[tokio::test]
    async fn test_duplicate_site_is_already_blocked() {
        let fx = Fixture::new("");
        let mut c = fx.controller(Box::new(Direct));

        c.add_site("example.com").unwrap();
        assert_eq!(
            c.add_site("example.com"),
            Err(BlockingError::AlreadyBlocked("example.com".to_string()))
        );
        assert_eq!(c.site_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_site_rejected_without_mutation() {
        let fx = Fixture::new("");
        let mut c = fx.controller(Box::new(Direct));

        assert!(matches!(c.add_site("https://"), Err(BlockingError::InvalidInput(_))));
        assert_eq!(c.site_count(), 0);
        c.flush().await.unwrap();
        assert!(!fx.paths.config_file().exists());
    }

    #[tokio::test]
    async fn test_persisted_set_matches_memory() {
        let fx = Fixture::new("");
        let mut c = fx.controller(Box::new(Direct));

        c.add_site("a.com").unwrap();
        c.add_site("b.com").unwrap();
        c.add_site("c.com").unwrap();
        assert!(c.remove_site("www.b.com"));
        assert!(!c.remove_site("never-added.com"));
        c.add_site("d.com").unwrap();
        c.flush().await.unwrap();

        assert_eq!(fx.saved().blocked_sites, c.export_sites());
        assert_eq!(c.export_sites(), vec!["a.com", "c.com", "d.com"]);

        c.clear_all();
        c.flush().await.unwrap();
        assert!(fx.saved().blocked_sites.is_empty());
    }

    #[tokio::test]
    async fn test_enable_rewrites_hosts() {
        let fx = Fixture::new("127.0.0.1 localhost\n");
        let mut c = fx.controller(Box::new(Direct));
        c.add_site("example.com").unwrap();

        c.enable().unwrap();
        assert_eq!(c.busy(), Some(Operation::Enable));
        assert_eq!(event(&mut c).await, Event::Enabled { sites: 1 });

        assert_eq!(
            fx.hosts(),
            "127.0.0.1 localhost\n\
             127.0.0.1 example.com # siper\n\
             127.0.0.1 www.example.com # siper\n"
        );
        assert!(c.state().active);
        assert_eq!(c.busy(), None);
        c.flush().await.unwrap();
        assert!(fx.saved().is_active);
    }

    #[tokio::test]
    async fn test_enable_with_empty_list_rejected() {
        let fx = Fixture::new("127.0.0.1 localhost\n");
        let mut c = fx.controller(Box::new(Direct));

        assert!(matches!(c.enable(), Err(BlockingError::InvalidInput(_))));
        assert_eq!(c.busy(), None);
    }

    #[tokio::test]
    async fn test_overlapping_operations_rejected() {
        let fx = Fixture::new("127.0.0.1 localhost\n");
        let mut c = fx.controller(Box::new(Direct));
        c.add_site("example.com").unwrap();

        c.enable().unwrap();
        assert_eq!(
            c.disable(),
            Err(BlockingError::OperationInProgress(Operation::Enable))
        );
        assert_eq!(
            c.sync().await,
            Err(BlockingError::OperationInProgress(Operation::Enable))
        );
        assert_eq!(event(&mut c).await, Event::Enabled { sites: 1 });
        c.disable().unwrap();
        assert_eq!(event(&mut c).await, Event::Disabled { cancelled_focus: false });
    }

    #[tokio::test]
    async fn test_declined_enable_leaves_state_unchanged() {
        let fx = Fixture::new("127.0.0.1 localhost\n");
        let mut c = fx.controller(Box::new(Refuse::declined()));
        c.add_site("example.com").unwrap();

        c.enable().unwrap();
        match event(&mut c).await {
            Event::Failed { op, error } => {
                assert_eq!(op, Operation::Enable);
                assert!(matches!(error, BlockingError::PermissionDenied(_)));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(!c.state().active);
        assert_eq!(fx.hosts(), "127.0.0.1 localhost\n");
    }

    #[tokio::test]
    async fn test_non_positive_focus_rejected() {
        let fx = Fixture::new("127.0.0.1 localhost\n");
        let mut c = fx.controller(Box::new(Direct));
        c.add_site("example.com").unwrap();

        for minutes in [0, -1, -25] {
            assert!(matches!(
                c.start_focus(minutes),
                Err(BlockingError::InvalidInput(_))
            ));
        }
        assert_eq!(c.busy(), None);
        assert_eq!(c.state(), BlockingState::default());
        assert!(c.history().is_empty());
    }

    #[tokio::test]
    async fn test_focus_then_manual_disable() {
        let fx = Fixture::new("127.0.0.1 localhost\n");
        // Long unit so the countdown cannot fire during the test
        let mut c = fx.controller(Box::new(Direct)).with_focus_unit(scheduler::MINUTE);
        c.add_site("example.com").unwrap();

        c.start_focus(25).unwrap();
        assert!(matches!(
            event(&mut c).await,
            Event::FocusStarted { minutes: 25, .. }
        ));
        let state = c.state();
        assert!(state.active);
        assert_eq!(state.focus_session.as_ref().unwrap().duration_minutes, 25);
        assert!(fx.hosts().contains(MARKER));

        assert_eq!(c.start_focus(10), Err(BlockingError::SessionAlreadyActive));

        c.disable().unwrap();
        assert_eq!(event(&mut c).await, Event::Disabled { cancelled_focus: true });

        assert_eq!(c.state(), BlockingState::default());
        assert_eq!(fx.hosts(), "127.0.0.1 localhost\n");
        assert_eq!(c.history().len(), 1);
        assert_eq!(c.history()[0].duration_minutes, 25);

        c.flush().await.unwrap();
        let store = ConfigStore::open(&fx.paths).unwrap();
        assert_eq!(store.load_history().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_focus_expires_naturally() {
        let fx = Fixture::new("127.0.0.1 localhost\n");
        let mut c = fx.controller(Box::new(Direct));
        c.add_site("example.com").unwrap();

        c.start_focus(2).unwrap();
        assert!(matches!(event(&mut c).await, Event::FocusStarted { minutes: 2, .. }));
        assert_eq!(event(&mut c).await, Event::FocusEnded { minutes: 2 });

        assert_eq!(c.state(), BlockingState::default());
        assert!(!fx.hosts().contains(MARKER));
        c.flush().await.unwrap();
        assert!(!fx.saved().is_active);
    }

    #[tokio::test]
    async fn test_stale_expiry_after_cancel_is_noop() {
        let fx = Fixture::new("127.0.0.1 localhost\n");
        let mut c = fx.controller(Box::new(Direct));
        c.add_site("example.com").unwrap();

        c.start_focus(1).unwrap();
        assert!(matches!(event(&mut c).await, Event::FocusStarted { .. }));
        // Let the countdown post its expiry without consuming it
        tokio::time::sleep(TICK * 4).await;

        c.disable().unwrap();
        assert_eq!(event(&mut c).await, Event::Disabled { cancelled_focus: true });

        // The queued expiry must not start a second deactivation
        assert_eq!(c.busy(), None);
        let extra = tokio::time::timeout(TICK * 20, c.next_event()).await;
        assert!(extra.is_err(), "unexpected event: {:?}", extra);
        assert_eq!(c.history().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_cancel_rearms_session() {
        let fx = Fixture::new("127.0.0.1 localhost\n");
        let toggle = Toggle::default();
        let refuse = Arc::clone(&toggle.refuse);
        let mut c = fx.controller(Box::new(toggle)).with_focus_unit(scheduler::MINUTE);
        c.add_site("example.com").unwrap();

        c.start_focus(30).unwrap();
        assert!(matches!(event(&mut c).await, Event::FocusStarted { .. }));
        let session = c.state().focus_session.unwrap();

        refuse.store(true, Ordering::SeqCst);
        c.disable().unwrap();
        assert!(matches!(
            event(&mut c).await,
            Event::Failed { op: Operation::Disable, error: BlockingError::PermissionDenied(_) }
        ));

        let state = c.state();
        assert!(state.active);
        assert_eq!(state.focus_session, Some(session));
        assert!(fx.hosts().contains(MARKER));
    }

    #[tokio::test]
    async fn test_sync_adopts_external_enable() {
        let fx = Fixture::new("127.0.0.1 localhost\n127.0.0.1 a.com # siper\n");
        let mut c = fx.controller(Box::new(Direct));
        assert!(!c.state().active);

        let r = c.sync().await.unwrap();
        assert_eq!(r, Reconciliation { active: true, drifted: true });
        assert!(c.state().active);
        c.flush().await.unwrap();
        assert!(fx.saved().is_active);

        let again = c.sync().await.unwrap();
        assert!(!again.drifted);
    }

    #[tokio::test]
    async fn test_sync_clears_session_when_entries_vanish() {
        let fx = Fixture::new("127.0.0.1 localhost\n");
        let mut c = fx.controller(Box::new(Direct)).with_focus_unit(scheduler::MINUTE);
        c.add_site("example.com").unwrap();
        c.start_focus(25).unwrap();
        assert!(matches!(event(&mut c).await, Event::FocusStarted { .. }));

        fs::write(&fx.paths.hosts, "127.0.0.1 localhost\n").unwrap();
        let r = c.sync().await.unwrap();
        assert!(r.drifted);
        assert_eq!(c.state(), BlockingState::default());
    }

    #[tokio::test]
    async fn test_expiry_during_enable_is_deferred() {
        let fx = Fixture::new("127.0.0.1 localhost\n");
        let mut c = fx.controller(Box::new(Direct)).with_focus_unit(scheduler::MINUTE);
        c.add_site("example.com").unwrap();
        c.start_focus(25).unwrap();
        assert!(matches!(event(&mut c).await, Event::FocusStarted { .. }));
        let id = c.state().focus_session.unwrap().id;

        c.enable().unwrap();
        assert!(c.handle(WorkerResult::FocusExpired(id)).is_none());
        assert_eq!(c.busy(), Some(Operation::Enable));
        assert!(c.state().focus_session.is_some());

        assert_eq!(event(&mut c).await, Event::Enabled { sites: 1 });
        assert_eq!(c.busy(), Some(Operation::FocusEnd));
        assert_eq!(event(&mut c).await, Event::FocusEnded { minutes: 25 });

        assert_eq!(c.state(), BlockingState::default());
        assert!(!fx.hosts().contains(MARKER));
    }

    #[tokio::test]
    async fn test_failed_restore_at_expiry_stays_active() {
        let fx = Fixture::new("127.0.0.1 localhost\n");
        let toggle = Toggle::default();
        let refuse = Arc::clone(&toggle.refuse);
        let mut c = fx.controller(Box::new(toggle));
        c.add_site("example.com").unwrap();

        c.start_focus(1).unwrap();
        assert!(matches!(event(&mut c).await, Event::FocusStarted { .. }));
        refuse.store(true, Ordering::SeqCst);

        assert!(matches!(
            event(&mut c).await,
            Event::Failed { op: Operation::FocusEnd, error: BlockingError::PermissionDenied(_) }
        ));
        let state = c.state();
        assert!(state.active);
        assert!(state.focus_session.is_none());
        assert!(fx.hosts().contains(MARKER));

        refuse.store(false, Ordering::SeqCst);
        c.disable().unwrap();
        assert_eq!(event(&mut c).await, Event::Disabled { cancelled_focus: false });
        assert!(!fx.hosts().contains(MARKER));
    }

    #[tokio::test]
    async fn test_finish_pending_applies_running_focus_end() {
        let fx = Fixture::new("127.0.0.1 localhost\n");
        let mut c = fx.controller(Box::new(Direct)).with_focus_unit(scheduler::MINUTE);
        c.add_site("example.com").unwrap();
        assert!(c.finish_pending().await.is_none());

        c.start_focus(25).unwrap();
        assert!(matches!(event(&mut c).await, Event::FocusStarted { .. }));
        let id = c.state().focus_session.unwrap().id;
        assert!(c.handle(WorkerResult::FocusExpired(id)).is_none());

        assert_eq!(
            c.disable(),
            Err(BlockingError::OperationInProgress(Operation::FocusEnd))
        );
        assert_eq!(
            c.finish_pending().await,
            Some(Event::FocusEnded { minutes: 25 })
        );
        assert_eq!(c.busy(), None);
        assert_eq!(c.state(), BlockingState::default());
        c.flush().await.unwrap();
        assert!(!fx.saved().is_active);
    }

    #[tokio::test]
    async fn test_corrupt_config_recovers_state_from_hosts() {
        let fx = Fixture::new("127.0.0.1 localhost\n127.0.0.1 a.com # siper\n");
        fs::create_dir_all(&fx.paths.config).unwrap();
        fs::write(fx.paths.config_file(), "{ truncated").unwrap();

        let mut c = BlockingController::open(&fx.paths, Box::new(Direct)).unwrap();
        assert!(!c.state().active);
        assert_eq!(c.site_count(), 0);

        let r = c.sync().await.unwrap();
        assert_eq!(r, Reconciliation { active: true, drifted: true });
        c.flush().await.unwrap();
        assert!(fx.saved().is_active);
    }

    #[tokio::test]
    async fn test_category_bulk_add() {
        let fx = Fixture::new("");
        let mut c = fx.controller(Box::new(Direct));
        c.add_site("reddit.com").unwrap();

        let first = c.add_category(Category::Social);
        assert_eq!(first.source, "social");
        assert_eq!(first.skipped, 1);
        assert_eq!(first.added, Category::Social.sites().len() - 1);

        let second = c.add_category(Category::Social);
        assert_eq!(second.added, 0);
        assert_eq!(second.skipped, Category::Social.sites().len());
    }

    #[tokio::test]
    async fn test_import_export_json() {
        let fx = Fixture::new("");
        let mut c = fx.controller(Box::new(Direct));
        c.add_site("a.com").unwrap();

        let report = c
            .import_json(r#"["a.com", "https://www.B.com/x", "c.org", ""]"#)
            .unwrap();
        assert_eq!((report.added, report.skipped), (2, 2));

        let exported: Vec<String> = serde_json::from_str(&c.export_json().unwrap()).unwrap();
        assert_eq!(exported, vec!["a.com", "b.com", "c.org"]);

        assert!(matches!(
            c.import_json("{\"sites\": []}"),
            Err(BlockingError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_preferences_persist() {
        let fx = Fixture::new("");
        let mut c = fx.controller(Box::new(Direct));

        assert_eq!(c.cycle_theme(), ThemeMode::Light);
        c.set_language("german").unwrap();
        assert!(c.set_language("  ").is_err());
        c.flush().await.unwrap();

        let saved = fx.saved();
        assert_eq!(saved.theme_mode, ThemeMode::Light);
        assert_eq!(saved.language, "german");
    }
}
