//! Focus session countdown
//!
//! `Idle -> Armed -> (Fired | Cancelled) -> Idle`. At most one session is
//! armed. Firing and cancelling both take the session out of the
//! scheduler, so whichever happens first wins and the other finds nothing:
//! a stale expiry message for a cancelled session is a no-op.

use chrono::Utc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::controller::WorkerResult;
use crate::error::{BlockingError, Result};
use crate::session::{FocusSession, SessionId};

/// Length of one focus minute on the runtime clock
pub const MINUTE: Duration = Duration::from_secs(60);

/// Validate a requested session length
pub fn validate_minutes(minutes: i64) -> Result<u32> {
    if minutes <= 0 {
        return Err(BlockingError::InvalidInput(format!(
            "focus duration must be a positive number of minutes, got {}",
            minutes
        )));
    }
    u32::try_from(minutes)
        .map_err(|_| BlockingError::InvalidInput(format!("focus duration too long: {}", minutes)))
}

struct Armed {
    session: FocusSession,
    timer: JoinHandle<()>,
}

pub struct FocusScheduler {
    unit: Duration,
    next_id: SessionId,
    armed: Option<Armed>,
}

impl FocusScheduler {
    pub fn new(unit: Duration) -> Self {
        Self {
            unit,
            next_id: 1,
            armed: None,
        }
    }

    pub fn session(&self) -> Option<&FocusSession> {
        self.armed.as_ref().map(|a| &a.session)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Reject a new session while one is armed
    pub fn ensure_idle(&self) -> Result<()> {
        if self.is_armed() {
            return Err(BlockingError::SessionAlreadyActive);
        }
        Ok(())
    }

    /// Idle -> Armed
    ///
    /// Spawns a single-shot timer that posts `FocusExpired(id)` on `tx`.
    /// Must be called within a Tokio runtime.
    pub fn arm(&mut self, minutes: u32, tx: mpsc::Sender<WorkerResult>) -> Result<&FocusSession> {
        self.ensure_idle()?;

        let id = self.next_id;
        self.next_id += 1;

        let session = FocusSession {
            id,
            started_at: Utc::now(),
            duration_minutes: minutes,
            deadline: Instant::now() + self.unit * minutes,
        };
        info!(id, minutes, "focus timer armed");
        Ok(self.install(session, tx))
    }

    /// Put back a session whose deactivation failed, keeping its deadline
    pub fn rearm(&mut self, session: FocusSession, tx: mpsc::Sender<WorkerResult>) {
        if let Some(previous) = self.cancel() {
            debug!(id = previous.id, "replaced armed session on rearm");
        }
        info!(id = session.id, "focus timer re-armed");
        self.install(session, tx);
    }

    /// Armed -> Cancelled: stop the countdown and hand back the session
    pub fn cancel(&mut self) -> Option<FocusSession> {
        let armed = self.armed.take()?;
        armed.timer.abort();
        info!(id = armed.session.id, "focus timer cancelled");
        Some(armed.session)
    }

    /// Armed -> Fired, only if `id` is the armed session
    pub fn fire(&mut self, id: SessionId) -> Option<FocusSession> {
        match &self.armed {
            Some(armed) if armed.session.id == id => {}
            _ => {
                debug!(id, "ignoring expiry of a session that is no longer armed");
                return None;
            }
        }
        let armed = self.armed.take()?;
        armed.timer.abort();
        info!(id, "focus timer fired");
        Some(armed.session)
    }

    fn install(&mut self, session: FocusSession, tx: mpsc::Sender<WorkerResult>) -> &FocusSession {
        let (id, deadline) = (session.id, session.deadline);
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = tx.send(WorkerResult::FocusExpired(id)).await;
        });
        &self.armed.insert(Armed { session, timer }).session
    }
}

impl Drop for FocusScheduler {
    fn drop(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.timer.abort();
        }
    }
}
