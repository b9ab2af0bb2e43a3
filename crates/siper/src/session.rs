//! Focus session and blocking state types

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Identifies one armed countdown
pub type SessionId = u64;

/// An armed focus session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusSession {
    pub id: SessionId,
    /// Wall-clock start, for display and history
    pub started_at: DateTime<Utc>,
    pub duration_minutes: u32,
    /// When the countdown fires on the runtime clock
    pub deadline: Instant,
}

impl FocusSession {
    /// Wall-clock end of the session
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.started_at + ChronoDuration::minutes(i64::from(self.duration_minutes))
    }

    /// Time left before the countdown fires
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Get remaining time in whole minutes, rounded up
    pub fn remaining_minutes(&self) -> u32 {
        let secs = self.remaining().as_secs();
        secs.div_ceil(60) as u32
    }
}

/// One started focus session, kept for statistics
///
/// Appended when the session starts, never mutated or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusHistoryEntry {
    pub start: DateTime<Utc>,
    pub duration_minutes: u32,
}

impl FocusHistoryEntry {
    pub fn from_session(session: &FocusSession) -> Self {
        Self {
            start: session.started_at,
            duration_minutes: session.duration_minutes,
        }
    }
}

/// Snapshot of the live blocking state
///
/// `focus_session.is_some()` implies `active`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockingState {
    pub active: bool,
    pub focus_session: Option<FocusSession>,
}
