//! Focus statistics calculation
//!
//! Aggregates the focus history into:
//! - Total sessions and focus time
//! - Focus time over the last seven days

use chrono::{DateTime, Duration, Utc};

use crate::session::FocusHistoryEntry;

/// Aggregated focus statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FocusStats {
    /// Total number of sessions started
    pub total_sessions: u32,
    /// Total focus time in minutes
    pub total_minutes: u32,
    /// Sessions started in the last 7 days
    pub week_sessions: u32,
    /// Focus time in minutes over the last 7 days
    pub week_minutes: u32,
}

impl FocusStats {
    /// Calculate statistics as of now
    pub fn from_history(history: &[FocusHistoryEntry]) -> Self {
        Self::from_history_at(history, Utc::now())
    }

    /// Calculate statistics as of `now`
    pub fn from_history_at(history: &[FocusHistoryEntry], now: DateTime<Utc>) -> Self {
        let week_ago = now - Duration::days(7);
        let week: Vec<&FocusHistoryEntry> = history.iter().filter(|e| e.start > week_ago).collect();

        Self {
            total_sessions: history.len() as u32,
            total_minutes: history.iter().map(|e| e.duration_minutes).sum(),
            week_sessions: week.len() as u32,
            week_minutes: week.iter().map(|e| e.duration_minutes).sum(),
        }
    }

    /// Get total hours and minutes as a tuple
    pub fn total_time(&self) -> (u32, u32) {
        split_minutes(self.total_minutes)
    }

    /// Get this week's hours and minutes as a tuple
    pub fn week_time(&self) -> (u32, u32) {
        split_minutes(self.week_minutes)
    }
}

fn split_minutes(minutes: u32) -> (u32, u32) {
    (minutes / 60, minutes % 60)
}
