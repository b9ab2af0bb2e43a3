//! Drift detection between persisted state and the hosts file
//!
//! The file is the source of truth: any managed marker means blocking is
//! in effect, whatever the config says. A stray comment that happens to
//! contain the marker is indistinguishable from a managed line.

use crate::hosts;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    /// Activation state implied by the file
    pub active: bool,
    /// True when `active` differs from what was persisted
    pub drifted: bool,
}

/// Compare actual file content with the persisted activation flag
pub fn reconcile(content: &str, persisted_active: bool) -> Reconciliation {
    let active = hosts::has_managed_entries(content);
    Reconciliation {
        active,
        drifted: active != persisted_active,
    }
}
