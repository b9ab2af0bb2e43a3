//! siper - Site blocking through the system hosts file
//!
//! "Block the noise, keep the focus."
//!
//! Blocking writes loopback entries for each listed site into the hosts
//! file through an elevated helper, and removes them again on disable.
//! Focus sessions block for a fixed number of minutes and unblock on their
//! own when the countdown ends.
//!
//! Modules:
//! - site: domain normalization
//! - hosts: managed-line format and the pure rewrite
//! - elevate / applier: privileged install of new hosts content
//! - sync: reconciliation of saved state with the hosts file
//! - session / scheduler: focus sessions and their countdown
//! - store / stats: persistence, focus history and statistics
//! - categories: built-in quick-add lists
//! - controller: the single owner of all of the above

pub mod applier;
pub mod categories;
pub mod controller;
pub mod elevate;
pub mod error;
pub mod hosts;
pub mod scheduler;
pub mod session;
pub mod site;
pub mod stats;
pub mod store;
pub mod sync;

pub use applier::{ApplyReport, PrivilegedApplier};
pub use categories::Category;
pub use controller::{BlockingController, BulkAddReport, Event, Operation};
pub use elevate::Elevator;
pub use error::{BlockingError, Result};
pub use session::{BlockingState, FocusHistoryEntry, FocusSession};
pub use stats::FocusStats;
pub use store::ConfigStore;
pub use sync::Reconciliation;
