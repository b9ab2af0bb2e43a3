//! siper core - shared functionality for the siper site blocker
//!
//! Holds the pieces every front-end needs before it can talk to the
//! blocking engine: where things live on disk and what the persisted
//! configuration looks like.

pub mod config;
pub mod paths;

pub use config::{Config, ThemeMode};
pub use paths::Paths;
