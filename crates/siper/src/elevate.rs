//! Privilege elevation back-ends
//!
//! The application never runs as root. Anything that needs root goes
//! through an [`Elevator`], which runs a single command with elevated
//! rights and hands back its captured output.
//! - Pkexec: polkit prompt, the default for desktop sessions
//! - Direct: no prompt, used when the process is already root

use std::ffi::OsStr;
use std::io;
use std::process::{Command, ExitStatus, Output};

/// How an elevated command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// The elevation helper refused to run the command
    Denied,
    /// The command ran and exited non-zero (or was killed)
    Failed(Option<i32>),
}

/// Runs a command with elevated rights
pub trait Elevator: Send + Sync {
    /// Short name used in logs and messages
    fn name(&self) -> &'static str;

    /// Run `program args...` elevated, blocking until it exits
    fn run(&self, program: &OsStr, args: &[&OsStr]) -> io::Result<Output>;

    /// Interpret the exit status using the helper's own exit semantics
    fn classify(&self, status: &ExitStatus) -> Outcome {
        if status.success() {
            Outcome::Success
        } else {
            Outcome::Failed(status.code())
        }
    }
}

/// polkit's `pkexec`
#[derive(Debug, Clone, Copy, Default)]
pub struct Pkexec;

impl Pkexec {
    /// Authorization dialog dismissed
    pub const EXIT_DISMISSED: i32 = 126;
    /// Not authorized, or authentication failed
    pub const EXIT_NOT_AUTHORIZED: i32 = 127;
}

impl Elevator for Pkexec {
    fn name(&self) -> &'static str {
        "pkexec"
    }

    fn run(&self, program: &OsStr, args: &[&OsStr]) -> io::Result<Output> {
        Command::new("pkexec").arg(program).args(args).output()
    }

    fn classify(&self, status: &ExitStatus) -> Outcome {
        match status.code() {
            Some(0) => Outcome::Success,
            Some(Self::EXIT_DISMISSED) | Some(Self::EXIT_NOT_AUTHORIZED) => Outcome::Denied,
            code => Outcome::Failed(code),
        }
    }
}

/// Runs commands as the current user, without any prompt
#[derive(Debug, Clone, Copy, Default)]
pub struct Direct;

impl Elevator for Direct {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn run(&self, program: &OsStr, args: &[&OsStr]) -> io::Result<Output> {
        Command::new(program).args(args).output()
    }
}

/// Pick the elevator for this process: root needs no prompt
pub fn detect() -> Box<dyn Elevator> {
    if is_root() {
        Box::new(Direct)
    } else {
        Box::new(Pkexec)
    }
}

pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() == 0 }
}
