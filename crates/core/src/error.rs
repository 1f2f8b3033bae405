//! Error kinds shared by the value layer, the runtime, and the compiler.
//!
//! Spec §4.I distinguishes two failure layers: contract violations (bugs in
//! the host-embedded instruction stream, never user-observable) and runtime
//! errors (catchable `try`/`catch` exceptions). [`Fault`] models the latter;
//! contract violations use [`fatal`] and never construct one.

use crate::source_location::SourceLocation;
use std::fmt;

/// The closed set of error kinds named in spec §4.I. Each has a canonical
/// English message template; callers may still supply a more specific
/// `message` (e.g. which index was out of range).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TypeMismatch,
    Overflow,
    DivisionByZero,
    IndexOutOfRange,
    NotInitialized,
    BypassedInitialization,
    Assertion,
    RecursiveImport,
    Io,
    Parse,
    Runtime,
}

impl ErrorKind {
    /// The canonical message template for this kind, used when a caller
    /// doesn't have anything more specific to say.
    pub fn template(self) -> &'static str {
        match self {
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::Overflow => "arithmetic overflow",
            ErrorKind::DivisionByZero => "division by zero",
            ErrorKind::IndexOutOfRange => "index out of range",
            ErrorKind::NotInitialized => "variable not initialized",
            ErrorKind::BypassedInitialization => "initialization bypassed",
            ErrorKind::Assertion => "assertion failure",
            ErrorKind::RecursiveImport => "recursive import",
            ErrorKind::Io => "I/O error",
            ErrorKind::Parse => "parse error",
            ErrorKind::Runtime => "runtime error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.template())
    }
}

/// A runtime error carrying a kind, a human-readable message, and (once it
/// crosses into a location-aware context) where it happened.
///
/// This is the payload errors carry *before* they become a catchable
/// `Value` exception with a backtrace (see `asteria_runtime::exception`);
/// `Fault` is the type `asteria-core`'s Value operations fail with, since
/// they have no notion of call frames or backtraces of their own.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Fault {
    pub kind: ErrorKind,
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl Fault {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Fault {
            kind,
            message: message.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}

pub type Result<T> = std::result::Result<T, Fault>;

/// Abort the process for a contract violation (spec §7.1): a malformed
/// instruction stream or evaluation-stack underflow. No user code can
/// ever observe this path; it exists to turn "should be impossible" bugs
/// into a clear diagnostic instead of undefined behaviour.
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)*) => {{
        eprintln!("asteria: contract violation: {}", format!($($arg)*));
        std::process::abort();
    }};
}
