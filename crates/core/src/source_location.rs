//! Source positions attached to AIR nodes, exceptions, and backtrace frames.

use std::fmt;

/// A file name plus a 1-based line number.
///
/// Asteria never needs column information at the runtime layer: the
/// compiler resolves columns during parsing but only the line survives
/// into the instruction stream, matching what backtraces print.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    file: String,
    line: i64,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: i64) -> Self {
        SourceLocation {
            file: file.into(),
            line,
        }
    }

    /// Placeholder used for faults raised by the runtime itself, outside
    /// any user-visible instruction (e.g. during GC teardown).
    pub fn native() -> Self {
        SourceLocation::new("<native>", 0)
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> i64 {
        self.line
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}
