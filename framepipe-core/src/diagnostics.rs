//! Accumulated decoder diagnostic output.
//!
//! The decoder's side channel emits line-oriented human-readable text.
//! The diagnostic scanner appends every non-empty line here; the
//! readiness gate and failure-reporting paths read snapshots. Single
//! writer, any number of snapshot readers.

use std::sync::Mutex;

/// Append-only log of decoder diagnostic lines.
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    lines: Mutex<Vec<String>>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one diagnostic line.
    pub fn append(&self, line: String) {
        self.lock().push(line);
    }

    /// Whether any accumulated line contains `marker` as a substring.
    pub fn contains(&self, marker: &str) -> bool {
        self.lock().iter().any(|line| line.contains(marker))
    }

    /// A point-in-time copy of all accumulated lines.
    pub fn snapshot(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// All accumulated lines joined with newlines, for error reports.
    pub fn joined(&self) -> String {
        self.lock().join("\n")
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        // A writer panicking mid-append leaves the Vec intact.
        self.lines.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ── Tests ────────────────────────────────────────────────────────
