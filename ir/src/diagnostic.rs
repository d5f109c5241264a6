//! Operator-level diagnostics.
//!
//! Patterns attach diagnostics to the op they are looking at. Every diagnostic is
//! also emitted as a `tracing` event so it shows up in logs without a collector.

use std::fmt;

use tracing::{error, info, warn};

use crate::function::OpId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Remark,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub op: OpId,
    pub op_name: &'static str,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: '{}' ({}): {}", self.severity, self.op_name, self.op, self.message)
    }
}

/// Ordered collection of diagnostics.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, severity: Severity, op: OpId, op_name: &'static str, message: impl Into<String>) {
        let diagnostic = Diagnostic { severity, op, op_name, message: message.into() };
        match severity {
            Severity::Error => error!(op = %op, op_name, message = %diagnostic.message, "diagnostic"),
            Severity::Warning => warn!(op = %op, op_name, message = %diagnostic.message, "diagnostic"),
            Severity::Remark => info!(op = %op, op_name, message = %diagnostic.message, "diagnostic"),
        }
        self.entries.push(diagnostic);
    }

    pub fn error(&mut self, op: OpId, op_name: &'static str, message: impl Into<String>) {
        self.emit(Severity::Error, op, op_name, message);
    }

    pub fn warning(&mut self, op: OpId, op_name: &'static str, message: impl Into<String>) {
        self.emit(Severity::Warning, op, op_name, message);
    }

    pub fn remark(&mut self, op: OpId, op_name: &'static str, message: impl Into<String>) {
        self.emit(Severity::Remark, op, op_name, message);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.severity == severity)
    }

    pub fn has_errors(&self) -> bool {
        self.with_severity(Severity::Error).next().is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
