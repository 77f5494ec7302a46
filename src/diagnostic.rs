//! Diagnostics reported by generators and by the pipeline itself

use crate::error::SynthError;
use crate::marker::MarkerSite;
use crate::types::Span;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Severity level for a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn is_error(&self) -> bool {
        matches!(self, Severity::Error)
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Severity::Warning)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// A diagnostic attached to a synthesized unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Source position the diagnostic refers to, if any
    pub location: Option<Span>,
    /// Stable error code for pipeline-raised diagnostics
    pub code: Option<String>,
    /// Marker whose invocation produced this diagnostic, set by the composer
    pub origin: Option<MarkerSite>,
}

impl Diagnostic {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            message: message.into(),
            location: None,
            code: None,
            origin: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn at(mut self, location: Span) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Error diagnostic for a per-marker failure
    pub fn from_error(err: &SynthError, site: &MarkerSite) -> Self {
        Diagnostic::error(err.to_string())
            .at(site.span)
            .with_code(err.code())
            .from_marker(site.clone())
    }

    pub(crate) fn from_marker(mut self, site: MarkerSite) -> Self {
        self.origin = Some(site);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.severity)?;
        if let Some(code) = &self.code {
            write!(f, "[{}]", code)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(loc) = &self.location {
            write!(f, " (at {})", loc)?;
        }
        Ok(())
    }
}

/// Append-only collector handed to a generator invocation.
///
/// Clones share storage, so a generator may pass the sink to helper tasks.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticSink {
    entries: Arc<Mutex<Vec<Diagnostic>>>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, diagnostic: Diagnostic) {
        self.entries.lock().push(diagnostic);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.report(Diagnostic::error(message));
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.report(Diagnostic::warning(message));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.report(Diagnostic::info(message));
    }

    /// Everything reported so far, in report order
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
