//! The append-only diagnostic sink every pass writes into.
//!
//! A diagnostic carries a stable code, a severity that is a property of
//! the code (never of the call site, §7), an optional span, and free-form
//! structured parameters for the message. Passes never panic or bail
//! early on recoverable input; they push to the sink and keep going.

use crate::span::SourceSpan;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Severity is fixed per diagnostic code; see `asdl_ir::codes` for the
/// registry of codes used across the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single diagnostic. `component` is the stage index used as a
/// deterministic tie-break (§5 Ordering guarantees, §9 "Diagnostics sink").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: &'static str,
    pub severity: Severity,
    pub span: Option<SourceSpan>,
    pub message: String,
    pub component: u8,
    #[serde(default)]
    pub suggestion: Option<String>,
}

impl Diagnostic {
    #[must_use]
    pub fn error(code: &'static str, component: u8, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Error,
            span: None,
            message: message.into(),
            component,
            suggestion: None,
        }
    }

    #[must_use]
    pub fn warning(code: &'static str, component: u8, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Warning,
            span: None,
            message: message.into(),
            component,
            suggestion: None,
        }
    }

    #[must_use]
    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Sort key used by `Diagnostics::sorted` — `(file, start, component, code)`,
    /// matching §9's "secondary sort ... before printing".
    fn sort_key(&self) -> (u32, usize, u8, &'static str) {
        match self.span {
            Some(span) => (span.file.raw(), span.start, self.component, self.code),
            None => (u32::MAX, usize::MAX, self.component, self.code),
        }
    }
}

/// An append-only diagnostic buffer passed by reference between passes.
/// Never a thread-local global (§9): a pass that wants to run sub-tasks in
/// parallel collects per-task buffers and merges them with `extend`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(Diagnostic::is_fatal)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Deterministic, source-order-then-stage-tiebroken view of the sink.
    /// This is the ordering the compile log and terminal reporting both use.
    #[must_use]
    pub fn sorted(&self) -> Vec<Diagnostic> {
        let mut entries = self.entries.clone();
        entries.sort_by(|a, b| {
            let ka = a.sort_key();
            let kb = b.sort_key();
            ka.partial_cmp(&kb).unwrap_or(Ordering::Equal)
        });
        entries
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
