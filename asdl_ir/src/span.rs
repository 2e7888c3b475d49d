//! Source-span metadata attached to every entity for diagnostics.

use crate::ids::FileId;
use serde::{Deserialize, Serialize};

/// A half-open byte range `[start, end)` inside a source file, plus the
/// line/column of `start` for human-readable diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    pub file: FileId,
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub col: u32,
}

impl SourceSpan {
    /// Builds a span from explicit byte offsets and line/column.
    #[must_use]
    pub const fn new(file: FileId, start: usize, end: usize, line: u32, col: u32) -> Self {
        Self {
            file,
            start,
            end,
            line,
            col,
        }
    }

    /// A degenerate zero-width span, used when a pass synthesizes an entity
    /// with no direct authoring-surface counterpart (e.g. an
    /// `instance_defaults`-introduced net, §4.4).
    #[must_use]
    pub const fn synthetic(file: FileId) -> Self {
        Self {
            file,
            start: 0,
            end: 0,
            line: 0,
            col: 0,
        }
    }
}
