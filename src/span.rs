//! Buffer identity and byte ranges.

use serde::Serialize;
use std::fmt;

/// Opaque identity of a host buffer, chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct BufferId(pub u64);

/// Immutable snapshot of a buffer that a formatting request works on.
#[derive(Debug, Clone, Copy)]
pub struct SourceBuffer<'a> {
    pub id: BufferId,
    pub text: &'a str,
}

impl<'a> SourceBuffer<'a> {
    pub fn new(id: BufferId, text: &'a str) -> Self {
        Self { id, text }
    }

    pub fn span(&self, start: usize, end: usize) -> SourceSpan {
        SourceSpan::new(self.id, start, end)
    }

    pub fn slice(&self, span: SourceSpan) -> &'a str {
        &self.text[span.start..span.end]
    }
}

/// Half-open byte range `[start, end)` inside one buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceSpan {
    pub buffer: BufferId,
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub fn new(buffer: BufferId, start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start after end");
        Self { buffer, start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn overlaps(&self, other: &SourceSpan) -> bool {
        self.buffer == other.buffer && self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &SourceSpan) -> bool {
        self.buffer == other.buffer && self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
