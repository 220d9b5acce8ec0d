//! Source positions carried by AST nodes and propagated onto conjuncts.
//!
//! The core never re-derives a position from source text (it doesn't have the text); it only
//! stores and forwards whatever the surface parser attached to a node.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A single byte-offset location within a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Name of the file this position is within, interned so spans are cheap to clone.
    pub file: Arc<str>,
    pub byte_offset: u32,
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(file: impl Into<Arc<str>>, byte_offset: u32, line: u32, column: u32) -> Self {
        Self { file: file.into(), byte_offset, line, column }
    }

    /// A placeholder position for synthetic nodes introduced by the compiler itself
    /// (e.g. the implicit top-level conjunct), not present in any source file.
    pub fn synthetic() -> Self {
        Self { file: Arc::from("<synthetic>"), byte_offset: 0, line: 0, column: 0 }
    }
}

/// A byte-offset span, `[start, end)`, plus any doc comments attached directly above the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<CommentGroup>,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end, comments: Vec::new() }
    }

    pub fn synthetic() -> Self {
        Self::new(Position::synthetic(), Position::synthetic())
    }

    pub fn with_comments(mut self, comments: Vec<CommentGroup>) -> Self {
        self.comments = comments;
        self
    }
}

/// A contiguous run of comment lines attached to one AST node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentGroup {
    pub lines: Vec<String>,
    /// Whether the surface syntax marked this comment group as doc-relevant
    /// (as opposed to an arbitrary inline comment).
    pub is_doc: bool,
}
