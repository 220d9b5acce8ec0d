//! The tagged error surface the unifier reports (§7).
//!
//! `EvalError` distinguishes fatal outcomes (the owning Vertex becomes Bottom) from incomplete
//! ones (the conjunct is retried on a later pass); [`EvalError::is_incomplete`] is the switch
//! [`crate::interpreter::engine::evaluate`] uses to decide whether to requeue or propagate.

use std::sync::Arc;

use crate::ir::Label;
use crate::position::Span;
use crate::schema::Kind;

/// One selector step in a reported error's path, root to leaf.
pub type ErrorPath = Vec<Label>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    #[error("reference to undefined identifier at {span:?}")]
    Reference { span: Span, path: ErrorPath },

    #[error("field or index `{label}` does not exist")]
    NotExists { label: Label, path: ErrorPath, span: Span, incomplete: bool },

    #[error("incompatible kinds: {left} vs {right}")]
    Type { left: Kind, right: Kind, path: ErrorPath, positions: Vec<Span> },

    #[error("value violates bound: {reason}")]
    Bounds { reason: String, path: ErrorPath, positions: Vec<Span> },

    #[error("value is not concrete")]
    Concrete { path: ErrorPath, incomplete: bool },

    #[error("structural cycle did not reach a fixed point after {passes} passes")]
    Cycle { path: ErrorPath, passes: u32, incomplete: bool },

    #[error("field `{label}` is not permitted by closedness")]
    Closed { label: Label, path: ErrorPath, closed_at: Span, introduced_at: Span },

    #[error("{message}")]
    User { message: String, path: ErrorPath, incomplete: bool },
}

impl EvalError {
    /// Whether this error should be retried on a later fixed-point pass rather than
    /// immediately making its Vertex Bottom.
    pub fn is_incomplete(&self) -> bool {
        match self {
            EvalError::Reference { .. }
            | EvalError::Type { .. }
            | EvalError::Bounds { .. }
            | EvalError::Closed { .. } => false,
            EvalError::NotExists { incomplete, .. }
            | EvalError::Concrete { incomplete, .. }
            | EvalError::Cycle { incomplete, .. }
            | EvalError::User { incomplete, .. } => *incomplete,
        }
    }

    /// Reclassifies an incomplete error as fatal, used when a full pass makes no progress
    /// (§7 Propagation: "after a full pass with no progress, remaining Incomplete errors
    /// become fatal").
    pub fn into_fatal(self) -> EvalError {
        match self {
            EvalError::NotExists { label, path, span, .. } => {
                EvalError::NotExists { label, path, span, incomplete: false }
            }
            EvalError::Concrete { path, .. } => EvalError::Concrete { path, incomplete: false },
            EvalError::Cycle { path, passes, .. } => {
                EvalError::Cycle { path, passes, incomplete: false }
            }
            EvalError::User { message, path, .. } => {
                EvalError::User { message, path, incomplete: false }
            }
            already_fatal => already_fatal,
        }
    }

    pub fn path(&self) -> &[Label] {
        match self {
            EvalError::Reference { path, .. }
            | EvalError::NotExists { path, .. }
            | EvalError::Type { path, .. }
            | EvalError::Bounds { path, .. }
            | EvalError::Concrete { path, .. }
            | EvalError::Cycle { path, .. }
            | EvalError::Closed { path, .. }
            | EvalError::User { path, .. } => path,
        }
    }
}

/// Every fatal cause reachable from a requested Vertex, deduplicated and ordered
/// depth-first/source-order as required by `validate` (§7 User-visible behavior).
pub fn dedup_errors(mut errors: Vec<EvalError>) -> Vec<EvalError> {
    let mut seen = std::collections::BTreeSet::new();
    errors.retain(|e| seen.insert(dedup_key(e)));
    errors
}

fn dedup_key(e: &EvalError) -> (u8, ErrorPath, Option<Arc<str>>) {
    let tag = match e {
        EvalError::Reference { .. } => 0,
        EvalError::NotExists { .. } => 1,
        EvalError::Type { .. } => 2,
        EvalError::Bounds { .. } => 3,
        EvalError::Concrete { .. } => 4,
        EvalError::Cycle { .. } => 5,
        EvalError::Closed { .. } => 6,
        EvalError::User { .. } => 7,
    };
    (tag, e.path().to_vec(), None)
}
