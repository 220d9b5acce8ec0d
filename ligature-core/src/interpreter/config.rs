//! The embedding host's configuration surface for one evaluation root (§5).
//!
//! The core reads no environment variables or files and owns no process-global state; every
//! knob an embedder needs is threaded through here and into [`crate::interpreter::evaluate`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::interpreter::builtins::BuiltinRegistry;
use crate::interpreter::error::EvalError;

/// A cheap, cloneable cancellation switch. Checked at each Vertex transition and each conjunct;
/// flipping it leaves in-progress Vertices in their current partial state.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Configuration for one call to [`crate::interpreter::evaluate`].
pub struct EvalConfig {
    pub cancellation: CancellationToken,
    /// Ceiling on fixed-point passes over a single Vertex's conjuncts before a non-terminating
    /// evaluation is reported as [`EvalError::Cycle`] instead of looping forever.
    pub max_passes: u32,
    pub builtins: Arc<dyn BuiltinRegistry>,
}

impl EvalConfig {
    pub fn new(builtins: Arc<dyn BuiltinRegistry>) -> Self {
        Self { cancellation: CancellationToken::new(), max_passes: 10_000, builtins }
    }

    pub fn with_max_passes(mut self, max_passes: u32) -> Self {
        self.max_passes = max_passes;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub(crate) fn check_cancelled(&self) -> Result<(), EvalError> {
        if self.cancellation.is_cancelled() {
            Err(EvalError::User {
                message: "evaluation cancelled".to_string(),
                path: Vec::new(),
                incomplete: false,
            })
        } else {
            Ok(())
        }
    }
}
