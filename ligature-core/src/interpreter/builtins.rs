//! Opaque builtin functions supplied by an external collaborator (§4.8, §6 Input: Builtin
//! registry). The core never introspects a builtin's body, only its declared signature.

use crate::interpreter::error::EvalError;
use crate::ir::value::Scalar;
use crate::schema::Kind;

/// One builtin's declared contract. `pure` is advisory to callers of the registry (the engine
/// itself never re-invokes a builtin for the same arguments within one evaluation, so purity
/// is never load-bearing for correctness, only for an embedder's own caching).
pub struct BuiltinSignature {
    pub name: &'static str,
    pub params: &'static [Kind],
    pub result: Kind,
    pub pure: bool,
}

/// A map from qualified name to builtin record. Implemented by the embedding host; the core
/// calls only into this trait and never assumes a particular function is present.
pub trait BuiltinRegistry: Send + Sync {
    fn signature(&self, name: &str) -> Option<BuiltinSignature>;

    fn call(&self, name: &str, args: &[Scalar]) -> Result<Scalar, EvalError>;
}

/// A registry with nothing registered; evaluating a program that calls any builtin against
/// this reports `EvalError::Reference`.
#[derive(Debug, Default)]
pub struct EmptyBuiltinRegistry;

impl BuiltinRegistry for EmptyBuiltinRegistry {
    fn signature(&self, _name: &str) -> Option<BuiltinSignature> {
        None
    }

    fn call(&self, name: &str, _args: &[Scalar]) -> Result<Scalar, EvalError> {
        Err(EvalError::User {
            message: format!("no such builtin `{name}`"),
            path: Vec::new(),
            incomplete: false,
        })
    }
}
