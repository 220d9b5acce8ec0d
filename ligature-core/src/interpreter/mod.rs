//! The evaluation core: a fixed-point unifier over a mutable Vertex graph (§3, §4).
//!
//! [`evaluate`] is the only entry point that mutates a [`Vertex`]; everything downstream
//! (the value-surface API in [`crate::schema`]... is read-only once a Vertex reaches the
//! requested [`VertexState`].

mod builtins;
mod config;
mod disjunction;
mod engine;
mod env;
mod error;
mod vertex;

pub use builtins::{BuiltinRegistry, BuiltinSignature, EmptyBuiltinRegistry};
pub use config::{CancellationToken, EvalConfig};
pub use disjunction::{default_set, Collapsed, Disjunct};
pub use engine::evaluate;
pub use env::{EnvFrame, Environment};
pub use error::{dedup_errors, ErrorPath, EvalError};
pub use vertex::{Closedness, Conjunct, LeafAccumulator, Vertex, VertexRef, VertexState};
