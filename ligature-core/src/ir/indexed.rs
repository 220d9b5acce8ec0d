//! The compiler's final product: a fully scope-resolved program ready to seed a root Vertex.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::StructLitIR;

/// A compiled configuration: one struct literal (the file's top-level declarations) with every
/// identifier already resolved to a [`super::ScopeRef`]. This is what seeds the root Vertex's
/// single top-level conjunct (§4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledProgram {
    pub package: Option<Arc<str>>,
    pub root: StructLitIR,
}
