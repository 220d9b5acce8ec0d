//! # Ligature
//!
//! Ligature is a constraint-based configuration language: values are described by constraints
//! and unified together rather than assigned, so unification order never matters and partial
//! knowledge narrows monotonically toward a concrete result (or a conflict). This crate is the
//! thin embedding surface over [`ligature_core`]'s evaluator: build a [`CompiledProgram`],
//! evaluate it against a root [`Vertex`], and read the result back through the value-surface
//! API re-exported below.
//!
//! The core never parses source text itself; callers supply an already-compiled program
//! (the output of [`ligature_core::frontend::compile`] run over a surface parser's AST) and an
//! optional [`BuiltinRegistry`] for any builtin functions the program calls.

use std::sync::Arc;

pub use ligature_core::interpreter::{
    BuiltinRegistry, BuiltinSignature, CancellationToken, EmptyBuiltinRegistry, EvalConfig,
    EvalError, Vertex, VertexRef, VertexState,
};
pub use ligature_core::ir::indexed::CompiledProgram;
pub use ligature_core::ir::value::{Bound, Scalar};
pub use ligature_core::ir::Label;
pub use ligature_core::schema::Kind;
pub use ligature_core::surface::{
    default, doc_comments, equals, is_concrete, iter_fields, iter_list, kind, lookup, path,
    source_position, validate, FieldFilter, Selector, ValidateOptions,
};

/// Seeds a root [`Vertex`] with a compiled program's top-level struct as its sole conjunct and
/// drives it to [`VertexState::Finalized`]. The root is returned regardless of whether
/// evaluation produced a fatal error: partial results remain reachable from it, and
/// [`ligature_core::surface::validate`] is the recommended way to discover what went wrong.
pub fn evaluate(
    program: &CompiledProgram,
    config: &EvalConfig,
) -> (VertexRef, Result<(), EvalError>) {
    let root = Vertex::new_root();
    root.borrow_mut().push_conjunct(ligature_core::interpreter::Conjunct {
        expr: Arc::new(ligature_core::ir::Expr::StructLit(program.root.clone())),
        env: ligature_core::interpreter::Environment::root(),
        span: ligature_core::position::Span::synthetic(),
    });
    let result = ligature_core::interpreter::evaluate(&root, VertexState::Finalized, config);
    (root, result)
}

/// Convenience constructor for an [`EvalConfig`] with no builtins registered.
pub fn default_config() -> EvalConfig {
    EvalConfig::new(Arc::new(EmptyBuiltinRegistry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ligature_core::ir::value::Scalar;
    use ligature_core::ir::{FieldDecl, StructLitIR};
    use ligature_core::position::Span;

    fn field(name: &str, value: ligature_core::ir::Expr) -> FieldDecl {
        FieldDecl {
            label: Label::Field(Arc::from(name)),
            optional: false,
            value,
            span: Span::synthetic(),
        }
    }

    #[test]
    fn evaluates_a_trivial_program() {
        let program = CompiledProgram {
            package: None,
            root: StructLitIR {
                fields: vec![field("port", ligature_core::ir::Expr::Value(Scalar::Int(8080)))],
                dynamic_fields: Vec::new(),
                embeddings: Vec::new(),
                comprehensions: Vec::new(),
                patterns: Vec::new(),
                bindings: Vec::new(),
                closed: false,
            },
        };
        let config = default_config();
        let (root, result) = evaluate(&program, &config);
        assert!(result.is_ok());
        let port = lookup(&root, &Label::Field(Arc::from("port"))).unwrap();
        assert_eq!(kind(&port), Kind::INT);
        assert!(is_concrete(&port));
    }
}
