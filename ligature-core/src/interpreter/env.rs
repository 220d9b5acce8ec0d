//! The runtime mirror of [`crate::frontend::scopes::ScopeStack`] (§3 Environment).
//!
//! A chain of immutable frames; extending it (entering a struct or a comprehension clause)
//! allocates a new node rather than mutating the parent's. `depth` in a [`crate::ir::ScopeRef`]
//! counts frames in this chain exactly the way the compiler counted frames in `ScopeStack`, so
//! the two never drift out of lockstep.

use std::rc::Rc;

use crate::interpreter::vertex::VertexRef;

pub enum EnvFrame {
    /// The namespace a struct literal's own fields and `let`/alias bindings are resolved
    /// against.
    Struct { vertex: VertexRef, bindings: Vec<VertexRef> },
    /// One comprehension's `for`/`if`/`let` clause chain; it owns binding slots but does not
    /// own a Vertex of its own; its declarations are unified into the nearest enclosing struct.
    Clause { bindings: Vec<VertexRef> },
}

struct EnvNode {
    frame: EnvFrame,
    parent: Option<Environment>,
}

#[derive(Clone)]
pub struct Environment(Option<Rc<EnvNode>>);

impl Environment {
    pub fn root() -> Self {
        Environment(None)
    }

    pub fn push(&self, frame: EnvFrame) -> Self {
        Environment(Some(Rc::new(EnvNode { frame, parent: Some(self.clone()) })))
    }

    /// Walks `depth` frames outward from the current one (depth 0 is the innermost frame
    /// itself), mirroring `ScopeStack::resolve`'s `frames.iter().rev().enumerate()` walk.
    pub fn frame_at(&self, depth: u32) -> Option<&EnvFrame> {
        let mut node = self.0.as_deref()?;
        for _ in 0..depth {
            node = node.parent.as_ref()?.0.as_deref()?;
        }
        Some(&node.frame)
    }
}
