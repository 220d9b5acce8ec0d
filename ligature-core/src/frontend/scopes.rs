//! Compile-time mirror of the runtime `Environment` chain (§4.1, §3 Environment).
//!
//! Every frame pushed here corresponds exactly to one frame the interpreter will later walk:
//! a [`Frame::Struct`] for a struct literal's own namespace (siblings resolve to each other by
//! label, lazily, via [`crate::ir::ScopeRef::Field`]), or a [`Frame::Clause`] for one
//! comprehension's `for`/`if`/`let` chain (slots resolve via [`crate::ir::ScopeRef::Let`]).
//! Keeping the two stacks in lockstep is what lets `depth` be computed once at compile time and
//! never recomputed at evaluation time.

use std::collections::HashMap;
use std::sync::Arc;

use crate::position::Span;

use super::error::FrontendError;

#[derive(Debug, Default)]
struct StructFrame {
    /// Field and definition labels declared directly in this struct, for duplicate-checking
    /// and so `Ident` lookups here find nothing (they resolve to arcs at evaluation time, not
    /// at compile time — the compiler only needs to know a name *exists* at this depth).
    field_names: HashMap<Arc<str>, Span>,
    /// `let`/alias bindings declared directly in this struct.
    binding_names: HashMap<Arc<str>, u32>,
    next_slot: u32,
}

#[derive(Debug, Default)]
struct ClauseFrame {
    binding_names: HashMap<Arc<str>, u32>,
    next_slot: u32,
}

enum Frame {
    Struct(StructFrame),
    Clause(ClauseFrame),
}

/// What a name resolved to, one level removed from [`crate::ir::ScopeRef`] so callers can
/// decide what to do (e.g. a field-label hit vs. a binding-slot hit need different `Expr`s).
pub enum Resolution {
    Field { depth: u32 },
    Let { depth: u32, slot: u32 },
}

pub struct ScopeStack {
    frames: Vec<Frame>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    pub fn push_struct(&mut self) {
        self.frames.push(Frame::Struct(StructFrame::default()));
    }

    pub fn pop_struct(&mut self) {
        match self.frames.pop() {
            Some(Frame::Struct(_)) => {}
            _ => unreachable!("push_struct/pop_struct must be balanced"),
        }
    }

    pub fn push_clause(&mut self) {
        self.frames.push(Frame::Clause(ClauseFrame::default()));
    }

    pub fn pop_clause(&mut self) {
        match self.frames.pop() {
            Some(Frame::Clause(_)) => {}
            _ => unreachable!("push_clause/pop_clause must be balanced"),
        }
    }

    /// Registers a field or definition label in the innermost struct frame. Does not error on
    /// repeats: `a: int, a: 3` is two conjuncts for one arc, not a shadowing conflict. Only
    /// collisions with a binding name in the same frame are reported.
    pub fn declare_field(&mut self, name: &Arc<str>, span: &Span) -> Result<(), FrontendError> {
        let frame = match self.frames.last_mut() {
            Some(Frame::Struct(f)) => f,
            _ => unreachable!("declare_field called outside a struct frame"),
        };
        if frame.binding_names.contains_key(name) {
            return Err(FrontendError::DuplicateBinding {
                name: name.to_string(),
                first: span.clone(),
                second: span.clone(),
            });
        }
        frame.field_names.entry(name.clone()).or_insert_with(|| span.clone());
        Ok(())
    }

    /// Registers a `let`/alias binding in the innermost struct or clause frame, returning its
    /// slot. Errors if the name is already bound (as a field, or as another binding) in the
    /// same frame — lexical shadowing across frames is fine, but not within one (§4.1).
    pub fn declare_binding(&mut self, name: &Arc<str>, span: &Span) -> Result<u32, FrontendError> {
        match self.frames.last_mut() {
            Some(Frame::Struct(frame)) => {
                if let Some(existing) = frame.field_names.get(name) {
                    return Err(FrontendError::DuplicateBinding {
                        name: name.to_string(),
                        first: existing.clone(),
                        second: span.clone(),
                    });
                }
                if frame.binding_names.contains_key(name) {
                    return Err(FrontendError::DuplicateBinding {
                        name: name.to_string(),
                        first: span.clone(),
                        second: span.clone(),
                    });
                }
                let slot = frame.next_slot;
                frame.next_slot += 1;
                frame.binding_names.insert(name.clone(), slot);
                Ok(slot)
            }
            Some(Frame::Clause(frame)) => {
                let slot = frame.next_slot;
                frame.next_slot += 1;
                frame.binding_names.insert(name.clone(), slot);
                Ok(slot)
            }
            None => unreachable!("declare_binding called with no enclosing frame"),
        }
    }

    /// Resolves an identifier outward-in, starting at the innermost frame. Field labels are
    /// matched only against `Frame::Struct`; bindings are matched against either frame kind.
    pub fn resolve(&self, name: &str) -> Option<Resolution> {
        for (depth, frame) in self.frames.iter().rev().enumerate() {
            let depth = depth as u32;
            match frame {
                Frame::Struct(f) => {
                    if let Some(slot) = f.binding_names.get(name) {
                        return Some(Resolution::Let { depth, slot: *slot });
                    }
                    if f.field_names.contains_key(name) {
                        return Some(Resolution::Field { depth });
                    }
                }
                Frame::Clause(f) => {
                    if let Some(slot) = f.binding_names.get(name) {
                        return Some(Resolution::Let { depth, slot: *slot });
                    }
                }
            }
        }
        None
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}
