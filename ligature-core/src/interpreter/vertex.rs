//! The mutable evaluation graph (§3 Vertex).

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::interpreter::env::Environment;
use crate::ir::value::{Bound, Scalar};
use crate::ir::{Expr, Label};
use crate::position::Span;
use crate::schema::Kind;

pub type VertexRef = Rc<RefCell<Vertex>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VertexState {
    Unprocessed,
    Partial,
    Evaluating,
    Finalized,
}

/// One contribution to a Vertex's value: an IR expression plus the environment its references
/// resolve against. Cheap to clone — both fields are reference-counted.
#[derive(Clone)]
pub struct Conjunct {
    pub expr: Arc<Expr>,
    pub env: Environment,
    pub span: Span,
}

/// The accumulated leaf-level constraint on a Vertex: every concrete scalar and bound seen so
/// far. `Vertex::finalize` reconciles this set into a single result or a [`crate::interpreter::error::EvalError::Type`]/
/// `Bounds` conflict.
#[derive(Debug, Clone, Default)]
pub struct LeafAccumulator {
    pub scalar: Option<Scalar>,
    pub bounds: Vec<Bound>,
}

/// A struct Vertex's closedness, accumulated across every contributing conjunct (§4.6).
#[derive(Debug, Clone, Default)]
pub struct Closedness {
    pub closed: bool,
    /// Labels explicitly permitted by some closed contributor; `None` until the first closed
    /// contributor is seen, since an all-open struct has no bound on permitted labels at all.
    pub permitted: Option<std::collections::BTreeSet<Arc<str>>>,
    pub closed_at: Option<Span>,
}

impl Closedness {
    /// Folds in one contributing struct's own closedness, widening `permitted` to the union of
    /// every closed contributor's label set (§4.6: "the union of permitted-label sets of *all*
    /// contributing closed structures is permitted").
    pub fn unify_with(&mut self, other_closed: bool, other_labels: &[Arc<str>], span: &Span) {
        if other_closed {
            self.closed = true;
            self.closed_at.get_or_insert_with(|| span.clone());
            let set = self.permitted.get_or_insert_with(Default::default);
            set.extend(other_labels.iter().cloned());
        }
    }

    pub fn permits(&self, label: &str) -> bool {
        match &self.permitted {
            None => true,
            Some(set) => set.iter().any(|l| l.as_ref() == label),
        }
    }
}

/// What a `[pattern]: constraint` declaration's label-side evaluates to (§3, §4.7).
#[derive(Debug, Clone)]
pub enum Matcher {
    /// `["foo"]: ...` — the pattern is a single concrete string, matching only that label.
    Exact(Arc<str>),
    /// `[string]: ...` — the bare `string` keyword, matching every field label.
    AnyString,
    /// `[=~"^foo"]: ...` / `[!~"^foo"]: ...` — matches labels the regex accepts.
    Regex(Bound),
}

impl Matcher {
    pub fn matches(&self, label: &str) -> bool {
        match self {
            Matcher::Exact(s) => s.as_ref() == label,
            Matcher::AnyString => true,
            Matcher::Regex(bound) => bound.accepts(&Scalar::String(Arc::from(label))).unwrap_or(false),
        }
    }
}

pub struct Vertex {
    pub parent: Option<Weak<RefCell<Vertex>>>,
    pub label: Option<Label>,
    pub conjuncts: Vec<Conjunct>,
    /// How many of `conjuncts` have already been processed at least once; conjuncts appended
    /// during expansion (comprehensions, embeddings) land after this cursor and are picked up
    /// on the next pass.
    pub next_unprocessed: usize,
    pub deferred: Vec<Conjunct>,
    pub state: VertexState,
    pub kind: Kind,
    pub leaf: LeafAccumulator,
    pub arc_order: Vec<Label>,
    pub arcs: std::collections::HashMap<Label, VertexRef>,
    pub closedness: Closedness,
    /// Set once, when this arc is created for a [`Label::Definition`] (§4.6): every struct body
    /// that ever contributes to this arc treats its own fields as the closed-by-default
    /// permitted set, independent of that body's own `closed` flag or a `splice_conjuncts`
    /// contributor's closedness (which propagates into `closedness` directly, not this flag).
    pub defines_closed_scope: bool,
    /// Every `[pattern]: constraint` declared by a contributing struct literal, in declaration
    /// order; applied to each matching arc once up front and again by
    /// [`Vertex::get_or_create_arc`] whenever a later contributor creates a new matching arc.
    pub pattern_constraints: Vec<(Matcher, Conjunct)>,
    /// Whether this arc is still optional, i.e. every field declaration that has contributed
    /// to it so far marked it `?`. A single required contributor makes it required for good;
    /// only meaningful for arcs reached by [`Label::Field`]/[`Label::Definition`] (§4.6
    /// resolved open question (a): optional fields still contribute their label to a closed
    /// struct's permitted set regardless of this flag).
    pub optional: bool,
    pub list_open: bool,
    pub list_element_constraint: Option<Conjunct>,
    /// The index an ellipsis's element constraint starts applying from, i.e. the declaring
    /// literal's own `elements.len()`; only meaningful alongside `list_element_constraint`.
    pub list_open_from: usize,
    pub disjuncts: Option<Vec<crate::interpreter::disjunction::Disjunct>>,
    pub doc_comments: Vec<String>,
    pub errors: Vec<crate::interpreter::error::EvalError>,
}

impl Vertex {
    pub fn new_root() -> VertexRef {
        Rc::new(RefCell::new(Self::blank(None, None)))
    }

    pub fn new_child(parent: &VertexRef, label: Label) -> VertexRef {
        Rc::new(RefCell::new(Self::blank(Some(Rc::downgrade(parent)), Some(label))))
    }

    /// A Vertex with no parent used to host one opaque imported/scratch expression; never
    /// reachable by path from any root (§4.1 import handling).
    pub fn new_scratch() -> VertexRef {
        Rc::new(RefCell::new(Self::blank(None, None)))
    }

    fn blank(parent: Option<Weak<RefCell<Vertex>>>, label: Option<Label>) -> Self {
        Vertex {
            parent,
            label,
            conjuncts: Vec::new(),
            next_unprocessed: 0,
            deferred: Vec::new(),
            state: VertexState::Unprocessed,
            kind: Kind::TOP,
            leaf: LeafAccumulator::default(),
            arc_order: Vec::new(),
            arcs: std::collections::HashMap::new(),
            closedness: Closedness::default(),
            defines_closed_scope: false,
            pattern_constraints: Vec::new(),
            optional: false,
            list_open: true,
            list_element_constraint: None,
            list_open_from: 0,
            disjuncts: None,
            doc_comments: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn push_conjunct(&mut self, conjunct: Conjunct) {
        self.conjuncts.push(conjunct);
    }

    pub fn get_or_create_arc(this: &VertexRef, label: &Label) -> VertexRef {
        if let Some(existing) = this.borrow().arcs.get(label) {
            return existing.clone();
        }
        let child = Vertex::new_child(this, label.clone());
        let matching: Vec<Conjunct> = if let Some(name) = label.as_field_name() {
            let v = this.borrow();
            v.pattern_constraints
                .iter()
                .filter(|(m, _)| m.matches(name))
                .map(|(_, c)| c.clone())
                .collect()
        } else {
            Vec::new()
        };
        {
            let mut child_mut = child.borrow_mut();
            for c in matching {
                child_mut.push_conjunct(c);
            }
        }
        let mut v = this.borrow_mut();
        v.arc_order.push(label.clone());
        v.arcs.insert(label.clone(), child.clone());
        child
    }

    /// Whether `label` is permitted by any `[pattern]: constraint` contributed so far, independent
    /// of [`Closedness::permitted`] (§4.6 invariant 8: pattern-matched labels are always allowed
    /// through a closed struct, regardless of its explicit permitted set).
    pub fn matches_pattern(&self, label: &str) -> bool {
        self.pattern_constraints.iter().any(|(m, _)| m.matches(label))
    }

    pub fn path(this: &VertexRef) -> Vec<Label> {
        let mut labels = Vec::new();
        let mut current = this.clone();
        loop {
            let label = current.borrow().label.clone();
            let parent = current.borrow().parent.clone();
            match (label, parent.and_then(|p| p.upgrade())) {
                (Some(l), Some(p)) => {
                    labels.push(l);
                    current = p;
                }
                _ => break,
            }
        }
        labels.reverse();
        labels
    }
}
