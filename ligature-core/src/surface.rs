//! The read-only value-surface API exposed to encoders and the CLI (§6 Output: Value-surface
//! API). Every operation here only reads a [`VertexRef`] already driven to the caller's
//! requested [`VertexState`] by [`crate::interpreter::evaluate`]; nothing in this module
//! mutates the graph.

use crate::interpreter::{dedup_errors, EvalError, Vertex, VertexRef, VertexState};
use crate::ir::Label;
use crate::position::{Position, Span};
use crate::schema::Kind;

/// A single lookup step; re-uses [`Label`] since a Vertex's arcs are already keyed by it.
pub type Selector = Label;

pub fn kind(v: &VertexRef) -> Kind {
    v.borrow().kind
}

/// A value with a single inhabitant: no outstanding disjunction, no bound without a concrete
/// scalar to check it against, and (recursively, skipping still-unset optional fields) every
/// reachable arc concrete too.
pub fn is_concrete(v: &VertexRef) -> bool {
    let vv = v.borrow();
    if vv.kind.is_bottom() || vv.disjuncts.is_some() {
        return false;
    }
    if vv.kind == Kind::STRUCT || vv.kind == Kind::LIST {
        let arcs: Vec<VertexRef> = vv
            .arc_order
            .iter()
            .filter_map(|l| vv.arcs.get(l).map(|a| (l, a.clone())))
            .filter(|(_, a)| !a.borrow().optional)
            .map(|(_, a)| a)
            .collect();
        drop(vv);
        return arcs.iter().all(is_concrete);
    }
    vv.leaf.scalar.is_some()
}

/// Resolves a `Many` disjunction to its unique marked default, per the marked-default rule
/// (§4.5, §9 resolved open question (b)). Returns `(v, false)` unchanged when `v` is not a
/// surviving multi-alternative disjunction, or when the default set isn't a singleton.
pub fn default(v: &VertexRef) -> (VertexRef, bool) {
    let disjuncts = v.borrow().disjuncts.clone();
    match disjuncts {
        None => (v.clone(), false),
        Some(alts) => match crate::interpreter::default_set(&alts).as_slice() {
            [only] => (only.value.clone(), true),
            _ => (v.clone(), false),
        },
    }
}

/// Looks up a single arc by label, creating nothing. `NotExists` is `incomplete` unless `v`
/// has already reached [`VertexState::Finalized`] (§7).
pub fn lookup(v: &VertexRef, selector: &Selector) -> Result<VertexRef, EvalError> {
    let vv = v.borrow();
    match vv.arcs.get(selector) {
        Some(arc) => Ok(arc.clone()),
        None => {
            let incomplete = vv.state < VertexState::Finalized;
            drop(vv);
            Err(EvalError::NotExists {
                label: selector.clone(),
                path: Vertex::path(v),
                span: Span::synthetic(),
                incomplete,
            })
        }
    }
}

pub struct FieldFilter {
    pub include_optional: bool,
    pub include_definitions: bool,
}

impl Default for FieldFilter {
    fn default() -> Self {
        Self { include_optional: true, include_definitions: false }
    }
}

/// Every struct field arc, in declaration order, subject to `filter` (§6, §8 invariant 8).
pub fn iter_fields(v: &VertexRef, filter: &FieldFilter) -> Vec<(Label, VertexRef)> {
    let vv = v.borrow();
    vv.arc_order
        .iter()
        .filter(|l| l.as_field_name().is_some())
        .filter(|l| filter.include_definitions || !l.is_definition())
        .filter_map(|l| vv.arcs.get(l).map(|a| (l.clone(), a.clone())))
        .filter(|(_, a)| filter.include_optional || !a.borrow().optional)
        .collect()
}

/// Every list element arc, in index order.
pub fn iter_list(v: &VertexRef) -> Vec<VertexRef> {
    let vv = v.borrow();
    vv.arc_order
        .iter()
        .filter(|l| matches!(l, Label::Index(_)))
        .filter_map(|l| vv.arcs.get(l).cloned())
        .collect()
}

/// Structural equality: two Disjunctions are equal iff their finalized alternatives are equal
/// as sets (§6).
pub fn equals(a: &VertexRef, b: &VertexRef) -> bool {
    if std::rc::Rc::ptr_eq(a, b) {
        return true;
    }
    let (av, bv) = (a.borrow(), b.borrow());
    if av.kind != bv.kind {
        return false;
    }
    match (&av.disjuncts, &bv.disjuncts) {
        (Some(ad), Some(bd)) => {
            let (ad, bd) = (ad.clone(), bd.clone());
            drop(av);
            drop(bv);
            ad.len() == bd.len()
                && ad.iter().all(|x| bd.iter().any(|y| equals(&x.value, &y.value)))
        }
        (None, None) => {
            if av.kind == Kind::STRUCT {
                if av.arc_order.len() != bv.arc_order.len() {
                    return false;
                }
                let pairs: Option<Vec<(VertexRef, VertexRef)>> = av
                    .arc_order
                    .iter()
                    .map(|l| match (av.arcs.get(l), bv.arcs.get(l)) {
                        (Some(x), Some(y)) => Some((x.clone(), y.clone())),
                        _ => None,
                    })
                    .collect();
                drop(av);
                drop(bv);
                matches!(pairs, Some(ref p) if p.iter().all(|(x, y)| equals(x, y)))
            } else if av.kind == Kind::LIST {
                if av.arc_order.len() != bv.arc_order.len() {
                    return false;
                }
                let pairs: Vec<(VertexRef, VertexRef)> = av
                    .arc_order
                    .iter()
                    .zip(bv.arc_order.iter())
                    .filter_map(|(la, lb)| Some((av.arcs.get(la)?.clone(), bv.arcs.get(lb)?.clone())))
                    .collect();
                let complete = pairs.len() == av.arc_order.len();
                drop(av);
                drop(bv);
                complete && pairs.iter().all(|(x, y)| equals(x, y))
            } else {
                av.leaf.scalar == bv.leaf.scalar
            }
        }
        _ => false,
    }
}

pub struct ValidateOptions {
    pub require_concrete: bool,
    pub require_final: bool,
}

/// Collects every fatal error reachable from `v`, deduplicated and in deterministic
/// depth-first/source order (§7 "User-visible behavior"), additionally synthesizing a
/// `Concrete` error per unconcrete reachable Vertex when `require_concrete` is set.
pub fn validate(v: &VertexRef, opts: &ValidateOptions) -> Result<(), Vec<EvalError>> {
    let mut errors = Vec::new();
    collect_errors(v, opts, &mut std::collections::HashSet::new(), &mut errors);
    let errors = dedup_errors(errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn collect_errors(
    v: &VertexRef,
    opts: &ValidateOptions,
    seen: &mut std::collections::HashSet<*const std::cell::RefCell<Vertex>>,
    out: &mut Vec<EvalError>,
) {
    let ptr = std::rc::Rc::as_ptr(v);
    if !seen.insert(ptr) {
        return;
    }
    let (own_errors, children, state): (Vec<EvalError>, Vec<VertexRef>, VertexState) = {
        let vv = v.borrow();
        let children = vv.arc_order.iter().filter_map(|l| vv.arcs.get(l).cloned()).collect();
        (vv.errors.clone(), children, vv.state)
    };
    out.extend(own_errors);
    if opts.require_final && state < VertexState::Finalized {
        out.push(EvalError::Concrete { path: Vertex::path(v), incomplete: true });
    }
    if opts.require_concrete && !is_concrete(v) {
        out.push(EvalError::Concrete { path: Vertex::path(v), incomplete: false });
    }
    for child in children {
        collect_errors(&child, opts, seen, out);
    }
}

/// Every doc comment attached to any conjunct this Vertex has processed, in source order,
/// deduplicated by text (§9 "Comment and position carriage").
pub fn doc_comments(v: &VertexRef) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    v.borrow().doc_comments.iter().filter(|line| seen.insert((*line).clone())).cloned().collect()
}

pub fn path(v: &VertexRef) -> Vec<Label> {
    Vertex::path(v)
}

/// The earliest source position among this Vertex's own conjuncts' spans, falling back to a
/// synthetic position for scratch/root Vertices with none.
pub fn source_position(v: &VertexRef) -> Position {
    v.borrow()
        .conjuncts
        .iter()
        .map(|c| c.span.start)
        .min()
        .unwrap_or_else(Position::synthetic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::{evaluate, EmptyBuiltinRegistry, EvalConfig};
    use crate::ir::value::Scalar;
    use crate::ir::Expr;
    use std::sync::Arc;

    fn scalar_vertex(s: Scalar) -> VertexRef {
        let v = Vertex::new_root();
        v.borrow_mut().push_conjunct(crate::interpreter::Conjunct {
            expr: Arc::new(Expr::Value(s)),
            env: crate::interpreter::Environment::root(),
            span: Span::synthetic(),
        });
        let config = EvalConfig::new(Arc::new(EmptyBuiltinRegistry));
        evaluate(&v, VertexState::Finalized, &config).unwrap();
        v
    }

    #[test]
    fn concrete_scalar_is_concrete() {
        let v = scalar_vertex(Scalar::Int(3));
        assert!(is_concrete(&v));
        assert_eq!(kind(&v), Kind::INT);
    }

    #[test]
    fn equals_is_structural_not_pointer() {
        let a = scalar_vertex(Scalar::String(Arc::from("x")));
        let b = scalar_vertex(Scalar::String(Arc::from("x")));
        assert!(equals(&a, &b));
    }

    #[test]
    fn lookup_missing_field_reports_not_exists() {
        let v = Vertex::new_root();
        let config = EvalConfig::new(Arc::new(EmptyBuiltinRegistry));
        evaluate(&v, VertexState::Finalized, &config).unwrap();
        let err = lookup(&v, &Label::Field(Arc::from("missing"))).unwrap_err();
        assert!(matches!(err, EvalError::NotExists { incomplete: false, .. }));
    }
}
