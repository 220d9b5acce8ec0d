//! The fixed-point unifier (§4.2): drives a Vertex's conjuncts to completion.

use std::sync::Arc;

use crate::interpreter::builtins::BuiltinSignature;
use crate::interpreter::config::EvalConfig;
use crate::interpreter::disjunction::{self, Disjunct};
use crate::interpreter::env::{EnvFrame, Environment};
use crate::interpreter::error::EvalError;
use crate::interpreter::vertex::{Conjunct, Matcher, Vertex, VertexRef, VertexState};
use crate::ir::value::{Bound, Scalar};
use crate::ir::{
    ArithOp, ClauseIR, CompareOp, ComprehensionBodyIR, ComprehensionIR, Declaration, Expr, Label,
    ScopeRef, StructLitIR, UnaryBoundOp,
};
use crate::position::Span;
use crate::schema::Kind;

/// Drives `v` to at least `target`. Re-entrant: a Vertex already `Evaluating` when re-entered
/// is a structural cycle tolerated by returning the current best approximation (§4.2 step 1a).
pub fn evaluate(v: &VertexRef, target: VertexState, config: &EvalConfig) -> Result<(), EvalError> {
    if v.borrow().state >= target {
        return Ok(());
    }
    if v.borrow().state == VertexState::Evaluating {
        log::trace!(target: "ligature_core::interpreter", "re-entrant reference to evaluating vertex {:?}", Vertex::path(v));
        return Ok(());
    }

    v.borrow_mut().state = VertexState::Evaluating;
    loop {
        if let Err(e) = drive_fixed_point(v, config) {
            let mut vv = v.borrow_mut();
            vv.errors.push(e.clone());
            vv.kind = Kind::BOTTOM;
            drop(vv);
            return Err(e);
        }
        match reconcile_disjuncts(v, config) {
            Ok(true) => continue,
            Ok(false) => break,
            Err(e) => {
                let mut vv = v.borrow_mut();
                vv.errors.push(e.clone());
                vv.kind = Kind::BOTTOM;
                drop(vv);
                return Err(e);
            }
        }
    }

    if target == VertexState::Finalized {
        if let Err(e) = finalize_arcs(v, config) {
            let mut vv = v.borrow_mut();
            vv.errors.push(e.clone());
            vv.kind = Kind::BOTTOM;
            drop(vv);
            return Err(e);
        }
    }

    let mut vv = v.borrow_mut();
    if vv.state < target {
        vv.state = target;
    }
    Ok(())
}

fn drive_fixed_point(v: &VertexRef, config: &EvalConfig) -> Result<(), EvalError> {
    let mut pass = 0u32;
    loop {
        config.check_cancelled()?;
        pass += 1;
        if pass > config.max_passes {
            return Err(EvalError::Cycle { path: Vertex::path(v), passes: pass, incomplete: false });
        }

        let start = v.borrow().next_unprocessed;
        let end = v.borrow().conjuncts.len();
        let retry = std::mem::take(&mut v.borrow_mut().deferred);
        let retry_count = retry.len();

        let mut still_deferred = Vec::new();
        for conjunct in retry.into_iter().chain((start..end).map(|i| v.borrow().conjuncts[i].clone())) {
            process_conjunct(v, &conjunct, config, &mut still_deferred)?;
        }
        v.borrow_mut().next_unprocessed = end;
        v.borrow_mut().deferred = still_deferred;

        let grew = v.borrow().conjuncts.len() > end;
        let remaining = v.borrow().deferred.len();
        if remaining == 0 {
            return Ok(());
        }
        // Only a pass that processed purely retried conjuncts (no freshly-discovered ones) and
        // still ends with at least as many deferred as it started with is genuinely stuck.
        let purely_retries = start == end;
        if !grew && purely_retries && remaining >= retry_count {
            let fatal: Vec<EvalError> =
                v.borrow_mut().deferred.drain(..).map(EvalError::into_fatal).collect();
            return Err(fatal.into_iter().next().expect("non-empty deferred set"));
        }
    }
}

/// Re-checks a Vertex's surviving disjuncts against the ambient context its sibling conjuncts
/// have since narrowed (§4.5, invariant 6: `(a|b) & c` distributes as `(a&c)|(b&c)`). A
/// disjunction's alternatives are evaluated against their own environment in isolation when
/// first encountered, since the rest of `v`'s conjuncts may not have run yet; once a full pass
/// leaves `v` at a fixed point, its accumulated kind/bounds are as narrow as they are going to
/// get for this round, so this prunes any alternative that no longer agrees with them. Returns
/// `Ok(true)` when pruning spliced a newly-collapsed single survivor's conjuncts into `v`,
/// meaning the caller must drive another fixed-point pass to process them.
fn reconcile_disjuncts(v: &VertexRef, config: &EvalConfig) -> Result<bool, EvalError> {
    let Some(alts) = v.borrow().disjuncts.clone() else { return Ok(false) };
    let (ambient_kind, ambient_bounds, ambient_scalar) = {
        let vv = v.borrow();
        (vv.kind, vv.leaf.bounds.clone(), vv.leaf.scalar.clone())
    };

    let mut survivors = Vec::with_capacity(alts.len());
    let mut pruned = false;
    for alt in alts {
        let alt_kind = alt.value.borrow().kind;
        if alt_kind.meet(ambient_kind).is_bottom() {
            pruned = true;
            continue;
        }
        let alt_scalar = alt.value.borrow().leaf.scalar.clone();
        if let (Some(known), Some(alt_known)) = (&ambient_scalar, &alt_scalar) {
            if known != alt_known {
                pruned = true;
                continue;
            }
        }
        let scalar_to_check = alt_scalar.or_else(|| ambient_scalar.clone());
        if let Some(scalar) = &scalar_to_check {
            let satisfies =
                ambient_bounds.iter().all(|b| b.accepts(scalar).unwrap_or(false));
            if !satisfies {
                pruned = true;
                continue;
            }
        }
        survivors.push(alt);
    }

    if !pruned {
        return Ok(false);
    }

    match disjunction::collapse(survivors) {
        disjunction::Collapsed::Bottom => Err(EvalError::Type {
            left: Kind::BOTTOM,
            right: Kind::BOTTOM,
            path: Vertex::path(v),
            positions: vec![Span::synthetic()],
        }),
        disjunction::Collapsed::Single(target) => {
            v.borrow_mut().disjuncts = None;
            splice_conjuncts(v, &target, &Environment::root(), &Span::synthetic());
            Ok(true)
        }
        disjunction::Collapsed::Many(many) => {
            v.borrow_mut().disjuncts = Some(many);
            Ok(false)
        }
    }
}

/// Processes one conjunct, mutating `v` in place. Appends to `deferred` (via the out-parameter)
/// instead of returning `Err` for `Incomplete`-classified errors, so the caller can retry them
/// on a later pass rather than treating them as fatal immediately.
fn process_conjunct(
    v: &VertexRef,
    conjunct: &Conjunct,
    config: &EvalConfig,
    deferred: &mut Vec<Conjunct>,
) -> Result<(), EvalError> {
    collect_doc_comments(v, &conjunct.span);
    match eval_conjunct_expr(v, &conjunct.expr, &conjunct.env, &conjunct.span, config) {
        Ok(()) => Ok(()),
        Err(e) if e.is_incomplete() => {
            deferred.push(conjunct.clone());
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Appends any doc comment lines attached directly to a conjunct's span onto its Vertex, in
/// source order; the value-surface dedups by text when it reads this back (§9 "Comment and
/// position carriage").
fn collect_doc_comments(v: &VertexRef, span: &Span) {
    for group in span.comments.iter().filter(|g| g.is_doc) {
        v.borrow_mut().doc_comments.extend(group.lines.iter().cloned());
    }
}

fn eval_conjunct_expr(
    v: &VertexRef,
    expr: &Expr,
    env: &Environment,
    span: &Span,
    config: &EvalConfig,
) -> Result<(), EvalError> {
    match expr {
        Expr::Value(scalar) => intersect_scalar(v, scalar.clone(), span),
        Expr::Bound(bound) => {
            intersect_kind(v, bound.kind(), span)?;
            v.borrow_mut().leaf.bounds.push(bound.clone());
            apply_bounds_to_known_scalar(v, span)
        }
        Expr::KindConstraint(kind) => intersect_kind(v, *kind, span),
        Expr::Bottom(reason) => {
            log::warn!(target: "ligature_core::interpreter", "explicit bottom reached: {:?}", reason);
            Err(EvalError::Type {
                left: Kind::BOTTOM,
                right: Kind::BOTTOM,
                path: Vertex::path(v),
                positions: vec![span.clone()],
            })
        }
        Expr::Reference(scope_ref) => {
            let target = resolve_scope_ref(env, scope_ref, config)?;
            evaluate(&target, VertexState::Partial, config)?;
            splice_conjuncts(v, &target, env, span);
            Ok(())
        }
        Expr::Selector(operand, field) => {
            let target = eval_to_vertex(operand, env, span, config)?;
            evaluate(&target, VertexState::Partial, config)?;
            let label = Label::Field(field.clone());
            let arc = target.borrow().arcs.get(&label).cloned();
            match arc {
                Some(arc) => {
                    evaluate(&arc, VertexState::Partial, config)?;
                    splice_conjuncts(v, &arc, env, span);
                    Ok(())
                }
                None => Err(EvalError::NotExists {
                    label,
                    path: Vertex::path(&target),
                    span: span.clone(),
                    incomplete: target.borrow().state != VertexState::Finalized,
                }),
            }
        }
        Expr::Index(operand, index) => {
            let target = eval_to_vertex(operand, env, span, config)?;
            evaluate(&target, VertexState::Partial, config)?;
            let idx_scratch = scratch_eval(index, env, config)?;
            let label = match idx_scratch.borrow().leaf.scalar.clone() {
                Some(Scalar::Int(i)) => Label::Index(i as usize),
                Some(Scalar::String(s)) => Label::Field(s),
                _ => {
                    return Err(EvalError::Type {
                        left: Kind::TOP,
                        right: Kind::TOP,
                        path: Vertex::path(v),
                        positions: vec![span.clone()],
                    })
                }
            };
            let arc = target.borrow().arcs.get(&label).cloned();
            match arc {
                Some(arc) => {
                    evaluate(&arc, VertexState::Partial, config)?;
                    splice_conjuncts(v, &arc, env, span);
                    Ok(())
                }
                None => Err(EvalError::NotExists {
                    label,
                    path: Vertex::path(&target),
                    span: span.clone(),
                    incomplete: true,
                }),
            }
        }
        Expr::Slice(operand, low, high) => {
            // Slicing produces a fresh list literal over the selected index range; modeled as
            // a struct/list embedding so the usual arc machinery applies.
            let target = eval_to_vertex(operand, env, span, config)?;
            evaluate(&target, VertexState::Finalized, config)?;
            let lo = match low {
                Some(e) => as_usize(&scratch_eval(e, env, config)?)?,
                None => 0,
            };
            let len = target.borrow().arc_order.len();
            let hi = match high {
                Some(e) => as_usize(&scratch_eval(e, env, config)?)?,
                None => len,
            };
            for i in lo..hi {
                if let Some(src) = target.borrow().arcs.get(&Label::Index(i)).cloned() {
                    let dst = Vertex::get_or_create_arc(v, &Label::Index(i - lo));
                    splice_conjuncts(&dst, &src, env, span);
                }
            }
            Ok(())
        }
        Expr::StructLit(lit) => process_struct_literal(v, lit, env, span, config),
        Expr::ListLit(lit) => process_list_literal(v, lit, env, span, config),
        Expr::Disjunction(alts) => {
            let mut survivors = Vec::with_capacity(alts.len());
            for alt in alts {
                let scratch = Vertex::new_scratch();
                scratch.borrow_mut().push_conjunct(Conjunct {
                    expr: Arc::new(alt.value.clone()),
                    env: env.clone(),
                    span: span.clone(),
                });
                if evaluate(&scratch, VertexState::Partial, config).is_ok() {
                    survivors.push(Disjunct { value: scratch, is_default: alt.is_default });
                }
            }
            match disjunction::collapse(survivors) {
                disjunction::Collapsed::Bottom => Err(EvalError::Type {
                    left: Kind::BOTTOM,
                    right: Kind::BOTTOM,
                    path: Vertex::path(v),
                    positions: vec![span.clone()],
                }),
                disjunction::Collapsed::Single(target) => {
                    splice_conjuncts(v, &target, env, span);
                    Ok(())
                }
                disjunction::Collapsed::Many(many) => {
                    let joined =
                        many.iter().fold(Kind::BOTTOM, |acc, d| acc.join(d.value.borrow().kind));
                    intersect_kind(v, joined, span)?;
                    v.borrow_mut().disjuncts = Some(many);
                    Ok(())
                }
            }
        }
        Expr::Unify(a, b) => {
            eval_conjunct_expr(v, a, env, span, config)?;
            eval_conjunct_expr(v, b, env, span, config)
        }
        Expr::Call(name, args) => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                let scratch = scratch_eval(arg, env, config)?;
                match scratch.borrow().leaf.scalar.clone() {
                    Some(scalar) => values.push(scalar),
                    None => return Err(incomplete_concrete(v)),
                }
            }
            let sig: Option<BuiltinSignature> = config.builtins.signature(name);
            if sig.is_none() {
                return Err(EvalError::Reference { span: span.clone(), path: Vertex::path(v) });
            }
            let result = config.builtins.call(name, &values)?;
            intersect_scalar(v, result, span)
        }
        Expr::Arith(op, a, b) => {
            let left = scratch_eval(a, env, config)?;
            let right = scratch_eval(b, env, config)?;
            let (lv, rv) = (left.borrow().leaf.scalar.clone(), right.borrow().leaf.scalar.clone());
            match (lv, rv) {
                (Some(l), Some(r)) => intersect_scalar(v, apply_arith(*op, &l, &r, span)?, span),
                _ => Err(incomplete_concrete(v)),
            }
        }
        Expr::Compare(op, a, b) => {
            let left = scratch_eval(a, env, config)?;
            let right = scratch_eval(b, env, config)?;
            let (lv, rv) = (left.borrow().leaf.scalar.clone(), right.borrow().leaf.scalar.clone());
            match (lv, rv) {
                (Some(l), Some(r)) => intersect_scalar(v, Scalar::Bool(apply_compare(*op, &l, &r)), span),
                _ => Err(incomplete_concrete(v)),
            }
        }
        Expr::Negate(inner) => {
            let scratch = scratch_eval(inner, env, config)?;
            match scratch.borrow().leaf.scalar.clone() {
                Some(Scalar::Int(i)) => intersect_scalar(v, Scalar::Int(-i), span),
                Some(Scalar::Float(f)) => intersect_scalar(v, Scalar::Float(-f), span),
                Some(_) => Err(type_conflict(v, Kind::NUMBER, span)),
                None => Err(incomplete_concrete(v)),
            }
        }
        Expr::Not(inner) => {
            let scratch = scratch_eval(inner, env, config)?;
            match scratch.borrow().leaf.scalar.clone() {
                Some(Scalar::Bool(b)) => intersect_scalar(v, Scalar::Bool(!b), span),
                Some(_) => Err(type_conflict(v, Kind::BOOL, span)),
                None => Err(incomplete_concrete(v)),
            }
        }
        Expr::UnaryBound(op, inner) => {
            let scratch = scratch_eval(inner, env, config)?;
            let scalar = match scratch.borrow().leaf.scalar.clone() {
                Some(s) => s,
                None => return Err(incomplete_concrete(v)),
            };
            let bound = unary_bound_from_scalar(*op, &scalar)?;
            intersect_kind(v, bound.kind(), span)?;
            v.borrow_mut().leaf.bounds.push(bound);
            apply_bounds_to_known_scalar(v, span)
        }
        Expr::Interpolation(parts) => {
            let mut out = String::new();
            for part in parts {
                match part {
                    crate::ir::InterpPart::Literal(s) => out.push_str(s),
                    crate::ir::InterpPart::Expr(e) => {
                        let scratch = scratch_eval(e, env, config)?;
                        match scratch.borrow().leaf.scalar.clone() {
                            Some(s) => out.push_str(&s.to_string()),
                            None => return Err(incomplete_concrete(v)),
                        }
                    }
                }
            }
            intersect_scalar(v, Scalar::String(Arc::from(out.as_str())), span)
        }
        Expr::Comprehension(comp) => expand_comprehension(v, comp, env, config),
    }
}

fn eval_to_vertex(
    expr: &Expr,
    env: &Environment,
    span: &Span,
    config: &EvalConfig,
) -> Result<VertexRef, EvalError> {
    let scratch = Vertex::new_scratch();
    scratch.borrow_mut().push_conjunct(Conjunct {
        expr: Arc::new(expr.clone()),
        env: env.clone(),
        span: span.clone(),
    });
    evaluate(&scratch, VertexState::Partial, config)?;
    Ok(scratch)
}

fn scratch_eval(expr: &Expr, env: &Environment, config: &EvalConfig) -> Result<VertexRef, EvalError> {
    let scratch = Vertex::new_scratch();
    scratch.borrow_mut().push_conjunct(Conjunct {
        expr: Arc::new(expr.clone()),
        env: env.clone(),
        span: Span::synthetic(),
    });
    evaluate(&scratch, VertexState::Finalized, config)?;
    Ok(scratch)
}

fn as_usize(v: &VertexRef) -> Result<usize, EvalError> {
    match v.borrow().leaf.scalar.clone() {
        Some(Scalar::Int(i)) if i >= 0 => Ok(i as usize),
        _ => Err(EvalError::Type {
            left: Kind::INT,
            right: Kind::TOP,
            path: Vec::new(),
            positions: Vec::new(),
        }),
    }
}

/// Structure sharing by conjunct (§4.2): copies the target's conjuncts (not its result) into
/// `v`, re-anchored to the *target's own* environment so nested references inside them still
/// resolve relative to where they were declared, not to `v`'s environment.
fn splice_conjuncts(v: &VertexRef, target: &VertexRef, _caller_env: &Environment, span: &Span) {
    let conjuncts: Vec<Conjunct> = target.borrow().conjuncts.clone();
    let (target_closed, target_permitted) = {
        let t = target.borrow();
        (t.closedness.closed, t.closedness.permitted.clone())
    };
    let mut vv = v.borrow_mut();
    for c in conjuncts {
        vv.push_conjunct(Conjunct { expr: c.expr, env: c.env, span: span.clone() });
    }
    vv.leaf.scalar = vv.leaf.scalar.clone().or_else(|| target.borrow().leaf.scalar.clone());
    for b in target.borrow().leaf.bounds.iter() {
        vv.leaf.bounds.push(b.clone());
    }
    if target_closed {
        let labels: Vec<Arc<str>> = target_permitted.map(|s| s.into_iter().collect()).unwrap_or_default();
        vv.closedness.unify_with(true, &labels, span);
    }
}

fn resolve_scope_ref(
    env: &Environment,
    scope_ref: &ScopeRef,
    config: &EvalConfig,
) -> Result<VertexRef, EvalError> {
    match scope_ref {
        ScopeRef::Field { depth, label } => match env.frame_at(*depth) {
            Some(EnvFrame::Struct { vertex, .. }) => {
                evaluate(vertex, VertexState::Partial, config)?;
                // A definition and a field share one scope namespace (`frontend::scopes`
                // declares both through `declare_field`), so the arc a bare name resolves to
                // is only known once the enclosing struct's own arcs exist: prefer the
                // definition arc, since `#Name: {...}` is what introduces a name this way.
                let definition_label = Label::Definition(label.clone());
                if let Some(arc) = vertex.borrow().arcs.get(&definition_label).cloned() {
                    return Ok(arc);
                }
                let field_label = Label::Field(label.clone());
                vertex.borrow().arcs.get(&field_label).cloned().ok_or_else(|| EvalError::NotExists {
                    label: field_label,
                    path: Vertex::path(vertex),
                    span: Span::synthetic(),
                    incomplete: true,
                })
            }
            _ => Err(EvalError::Reference { span: Span::synthetic(), path: Vec::new() }),
        },
        ScopeRef::Let { depth, slot } => match env.frame_at(*depth) {
            Some(EnvFrame::Struct { bindings, .. }) | Some(EnvFrame::Clause { bindings }) => {
                bindings.get(*slot as usize).cloned().ok_or_else(|| EvalError::Reference {
                    span: Span::synthetic(),
                    path: Vec::new(),
                })
            }
            None => Err(EvalError::Reference { span: Span::synthetic(), path: Vec::new() }),
        },
        ScopeRef::Import(expr) => {
            let scratch = Vertex::new_scratch();
            scratch.borrow_mut().push_conjunct(Conjunct {
                expr: expr.clone(),
                env: Environment::root(),
                span: Span::synthetic(),
            });
            Ok(scratch)
        }
    }
}

fn process_struct_literal(
    v: &VertexRef,
    lit: &StructLitIR,
    env: &Environment,
    span: &Span,
    config: &EvalConfig,
) -> Result<(), EvalError> {
    intersect_kind(v, Kind::STRUCT, span)?;

    let binding_vertices: Vec<VertexRef> =
        (0..lit.bindings.len()).map(|_| Vertex::new_scratch()).collect();
    let struct_env = env.push(EnvFrame::Struct { vertex: v.clone(), bindings: binding_vertices.clone() });
    for (i, expr) in lit.bindings.iter().enumerate() {
        binding_vertices[i].borrow_mut().push_conjunct(Conjunct {
            expr: Arc::new(expr.clone()),
            env: struct_env.clone(),
            span: span.clone(),
        });
    }

    let own_labels: Vec<Arc<str>> =
        lit.fields.iter().filter_map(|f| f.label.as_field_name().map(Arc::from)).collect();
    let struct_closed = lit.closed
        || lit.fields.iter().any(|f| matches!(f.label, Label::Definition(_)))
        || v.borrow().defines_closed_scope;
    v.borrow_mut().closedness.unify_with(struct_closed, &own_labels, span);

    for field in &lit.fields {
        let is_new = !v.borrow().arcs.contains_key(&field.label);
        let arc = Vertex::get_or_create_arc(v, &field.label);
        {
            let mut a = arc.borrow_mut();
            a.optional = if is_new { field.optional } else { a.optional && field.optional };
            a.push_conjunct(Conjunct {
                expr: Arc::new(field.value.clone()),
                env: struct_env.clone(),
                span: field.span.clone(),
            });
            if field.label.is_definition() {
                a.defines_closed_scope = true;
            }
        }
    }

    for dyn_field in &lit.dynamic_fields {
        let scratch = scratch_eval(&dyn_field.label, &struct_env, config)?;
        let label = match scratch.borrow().leaf.scalar.clone() {
            Some(Scalar::String(s)) => Label::Field(s),
            Some(_) => return Err(type_conflict(v, Kind::STRING, &dyn_field.span)),
            None => return Err(incomplete_concrete(v)),
        };
        let arc = Vertex::get_or_create_arc(v, &label);
        arc.borrow_mut().push_conjunct(Conjunct {
            expr: Arc::new(dyn_field.value.clone()),
            env: struct_env.clone(),
            span: dyn_field.span.clone(),
        });
    }

    for pattern in &lit.patterns {
        apply_pattern_constraint(v, pattern, &struct_env, config)?;
    }

    for embedding in &lit.embeddings {
        eval_conjunct_expr(v, embedding, &struct_env, span, config)?;
    }

    for comp in &lit.comprehensions {
        expand_comprehension(v, comp, &struct_env, config)?;
    }

    Ok(())
}

/// Evaluates a `[pattern]: constraint` declaration's label side to a [`Matcher`], records it on
/// `v` so later-created arcs pick it up via [`Vertex::get_or_create_arc`], and applies it to every
/// arc `v` already has (§3 `OptionalSet`, §4.7, §4.6 invariant 8).
fn apply_pattern_constraint(
    v: &VertexRef,
    pattern: &crate::ir::PatternConstraint,
    struct_env: &Environment,
    config: &EvalConfig,
) -> Result<(), EvalError> {
    let scratch = scratch_eval(&pattern.pattern, struct_env, config)?;
    let matcher = {
        let s = scratch.borrow();
        if let Some(Scalar::String(name)) = &s.leaf.scalar {
            Matcher::Exact(name.clone())
        } else if let Some(regex) = s.leaf.bounds.iter().find_map(|b| match b {
            Bound::Regex { .. } => Some(b.clone()),
            _ => None,
        }) {
            Matcher::Regex(regex)
        } else if s.kind == Kind::STRING {
            Matcher::AnyString
        } else {
            return Err(type_conflict(v, Kind::STRING, &pattern.span));
        }
    };

    let conjunct = Conjunct { expr: Arc::new(pattern.constraint.clone()), env: struct_env.clone(), span: pattern.span.clone() };

    let existing: Vec<VertexRef> = {
        let vv = v.borrow();
        vv.arc_order
            .iter()
            .filter(|l| l.as_field_name().is_some_and(|n| matcher.matches(n)))
            .filter_map(|l| vv.arcs.get(l).cloned())
            .collect()
    };
    for arc in existing {
        arc.borrow_mut().push_conjunct(conjunct.clone());
    }

    v.borrow_mut().pattern_constraints.push((matcher, conjunct));
    Ok(())
}

fn process_list_literal(
    v: &VertexRef,
    lit: &crate::ir::ListLitIR,
    env: &Environment,
    span: &Span,
    config: &EvalConfig,
) -> Result<(), EvalError> {
    intersect_kind(v, Kind::LIST, span)?;
    {
        let mut vv = v.borrow_mut();
        vv.list_open = vv.list_open && !lit.closed;
    }
    for (i, element) in lit.elements.iter().enumerate() {
        let arc = Vertex::get_or_create_arc(v, &Label::Index(i));
        arc.borrow_mut().push_conjunct(Conjunct {
            expr: Arc::new(element.clone()),
            env: env.clone(),
            span: span.clone(),
        });
    }
    if let Some(constraint) = &lit.ellipsis_element {
        let mut vv = v.borrow_mut();
        vv.list_element_constraint =
            Some(Conjunct { expr: Arc::new((**constraint).clone()), env: env.clone(), span: span.clone() });
        vv.list_open_from = lit.elements.len();
    }
    let _ = config;
    Ok(())
}

fn expand_comprehension(
    v: &VertexRef,
    comp: &ComprehensionIR,
    env: &Environment,
    config: &EvalConfig,
) -> Result<(), EvalError> {
    expand_clauses(v, &comp.clauses, 0, &comp.body, env, config)
}

fn expand_clauses(
    v: &VertexRef,
    clauses: &[ClauseIR],
    index: usize,
    body: &ComprehensionBodyIR,
    env: &Environment,
    config: &EvalConfig,
) -> Result<(), EvalError> {
    let Some(clause) = clauses.get(index) else {
        return emit_comprehension_body(v, body, env, config);
    };
    match clause {
        ClauseIR::If { condition } => {
            let scratch = scratch_eval(condition, env, config)?;
            match scratch.borrow().leaf.scalar.clone() {
                Some(Scalar::Bool(true)) => expand_clauses(v, clauses, index + 1, body, env, config),
                Some(Scalar::Bool(false)) => Ok(()),
                Some(_) => Err(type_conflict(v, Kind::BOOL, &Span::synthetic())),
                None => Err(incomplete_concrete(v)),
            }
        }
        ClauseIR::Let { slot: _, value } => {
            let scratch = Vertex::new_scratch();
            scratch.borrow_mut().push_conjunct(Conjunct {
                expr: Arc::new(value.clone()),
                env: env.clone(),
                span: Span::synthetic(),
            });
            let extended = env.push(EnvFrame::Clause { bindings: vec![scratch] });
            expand_clauses(v, clauses, index + 1, body, &extended, config)
        }
        ClauseIR::For { key_slot, value_slot: _, source } => {
            let source_vertex = eval_to_vertex(source, env, &Span::synthetic(), config)?;
            evaluate(&source_vertex, VertexState::Finalized, config)?;
            let labels: Vec<Label> = source_vertex.borrow().arc_order.clone();
            for label in &labels {
                let element = source_vertex.borrow().arcs.get(label).cloned().expect("arc_order entry must exist");
                let mut bindings = Vec::new();
                if key_slot.is_some() {
                    let key_scratch = Vertex::new_scratch();
                    let key_scalar = match label {
                        Label::Field(s) | Label::Definition(s) => Scalar::String(s.clone()),
                        Label::Index(i) => Scalar::Int(*i as i64),
                    };
                    key_scratch.borrow_mut().leaf.scalar = Some(key_scalar);
                    key_scratch.borrow_mut().state = VertexState::Finalized;
                    bindings.push(key_scratch);
                }
                bindings.push(element);
                let extended = env.push(EnvFrame::Clause { bindings });
                expand_clauses(v, clauses, index + 1, body, &extended, config)?;
            }
            Ok(())
        }
    }
}

/// Once every clause in the chain has bound its variables, unify the body's conjuncts into the
/// enclosing struct (or append the list element) using the fully-extended environment (§4.7).
fn emit_comprehension_body(
    v: &VertexRef,
    body: &ComprehensionBodyIR,
    env: &Environment,
    config: &EvalConfig,
) -> Result<(), EvalError> {
    match body {
        ComprehensionBodyIR::Struct { declarations, bindings } => {
            let binding_vertices: Vec<VertexRef> =
                (0..bindings.len()).map(|_| Vertex::new_scratch()).collect();
            let body_env = env.push(EnvFrame::Clause { bindings: binding_vertices.clone() });
            for (i, expr) in bindings.iter().enumerate() {
                binding_vertices[i].borrow_mut().push_conjunct(Conjunct {
                    expr: Arc::new(expr.clone()),
                    env: body_env.clone(),
                    span: Span::synthetic(),
                });
            }
            for decl in declarations {
                emit_declaration(v, decl, &body_env, config)?;
            }
            Ok(())
        }
        ComprehensionBodyIR::ListElement(expr) => {
            let next_index = v.borrow().arc_order.len();
            let arc = Vertex::get_or_create_arc(v, &Label::Index(next_index));
            arc.borrow_mut().push_conjunct(Conjunct {
                expr: Arc::new((**expr).clone()),
                env: env.clone(),
                span: Span::synthetic(),
            });
            Ok(())
        }
    }
}

fn emit_declaration(
    v: &VertexRef,
    decl: &Declaration,
    env: &Environment,
    config: &EvalConfig,
) -> Result<(), EvalError> {
    match decl {
        Declaration::Field(f) => {
            let is_new = !v.borrow().arcs.contains_key(&f.label);
            let arc = Vertex::get_or_create_arc(v, &f.label);
            let mut a = arc.borrow_mut();
            a.optional = if is_new { f.optional } else { a.optional && f.optional };
            a.push_conjunct(Conjunct {
                expr: Arc::new(f.value.clone()),
                env: env.clone(),
                span: f.span.clone(),
            });
            Ok(())
        }
        Declaration::DynamicField(f) => {
            let scratch = scratch_eval(&f.label, env, config)?;
            let label = match scratch.borrow().leaf.scalar.clone() {
                Some(Scalar::String(s)) => Label::Field(s),
                Some(_) => return Err(type_conflict(v, Kind::STRING, &f.span)),
                None => return Err(incomplete_concrete(v)),
            };
            let arc = Vertex::get_or_create_arc(v, &label);
            arc.borrow_mut().push_conjunct(Conjunct {
                expr: Arc::new(f.value.clone()),
                env: env.clone(),
                span: f.span.clone(),
            });
            Ok(())
        }
        Declaration::Embedding(e) => eval_conjunct_expr(v, e, env, &Span::synthetic(), config),
        Declaration::Comprehension(c) => expand_comprehension(v, c, env, config),
        Declaration::Pattern(p) => apply_pattern_constraint(v, p, env, config),
    }
}

fn apply_arith(op: ArithOp, l: &Scalar, r: &Scalar, span: &Span) -> Result<Scalar, EvalError> {
    match (l, r) {
        (Scalar::Int(a), Scalar::Int(b)) => Ok(Scalar::Int(match op {
            ArithOp::Add => a.wrapping_add(*b),
            ArithOp::Sub => a.wrapping_sub(*b),
            ArithOp::Mul => a.wrapping_mul(*b),
            ArithOp::Div => {
                if *b == 0 {
                    return Err(EvalError::Bounds {
                        reason: "division by zero".to_string(),
                        path: Vec::new(),
                        positions: vec![span.clone()],
                    });
                }
                a / b
            }
        })),
        _ => {
            let (a, b) = (l.as_f64(), r.as_f64());
            match (a, b) {
                (Some(a), Some(b)) => Ok(Scalar::Float(match op {
                    ArithOp::Add => a + b,
                    ArithOp::Sub => a - b,
                    ArithOp::Mul => a * b,
                    ArithOp::Div => a / b,
                })),
                _ => Err(EvalError::Type {
                    left: l.kind(),
                    right: r.kind(),
                    path: Vec::new(),
                    positions: vec![span.clone()],
                }),
            }
        }
    }
}

fn apply_compare(op: CompareOp, l: &Scalar, r: &Scalar) -> bool {
    match op {
        CompareOp::Eq => l == r,
        CompareOp::Ne => l != r,
        CompareOp::Ge | CompareOp::Gt | CompareOp::Le | CompareOp::Lt => {
            match (l.as_f64(), r.as_f64()) {
                (Some(a), Some(b)) => match op {
                    CompareOp::Ge => a >= b,
                    CompareOp::Gt => a > b,
                    CompareOp::Le => a <= b,
                    CompareOp::Lt => a < b,
                    _ => unreachable!(),
                },
                _ => false,
            }
        }
    }
}

fn unary_bound_from_scalar(op: UnaryBoundOp, scalar: &Scalar) -> Result<Bound, EvalError> {
    use crate::schema::BoundOp;
    match (op, scalar) {
        (UnaryBoundOp::Ge, _) => numeric_or_err(BoundOp::Ge, scalar),
        (UnaryBoundOp::Gt, _) => numeric_or_err(BoundOp::Gt, scalar),
        (UnaryBoundOp::Le, _) => numeric_or_err(BoundOp::Le, scalar),
        (UnaryBoundOp::Lt, _) => numeric_or_err(BoundOp::Lt, scalar),
        (UnaryBoundOp::Ne, Scalar::String(s)) => Ok(Bound::StringNe(s.clone())),
        (UnaryBoundOp::Ne, _) => numeric_or_err(BoundOp::Ne, scalar),
        (UnaryBoundOp::Matches, Scalar::String(s)) => {
            Ok(Bound::Regex { pattern: s.clone(), negated: false })
        }
        (UnaryBoundOp::NotMatches, Scalar::String(s)) => {
            Ok(Bound::Regex { pattern: s.clone(), negated: true })
        }
        (UnaryBoundOp::Matches | UnaryBoundOp::NotMatches, _) => Err(EvalError::Type {
            left: Kind::STRING,
            right: scalar.kind(),
            path: Vec::new(),
            positions: Vec::new(),
        }),
    }
}

fn numeric_or_err(op: crate::schema::BoundOp, scalar: &Scalar) -> Result<Bound, EvalError> {
    scalar.as_f64().map(|v| Bound::Numeric(op, v)).ok_or_else(|| EvalError::Type {
        left: Kind::NUMBER,
        right: scalar.kind(),
        path: Vec::new(),
        positions: Vec::new(),
    })
}

fn intersect_kind(v: &VertexRef, kind: Kind, span: &Span) -> Result<(), EvalError> {
    let mut vv = v.borrow_mut();
    let narrowed = vv.kind.meet(kind);
    if narrowed.is_bottom() && !vv.kind.is_bottom() {
        let left = vv.kind;
        drop(vv);
        return Err(EvalError::Type { left, right: kind, path: Vertex::path(v), positions: vec![span.clone()] });
    }
    vv.kind = narrowed;
    Ok(())
}

fn intersect_scalar(v: &VertexRef, scalar: Scalar, span: &Span) -> Result<(), EvalError> {
    intersect_kind(v, scalar.kind(), span)?;
    let mut vv = v.borrow_mut();
    match &vv.leaf.scalar {
        None => {
            vv.leaf.scalar = Some(scalar);
            drop(vv);
            apply_bounds_to_known_scalar(v, span)
        }
        Some(existing) if *existing == scalar => Ok(()),
        Some(existing) => {
            let (l, r) = (existing.kind(), scalar.kind());
            drop(vv);
            Err(EvalError::Type { left: l, right: r, path: Vertex::path(v), positions: vec![span.clone()] })
        }
    }
}

fn apply_bounds_to_known_scalar(v: &VertexRef, span: &Span) -> Result<(), EvalError> {
    let (scalar, bounds) = {
        let vv = v.borrow();
        (vv.leaf.scalar.clone(), vv.leaf.bounds.clone())
    };
    let Some(scalar) = scalar else { return Ok(()) };
    for bound in &bounds {
        let ok = bound.accepts(&scalar).map_err(|e| EvalError::Bounds {
            reason: e.to_string(),
            path: Vertex::path(v),
            positions: vec![span.clone()],
        })?;
        if !ok {
            return Err(EvalError::Bounds {
                reason: format!("{scalar} does not satisfy {bound}"),
                path: Vertex::path(v),
                positions: vec![span.clone()],
            });
        }
    }
    Ok(())
}

fn incomplete_concrete(v: &VertexRef) -> EvalError {
    EvalError::Concrete { path: Vertex::path(v), incomplete: true }
}

fn type_conflict(v: &VertexRef, expected: Kind, span: &Span) -> EvalError {
    EvalError::Type { left: expected, right: v.borrow().kind, path: Vertex::path(v), positions: vec![span.clone()] }
}

fn finalize_arcs(v: &VertexRef, config: &EvalConfig) -> Result<(), EvalError> {
    let (constraint, open_from) = {
        let vv = v.borrow();
        (vv.list_element_constraint.clone(), vv.list_open_from)
    };
    if let Some(constraint) = constraint {
        let trailing: Vec<usize> = {
            let vv = v.borrow();
            vv.arc_order
                .iter()
                .filter_map(|l| match l {
                    Label::Index(i) if *i >= open_from => Some(*i),
                    _ => None,
                })
                .collect()
        };
        for i in trailing {
            let arc = Vertex::get_or_create_arc(v, &Label::Index(i));
            arc.borrow_mut().push_conjunct(constraint.clone());
        }
    }
    let arcs: Vec<VertexRef> = {
        let vv = v.borrow();
        vv.arc_order.iter().filter_map(|l| vv.arcs.get(l).cloned()).collect()
    };
    for arc in arcs {
        let label = arc.borrow().label.clone();
        if let Some(label) = label {
            if let Some(name) = label.as_field_name() {
                if !v.borrow().closedness.permits(name) && !v.borrow().matches_pattern(name) {
                    return Err(EvalError::Closed {
                        label,
                        path: Vertex::path(v),
                        closed_at: v.borrow().closedness.closed_at.clone().unwrap_or_else(Span::synthetic),
                        introduced_at: Span::synthetic(),
                    });
                }
            }
        }
        evaluate(&arc, VertexState::Finalized, config)?;
    }
    Ok(())
}
