//! End-to-end scenarios built directly at the IR level (no parser is in scope, so these stand
//! in for the surface syntax given alongside each scenario) and driven through the full
//! evaluator and value-surface API.

use std::sync::Arc;

use ligature_core::interpreter::{
    evaluate, Conjunct, EmptyBuiltinRegistry, EvalConfig, EvalError, Environment, Vertex,
    VertexRef, VertexState,
};
use ligature_core::ir::value::{Bound, Scalar};
use ligature_core::ir::{
    ArithOp, ClauseIR, CompareOp, ComprehensionBodyIR, ComprehensionIR, Declaration,
    DynamicFieldDecl, Expr, FieldDecl, Label, ListLitIR, ScopeRef, StructLitIR, UnaryBoundOp,
};
use ligature_core::position::Span;
use ligature_core::surface;

fn field(name: &str, value: Expr) -> FieldDecl {
    FieldDecl { label: Label::Field(Arc::from(name)), optional: false, value, span: Span::synthetic() }
}

fn def_field(name: &str, value: Expr) -> FieldDecl {
    FieldDecl { label: Label::Definition(Arc::from(name)), optional: false, value, span: Span::synthetic() }
}

fn int(i: i64) -> Expr {
    Expr::Value(Scalar::Int(i))
}

fn sibling(depth: u32, label: &str) -> Expr {
    Expr::Reference(ScopeRef::Field { depth, label: Arc::from(label) })
}

fn unify(a: Expr, b: Expr) -> Expr {
    Expr::Unify(Box::new(a), Box::new(b))
}

fn empty_struct(fields: Vec<FieldDecl>) -> StructLitIR {
    StructLitIR {
        fields,
        dynamic_fields: Vec::new(),
        embeddings: Vec::new(),
        comprehensions: Vec::new(),
        patterns: Vec::new(),
        bindings: Vec::new(),
        closed: false,
    }
}

/// Seeds a fresh root Vertex with `root` as its sole conjunct and drives it to Finalized,
/// the way [`ligature::evaluate`] does for a caller that has already compiled a program.
fn run(root: StructLitIR) -> (VertexRef, Result<(), EvalError>) {
    let v = Vertex::new_root();
    v.borrow_mut().push_conjunct(Conjunct {
        expr: Arc::new(Expr::StructLit(root)),
        env: Environment::root(),
        span: Span::synthetic(),
    });
    let config = EvalConfig::new(Arc::new(EmptyBuiltinRegistry));
    let result = evaluate(&v, VertexState::Finalized, &config);
    (v, result)
}

fn int_value(v: &VertexRef) -> i64 {
    match v.borrow().leaf.scalar.clone() {
        Some(Scalar::Int(i)) => i,
        other => panic!("expected concrete Int, got {other:?}"),
    }
}

#[test]
fn s1_basic_unification() {
    let (root, result) = run(empty_struct(vec![field("a", unify(Expr::KindConstraint(ligature_core::schema::Kind::INT), int(3)))]));
    assert!(result.is_ok());
    let a = surface::lookup(&root, &Label::Field(Arc::from("a"))).unwrap();
    assert!(surface::is_concrete(&a));
    assert_eq!(surface::kind(&a), ligature_core::schema::Kind::INT);
    assert_eq!(int_value(&a), 3);
}

#[test]
fn s1_nested_field_path_is_recorded() {
    let (root, result) = run(empty_struct(vec![field(
        "outer",
        Expr::StructLit(empty_struct(vec![field("inner", int(5))])),
    )]));
    assert!(result.is_ok());
    let outer = surface::lookup(&root, &Label::Field(Arc::from("outer"))).unwrap();
    let inner = surface::lookup(&outer, &Label::Field(Arc::from("inner"))).unwrap();
    similar_asserts::assert_eq!(
        surface::path(&inner),
        vec![Label::Field(Arc::from("outer")), Label::Field(Arc::from("inner"))]
    );
}

#[test]
fn s2_conflicting_concretes() {
    let (root, result) = run(empty_struct(vec![field("x", int(1)), field("x", int(2))]));
    assert!(result.is_err() || surface::validate(&root, &surface::ValidateOptions { require_concrete: true, require_final: true }).is_err());
    let x = surface::lookup(&root, &Label::Field(Arc::from("x"))).unwrap();
    assert!(!surface::is_concrete(&x));
}

#[test]
fn s3_reference_and_bounds_satisfied() {
    let v_bound = unify(
        Expr::UnaryBound(UnaryBoundOp::Ge, Box::new(sibling(0, "min"))),
        Expr::UnaryBound(UnaryBoundOp::Le, Box::new(sibling(0, "max"))),
    );
    let (root, result) = run(empty_struct(vec![
        field("min", int(1)),
        field("max", int(10)),
        field("v", v_bound.clone()),
        field("v", int(7)),
    ]));
    assert!(result.is_ok());
    let v = surface::lookup(&root, &Label::Field(Arc::from("v"))).unwrap();
    assert!(surface::is_concrete(&v));
    assert_eq!(int_value(&v), 7);
}

#[test]
fn s3_reference_and_bounds_violated() {
    let v_bound = unify(
        Expr::UnaryBound(UnaryBoundOp::Ge, Box::new(sibling(0, "min"))),
        Expr::UnaryBound(UnaryBoundOp::Le, Box::new(sibling(0, "max"))),
    );
    let (root, result) = run(empty_struct(vec![
        field("min", int(1)),
        field("max", int(10)),
        field("v", v_bound),
        field("v", int(11)),
    ]));
    assert!(result.is_err());
    assert!(matches!(result.unwrap_err(), EvalError::Bounds { .. }));
    let v = surface::lookup(&root, &Label::Field(Arc::from("v"))).unwrap();
    assert!(!surface::is_concrete(&v));
}

#[test]
fn s4_disjunction_with_default() {
    let port_decl = Expr::Disjunction(vec![
        ligature_core::ir::DisjunctAlt { value: int(8080), is_default: true },
        ligature_core::ir::DisjunctAlt { value: Expr::KindConstraint(ligature_core::schema::Kind::INT), is_default: false },
    ]);
    let (root, result) = run(empty_struct(vec![field("port", port_decl)]));
    assert!(result.is_ok());
    let port = surface::lookup(&root, &Label::Field(Arc::from("port"))).unwrap();
    let (resolved, had_default) = surface::default(&port);
    assert!(had_default);
    assert_eq!(int_value(&resolved), 8080);
}

#[test]
fn s4_disjunction_narrowed_past_default_has_no_default() {
    let port_decl = unify(
        Expr::Disjunction(vec![
            ligature_core::ir::DisjunctAlt { value: int(8080), is_default: true },
            ligature_core::ir::DisjunctAlt { value: Expr::KindConstraint(ligature_core::schema::Kind::INT), is_default: false },
        ]),
        Expr::UnaryBound(UnaryBoundOp::Gt, Box::new(int(9000))),
    );
    let (root, result) = run(empty_struct(vec![field("port", port_decl)]));
    assert!(result.is_ok());
    let port = surface::lookup(&root, &Label::Field(Arc::from("port"))).unwrap();
    let (_, had_default) = surface::default(&port);
    assert!(!had_default);
}

#[test]
fn s5_closed_struct_rejects_extra_field() {
    // `#S: { a: int }; x: #S & { a: 1, b: 2 }`.
    let s_def = def_field(
        "S",
        Expr::StructLit(empty_struct(vec![field("a", Expr::KindConstraint(ligature_core::schema::Kind::INT))])),
    );
    let x_value = unify(
        sibling(0, "S"),
        Expr::StructLit(empty_struct(vec![field("a", int(1)), field("b", int(2))])),
    );
    let root = empty_struct(vec![s_def, field("x", x_value)]);
    let (root, result) = run(root);
    assert!(result.is_err());
    assert!(matches!(result.unwrap_err(), EvalError::Closed { .. }));
    let x = surface::lookup(&root, &Label::Field(Arc::from("x"))).unwrap();
    let a = surface::lookup(&x, &Label::Field(Arc::from("a"))).unwrap();
    assert_eq!(int_value(&a), 1);
}

#[test]
fn s9_pattern_constraint_binds_matching_fields_only() {
    // `{ [=~"^x_"]: >0, x_a: 5, x_b: -1, y: -3 }`. The pattern only touches labels starting
    // with `x_`, so `y` is left alone while `x_b` is rejected for violating the bound.
    let mut lit = empty_struct(vec![field("x_a", int(5)), field("x_b", int(-1)), field("y", int(-3))]);
    lit.patterns.push(ligature_core::ir::PatternConstraint {
        pattern: Expr::Bound(Bound::Regex { pattern: Arc::from("^x_"), negated: false }),
        constraint: Expr::Bound(Bound::Numeric(ligature_core::schema::BoundOp::Gt, 0.0)),
        span: Span::synthetic(),
    });
    let (root, result) = run(lit);
    assert!(result.is_err());
    let y = surface::lookup(&root, &Label::Field(Arc::from("y"))).unwrap();
    assert_eq!(int_value(&y), -3);
    let x_a = surface::lookup(&root, &Label::Field(Arc::from("x_a"))).unwrap();
    assert_eq!(int_value(&x_a), 5);
}

#[test]
fn s9_pattern_constraint_exempts_matching_label_from_closed_struct() {
    // `close({ [string]: int, a: 1 }) & { z: 5 }`. `z` is introduced by the unified-in struct,
    // after closedness is already in force, yet the bare `string` pattern still lets it through.
    let mut closed_lit = empty_struct(vec![field("a", int(1))]);
    closed_lit.closed = true;
    closed_lit.patterns.push(ligature_core::ir::PatternConstraint {
        pattern: Expr::KindConstraint(ligature_core::schema::Kind::STRING),
        constraint: Expr::KindConstraint(ligature_core::schema::Kind::INT),
        span: Span::synthetic(),
    });
    let outer_value = unify(
        Expr::StructLit(closed_lit),
        Expr::StructLit(empty_struct(vec![field("z", int(5))])),
    );
    let root = empty_struct(vec![field("outer", outer_value)]);
    let (root, result) = run(root);
    assert!(result.is_ok());
    let outer = surface::lookup(&root, &Label::Field(Arc::from("outer"))).unwrap();
    let a = surface::lookup(&outer, &Label::Field(Arc::from("a"))).unwrap();
    let z = surface::lookup(&outer, &Label::Field(Arc::from("z"))).unwrap();
    assert_eq!(int_value(&a), 1);
    assert_eq!(int_value(&z), 5);
}

#[test]
fn s6_comprehension_over_struct() {
    let src = empty_struct(vec![field("a", int(1)), field("b", int(2))]);
    let comprehension = ComprehensionIR {
        clauses: vec![ClauseIR::For {
            key_slot: Some(0),
            value_slot: 1,
            source: sibling(1, "src"),
        }],
        body: ComprehensionBodyIR::Struct {
            declarations: vec![Declaration::DynamicField(DynamicFieldDecl {
                label: Expr::Reference(ScopeRef::Let { depth: 1, slot: 0 }),
                optional: false,
                value: Expr::Arith(
                    ArithOp::Mul,
                    Box::new(Expr::Reference(ScopeRef::Let { depth: 1, slot: 1 })),
                    Box::new(int(10)),
                ),
                span: Span::synthetic(),
            })],
            bindings: Vec::new(),
        },
        span: Span::synthetic(),
    };
    let mut out = empty_struct(Vec::new());
    out.comprehensions.push(comprehension);
    let root = empty_struct(vec![field("src", Expr::StructLit(src)), field("out", Expr::StructLit(out))]);
    let (root, result) = run(root);
    assert!(result.is_ok());
    let out = surface::lookup(&root, &Label::Field(Arc::from("out"))).unwrap();
    let a = surface::lookup(&out, &Label::Field(Arc::from("a"))).unwrap();
    let b = surface::lookup(&out, &Label::Field(Arc::from("b"))).unwrap();
    assert_eq!(int_value(&a), 10);
    assert_eq!(int_value(&b), 20);
    let fields = surface::iter_fields(&out, &surface::FieldFilter::default());
    assert_eq!(fields.len(), 2);
}

#[test]
fn s7_list_unification_and_open_lists() {
    let declared = ListLitIR {
        elements: vec![
            Expr::KindConstraint(ligature_core::schema::Kind::INT),
            Expr::KindConstraint(ligature_core::schema::Kind::INT),
        ],
        ellipsis_element: Some(Box::new(Expr::KindConstraint(ligature_core::schema::Kind::STRING))),
        closed: false,
    };
    let concrete = ListLitIR {
        elements: vec![int(1), int(2), Expr::Value(Scalar::String(Arc::from("a"))), Expr::Value(Scalar::String(Arc::from("b")))],
        ellipsis_element: None,
        closed: true,
    };
    let xs_value = unify(Expr::ListLit(declared), Expr::ListLit(concrete));
    let (root, result) = run(empty_struct(vec![field("xs", xs_value)]));
    assert!(result.is_ok());
    let xs = surface::lookup(&root, &Label::Field(Arc::from("xs"))).unwrap();
    assert!(surface::is_concrete(&xs));
    let elements = surface::iter_list(&xs);
    assert_eq!(elements.len(), 4);
    assert_eq!(int_value(&elements[0]), 1);
    assert_eq!(int_value(&elements[1]), 2);
    match elements[2].borrow().leaf.scalar.clone() {
        Some(Scalar::String(s)) => assert_eq!(&*s, "a"),
        other => panic!("expected string, got {other:?}"),
    }
}

#[test]
fn s7_list_element_type_conflict() {
    let declared = ListLitIR {
        elements: vec![
            Expr::KindConstraint(ligature_core::schema::Kind::INT),
            Expr::KindConstraint(ligature_core::schema::Kind::INT),
        ],
        ellipsis_element: Some(Box::new(Expr::KindConstraint(ligature_core::schema::Kind::STRING))),
        closed: false,
    };
    let concrete = ListLitIR {
        elements: vec![int(1), int(2), int(3), Expr::Value(Scalar::String(Arc::from("b")))],
        ellipsis_element: None,
        closed: true,
    };
    let xs_value = unify(Expr::ListLit(declared), Expr::ListLit(concrete));
    let (_, result) = run(empty_struct(vec![field("xs", xs_value)]));
    assert!(result.is_err());
    assert!(matches!(result.unwrap_err(), EvalError::Type { .. }));
}

#[test]
fn s8_cycle_that_resolves_via_disjunction() {
    // a: b + 1; b: a - 1; a: 5
    let a_value = unify(
        Expr::Arith(ArithOp::Add, Box::new(sibling(0, "b")), Box::new(int(1))),
        int(5),
    );
    let b_value = Expr::Arith(ArithOp::Sub, Box::new(sibling(0, "a")), Box::new(int(1)));
    let (root, result) = run(empty_struct(vec![field("a", a_value), field("b", b_value)]));
    assert!(result.is_ok());
    let a = surface::lookup(&root, &Label::Field(Arc::from("a"))).unwrap();
    let b = surface::lookup(&root, &Label::Field(Arc::from("b"))).unwrap();
    assert_eq!(int_value(&a), 5);
    assert_eq!(int_value(&b), 4);
}

#[test]
fn compare_op_equal_narrows_kind() {
    let root = empty_struct(vec![field(
        "eq",
        Expr::Compare(CompareOp::Eq, Box::new(int(3)), Box::new(int(3))),
    )]);
    let (root, result) = run(root);
    assert!(result.is_ok());
    let eq = surface::lookup(&root, &Label::Field(Arc::from("eq"))).unwrap();
    match eq.borrow().leaf.scalar.clone() {
        Some(Scalar::Bool(b)) => assert!(b),
        other => panic!("expected bool, got {other:?}"),
    }
}

#[test]
fn bound_accepts_matches_spec_semantics() {
    let bound = Bound::Numeric(ligature_core::schema::BoundOp::Ge, 1.0);
    assert!(bound.accepts(&Scalar::Int(1)).unwrap());
    assert!(!bound.accepts(&Scalar::Int(0)).unwrap());
}
