//! The desugared, scope-resolved intermediate form produced by [`crate::frontend`] and
//! consumed by [`crate::interpreter`] (§4.1 / the IR component of §2).
//!
//! No evaluation happens while building this tree: `Expr` nodes are immutable and may be
//! shared (behind `Arc`) across every conjunct that references them.

pub mod indexed;
pub mod value;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::position::Span;
use crate::schema::Kind;

use self::value::{Bound, Scalar};

/// How a Vertex was reached from its parent: by struct field/definition label, or by list index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Label {
    Field(Arc<str>),
    Definition(Arc<str>),
    Index(usize),
}

impl Label {
    pub fn as_field_name(&self) -> Option<&str> {
        match self {
            Label::Field(s) | Label::Definition(s) => Some(s),
            Label::Index(_) => None,
        }
    }

    pub fn is_definition(&self) -> bool {
        matches!(self, Label::Definition(_))
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Field(s) => write!(f, "{s}"),
            Label::Definition(s) => write!(f, "#{s}"),
            Label::Index(i) => write!(f, "[{i}]"),
        }
    }
}

/// A resolved lexical reference, produced once by the compiler and never re-resolved by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScopeRef {
    /// A sibling field or definition of an enclosing struct, `depth` struct frames out.
    /// Resolved lazily against whatever Vertex owns that frame at evaluation time, since arcs
    /// are created on demand (§4.3).
    Field { depth: u32, label: Arc<str> },
    /// A `let`/alias/comprehension-clause binding, `depth` binding frames out, at the given
    /// slot within that frame.
    Let { depth: u32, slot: u32 },
    /// An identifier resolved by the external import collaborator at compile time; the core
    /// treats the imported expression as opaque, shared IR to splice in by reference.
    Import(Arc<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Ge,
    Gt,
    Le,
    Lt,
}

/// A prefix comparison/match operator used as a bound constructor, e.g. `>=1` or `=~#"."#.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryBoundOp {
    Ge,
    Gt,
    Le,
    Lt,
    Ne,
    Matches,
    NotMatches,
}

/// One declared field inside a struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDecl {
    pub label: Label,
    pub optional: bool,
    pub value: Expr,
    pub span: Span,
}

/// `[pattern]: constraint` — applies to every not-yet-declared label matching `pattern`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConstraint {
    pub pattern: Expr,
    pub constraint: Expr,
    pub span: Span,
}

/// `(labelExpr): value` — a field whose label is computed rather than lexical, e.g. the body
/// of a `for k, v in src { (k): v }` comprehension (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicFieldDecl {
    pub label: Expr,
    pub optional: bool,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructLitIR {
    pub fields: Vec<FieldDecl>,
    pub dynamic_fields: Vec<DynamicFieldDecl>,
    pub embeddings: Vec<Expr>,
    pub comprehensions: Vec<ComprehensionIR>,
    pub patterns: Vec<PatternConstraint>,
    /// One scratch conjunct expression per `let`/alias declared directly in this struct, in
    /// slot order; the interpreter seeds one scratch Vertex per entry when it opens this
    /// struct's scope (§3 Environment).
    pub bindings: Vec<Expr>,
    /// True for structs wrapped in `close()`; see §4.6. Definitions are closed unconditionally
    /// by the interpreter based on their arc's [`Label`], independent of this flag.
    pub closed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListLitIR {
    pub elements: Vec<Expr>,
    pub ellipsis_element: Option<Box<Expr>>,
    /// False exactly when an ellipsis is present.
    pub closed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisjunctAlt {
    pub value: Expr,
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClauseIR {
    For { key_slot: Option<u32>, value_slot: u32, source: Expr },
    If { condition: Expr },
    Let { slot: u32, value: Expr },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ComprehensionBodyIR {
    /// `declarations` are unified into the enclosing struct's Vertex on each iteration;
    /// `bindings` holds one scratch conjunct per `let`/alias declared directly in the body,
    /// same convention as [`StructLitIR::bindings`], addressed through the comprehension's own
    /// clause frame rather than a frame of their own.
    Struct { declarations: Vec<Declaration>, bindings: Vec<Expr> },
    ListElement(Box<Expr>),
}

/// One struct/let declaration reachable from inside a comprehension body, re-using the same
/// shapes ordinary struct contents use so expansion (§4.7) can reuse struct-literal processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Declaration {
    Field(FieldDecl),
    DynamicField(DynamicFieldDecl),
    Embedding(Expr),
    Comprehension(ComprehensionIR),
    Pattern(PatternConstraint),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComprehensionIR {
    pub clauses: Vec<ClauseIR>,
    pub body: ComprehensionBodyIR,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InterpPart {
    Literal(Arc<str>),
    Expr(Expr),
}

/// A desugared expression. Everything an identifier could have meant has already been decided
/// by the compiler: `Expr::Reference` never carries a bare name, only a [`ScopeRef`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    Value(Scalar),
    Bound(Bound),
    /// A bare type keyword (`int`, `string`, `number`, `_`, ...), narrowing kind only.
    KindConstraint(Kind),
    Bottom(Option<Arc<str>>),
    Reference(ScopeRef),
    Selector(Box<Expr>, Arc<str>),
    Index(Box<Expr>, Box<Expr>),
    Slice(Box<Expr>, Option<Box<Expr>>, Option<Box<Expr>>),
    StructLit(StructLitIR),
    ListLit(ListLitIR),
    Disjunction(Vec<DisjunctAlt>),
    /// `a & b`: processing this conjunct is defined as processing both operands as separate
    /// conjuncts of the same vertex (§4.2); associativity/commutativity fall out for free.
    Unify(Box<Expr>, Box<Expr>),
    Call(Arc<str>, Vec<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    /// Unary `-x`.
    Negate(Box<Expr>),
    /// Unary `!x`.
    Not(Box<Expr>),
    /// A prefix operator that turns its operand into a [`Bound`] at evaluation time, e.g.
    /// `>=min` where `min` is a reference and not a literal (§4.2, §6 GLOSSARY "Bound").
    UnaryBound(UnaryBoundOp, Box<Expr>),
    Interpolation(Vec<InterpPart>),
    Comprehension(Box<ComprehensionIR>),
}

