//! The position-annotated AST the core consumes (§6 of the design: Input: AST).
//!
//! Nothing in this module parses source text — that is the surface parser's job, an external
//! collaborator. These types are the data contract between that parser and [`crate::frontend`].
#![allow(dead_code)]

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::position::Span;

/// A whole source file: an optional package clause followed by top-level declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    pub package: Option<Package>,
    pub declarations: Vec<Declaration>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub name: Arc<str>,
    pub span: Span,
}

/// A top-level declaration inside a file or a struct body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Declaration {
    Field(Field),
    Definition(Definition),
    Embedding(Embedding),
    Alias(Alias),
    Let(Let),
    Comprehension(Comprehension),
}

/// `label: value` or `label?: value`, with optionality/requiredness and attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub label: FieldLabel,
    pub optional: bool,
    pub value: Expr,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    pub span: Span,
}

/// A field label: a plain identifier/string, or a pattern constraint such as `[string]: int`
/// applying to every not-yet-declared label matching the pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldLabel {
    Ident(Arc<str>),
    String(Arc<str>),
    /// `[pattern]: value` — the pattern expression must evaluate to a string or a kind
    /// constraint (e.g. a regex bound); the field's value constrains every matching label.
    Pattern(Box<Expr>),
    /// `(interpolated): value` — the label itself is computed, e.g. from a comprehension binding.
    Interpolated(Box<Expr>),
}

/// `#Name: { ... }` — scope-visible within its enclosing struct, closed by default (§4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    pub name: Arc<str>,
    pub value: Expr,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    pub span: Span,
}

/// An embedded expression contributing its conjuncts directly into the enclosing struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub value: Expr,
    pub span: Span,
}

/// `x = expr` — a scope binding visible to sibling declarations, not itself a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alias {
    pub name: Arc<str>,
    pub value: Expr,
    pub span: Span,
}

/// `let x = expr` inside a struct body — same visibility rules as [`Alias`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Let {
    pub name: Arc<str>,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: Arc<str>,
    pub text: Arc<str>,
    pub span: Span,
}

/// `for k, v in src { ... }` / `if cond { ... }` / `let x = e` clause chain plus a body.
///
/// The body is a list of declarations (when comprehending into a struct) or an expression list
/// (when comprehending into a list); both shapes share the same clause semantics, so we carry
/// the two bodies in one enum rather than duplicating the clause machinery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comprehension {
    pub clauses: Vec<Clause>,
    pub body: ComprehensionBody,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ComprehensionBody {
    Struct(Vec<Declaration>),
    List(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Clause {
    For(ForClause),
    If(IfClause),
    Let(LetClause),
}

/// `for v in src` (single-binding) or `for k, v in src` (key + value binding).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForClause {
    pub key: Option<Arc<str>>,
    pub value: Arc<str>,
    pub source: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfClause {
    pub condition: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetClause {
    pub name: Arc<str>,
    pub value: Box<Expr>,
    pub span: Span,
}

/// Any expression position in the language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    StructLit(StructLit),
    ListLit(ListLit),
    BasicLit(BasicLit),
    Interpolation(Interpolation),
    Ident(Ident),
    Selector(Selector),
    Index(Index),
    Slice(Slice),
    Call(Call),
    Unary(Unary),
    Binary(Binary),
    Paren(Paren),
    BottomLit(BottomLit),
    /// An inline disjunction/comprehension used as a value, e.g. the RHS of a field.
    Disjunction(DisjunctionExpr),
    Comprehension(Box<Comprehension>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructLit {
    pub declarations: Vec<Declaration>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListLit {
    pub elements: Vec<Expr>,
    /// A trailing `...` or `...T`, marking the list open with an optional element constraint.
    pub ellipsis: Option<Ellipsis>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ellipsis {
    pub element_constraint: Option<Box<Expr>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BasicLit {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Arc<str>),
    Bytes(Arc<[u8]>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpolation {
    /// Alternates: segment 0 is a literal, segment 1 is an expression slot, etc.
    /// `literals.len() == expressions.len() + 1`.
    pub literals: Vec<Arc<str>>,
    pub expressions: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ident {
    pub name: Arc<str>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selector {
    pub operand: Box<Expr>,
    pub field: Arc<str>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub operand: Box<Expr>,
    pub index: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    pub operand: Box<Expr>,
    pub low: Option<Box<Expr>>,
    pub high: Option<Box<Expr>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub callee: Arc<str>,
    pub arguments: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
    /// Comparison operators used prefix, as bound constructors: `>=1`, `<10`, `!="x"`, `=~#"."#`.
    Ge,
    Gt,
    Le,
    Lt,
    Ne,
    Matches,
    NotMatches,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unary {
    pub op: UnaryOp,
    pub operand: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Unify,
    Disjunct,
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Ge,
    Gt,
    Le,
    Lt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binary {
    pub op: BinaryOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paren {
    pub inner: Box<Expr>,
    pub span: Span,
}

/// An explicit `_|_("reason")` bottom literal written in source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottomLit {
    pub reason: Option<Arc<str>>,
    pub span: Span,
}

/// `a | b | *c` — an ordered alternation, with zero or more alternatives marked default
/// via the `*` prefix operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisjunctionExpr {
    pub alternatives: Vec<DisjunctionAlternative>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisjunctionAlternative {
    pub value: Expr,
    pub is_default: bool,
}
