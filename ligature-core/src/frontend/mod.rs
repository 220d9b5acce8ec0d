//! AST → IR lowering (§4.1): lexical scope resolution plus desugaring, no evaluation.
//!
//! Every struct literal is lowered in two passes over its declarations: the first pass
//! registers every field/definition label and every `let`/alias slot so later siblings (and
//! earlier ones) can reference each other regardless of source order, the second pass lowers
//! each declaration's expressions against the now-complete scope. Running both passes in the
//! same declaration order is what lets [`crate::ir::StructLitIR::bindings`] be indexed purely
//! by position, with no separate slot-to-declaration map.

pub mod error;
mod scopes;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::ast;
use crate::ir::{self, value::Bound};
use crate::schema::{BoundOp, Kind};

pub use error::FrontendError;
use scopes::{Resolution, ScopeStack};

/// Lowers a whole file into a [`ir::indexed::CompiledProgram`].
///
/// `imports` maps an import binding name (as it would appear as a bare identifier in the
/// source) to the already-resolved IR it stands for; the core treats every entry as opaque,
/// shared IR supplied by an external collaborator (§6 Input: AST).
pub fn compile(
    file: &ast::File,
    imports: &BTreeMap<Arc<str>, Arc<ir::Expr>>,
) -> Result<ir::indexed::CompiledProgram, FrontendError> {
    let mut compiler = Compiler { imports, scopes: ScopeStack::new() };
    let root = compiler.lower_struct(&file.declarations)?;
    Ok(ir::indexed::CompiledProgram {
        package: file.package.as_ref().map(|p| p.name.clone()),
        root,
    })
}

struct Compiler<'a> {
    imports: &'a BTreeMap<Arc<str>, Arc<ir::Expr>>,
    scopes: ScopeStack,
}

/// What one lowered declaration contributes to its enclosing struct body.
enum LoweredDecl {
    Field(ir::FieldDecl),
    DynamicField(ir::DynamicFieldDecl),
    Pattern(ir::PatternConstraint),
    Embedding(ir::Expr),
    Comprehension(ir::ComprehensionIR),
    /// A `let`/alias: not itself a declaration, but a scratch conjunct appended to the
    /// enclosing scope's binding slots.
    Binding(ir::Expr),
}

impl<'a> Compiler<'a> {
    /// Lowers the declarations of a struct literal (or a file's top level, which is lowered the
    /// same way) into a fully-formed [`ir::StructLitIR`].
    fn lower_struct(&mut self, decls: &[ast::Declaration]) -> Result<ir::StructLitIR, FrontendError> {
        let (fields, dynamic_fields, embeddings, comprehensions, patterns, bindings) =
            self.lower_struct_body(decls)?;
        Ok(ir::StructLitIR {
            fields,
            dynamic_fields,
            embeddings,
            comprehensions,
            patterns,
            bindings,
            closed: false,
        })
    }

    #[allow(clippy::type_complexity)]
    fn lower_struct_body(
        &mut self,
        decls: &[ast::Declaration],
    ) -> Result<
        (
            Vec<ir::FieldDecl>,
            Vec<ir::DynamicFieldDecl>,
            Vec<ir::Expr>,
            Vec<ir::ComprehensionIR>,
            Vec<ir::PatternConstraint>,
            Vec<ir::Expr>,
        ),
        FrontendError,
    > {
        self.scopes.push_struct();
        self.declare_names(decls)?;

        let mut fields = Vec::new();
        let mut dynamic_fields = Vec::new();
        let mut embeddings = Vec::new();
        let mut comprehensions = Vec::new();
        let mut patterns = Vec::new();
        let mut bindings = Vec::new();

        for decl in decls {
            match self.lower_declaration(decl)? {
                LoweredDecl::Field(f) => fields.push(f),
                LoweredDecl::DynamicField(f) => dynamic_fields.push(f),
                LoweredDecl::Pattern(p) => patterns.push(p),
                LoweredDecl::Embedding(e) => embeddings.push(e),
                LoweredDecl::Comprehension(c) => comprehensions.push(c),
                LoweredDecl::Binding(b) => bindings.push(b),
            }
        }

        self.scopes.pop_struct();
        Ok((fields, dynamic_fields, embeddings, comprehensions, patterns, bindings))
    }

    /// First pass: registers every name a declaration introduces, so pass two can resolve
    /// forward references. Declares nothing for patterns, embeddings, or comprehensions — none
    /// of those introduce a name.
    fn declare_names(&mut self, decls: &[ast::Declaration]) -> Result<(), FrontendError> {
        for decl in decls {
            match decl {
                ast::Declaration::Field(f) => match &f.label {
                    ast::FieldLabel::Ident(name) | ast::FieldLabel::String(name) => {
                        self.scopes.declare_field(name, &f.span)?;
                    }
                    ast::FieldLabel::Pattern(_) | ast::FieldLabel::Interpolated(_) => {}
                },
                ast::Declaration::Definition(d) => {
                    self.scopes.declare_field(&d.name, &d.span)?;
                }
                ast::Declaration::Alias(a) => {
                    self.scopes.declare_binding(&a.name, &a.span)?;
                }
                ast::Declaration::Let(l) => {
                    self.scopes.declare_binding(&l.name, &l.span)?;
                }
                ast::Declaration::Embedding(_) | ast::Declaration::Comprehension(_) => {}
            }
        }
        Ok(())
    }

    fn lower_declaration(&mut self, decl: &ast::Declaration) -> Result<LoweredDecl, FrontendError> {
        match decl {
            ast::Declaration::Field(f) => match &f.label {
                ast::FieldLabel::Ident(name) | ast::FieldLabel::String(name) => {
                    Ok(LoweredDecl::Field(ir::FieldDecl {
                        label: ir::Label::Field(name.clone()),
                        optional: f.optional,
                        value: self.lower_expr(&f.value)?,
                        span: f.span.clone(),
                    }))
                }
                ast::FieldLabel::Pattern(pattern) => Ok(LoweredDecl::Pattern(ir::PatternConstraint {
                    pattern: self.lower_expr(pattern)?,
                    constraint: self.lower_expr(&f.value)?,
                    span: f.span.clone(),
                })),
                ast::FieldLabel::Interpolated(label) => {
                    Ok(LoweredDecl::DynamicField(ir::DynamicFieldDecl {
                        label: self.lower_expr(label)?,
                        optional: f.optional,
                        value: self.lower_expr(&f.value)?,
                        span: f.span.clone(),
                    }))
                }
            },
            ast::Declaration::Definition(d) => Ok(LoweredDecl::Field(ir::FieldDecl {
                label: ir::Label::Definition(d.name.clone()),
                optional: false,
                value: self.lower_expr(&d.value)?,
                span: d.span.clone(),
            })),
            ast::Declaration::Embedding(e) => Ok(LoweredDecl::Embedding(self.lower_expr(&e.value)?)),
            ast::Declaration::Alias(a) => Ok(LoweredDecl::Binding(self.lower_expr(&a.value)?)),
            ast::Declaration::Let(l) => Ok(LoweredDecl::Binding(self.lower_expr(&l.value)?)),
            ast::Declaration::Comprehension(c) => {
                Ok(LoweredDecl::Comprehension(self.lower_comprehension(c)?))
            }
        }
    }

    fn lower_comprehension(&mut self, comp: &ast::Comprehension) -> Result<ir::ComprehensionIR, FrontendError> {
        self.scopes.push_clause();
        let mut clauses = Vec::with_capacity(comp.clauses.len());
        for clause in &comp.clauses {
            let lowered = match clause {
                ast::Clause::For(f) => {
                    let source = self.lower_expr(&f.source)?;
                    let key_slot = match &f.key {
                        Some(name) => Some(self.scopes.declare_binding(name, &f.span)?),
                        None => None,
                    };
                    let value_slot = self.scopes.declare_binding(&f.value, &f.span)?;
                    ir::ClauseIR::For { key_slot, value_slot, source }
                }
                ast::Clause::If(c) => {
                    ir::ClauseIR::If { condition: self.lower_expr(&c.condition)? }
                }
                ast::Clause::Let(l) => {
                    let value = self.lower_expr(&l.value)?;
                    let slot = self.scopes.declare_binding(&l.name, &l.span)?;
                    ir::ClauseIR::Let { slot, value }
                }
            };
            clauses.push(lowered);
        }

        let body = match &comp.body {
            ast::ComprehensionBody::Struct(decls) => {
                let mut declarations = Vec::new();
                let mut bindings = Vec::new();
                for decl in decls {
                    match self.lower_declaration(decl)? {
                        LoweredDecl::Field(f) => declarations.push(ir::Declaration::Field(f)),
                        LoweredDecl::DynamicField(f) => {
                            declarations.push(ir::Declaration::DynamicField(f))
                        }
                        LoweredDecl::Pattern(p) => declarations.push(ir::Declaration::Pattern(p)),
                        LoweredDecl::Embedding(e) => declarations.push(ir::Declaration::Embedding(e)),
                        LoweredDecl::Comprehension(c) => {
                            declarations.push(ir::Declaration::Comprehension(c))
                        }
                        LoweredDecl::Binding(b) => bindings.push(b),
                    }
                }
                ir::ComprehensionBodyIR::Struct { declarations, bindings }
            }
            ast::ComprehensionBody::List(expr) => {
                ir::ComprehensionBodyIR::ListElement(Box::new(self.lower_expr(expr)?))
            }
        };

        self.scopes.pop_clause();
        Ok(ir::ComprehensionIR { clauses, body, span: comp.span.clone() })
    }

    fn lower_expr(&mut self, expr: &ast::Expr) -> Result<ir::Expr, FrontendError> {
        match expr {
            ast::Expr::StructLit(s) => Ok(ir::Expr::StructLit(self.lower_struct(&s.declarations)?)),
            ast::Expr::ListLit(l) => Ok(ir::Expr::ListLit(self.lower_list(l)?)),
            ast::Expr::BasicLit(lit) => Ok(Self::lower_basic_lit(lit)),
            ast::Expr::Interpolation(interp) => self.lower_interpolation(interp),
            ast::Expr::Ident(ident) => self.lower_ident(ident),
            ast::Expr::Selector(sel) => Ok(ir::Expr::Selector(
                Box::new(self.lower_expr(&sel.operand)?),
                sel.field.clone(),
            )),
            ast::Expr::Index(idx) => Ok(ir::Expr::Index(
                Box::new(self.lower_expr(&idx.operand)?),
                Box::new(self.lower_expr(&idx.index)?),
            )),
            ast::Expr::Slice(s) => Ok(ir::Expr::Slice(
                Box::new(self.lower_expr(&s.operand)?),
                s.low.as_deref().map(|e| self.lower_expr(e)).transpose()?.map(Box::new),
                s.high.as_deref().map(|e| self.lower_expr(e)).transpose()?.map(Box::new),
            )),
            ast::Expr::Call(call) => {
                let arguments =
                    call.arguments.iter().map(|a| self.lower_expr(a)).collect::<Result<_, _>>()?;
                Ok(ir::Expr::Call(call.callee.clone(), arguments))
            }
            ast::Expr::Unary(u) => self.lower_unary(u),
            ast::Expr::Binary(b) => self.lower_binary(b),
            ast::Expr::Paren(p) => self.lower_expr(&p.inner),
            ast::Expr::BottomLit(b) => Ok(ir::Expr::Bottom(b.reason.clone())),
            ast::Expr::Disjunction(d) => self.lower_disjunction(d),
            ast::Expr::Comprehension(c) => {
                Ok(ir::Expr::Comprehension(Box::new(self.lower_comprehension(c)?)))
            }
        }
    }

    fn lower_basic_lit(lit: &ast::BasicLit) -> ir::Expr {
        match lit {
            ast::BasicLit::Null => ir::Expr::Value(crate::ir::value::Scalar::Null),
            ast::BasicLit::Bool(b) => ir::Expr::Value(crate::ir::value::Scalar::Bool(*b)),
            ast::BasicLit::Int(i) => ir::Expr::Value(crate::ir::value::Scalar::Int(*i)),
            ast::BasicLit::Float(f) => ir::Expr::Value(crate::ir::value::Scalar::Float(*f)),
            ast::BasicLit::String(s) => ir::Expr::Value(crate::ir::value::Scalar::String(s.clone())),
            ast::BasicLit::Bytes(b) => ir::Expr::Value(crate::ir::value::Scalar::Bytes(b.clone())),
        }
    }

    fn lower_interpolation(&mut self, interp: &ast::Interpolation) -> Result<ir::Expr, FrontendError> {
        let mut parts = Vec::with_capacity(interp.literals.len() + interp.expressions.len());
        let mut literals = interp.literals.iter();
        let mut expressions = interp.expressions.iter();
        if let Some(first) = literals.next() {
            parts.push(ir::InterpPart::Literal(first.clone()));
        }
        for expr in expressions.by_ref() {
            parts.push(ir::InterpPart::Expr(self.lower_expr(expr)?));
            if let Some(lit) = literals.next() {
                parts.push(ir::InterpPart::Literal(lit.clone()));
            }
        }
        Ok(ir::Expr::Interpolation(parts))
    }

    fn lower_ident(&mut self, ident: &ast::Ident) -> Result<ir::Expr, FrontendError> {
        if let Some(kind) = builtin_kind_keyword(&ident.name) {
            return Ok(ir::Expr::KindConstraint(kind));
        }
        if let Some(imported) = self.imports.get(&ident.name) {
            return Ok(ir::Expr::Reference(ir::ScopeRef::Import(imported.clone())));
        }
        match self.scopes.resolve(&ident.name) {
            Some(Resolution::Field { depth }) => {
                Ok(ir::Expr::Reference(ir::ScopeRef::Field { depth, label: ident.name.clone() }))
            }
            Some(Resolution::Let { depth, slot }) => {
                Ok(ir::Expr::Reference(ir::ScopeRef::Let { depth, slot }))
            }
            None => Err(FrontendError::UndefinedIdentifier {
                name: ident.name.to_string(),
                span: ident.span.clone(),
            }),
        }
    }

    fn lower_unary(&mut self, u: &ast::Unary) -> Result<ir::Expr, FrontendError> {
        match u.op {
            ast::UnaryOp::Neg => Ok(ir::Expr::Negate(Box::new(self.lower_expr(&u.operand)?))),
            ast::UnaryOp::Not => Ok(ir::Expr::Not(Box::new(self.lower_expr(&u.operand)?))),
            ast::UnaryOp::Ge => self.lower_unary_bound(ir::UnaryBoundOp::Ge, &u.operand),
            ast::UnaryOp::Gt => self.lower_unary_bound(ir::UnaryBoundOp::Gt, &u.operand),
            ast::UnaryOp::Le => self.lower_unary_bound(ir::UnaryBoundOp::Le, &u.operand),
            ast::UnaryOp::Lt => self.lower_unary_bound(ir::UnaryBoundOp::Lt, &u.operand),
            ast::UnaryOp::Ne => self.lower_unary_bound(ir::UnaryBoundOp::Ne, &u.operand),
            ast::UnaryOp::Matches => self.lower_unary_bound(ir::UnaryBoundOp::Matches, &u.operand),
            ast::UnaryOp::NotMatches => {
                self.lower_unary_bound(ir::UnaryBoundOp::NotMatches, &u.operand)
            }
        }
    }

    /// A prefix comparison/match operator against a literal operand is folded straight into a
    /// leaf [`Bound`]; against anything else (a reference, say) it stays an [`ir::Expr::UnaryBound`]
    /// and is resolved once the operand becomes concrete (§4.2).
    fn lower_unary_bound(
        &mut self,
        op: ir::UnaryBoundOp,
        operand: &ast::Expr,
    ) -> Result<ir::Expr, FrontendError> {
        let lowered = self.lower_expr(operand)?;
        if let ir::Expr::Value(scalar) = &lowered {
            if let Some(bound) = bound_from_literal(op, scalar, operand)? {
                return Ok(ir::Expr::Bound(bound));
            }
        }
        Ok(ir::Expr::UnaryBound(op, Box::new(lowered)))
    }

    fn lower_binary(&mut self, b: &ast::Binary) -> Result<ir::Expr, FrontendError> {
        let left = self.lower_expr(&b.left)?;
        let right = self.lower_expr(&b.right)?;
        let expr = match b.op {
            ast::BinaryOp::Unify => ir::Expr::Unify(Box::new(left), Box::new(right)),
            ast::BinaryOp::Disjunct => ir::Expr::Disjunction(vec![
                ir::DisjunctAlt { value: left, is_default: false },
                ir::DisjunctAlt { value: right, is_default: false },
            ]),
            ast::BinaryOp::Add => ir::Expr::Arith(ir::ArithOp::Add, Box::new(left), Box::new(right)),
            ast::BinaryOp::Sub => ir::Expr::Arith(ir::ArithOp::Sub, Box::new(left), Box::new(right)),
            ast::BinaryOp::Mul => ir::Expr::Arith(ir::ArithOp::Mul, Box::new(left), Box::new(right)),
            ast::BinaryOp::Div => ir::Expr::Arith(ir::ArithOp::Div, Box::new(left), Box::new(right)),
            ast::BinaryOp::Eq => ir::Expr::Compare(ir::CompareOp::Eq, Box::new(left), Box::new(right)),
            ast::BinaryOp::Ne => ir::Expr::Compare(ir::CompareOp::Ne, Box::new(left), Box::new(right)),
            ast::BinaryOp::Ge => ir::Expr::Compare(ir::CompareOp::Ge, Box::new(left), Box::new(right)),
            ast::BinaryOp::Gt => ir::Expr::Compare(ir::CompareOp::Gt, Box::new(left), Box::new(right)),
            ast::BinaryOp::Le => ir::Expr::Compare(ir::CompareOp::Le, Box::new(left), Box::new(right)),
            ast::BinaryOp::Lt => ir::Expr::Compare(ir::CompareOp::Lt, Box::new(left), Box::new(right)),
        };
        Ok(expr)
    }

    fn lower_disjunction(&mut self, d: &ast::DisjunctionExpr) -> Result<ir::Expr, FrontendError> {
        let alternatives = d
            .alternatives
            .iter()
            .map(|alt| {
                Ok(ir::DisjunctAlt { value: self.lower_expr(&alt.value)?, is_default: alt.is_default })
            })
            .collect::<Result<_, FrontendError>>()?;
        Ok(ir::Expr::Disjunction(alternatives))
    }

    fn lower_list(&mut self, list: &ast::ListLit) -> Result<ir::ListLitIR, FrontendError> {
        let elements = list.elements.iter().map(|e| self.lower_expr(e)).collect::<Result<_, _>>()?;
        let ellipsis_element = match &list.ellipsis {
            Some(ast::Ellipsis { element_constraint: Some(c), .. }) => {
                Some(Box::new(self.lower_expr(c)?))
            }
            Some(ast::Ellipsis { element_constraint: None, .. }) => {
                Some(Box::new(ir::Expr::KindConstraint(Kind::TOP)))
            }
            None => None,
        };
        Ok(ir::ListLitIR { elements, closed: list.ellipsis.is_none(), ellipsis_element })
    }
}

fn builtin_kind_keyword(name: &str) -> Option<Kind> {
    Some(match name {
        "_" => Kind::TOP,
        "null" => Kind::NULL,
        "bool" => Kind::BOOL,
        "int" => Kind::INT,
        "float" => Kind::FLOAT,
        "number" => Kind::NUMBER,
        "bytes" => Kind::BYTES,
        "string" => Kind::STRING,
        _ => return None,
    })
}

fn bound_from_literal(
    op: ir::UnaryBoundOp,
    scalar: &crate::ir::value::Scalar,
    operand_site: &ast::Expr,
) -> Result<Option<Bound>, FrontendError> {
    use crate::ir::value::Scalar;

    let span = operand_span(operand_site);
    match (op, scalar) {
        (ir::UnaryBoundOp::Ge, _) => Ok(numeric_bound(BoundOp::Ge, scalar)),
        (ir::UnaryBoundOp::Gt, _) => Ok(numeric_bound(BoundOp::Gt, scalar)),
        (ir::UnaryBoundOp::Le, _) => Ok(numeric_bound(BoundOp::Le, scalar)),
        (ir::UnaryBoundOp::Lt, _) => Ok(numeric_bound(BoundOp::Lt, scalar)),
        (ir::UnaryBoundOp::Ne, Scalar::String(s)) => Ok(Some(Bound::StringNe(s.clone()))),
        (ir::UnaryBoundOp::Ne, _) => Ok(numeric_bound(BoundOp::Ne, scalar)),
        (ir::UnaryBoundOp::Matches, Scalar::String(pattern)) => {
            validate_regex(pattern, span)?;
            Ok(Some(Bound::Regex { pattern: pattern.clone(), negated: false }))
        }
        (ir::UnaryBoundOp::NotMatches, Scalar::String(pattern)) => {
            validate_regex(pattern, span)?;
            Ok(Some(Bound::Regex { pattern: pattern.clone(), negated: true }))
        }
        (ir::UnaryBoundOp::Matches | ir::UnaryBoundOp::NotMatches, _) => Ok(None),
    }
}

fn numeric_bound(op: BoundOp, scalar: &crate::ir::value::Scalar) -> Option<Bound> {
    scalar.as_f64().map(|v| Bound::Numeric(op, v))
}

fn validate_regex(pattern: &str, span: crate::position::Span) -> Result<(), FrontendError> {
    regex::Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| FrontendError::BadRegex(e.to_string(), span))
}

fn operand_span(expr: &ast::Expr) -> crate::position::Span {
    match expr {
        ast::Expr::StructLit(s) => s.span.clone(),
        ast::Expr::ListLit(l) => l.span.clone(),
        ast::Expr::BasicLit(_) => crate::position::Span::synthetic(),
        ast::Expr::Interpolation(i) => i.span.clone(),
        ast::Expr::Ident(i) => i.span.clone(),
        ast::Expr::Selector(s) => s.span.clone(),
        ast::Expr::Index(i) => i.span.clone(),
        ast::Expr::Slice(s) => s.span.clone(),
        ast::Expr::Call(c) => c.span.clone(),
        ast::Expr::Unary(u) => u.span.clone(),
        ast::Expr::Binary(b) => b.span.clone(),
        ast::Expr::Paren(p) => p.span.clone(),
        ast::Expr::BottomLit(b) => b.span.clone(),
        ast::Expr::Disjunction(d) => d.span.clone(),
        ast::Expr::Comprehension(c) => c.span.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Span;

    fn ident(name: &str) -> ast::Expr {
        ast::Expr::Ident(ast::Ident { name: Arc::from(name), span: Span::synthetic() })
    }

    fn int_lit(v: i64) -> ast::Expr {
        ast::Expr::BasicLit(ast::BasicLit::Int(v))
    }

    fn field(name: &str, value: ast::Expr) -> ast::Declaration {
        ast::Declaration::Field(ast::Field {
            label: ast::FieldLabel::Ident(Arc::from(name)),
            optional: false,
            value,
            attributes: Vec::new(),
            span: Span::synthetic(),
        })
    }

    #[test]
    fn sibling_fields_resolve_by_label_at_depth_zero() {
        let file = ast::File {
            package: None,
            declarations: vec![field("a", int_lit(1)), field("b", ident("a"))],
            span: Span::synthetic(),
        };
        let compiled = compile(&file, &BTreeMap::new()).unwrap();
        assert_eq!(compiled.root.fields.len(), 2);
        match &compiled.root.fields[1].value {
            ir::Expr::Reference(ir::ScopeRef::Field { depth: 0, label }) => {
                assert_eq!(label.as_ref(), "a");
            }
            other => panic!("expected a field reference, got {other:?}"),
        }
    }

    #[test]
    fn undefined_identifier_is_rejected() {
        let file = ast::File {
            package: None,
            declarations: vec![field("a", ident("nope"))],
            span: Span::synthetic(),
        };
        let err = compile(&file, &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, FrontendError::UndefinedIdentifier { .. }));
    }

    #[test]
    fn duplicate_let_binding_in_same_struct_is_rejected() {
        let file = ast::File {
            package: None,
            declarations: vec![
                ast::Declaration::Let(ast::Let {
                    name: Arc::from("x"),
                    value: int_lit(1),
                    span: Span::synthetic(),
                }),
                ast::Declaration::Let(ast::Let {
                    name: Arc::from("x"),
                    value: int_lit(2),
                    span: Span::synthetic(),
                }),
            ],
            span: Span::synthetic(),
        };
        let err = compile(&file, &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, FrontendError::DuplicateBinding { .. }));
    }

    #[test]
    fn imported_identifier_resolves_to_opaque_expr() {
        let imported = Arc::new(ir::Expr::Value(crate::ir::value::Scalar::Int(42)));
        let imports = btreemap! { Arc::from("cfg") => imported.clone() };
        let file = ast::File {
            package: None,
            declarations: vec![field("a", ident("cfg"))],
            span: Span::synthetic(),
        };
        let compiled = compile(&file, &imports).unwrap();
        match &compiled.root.fields[0].value {
            ir::Expr::Reference(ir::ScopeRef::Import(e)) => assert!(Arc::ptr_eq(e, &imported)),
            other => panic!("expected an import reference, got {other:?}"),
        }
    }

    #[test]
    fn literal_unary_bound_folds_to_bound_expr() {
        let file = ast::File {
            package: None,
            declarations: vec![field(
                "a",
                ast::Expr::Unary(ast::Unary {
                    op: ast::UnaryOp::Ge,
                    operand: Box::new(int_lit(10)),
                    span: Span::synthetic(),
                }),
            )],
            span: Span::synthetic(),
        };
        let compiled = compile(&file, &BTreeMap::new()).unwrap();
        assert!(matches!(compiled.root.fields[0].value, ir::Expr::Bound(Bound::Numeric(BoundOp::Ge, v)) if v == 10.0));
    }
}
