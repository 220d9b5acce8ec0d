use crate::position::Span;

/// Errors raised while lowering an AST into IR (§4.1). All of these are compile-time and fatal:
/// nothing here is retried the way an [`crate::interpreter::error::EvalError`] can be.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrontendError {
    #[error("reference to undefined identifier `{name}`")]
    UndefinedIdentifier { name: String, span: Span },

    #[error("`{name}` is declared more than once in the same scope")]
    DuplicateBinding { name: String, first: Span, second: Span },

    #[error("field label `{0}` is not a valid pattern constraint source")]
    InvalidPatternLabel(String, Span),

    #[error("invalid regular expression in bound: {0}")]
    BadRegex(String, Span),
}

impl FrontendError {
    pub fn primary_span(&self) -> &Span {
        match self {
            FrontendError::UndefinedIdentifier { span, .. } => span,
            FrontendError::DuplicateBinding { second, .. } => second,
            FrontendError::InvalidPatternLabel(_, span) => span,
            FrontendError::BadRegex(_, span) => span,
        }
    }
}
