//! Concrete scalar values and leaf bound constraints.
//!
//! `Scalar` is the "this value is fully known" half of the lattice; `Bound` is a leaf
//! constraint that narrows a kind without picking a single inhabitant (`>=1`, a regex, ...).
//! Both are produced by [`crate::frontend`] from [`crate::ast::BasicLit`]/[`crate::ast::Unary`]
//! nodes and consumed by [`crate::interpreter`].

use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::schema::{BoundOp, Kind};

/// A fully concrete leaf value. Order matters for untagged deserialization in the same way
/// it does for `FieldValue`-shaped enums elsewhere in this codebase's lineage: prefer the
/// exact integer reading over the lossy float one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Arc<str>),
    Bytes(Arc<[u8]>),
}

impl Scalar {
    pub fn kind(&self) -> Kind {
        match self {
            Scalar::Null => Kind::NULL,
            Scalar::Bool(_) => Kind::BOOL,
            Scalar::Int(_) => Kind::INT,
            Scalar::Float(_) => Kind::FLOAT,
            Scalar::String(_) => Kind::STRING,
            Scalar::Bytes(_) => Kind::BYTES,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => true,
            (Scalar::Bool(l), Scalar::Bool(r)) => l == r,
            (Scalar::Int(l), Scalar::Int(r)) => l == r,
            (Scalar::Float(l), Scalar::Float(r)) => {
                debug_assert!(l.is_finite(), "non-finite floats must never reach Scalar::Float");
                debug_assert!(r.is_finite());
                l == r
            }
            // Int/Float are distinct kinds in this lattice (Number is their union, not a
            // fusion); 3 and 3.0 are related by `Number` but not structurally equal.
            (Scalar::String(l), Scalar::String(r)) => l == r,
            (Scalar::Bytes(l), Scalar::Bytes(r)) => l == r,
            _ => false,
        }
    }
}

impl Eq for Scalar {}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::String(Arc::from(v))
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::String(Arc::from(v.as_str()))
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::String(s) => write!(f, "{s:?}"),
            Scalar::Bytes(b) => write!(f, "'{}'", String::from_utf8_lossy(b)),
        }
    }
}

/// A leaf constraint narrowing a kind without naming a single inhabitant.
///
/// `Bound`s compose by intersection (§4.2): two `Numeric(Ge, _)` bounds keep the tighter
/// one, and a bound incompatible with a concrete [`Scalar`] makes the owning vertex Bottom.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Bound {
    /// `>=n`, `<n`, `!=n`, ... against a number.
    Numeric(BoundOp, f64),
    /// `!="s"` against a string.
    StringNe(Arc<str>),
    /// `=~#"pattern"#` / `!~#"pattern"#`.
    Regex { pattern: Arc<str>, negated: bool },
}

impl Bound {
    pub fn kind(&self) -> Kind {
        match self {
            Bound::Numeric(..) => Kind::NUMBER,
            Bound::StringNe(_) | Bound::Regex { .. } => Kind::STRING,
        }
    }

    pub fn accepts(&self, value: &Scalar) -> Result<bool, BoundEvalError> {
        match self {
            Bound::Numeric(op, bound) => match value.as_f64() {
                Some(v) => Ok(op.holds_for_numbers(v, *bound)),
                None => Ok(false),
            },
            Bound::StringNe(s) => match value {
                Scalar::String(v) => Ok(v != s),
                _ => Ok(false),
            },
            Bound::Regex { pattern, negated } => match value {
                Scalar::String(v) => {
                    let re = Regex::new(pattern).map_err(|e| BoundEvalError::BadRegex(e.to_string()))?;
                    Ok(re.is_match(v) != *negated)
                }
                _ => Ok(false),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoundEvalError {
    #[error("invalid regular expression: {0}")]
    BadRegex(String),
}

impl PartialEq for Bound {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Bound::Numeric(lo, lv), Bound::Numeric(ro, rv)) => lo == ro && lv == rv,
            (Bound::StringNe(l), Bound::StringNe(r)) => l == r,
            (Bound::Regex { pattern: lp, negated: ln }, Bound::Regex { pattern: rp, negated: rn }) => {
                lp == rp && ln == rn
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for Bound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bound::Numeric(op, v) => write!(f, "{op}{v}"),
            Bound::StringNe(s) => write!(f, "!=\"{s}\""),
            Bound::Regex { pattern, negated } => {
                write!(f, "{}\"{pattern}\"", if *negated { "!~" } else { "=~" })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_bound_accepts_and_rejects() {
        let b = Bound::Numeric(BoundOp::Ge, 10.0);
        assert!(b.accepts(&Scalar::Int(10)).unwrap());
        assert!(!b.accepts(&Scalar::Int(9)).unwrap());
    }

    #[test]
    fn regex_bound() {
        let b = Bound::Regex { pattern: Arc::from("^a.*z$"), negated: false };
        assert!(b.accepts(&Scalar::String(Arc::from("abcz"))).unwrap());
        assert!(!b.accepts(&Scalar::String(Arc::from("xyz"))).unwrap());
    }

    #[test]
    fn float_equality_requires_finite() {
        assert_eq!(Scalar::Float(1.5), Scalar::Float(1.5));
        assert_ne!(Scalar::Int(3), Scalar::Float(3.0));
    }
}
