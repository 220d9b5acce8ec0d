//! Disjunction exploration and default selection (§4.5).

use crate::interpreter::vertex::VertexRef;

/// One surviving alternative of a disjunction, recorded on the owning Vertex once every
/// alternative has been unified with the ambient context and the Bottom ones discarded.
#[derive(Clone)]
pub struct Disjunct {
    pub value: VertexRef,
    pub is_default: bool,
}

/// The result of collapsing a disjunction: how many alternatives survived, and which (if any)
/// the default rule picks when concreteness is required.
pub enum Collapsed {
    /// Every alternative unified to Bottom.
    Bottom,
    /// Exactly one alternative survived; the disjunction itself collapses to it.
    Single(VertexRef),
    /// More than one alternative survived; still a Disjunction value, not concrete.
    Many(Vec<Disjunct>),
}

/// Applies the marked-default rule to a surviving alternative set (§4.5, §9 resolved open
/// question (b)): the default set is the intersection of survivors with the marked set. A
/// singleton default set resolves the disjunction when concreteness is required; anything else
/// is left to the caller to report as `EvalError::Concrete`.
pub fn collapse(survivors: Vec<Disjunct>) -> Collapsed {
    match survivors.len() {
        0 => Collapsed::Bottom,
        1 => Collapsed::Single(survivors.into_iter().next().unwrap().value),
        _ => Collapsed::Many(survivors),
    }
}

/// The default set among survivors, per the marked-default rule. Outside-in resolution order
/// (resolved open question (b)) is a caller concern: the engine computes an enclosing
/// disjunction's default set before recursing into any nested one, simply by virtue of
/// processing conjuncts in source/insertion order (§4.2).
pub fn default_set(survivors: &[Disjunct]) -> Vec<&Disjunct> {
    survivors.iter().filter(|d| d.is_default).collect()
}
