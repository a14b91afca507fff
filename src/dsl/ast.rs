//! The Out AST. `OutExpr` is the canonical form every sugared spelling
//! (`bundle`, `all`) desugars to at parse time.

use crate::feature::{FeatureIndex, Ternary};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutExpr {
    Inr,
    Trm,
    /// `(lit (+|-) feature)`. Polarity is always `Plus`/`Minus`.
    Lit(Ternary, FeatureIndex),
    Proj(Box<OutExpr>, ProjTarget),
    Unify(Box<OutExpr>, Box<OutExpr>),
    Subtract(Box<OutExpr>, Box<OutExpr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjTarget {
    Features(Vec<FeatureIndex>),
    All,
}
