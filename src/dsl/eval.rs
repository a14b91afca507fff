//! Pure, recursive, deterministic evaluation of the Out AST.
//!
//! Shared verbatim between [`crate::transducer`] and [`crate::evaluator`] so
//! the two can never drift apart on the meaning of a rule's output — this is
//! the single place `INR`/`TRM` semantics are defined.

use crate::bundle::Bundle;
use crate::error::Error;
use crate::feature::FeatureUniverse;

use super::ast::{OutExpr, ProjTarget};

/// Evaluates `expr` with `inr`/`trm` bound to the given bundles.
pub fn eval_out(expr: &OutExpr, inr: &Bundle, trm: &Bundle, universe: &FeatureUniverse) -> Result<Bundle, Error> {
    match expr {
        OutExpr::Inr => Ok(inr.clone()),
        OutExpr::Trm => Ok(trm.clone()),
        OutExpr::Lit(polarity, feature) => {
            if *feature >= universe.len() {
                return Err(Error::Dsl {
                    message: format!("feature index {feature} out of range"),
                    expr: format!("{expr:?}"),
                });
            }
            Ok(Bundle::empty().with(*feature, *polarity))
        }
        OutExpr::Proj(inner, target) => {
            let value = eval_out(inner, inr, trm, universe)?;
            match target {
                ProjTarget::Features(feats) => Ok(value.restrict(feats)),
                ProjTarget::All => Ok(value.restrict(&universe.all_indices())),
            }
        }
        OutExpr::Unify(a, b) => {
            let a = eval_out(a, inr, trm, universe)?;
            let b = eval_out(b, inr, trm, universe)?;
            Ok(a.unify(&b))
        }
        OutExpr::Subtract(a, b) => {
            let a = eval_out(a, inr, trm, universe)?;
            let b = eval_out(b, inr, trm, universe)?;
            Ok(a.subtract(&b))
        }
    }
}
