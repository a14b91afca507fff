//! Predicate compiler: lowers a natural class to a total, allocation-free
//! predicate over Σ_V tuples.

use crate::feature::{FeatureIndex, Ternary};
use crate::rule::NaturalClass;

/// `(position in V_order, required polarity)` pairs, precomputed once per
/// `(class, V_order)` pair. An empty class compiles to the constant-true
/// predicate.
#[derive(Debug, Clone)]
pub struct CompiledClass {
    checks: Vec<(usize, Ternary)>,
}

impl CompiledClass {
    pub fn compile(class: &NaturalClass, v_order: &[FeatureIndex]) -> Self {
        let checks = class
            .literals()
            .iter()
            .map(|lit| {
                let pos = v_order
                    .iter()
                    .position(|&f| f == lit.feature)
                    .expect("class feature must be in V: dependency analysis guarantees this");
                (pos, lit.polarity)
            })
            .collect();
        Self { checks }
    }

    /// O(|class|), no allocation.
    pub fn matches(&self, tuple: &[Ternary]) -> bool {
        self.checks.iter().all(|&(pos, polarity)| tuple[pos] == polarity)
    }
}
