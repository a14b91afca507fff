//! The dependency analyser: computes `V` (grammar-visible features) and
//! `P ⊆ V` (Out-visible terminator features) for a rule.

use std::collections::BTreeSet;

use log::trace;

use crate::dsl::ast::{OutExpr, ProjTarget};
use crate::feature::{FeatureIndex, FeatureUniverse};
use crate::rule::NaturalClass;

/// `V` and `P`, each already in `F`'s canonical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependencies {
    pub v_order: Vec<FeatureIndex>,
    pub p_order: Vec<FeatureIndex>,
}

impl Dependencies {
    pub fn k(&self) -> usize {
        self.v_order.len()
    }

    pub fn p_len(&self) -> usize {
        self.p_order.len()
    }
}

fn class_features(class: &NaturalClass, out: &mut BTreeSet<FeatureIndex>) {
    for lit in class.literals() {
        out.insert(lit.feature);
    }
}

/// Walks the Out AST collecting features named by `Lit` and explicit `Proj`
/// lists; returns `true` if a `Proj(_, ALL)` was reached (forcing `V := F`).
fn walk_v(expr: &OutExpr, out: &mut BTreeSet<FeatureIndex>) -> bool {
    match expr {
        OutExpr::Inr | OutExpr::Trm => false,
        OutExpr::Lit(_, feature) => {
            out.insert(*feature);
            false
        }
        OutExpr::Proj(inner, target) => {
            let inner_all = walk_v(inner, out);
            match target {
                ProjTarget::Features(feats) => {
                    out.extend(feats.iter().copied());
                    inner_all
                }
                ProjTarget::All => true,
            }
        }
        OutExpr::Unify(a, b) | OutExpr::Subtract(a, b) => {
            let a_all = walk_v(a, out);
            let b_all = walk_v(b, out);
            a_all || b_all
        }
    }
}

/// Is `expr` TRM-tainted: is it directly `Trm`, does it contain `Trm`, or is
/// it a `Unify`/`Subtract` combined with a tainted sibling?
fn is_tainted(expr: &OutExpr) -> bool {
    match expr {
        OutExpr::Inr | OutExpr::Lit(..) => false,
        OutExpr::Trm => true,
        OutExpr::Proj(inner, _) => is_tainted(inner),
        OutExpr::Unify(a, b) | OutExpr::Subtract(a, b) => is_tainted(a) || is_tainted(b),
    }
}

/// Every feature named directly under `expr` — the set Out-visibility
/// attributes to `expr` once it is known to be tainted. Bare `Inr`/`Trm`
/// name the whole of `v_order`; `Proj(_, ALL)` also names the whole of
/// `v_order`, since `Proj(TRM, *)` sets `P = V`.
fn named_features(expr: &OutExpr, v_order: &[FeatureIndex]) -> BTreeSet<FeatureIndex> {
    match expr {
        OutExpr::Inr | OutExpr::Trm => v_order.iter().copied().collect(),
        OutExpr::Lit(_, feature) => std::iter::once(*feature).collect(),
        OutExpr::Proj(_, ProjTarget::Features(feats)) => feats.iter().copied().collect(),
        OutExpr::Proj(_, ProjTarget::All) => v_order.iter().copied().collect(),
        OutExpr::Unify(a, b) | OutExpr::Subtract(a, b) => {
            named_features(a, v_order)
                .into_iter()
                .chain(named_features(b, v_order))
                .collect()
        }
    }
}

/// Collects `P`: walk the AST, and at the first tainted node on each path
/// take its full `named_features` without recursing further (recursing
/// further would only ever add a subset of what's already included).
fn collect_p(expr: &OutExpr, v_order: &[FeatureIndex]) -> BTreeSet<FeatureIndex> {
    if is_tainted(expr) {
        return named_features(expr, v_order);
    }
    match expr {
        OutExpr::Inr | OutExpr::Trm | OutExpr::Lit(..) => BTreeSet::new(),
        OutExpr::Proj(inner, _) => collect_p(inner, v_order),
        OutExpr::Unify(a, b) | OutExpr::Subtract(a, b) => {
            collect_p(a, v_order).into_iter().chain(collect_p(b, v_order)).collect()
        }
    }
}

/// Computes `V`/`P` for one rule's classes and Out AST.
pub fn analyze(
    inr: &NaturalClass,
    trm: &NaturalClass,
    cnd: &NaturalClass,
    out: &OutExpr,
    universe: &FeatureUniverse,
) -> Dependencies {
    let mut v_set = BTreeSet::new();
    class_features(inr, &mut v_set);
    class_features(trm, &mut v_set);
    class_features(cnd, &mut v_set);
    let v_is_full = walk_v(out, &mut v_set);

    let v_order: Vec<FeatureIndex> = if v_is_full {
        universe.all_indices()
    } else {
        v_set.into_iter().collect()
    };

    let p_set = collect_p(out, &v_order);
    let p_order: Vec<FeatureIndex> = v_order.iter().copied().filter(|f| p_set.contains(f)).collect();

    trace!("analyzed rule: |V|={} |P|={}", v_order.len(), p_order.len());
    Dependencies { v_order, p_order }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::parser;
    use crate::feature::Ternary;
    use crate::rule::Literal;

    fn universe() -> FeatureUniverse {
        FeatureUniverse::new(["F1", "F2"])
    }

    fn class(lits: &[(Ternary, FeatureIndex)]) -> NaturalClass {
        NaturalClass::new(lits.iter().map(|&(p, f)| Literal { polarity: p, feature: f }).collect())
    }

    #[test]
    fn s1_identity_rule_has_empty_v_and_p() {
        let u = universe();
        let out = parser::parse("INR", &u).unwrap();
        let empty = NaturalClass::default();
        let deps = analyze(&empty, &empty, &empty, &out, &u);
        assert!(deps.v_order.is_empty());
        assert!(deps.p_order.is_empty());
    }

    #[test]
    fn s2_replace_f1_after_trm_terminator() {
        let u = universe();
        let f1 = u.index_of("F1").unwrap();
        let f2 = u.index_of("F2").unwrap();
        let inr = class(&[(Ternary::Plus, f1)]);
        let trm = class(&[(Ternary::Minus, f2)]);
        let out = parser::parse("(unify (proj TRM (F1)) INR)", &u).unwrap();
        let deps = analyze(&inr, &trm, &NaturalClass::default(), &out, &u);
        assert_eq!(deps.v_order, vec![f1, f2]);
        assert_eq!(deps.p_order, vec![f1]);
    }

    #[test]
    fn s4_proj_trm_all_expands_v_to_f_and_sets_p_to_v() {
        let u = universe();
        let out = parser::parse("(proj TRM *)", &u).unwrap();
        let empty = NaturalClass::default();
        let deps = analyze(&empty, &empty, &empty, &out, &u);
        assert_eq!(deps.v_order, u.all_indices());
        assert_eq!(deps.p_order, u.all_indices());
    }

    #[test]
    fn p_is_always_subset_of_v() {
        let u = universe();
        let f1 = u.index_of("F1").unwrap();
        let inr = class(&[(Ternary::Plus, f1)]);
        let out = parser::parse("(unify TRM (lit - F2))", &u).unwrap();
        let deps = analyze(&inr, &NaturalClass::default(), &NaturalClass::default(), &out, &u);
        assert!(deps.p_order.iter().all(|f| deps.v_order.contains(f)));
    }

    #[test]
    fn bare_trm_taints_whole_expression() {
        let u = universe();
        let out = parser::parse("(subtract INR TRM)", &u).unwrap();
        let f1 = u.index_of("F1").unwrap();
        let inr = class(&[(Ternary::Plus, f1)]);
        let deps = analyze(&inr, &NaturalClass::default(), &NaturalClass::default(), &out, &u);
        // bare TRM as a sibling taints the whole Subtract node, so every
        // feature named anywhere in it (here just F1, from INR) enters P.
        assert_eq!(deps.p_order, vec![f1]);
    }
}
