//! AT&T textual emitter and shared symbol table. Pure string-building; no
//! file I/O here, leaving format-level (de)serialization to the caller.

use std::fmt::Write;

use itertools::Itertools;

use crate::encoding::decode_tuple;
use crate::feature::{FeatureIndex, FeatureUniverse, Ternary};
use crate::transducer::Transducer;

/// One arc per line (`src dst ilabel olabel`), then one line per final
/// state. Every state in `T_V` is final, so this is every state id in
/// ascending order. Arc and state order are already canonical (states
/// ascending, arcs within a state ascending by `ilabel`), so this is a
/// direct walk with no sorting.
pub fn to_att(t: &Transducer) -> String {
    let mut out = String::new();
    for state in 0..t.num_states {
        for arc in t.arcs_for_state(state) {
            writeln!(out, "{} {} {} {}", arc.src, arc.dst, arc.ilabel, arc.olabel).expect("String write cannot fail");
        }
    }
    for state in 0..t.num_states {
        writeln!(out, "{state}").expect("String write cannot fail");
    }
    out
}

/// `name id` lines covering label 0 (`<eps>`) and every label used by a
/// transducer over `v_order`.
pub fn symbol_table(universe: &FeatureUniverse, v_order: &[FeatureIndex]) -> String {
    let k = v_order.len();
    let total = 3u64.pow(k as u32);
    let mut out = String::new();
    writeln!(out, "<eps> 0").expect("String write cannot fail");
    for label in 1..=total {
        let tuple = decode_tuple(label, k);
        let name = label_symbol_name(universe, v_order, &tuple);
        writeln!(out, "{name} {label}").expect("String write cannot fail");
    }
    out
}

/// `featureName + sign` for each coordinate in `v_order`, joined by `_`.
pub fn label_symbol_name(universe: &FeatureUniverse, v_order: &[FeatureIndex], tuple: &[Ternary]) -> String {
    v_order
        .iter()
        .zip(tuple.iter())
        .map(|(&f, &t)| format!("{}{}", universe.name_at(f), t.as_sign()))
        .join("_")
}
