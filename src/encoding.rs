//! Bundle encoder: Σ_V tuples, base-3 label encoding, projection `π_P`, and
//! alphabet symbol resolution.

use std::collections::HashMap;

use crate::alphabet::Alphabet;
use crate::bundle::Bundle;
use crate::error::Error;
use crate::feature::{FeatureIndex, Ternary};

/// `label(t₀,…,t_{k-1}) = 1 + Σᵢ tᵢ·3ⁱ` (label 0 reserved for ε).
pub fn encode_tuple(tuple: &[Ternary]) -> u64 {
    let mut label: u64 = 0;
    for (i, &t) in tuple.iter().enumerate() {
        label += (t.as_digit() as u64) * 3u64.pow(i as u32);
    }
    label + 1
}

/// Inverse of [`encode_tuple`] for a tuple of length `k`.
pub fn decode_tuple(label: u64, k: usize) -> Vec<Ternary> {
    assert!(label >= 1, "label 0 is reserved for ε, has no tuple");
    let mut n = label - 1;
    let mut out = Vec::with_capacity(k);
    for _ in 0..k {
        out.push(Ternary::from_digit((n % 3) as u8));
        n /= 3;
    }
    out
}

pub fn bundle_to_tuple(bundle: &Bundle, order: &[FeatureIndex]) -> Vec<Ternary> {
    order.iter().map(|&f| bundle.get(f)).collect()
}

pub fn tuple_to_bundle(tuple: &[Ternary], order: &[FeatureIndex]) -> Bundle {
    let mut bundle = Bundle::empty();
    for (&f, &t) in order.iter().zip(tuple.iter()) {
        bundle.set(f, t);
    }
    bundle
}

/// Precomputed coordinate indices projecting a Σ_V tuple onto Σ_P: for each
/// feature in `p_order`, its position within `v_order`. Built once per rule
/// so `project` is an O(|P|), allocation-free array gather.
pub struct Projection {
    positions: Vec<usize>,
}

impl Projection {
    pub fn new(v_order: &[FeatureIndex], p_order: &[FeatureIndex]) -> Self {
        let positions = p_order
            .iter()
            .map(|pf| {
                v_order
                    .iter()
                    .position(|vf| vf == pf)
                    .expect("P must be a subset of V")
            })
            .collect();
        Self { positions }
    }

    /// `π_P(tuple)`, writing into a caller-supplied buffer: no allocation
    /// on the hot path.
    pub fn project_into(&self, tuple: &[Ternary], out: &mut Vec<Ternary>) {
        out.clear();
        out.extend(self.positions.iter().map(|&pos| tuple[pos]));
    }

    pub fn project(&self, tuple: &[Ternary]) -> Vec<Ternary> {
        let mut out = Vec::with_capacity(self.positions.len());
        self.project_into(tuple, &mut out);
        out
    }
}

enum Resolution {
    Unique(usize),
    Ambiguous(Vec<usize>),
}

/// Resolves Σ_V tuples back to alphabet symbol names. Built once per
/// `(alphabet, V_order)` pair; `resolve` afterwards is an O(1) average hash
/// lookup.
pub struct SymbolResolver<'a> {
    alphabet: &'a Alphabet,
    by_label: HashMap<u64, Resolution>,
}

impl<'a> SymbolResolver<'a> {
    pub fn build(alphabet: &'a Alphabet, v_order: &[FeatureIndex]) -> Self {
        let mut by_label: HashMap<u64, Resolution> = HashMap::new();
        for (idx, (_, bundle)) in alphabet.iter().enumerate() {
            let tuple = bundle_to_tuple(bundle, v_order);
            let label = encode_tuple(&tuple);
            by_label
                .entry(label)
                .and_modify(|r| match r {
                    Resolution::Unique(first) => *r = Resolution::Ambiguous(vec![*first, idx]),
                    Resolution::Ambiguous(v) => v.push(idx),
                })
                .or_insert(Resolution::Unique(idx));
        }
        Self { alphabet, by_label }
    }

    /// Resolves a tuple to its symbol name. In `strict` mode an ambiguous
    /// match is a [`Error::SymbolResolution`]; in non-strict mode the first
    /// alphabet-order match wins.
    pub fn resolve(&self, tuple: &[Ternary], rule_id: &str, position: usize, strict: bool) -> Result<&'a str, Error> {
        let label = encode_tuple(tuple);
        match self.by_label.get(&label) {
            Some(Resolution::Unique(idx)) => Ok(self.alphabet.symbol_name(*idx)),
            Some(Resolution::Ambiguous(candidates)) => {
                if strict {
                    Err(Error::SymbolResolution {
                        rule_id: rule_id.to_string(),
                        position,
                        tuple: format_tuple(tuple),
                    })
                } else {
                    let first = candidates.iter().min().copied().expect("non-empty by construction");
                    Ok(self.alphabet.symbol_name(first))
                }
            }
            None => Err(Error::SymbolResolution {
                rule_id: rule_id.to_string(),
                position,
                tuple: format_tuple(tuple),
            }),
        }
    }
}

fn format_tuple(tuple: &[Ternary]) -> String {
    let signs: String = tuple.iter().map(|t| t.as_sign()).collect();
    format!("<{signs}>")
}
