//! Feature bundles: partial maps from feature name to polarity, represented
//! as a pair of bit-parallel masks so `Unify`/`Subtract` stay word-parallel
//! even when `|F|` grows beyond a handful of features.

use crate::feature::{FeatureIndex, Ternary};

const WORD_BITS: usize = u64::BITS as usize;

/// A growable bitset over `FeatureIndex`, word-parallel for `union`/`diff`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Bitset(Vec<u64>);

impl Bitset {
    fn word_index(bit: usize) -> usize {
        bit / WORD_BITS
    }

    fn ensure_capacity(&mut self, bit: usize) {
        let needed = Self::word_index(bit) + 1;
        if self.0.len() < needed {
            self.0.resize(needed, 0);
        }
    }

    fn get(&self, bit: usize) -> bool {
        let word = Self::word_index(bit);
        match self.0.get(word) {
            Some(w) => (w >> (bit % WORD_BITS)) & 1 == 1,
            None => false,
        }
    }

    fn set(&mut self, bit: usize, value: bool) {
        if value {
            self.ensure_capacity(bit);
            self.0[Self::word_index(bit)] |= 1 << (bit % WORD_BITS);
        } else if Self::word_index(bit) < self.0.len() {
            self.0[Self::word_index(bit)] &= !(1 << (bit % WORD_BITS));
        }
    }

    fn union(&self, other: &Bitset) -> Bitset {
        let len = self.0.len().max(other.0.len());
        let mut out = vec![0u64; len];
        for i in 0..len {
            let a = self.0.get(i).copied().unwrap_or(0);
            let b = other.0.get(i).copied().unwrap_or(0);
            out[i] = a | b;
        }
        Bitset(out)
    }

    /// `self & !other`
    fn diff(&self, other: &Bitset) -> Bitset {
        let mut out = self.0.clone();
        for i in 0..out.len() {
            let b = other.0.get(i).copied().unwrap_or(0);
            out[i] &= !b;
        }
        Bitset(out)
    }

    fn mask_out(&mut self, other: &Bitset) {
        for i in 0..self.0.len() {
            let b = other.0.get(i).copied().unwrap_or(0);
            self.0[i] &= !b;
        }
    }

    fn iter_set(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().enumerate().flat_map(|(word_idx, &word)| {
            (0..WORD_BITS).filter_map(move |bit| {
                if (word >> bit) & 1 == 1 {
                    Some(word_idx * WORD_BITS + bit)
                } else {
                    None
                }
            })
        })
    }
}

/// A partial mapping from feature name to polarity. Absence of a feature
/// denotes `UNSPEC`; by construction a bundle can never map one feature to
/// both polarities (the two masks are kept disjoint by `set`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bundle {
    plus: Bitset,
    minus: Bitset,
}

impl Bundle {
    /// The fully-underspecified identity bundle.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn set(&mut self, feature: FeatureIndex, value: Ternary) {
        match value {
            Ternary::Unspec => {
                self.plus.set(feature, false);
                self.minus.set(feature, false);
            }
            Ternary::Plus => {
                self.plus.set(feature, true);
                self.minus.set(feature, false);
            }
            Ternary::Minus => {
                self.minus.set(feature, true);
                self.plus.set(feature, false);
            }
        }
    }

    pub fn with(mut self, feature: FeatureIndex, value: Ternary) -> Self {
        self.set(feature, value);
        self
    }

    pub fn get(&self, feature: FeatureIndex) -> Ternary {
        if self.plus.get(feature) {
            Ternary::Plus
        } else if self.minus.get(feature) {
            Ternary::Minus
        } else {
            Ternary::Unspec
        }
    }

    /// Every feature this bundle assigns a polarity to, ascending.
    pub fn domain(&self) -> impl Iterator<Item = FeatureIndex> + '_ {
        self.plus.iter_set().chain(self.minus.iter_set())
    }

    /// `Proj(self, features)` — restriction to an explicit feature set.
    pub fn restrict(&self, features: &[FeatureIndex]) -> Bundle {
        let mut out = Bundle::empty();
        for &f in features {
            out.set(f, self.get(f));
        }
        out
    }

    /// `Unify(self, other) = self ∪ { (F,c) ∈ other | F ∉ dom(self) }`.
    /// Left-biased: never overwrites a feature `self` already assigns.
    pub fn unify(&self, other: &Bundle) -> Bundle {
        let other_only_plus = other.plus.diff(&self.plus).diff(&self.minus);
        let other_only_minus = other.minus.diff(&self.plus).diff(&self.minus);
        Bundle {
            plus: self.plus.union(&other_only_plus),
            minus: self.minus.union(&other_only_minus),
        }
    }

    /// `Subtract(self, other) = { (F,c) ∈ self | (F,c) ∉ other }`. Removes
    /// only exact polarity matches.
    pub fn subtract(&self, other: &Bundle) -> Bundle {
        let mut plus = self.plus.clone();
        plus.mask_out(&other.plus);
        let mut minus = self.minus.clone();
        minus.mask_out(&other.minus);
        Bundle { plus, minus }
    }
}
