//! The alphabet: an ordered, immutable mapping from symbol name to its full
//! feature bundle over `F`.

use std::collections::HashMap;

use smol_str::SmolStr;

use crate::bundle::Bundle;
use crate::document::AlphabetTable;
use crate::error::Error;
use crate::feature::{FeatureIndex, FeatureUniverse, Ternary};

/// An ordered set of surface symbols, each annotated with a full bundle over
/// the shared [`FeatureUniverse`]. Created once per compilation unit;
/// immutable thereafter.
#[derive(Debug, Clone)]
pub struct Alphabet {
    universe: FeatureUniverse,
    symbols: Vec<SmolStr>,
    index: HashMap<SmolStr, usize>,
    bundles: Vec<Bundle>,
}

impl Alphabet {
    pub fn builder(universe: FeatureUniverse) -> AlphabetBuilder {
        AlphabetBuilder::new(universe)
    }

    pub fn universe(&self) -> &FeatureUniverse {
        &self.universe
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbol_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn symbol_name(&self, idx: usize) -> &str {
        &self.symbols[idx]
    }

    pub fn symbol_bundle(&self, name: &str) -> Option<&Bundle> {
        self.symbol_index(name).map(|i| &self.bundles[i])
    }

    pub fn bundle_at(&self, idx: usize) -> &Bundle {
        &self.bundles[idx]
    }

    /// Symbols in alphabet (construction) order, paired with their bundles.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bundle)> {
        self.symbols
            .iter()
            .map(SmolStr::as_str)
            .zip(self.bundles.iter())
    }

    /// Projects a symbol's bundle to a Σ_V tuple aligned with `order`,
    /// mapping absent features to `UNSPEC`.
    pub fn project_symbol(&self, name: &str, order: &[FeatureIndex]) -> Option<Vec<Ternary>> {
        let bundle = self.symbol_bundle(name)?;
        Some(order.iter().map(|&f| bundle.get(f)).collect())
    }

    /// Assembles the [`FeatureUniverse`] and [`Alphabet`] directly from a
    /// decoded §6 alphabet table (`""`-then-symbols header row, one row per
    /// feature, cells `{"+","-","0"}`, missing cells `UNSPEC`). Decoding the
    /// table's textual form is a caller concern (§1); this is the core's own
    /// assembly step from the decoded shape to its types, the counterpart to
    /// [`crate::rule::compile_document`] on the rules side.
    pub fn from_table(table: &AlphabetTable) -> Result<Self, Error> {
        let universe = FeatureUniverse::new(table.rows.iter().map(|(name, _)| name.clone()));
        let mut builder = Alphabet::builder(universe);
        for (symbol_pos, symbol_name) in table.symbols.iter().enumerate() {
            let mut cells = Vec::with_capacity(table.rows.len());
            for (feature_name, row) in &table.rows {
                let cell = row.get(symbol_pos).and_then(|c| c.as_deref());
                let value = Ternary::from_cell(cell).ok_or_else(|| {
                    Error::Schema(format!(
                        "alphabet symbol '{symbol_name}' has invalid cell '{}' for feature '{feature_name}'",
                        cell.unwrap_or("?")
                    ))
                })?;
                cells.push((feature_name.as_str(), value));
            }
            builder.add_symbol(symbol_name, cells)?;
        }
        builder.build()
    }
}

/// Builds an [`Alphabet`] from decoded `(symbol name, feature cells)` rows.
/// Decoding the surrounding table text format is left to the caller; this
/// only assembles and validates the already-decoded rows.
pub struct AlphabetBuilder {
    universe: FeatureUniverse,
    symbols: Vec<SmolStr>,
    index: HashMap<SmolStr, usize>,
    bundles: Vec<Bundle>,
}

impl AlphabetBuilder {
    pub fn new(universe: FeatureUniverse) -> Self {
        Self {
            universe,
            symbols: Vec::new(),
            index: HashMap::new(),
            bundles: Vec::new(),
        }
    }

    /// Adds one symbol with its cells given as `(feature name, value)`
    /// pairs; features not named default to `UNSPEC`. Fails with
    /// [`Error::Schema`] if the symbol name is a duplicate or a feature name
    /// is unknown.
    pub fn add_symbol<'a, I>(&mut self, name: &str, cells: I) -> Result<&mut Self, Error>
    where
        I: IntoIterator<Item = (&'a str, Ternary)>,
    {
        if self.index.contains_key(name) {
            return Err(Error::Schema(format!("duplicate alphabet symbol '{name}'")));
        }
        let mut bundle = Bundle::empty();
        for (feature_name, value) in cells {
            let idx = self.universe.index_of(feature_name).ok_or_else(|| {
                Error::Schema(format!(
                    "alphabet symbol '{name}' references unknown feature '{feature_name}'"
                ))
            })?;
            bundle.set(idx, value);
        }
        let key = SmolStr::new(name);
        self.index.insert(key.clone(), self.symbols.len());
        self.symbols.push(key);
        self.bundles.push(bundle);
        Ok(self)
    }

    pub fn build(self) -> Result<Alphabet, Error> {
        if self.symbols.is_empty() {
            return Err(Error::Schema("alphabet has no symbols".into()));
        }
        Ok(Alphabet {
            universe: self.universe,
            symbols: self.symbols,
            index: self.index,
            bundles: self.bundles,
        })
    }
}
