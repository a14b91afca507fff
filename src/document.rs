//! Decoded document shapes. These are exactly the objects a JSON/TOML
//! decoder would populate and what an emitter would re-serialize; the crate
//! performs no byte-level (de)serialization itself — that decoding is left
//! to the caller.
//!
//! With the `serde` feature enabled, every type here additionally derives
//! `Serialize`/`Deserialize`, for hosts that want to hand these structs
//! straight to `serde_json`/`toml` without writing their own decoder.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// `(polarity, feature)` pairs shared by `inr`/`trm`/`cnd`, e.g.
/// `[["+", "F1"], …]` — the same shape applies to all three.
pub type RawClass = Vec<(String, String)>;

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawRule {
    pub id: String,
    pub dir: String,
    pub inr: RawClass,
    pub trm: RawClass,
    pub cnd: RawClass,
    pub out: String,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawRulesDocument {
    pub id: String,
    pub rules: Vec<RawRule>,
}

/// Feature table: first row `""` then symbol names, first column feature
/// names, cells `{"+", "-", "0"}`; missing cells are `UNSPEC`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AlphabetTable {
    pub symbols: Vec<String>,
    /// One row per feature: `(feature name, cells aligned with `symbols`)`.
    pub rows: Vec<(String, Vec<Option<String>>)>,
}

/// Either a bare ordered sequence of words, or `{inputs: [...]}`. Both
/// shapes decode to the same in-memory form.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InputDocument {
    pub inputs: Vec<Vec<String>>,
}

/// One row of per-rule output. The `input` field is only populated when
/// `include_input` is set.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OutputRow {
    pub rule_id: String,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub input: Option<Vec<String>>,
    pub outputs: Vec<String>,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OutputDocument {
    pub id: String,
    pub inputs: Vec<Vec<String>>,
    pub rows: Vec<OutputRow>,
}
