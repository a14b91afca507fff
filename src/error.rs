//! Error kinds for this crate. Hand-written `Display`/`std::error::Error`
//! impls, no `thiserror`: a small closed enum over a derive macro.

use std::fmt;

#[derive(Debug, Clone)]
pub enum Error {
    /// Malformed rule/alphabet/input document.
    Schema(String),
    /// Out expression syntactic or semantic failure.
    Dsl { message: String, expr: String },
    /// Word contains a symbol absent from the alphabet.
    UnknownSymbol {
        rule_id: String,
        position: usize,
        symbol: String,
    },
    /// Output bundle cannot resolve to a unique symbol under `strict`.
    SymbolResolution {
        rule_id: String,
        position: usize,
        tuple: String,
    },
    /// Projected arc count exceeds the configured budget.
    ArcBudgetExceeded {
        rule_id: String,
        projected: u128,
        max_arcs: usize,
    },
    /// Reference evaluator and compiled transducer disagree under `compare`.
    Consistency {
        rule_id: String,
        word: String,
        position: usize,
    },
    /// A post-construction invariant (totality, determinism, ...) failed.
    InternalInvariantViolated(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Schema(msg) => write!(f, "schema error: {msg}"),
            Error::Dsl { message, expr } => {
                write!(f, "DSL error in `{expr}`: {message}")
            }
            Error::UnknownSymbol {
                rule_id,
                position,
                symbol,
            } => write!(
                f,
                "rule '{rule_id}': unknown symbol '{symbol}' at position {position}"
            ),
            Error::SymbolResolution {
                rule_id,
                position,
                tuple,
            } => write!(
                f,
                "rule '{rule_id}': output tuple {tuple} at position {position} does not resolve to a unique alphabet symbol"
            ),
            Error::ArcBudgetExceeded {
                rule_id,
                projected,
                max_arcs,
            } => write!(
                f,
                "rule '{rule_id}': projected arc count {projected} exceeds max_arcs {max_arcs}"
            ),
            Error::Consistency {
                rule_id,
                word,
                position,
            } => write!(
                f,
                "rule '{rule_id}': reference evaluator and compiled transducer diverge on '{word}' at position {position}"
            ),
            Error::InternalInvariantViolated(msg) => {
                write!(f, "internal invariant violated: {msg}")
            }
        }
    }
}

impl std::error::Error for Error {}
