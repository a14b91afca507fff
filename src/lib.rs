//! Compiles Search & Change phonological rewrite rules into canonical,
//! total, deterministic finite-state transducers over a ternary-feature
//! alphabet, and provides a reference evaluator sharing the same
//! [`dsl::eval_out`] so compiled and direct evaluation cannot drift apart.
//!
//! A typical session: decode a [`document::RawRulesDocument`] and an
//! [`alphabet::Alphabet`] (decoding itself is a caller concern), validate
//! the document with [`rule::compile_document`], then either build a
//! transducer per rule with [`transducer::build`] or run rules directly
//! against words with [`evaluator::RuleRuntime`]. [`emitter`] turns a built
//! transducer into AT&T text and a symbol table for downstream FST tooling.

pub mod alphabet;
pub mod analysis;
pub mod bundle;
pub mod config;
pub mod document;
pub mod dsl;
pub mod emitter;
pub mod encoding;
pub mod error;
pub mod evaluator;
pub mod feature;
pub mod predicate;
pub mod rule;
pub mod transducer;

pub use alphabet::{Alphabet, AlphabetBuilder};
pub use config::Config;
pub use error::Error;
pub use evaluator::{dependencies_for_document, run_document, DocumentRun, Pipeline, RuleRuntime};
pub use feature::{FeatureUniverse, Ternary};
pub use rule::{Rule, RulesDocument};
pub use transducer::Transducer;
