//! Configuration knobs, carried explicitly end to end rather than stashed
//! in ambient/global state. No `OnceLock` singleton: every function that
//! needs a `Config` takes one as an argument.

use crate::rule::Direction;

/// Default arc budget.
pub const DEFAULT_MAX_ARCS: usize = 5_000_000;

#[derive(Debug, Clone)]
pub struct Config {
    /// Bundle→symbol resolution must be unique.
    pub strict: bool,
    /// Arc budget enforced before any arc is constructed.
    pub max_arcs: usize,
    /// Include input copies alongside outputs in the output document.
    pub include_input: bool,
    /// When set, overrides every rule's own `dir`.
    pub direction_override: Option<Direction>,
    /// Return `V`/`P` alongside compilation results.
    pub dump_vp: bool,
    /// Assert the reference evaluator agrees with the compiled transducer.
    pub compare: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strict: false,
            max_arcs: DEFAULT_MAX_ARCS,
            include_input: false,
            direction_override: None,
            dump_vp: false,
            compare: false,
        }
    }
}

/// Callback invoked by the transducer builder as arcs are produced. An
/// explicit callback rather than ambient state, so a caller or test can
/// instrument progress without reaching into the builder. Invoked from the
/// thread that owns the builder; must not mutate the builder.
pub trait Progress {
    fn on_arcs(&mut self, built: u64, total: u64);
}

impl<F: FnMut(u64, u64)> Progress for F {
    fn on_arcs(&mut self, built: u64, total: u64) {
        self(built, total)
    }
}
