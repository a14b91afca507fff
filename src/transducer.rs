//! The transducer builder: constructs `T_V` directly, without ever
//! materialising a brute-force transducer first.

use log::{debug, warn};
use smol_str::SmolStr;

use crate::analysis::{self, Dependencies};
use crate::config::{Config, Progress};
use crate::dsl::eval_out;
use crate::encoding::{bundle_to_tuple, decode_tuple, encode_tuple, tuple_to_bundle, Projection};
use crate::error::Error;
use crate::feature::FeatureUniverse;
use crate::predicate::CompiledClass;
use crate::rule::Rule;

/// How many arcs elapse between [`Progress::on_arcs`] calls.
const PROGRESS_INTERVAL: u64 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arc {
    pub src: usize,
    pub dst: usize,
    pub ilabel: u64,
    pub olabel: u64,
}

/// `T_V`: total, deterministic, length-preserving. Every state is final.
/// Arcs are stored flat, grouped by state in ascending label order, so
/// `arcs_for_state` is a plain slice.
#[derive(Debug, Clone)]
pub struct Transducer {
    pub rule_id: SmolStr,
    pub v_order: Vec<usize>,
    pub p_order: Vec<usize>,
    pub num_states: usize,
    arcs_per_state: usize,
    pub arcs: Vec<Arc>,
}

impl Transducer {
    pub fn arcs_for_state(&self, state: usize) -> &[Arc] {
        let start = state * self.arcs_per_state;
        &self.arcs[start..start + self.arcs_per_state]
    }

    /// The unique outgoing arc from `state` for input label `ilabel`.
    /// Totality and determinism amount to this lookup being well-defined
    /// for every `(state, ilabel)` pair.
    pub fn arc(&self, state: usize, ilabel: u64) -> &Arc {
        let arcs = self.arcs_for_state(state);
        &arcs[(ilabel - 1) as usize]
    }

    /// Every state is final.
    pub fn is_final(&self, state: usize) -> bool {
        state < self.num_states
    }
}

/// Computes `(1 + 3^|P|) · 3^|V|` without constructing anything, so the
/// budget check in [`build`] runs before any allocation. Returns `None` if
/// the computation would overflow `u128` (a `|V|`/`|P|` large enough for
/// that is certainly larger than any representable `max_arcs`).
pub fn projected_arc_count(deps: &Dependencies) -> Option<u128> {
    let states = 1u128.checked_add(3u128.checked_pow(deps.p_len() as u32)?)?;
    let per_state = 3u128.checked_pow(deps.k() as u32)?;
    states.checked_mul(per_state)
}

/// Builds `T_V` for one rule. Fails with [`Error::ArcBudgetExceeded`]
/// before any arc is constructed if the projected arc count exceeds
/// `config.max_arcs`; no partial output escapes any failure path.
pub fn build(
    rule: &Rule,
    universe: &FeatureUniverse,
    config: &Config,
    mut progress: Option<&mut dyn Progress>,
) -> Result<Transducer, Error> {
    let deps = analysis::analyze(&rule.inr, &rule.trm, &rule.cnd, &rule.out, universe);
    build_with_deps(rule, universe, &deps, config, progress.as_deref_mut())
}

/// As [`build`], but reuses an already-computed [`Dependencies`] (useful
/// when the caller also wants `V`/`P` via `dump_vp`, see
/// [`crate::evaluator::RuleRuntime`]).
pub fn build_with_deps(
    rule: &Rule,
    universe: &FeatureUniverse,
    deps: &Dependencies,
    config: &Config,
    mut progress: Option<&mut dyn Progress>,
) -> Result<Transducer, Error> {
    let total_arcs = projected_arc_count(deps).ok_or_else(|| {
        warn!(
            "rule '{}': projected arc count overflows u128 (|V|={}, |P|={}); rejecting before allocation",
            rule.id,
            deps.k(),
            deps.p_len()
        );
        Error::ArcBudgetExceeded {
            rule_id: rule.id.to_string(),
            projected: u128::MAX,
            max_arcs: config.max_arcs,
        }
    })?;
    if total_arcs > config.max_arcs as u128 {
        warn!(
            "rule '{}': projected arc count {total_arcs} exceeds max_arcs {}",
            rule.id, config.max_arcs
        );
        return Err(Error::ArcBudgetExceeded {
            rule_id: rule.id.to_string(),
            projected: total_arcs,
            max_arcs: config.max_arcs,
        });
    }
    debug!("rule '{}': building T_V, {total_arcs} arcs projected", rule.id);

    let k = deps.k();
    let p = deps.p_len();
    let num_states: usize = (1u128 + 3u128.pow(p as u32)).try_into().expect("checked by budget above");
    let arcs_per_state: usize = 3u128.pow(k as u32).try_into().expect("checked by budget above");
    let total_arcs_usize: usize = total_arcs.try_into().expect("checked by budget above");

    let inr_pred = CompiledClass::compile(&rule.inr, &deps.v_order);
    let trm_pred = CompiledClass::compile(&rule.trm, &deps.v_order);
    let cnd_pred = CompiledClass::compile(&rule.cnd, &deps.v_order);
    let projection = Projection::new(&deps.v_order, &deps.p_order);

    let mut arcs = Vec::with_capacity(total_arcs_usize);
    let mut built: u64 = 0;
    let mut proj_buf = Vec::with_capacity(p);

    for state in 0..num_states {
        let mem_bundle = if state == 0 {
            None
        } else {
            let mem_tuple = decode_tuple(state as u64, p);
            Some(tuple_to_bundle(&mem_tuple, &deps.p_order))
        };

        for label in 1..=arcs_per_state as u64 {
            let tuple = decode_tuple(label, k);
            let (dst, olabel) = match &mem_bundle {
                None => {
                    let trm_ok = trm_pred.matches(&tuple);
                    let cnd_ok = cnd_pred.matches(&tuple);
                    let dst = if trm_ok && cnd_ok {
                        projection.project_into(&tuple, &mut proj_buf);
                        encode_tuple(&proj_buf) as usize
                    } else {
                        0
                    };
                    (dst, label)
                }
                Some(mem) => {
                    let inr_ok = inr_pred.matches(&tuple);
                    let out_tuple = if inr_ok {
                        let inr_bundle = tuple_to_bundle(&tuple, &deps.v_order);
                        let out_bundle = eval_out(&rule.out, &inr_bundle, mem, universe)?;
                        bundle_to_tuple(&out_bundle, &deps.v_order)
                    } else {
                        tuple.clone()
                    };
                    let trm_ok = trm_pred.matches(&tuple);
                    let cnd_ok = cnd_pred.matches(&tuple);
                    let dst = if trm_ok {
                        if cnd_ok {
                            projection.project_into(&tuple, &mut proj_buf);
                            encode_tuple(&proj_buf) as usize
                        } else {
                            0
                        }
                    } else {
                        state
                    };
                    (dst, encode_tuple(&out_tuple))
                }
            };

            arcs.push(Arc {
                src: state,
                dst,
                ilabel: label,
                olabel,
            });
            built += 1;
            if let Some(p) = progress.as_deref_mut() {
                if built % PROGRESS_INTERVAL == 0 {
                    p.on_arcs(built, total_arcs_usize as u64);
                }
            }
        }
    }

    if let Some(p) = progress.as_deref_mut() {
        p.on_arcs(built, total_arcs_usize as u64);
    }

    Ok(Transducer {
        rule_id: rule.id.clone(),
        v_order: deps.v_order.clone(),
        p_order: deps.p_order.clone(),
        num_states,
        arcs_per_state,
        arcs,
    })
}
