//! The reference evaluator: runs rewrite semantics directly on a word,
//! state by state, using the exact same predicates, projection and
//! `eval_out` the transducer builder uses — so "reference ≡ compiled" is a
//! structural guarantee rather than a tested coincidence.

use log::debug;
use smol_str::SmolStr;

use crate::alphabet::Alphabet;
use crate::analysis::{self, Dependencies};
use crate::config::Config;
use crate::document::{InputDocument, OutputDocument, OutputRow};
use crate::dsl::eval_out;
use crate::encoding::{bundle_to_tuple, decode_tuple, encode_tuple, tuple_to_bundle, Projection, SymbolResolver};
use crate::error::Error;
use crate::feature::{FeatureUniverse, Ternary};
use crate::predicate::CompiledClass;
use crate::rule::{Direction, Rule, RulesDocument};
use crate::transducer;

/// One rule, compiled once against a fixed universe and alphabet; reusable
/// across many words without repeating dependency analysis or predicate
/// compilation per call.
pub struct RuleRuntime<'a> {
    rule: &'a Rule,
    universe: &'a FeatureUniverse,
    alphabet: &'a Alphabet,
    deps: Dependencies,
    inr_pred: CompiledClass,
    trm_pred: CompiledClass,
    cnd_pred: CompiledClass,
    projection: Projection,
    resolver: SymbolResolver<'a>,
}

impl<'a> RuleRuntime<'a> {
    pub fn prepare(rule: &'a Rule, universe: &'a FeatureUniverse, alphabet: &'a Alphabet) -> Self {
        let deps = analysis::analyze(&rule.inr, &rule.trm, &rule.cnd, &rule.out, universe);
        let inr_pred = CompiledClass::compile(&rule.inr, &deps.v_order);
        let trm_pred = CompiledClass::compile(&rule.trm, &deps.v_order);
        let cnd_pred = CompiledClass::compile(&rule.cnd, &deps.v_order);
        let projection = Projection::new(&deps.v_order, &deps.p_order);
        let resolver = SymbolResolver::build(alphabet, &deps.v_order);
        Self {
            rule,
            universe,
            alphabet,
            deps,
            inr_pred,
            trm_pred,
            cnd_pred,
            projection,
            resolver,
        }
    }

    pub fn dependencies(&self) -> &Dependencies {
        &self.deps
    }

    /// Applies this rule to `word`, returning the rewritten word. A `RIGHT`
    /// rule reverses the word, runs as `LEFT`, and reverses the result back.
    pub fn apply_word(&self, word: &[&str], cfg: &Config) -> Result<Vec<SmolStr>, Error> {
        let dir = cfg.direction_override.unwrap_or(self.rule.dir);
        let scan_rtl = dir == Direction::Right;

        let scanned: Vec<&str> = if scan_rtl {
            word.iter().rev().copied().collect()
        } else {
            word.to_vec()
        };

        let mut memory: Option<Vec<Ternary>> = None;
        let mut out = Vec::with_capacity(scanned.len());

        for (pos, &sym) in scanned.iter().enumerate() {
            let tuple = self.alphabet.project_symbol(sym, &self.deps.v_order).ok_or_else(|| {
                Error::UnknownSymbol {
                    rule_id: self.rule.id.to_string(),
                    position: pos,
                    symbol: sym.to_string(),
                }
            })?;

            let (out_symbol, next_memory) = match &memory {
                None => {
                    let trm_ok = self.trm_pred.matches(&tuple);
                    let cnd_ok = self.cnd_pred.matches(&tuple);
                    let next = if trm_ok && cnd_ok {
                        Some(self.projection.project(&tuple))
                    } else {
                        None
                    };
                    (SmolStr::new(sym), next)
                }
                Some(mem_tuple) => {
                    let mem_bundle = tuple_to_bundle(mem_tuple, &self.deps.p_order);
                    let inr_ok = self.inr_pred.matches(&tuple);
                    let out_symbol = if inr_ok {
                        let inr_bundle = tuple_to_bundle(&tuple, &self.deps.v_order);
                        let out_bundle = eval_out(&self.rule.out, &inr_bundle, &mem_bundle, self.universe)?;
                        let out_tuple = bundle_to_tuple(&out_bundle, &self.deps.v_order);
                        let name = self.resolver.resolve(&out_tuple, &self.rule.id, pos, cfg.strict)?;
                        SmolStr::new(name)
                    } else {
                        SmolStr::new(sym)
                    };
                    let trm_ok = self.trm_pred.matches(&tuple);
                    let cnd_ok = self.cnd_pred.matches(&tuple);
                    let next = if trm_ok {
                        if cnd_ok {
                            Some(self.projection.project(&tuple))
                        } else {
                            None
                        }
                    } else {
                        Some(mem_tuple.clone())
                    };
                    (out_symbol, next)
                }
            };

            out.push(out_symbol);
            memory = next_memory;
        }

        if scan_rtl {
            out.reverse();
        }
        Ok(out)
    }
}

/// Applies a sequence of rules to a word, feeding each rule's output to the
/// next.
pub struct Pipeline<'a> {
    runtimes: Vec<RuleRuntime<'a>>,
}

impl<'a> Pipeline<'a> {
    pub fn new(runtimes: Vec<RuleRuntime<'a>>) -> Self {
        Self { runtimes }
    }

    pub fn apply(&self, word: &[&str], cfg: &Config) -> Result<Vec<SmolStr>, Error> {
        let mut current: Vec<SmolStr> = word.iter().map(|&s| SmolStr::new(s)).collect();
        for runtime in &self.runtimes {
            let refs: Vec<&str> = current.iter().map(SmolStr::as_str).collect();
            current = runtime.apply_word(&refs, cfg)?;
        }
        Ok(current)
    }
}

/// Runs `word` through the reference evaluator and, when `cfg.compare` is
/// set, also through a freshly built `T_V` for the same rule, failing with
/// [`Error::Consistency`] at the first position the two disagree. Returns
/// the reference result either way.
pub fn run(rule: &Rule, universe: &FeatureUniverse, alphabet: &Alphabet, word: &[&str], cfg: &Config) -> Result<Vec<SmolStr>, Error> {
    let runtime = RuleRuntime::prepare(rule, universe, alphabet);
    let reference = runtime.apply_word(word, cfg)?;
    if !cfg.compare {
        return Ok(reference);
    }
    debug!("rule '{}': cross-checking reference against compiled T_V", rule.id);
    let compiled = run_compiled(rule, universe, &runtime, word, cfg)?;
    for (pos, (r, c)) in reference.iter().zip(compiled.iter()).enumerate() {
        if r != c {
            return Err(Error::Consistency {
                rule_id: rule.id.to_string(),
                word: word.join(" "),
                position: pos,
            });
        }
    }
    Ok(reference)
}

fn run_compiled(
    rule: &Rule,
    universe: &FeatureUniverse,
    runtime: &RuleRuntime,
    word: &[&str],
    cfg: &Config,
) -> Result<Vec<SmolStr>, Error> {
    let deps = runtime.dependencies();
    let transducer = transducer::build_with_deps(rule, universe, deps, cfg, None)?;
    let dir = cfg.direction_override.unwrap_or(rule.dir);
    let scan_rtl = dir == Direction::Right;
    let scanned: Vec<&str> = if scan_rtl {
        word.iter().rev().copied().collect()
    } else {
        word.to_vec()
    };

    let mut state = 0usize;
    let mut out = Vec::with_capacity(scanned.len());
    for (pos, &sym) in scanned.iter().enumerate() {
        let tuple = runtime.alphabet.project_symbol(sym, &deps.v_order).ok_or_else(|| Error::UnknownSymbol {
            rule_id: rule.id.to_string(),
            position: pos,
            symbol: sym.to_string(),
        })?;
        let ilabel = encode_tuple(&tuple);
        let arc = transducer.arc(state, ilabel);
        let out_tuple = decode_tuple(arc.olabel, deps.k());
        let name = runtime.resolver.resolve(&out_tuple, &rule.id, pos, cfg.strict)?;
        out.push(SmolStr::new(name));
        state = arc.dst;
    }
    if scan_rtl {
        out.reverse();
    }
    Ok(out)
}

/// The result of [`run_document`]: the §6 `OutputDocument` plus, when
/// `cfg.dump_vp` was set, each rule's `V`/`P` alongside it.
#[derive(Debug, Clone)]
pub struct DocumentRun {
    pub output: OutputDocument,
    pub dependencies: Option<Vec<(SmolStr, Dependencies)>>,
}

/// Runs every rule in `rules` over every word in `inputs`, in document
/// order, assembling the §6 `OutputDocument` contract. Each input word
/// contributes one [`OutputRow`] per rule, threaded through the pipeline in
/// document order (§8 S6: "the second row is computed on the first row's
/// output"); `cfg.include_input` controls whether a row also carries a copy
/// of that rule's input. When `cfg.compare` is set, each step is
/// cross-checked against a freshly compiled `T_V` via [`run`]. When
/// `cfg.dump_vp` is set, [`DocumentRun::dependencies`] carries each rule's
/// `V`/`P`; otherwise it is `None`.
pub fn run_document(
    rules: &RulesDocument,
    universe: &FeatureUniverse,
    alphabet: &Alphabet,
    inputs: &InputDocument,
    cfg: &Config,
) -> Result<DocumentRun, Error> {
    let runtimes: Vec<RuleRuntime> = rules
        .rules
        .iter()
        .map(|rule| RuleRuntime::prepare(rule, universe, alphabet))
        .collect();

    let mut rows = Vec::with_capacity(inputs.inputs.len() * rules.rules.len());
    for word in &inputs.inputs {
        let mut current: Vec<String> = word.clone();
        for (rule, runtime) in rules.rules.iter().zip(&runtimes) {
            let refs: Vec<&str> = current.iter().map(String::as_str).collect();
            let output = if cfg.compare {
                run(rule, universe, alphabet, &refs, cfg)?
            } else {
                runtime.apply_word(&refs, cfg)?
            };
            let input = cfg.include_input.then(|| current.clone());
            current = output.iter().map(SmolStr::to_string).collect();
            rows.push(OutputRow {
                rule_id: rule.id.to_string(),
                input,
                outputs: current.clone(),
            });
        }
    }

    let dependencies = cfg.dump_vp.then(|| dependencies_for_document(rules, universe));

    Ok(DocumentRun {
        output: OutputDocument {
            id: rules.id.to_string(),
            inputs: inputs.inputs.clone(),
            rows,
        },
        dependencies,
    })
}

/// `V`/`P` for every rule in a document, in document order.
pub fn dependencies_for_document(rules: &RulesDocument, universe: &FeatureUniverse) -> Vec<(SmolStr, Dependencies)> {
    rules
        .rules
        .iter()
        .map(|rule| {
            let deps = analysis::analyze(&rule.inr, &rule.trm, &rule.cnd, &rule.out, universe);
            (rule.id.clone(), deps)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{RawRule, RawRulesDocument};
    use crate::rule::compile_document;

    fn universe() -> FeatureUniverse {
        FeatureUniverse::new(["F1", "F2"])
    }

    fn test_alphabet() -> Alphabet {
        let mut b = Alphabet::builder(universe());
        b.add_symbol("A", [("F1", Ternary::Plus), ("F2", Ternary::Unspec)]).unwrap();
        b.add_symbol("B", [("F1", Ternary::Minus), ("F2", Ternary::Plus)]).unwrap();
        b.add_symbol("C", [("F1", Ternary::Unspec), ("F2", Ternary::Minus)]).unwrap();
        b.add_symbol("D", [("F1", Ternary::Plus), ("F2", Ternary::Minus)]).unwrap();
        b.build().unwrap()
    }

    fn compile(raw: RawRule) -> Rule {
        let doc = RawRulesDocument {
            id: "doc".into(),
            rules: vec![raw],
        };
        compile_document(&doc, &universe()).unwrap().rules.into_iter().next().unwrap()
    }

    #[test]
    fn s1_identity_rule_is_a_no_op() {
        let rule = compile(RawRule {
            id: "s1".into(),
            dir: "LEFT".into(),
            inr: vec![],
            trm: vec![],
            cnd: vec![],
            out: "INR".into(),
        });
        let universe = universe();
        let alphabet = test_alphabet();
        let runtime = RuleRuntime::prepare(&rule, &universe, &alphabet);
        let out = runtime.apply_word(&["A", "B", "C"], &Config::default()).unwrap();
        assert_eq!(out, vec!["A", "B", "C"]);
    }

    #[test]
    fn s2_replace_f1_after_trm_terminator() {
        let rule = compile(RawRule {
            id: "s2".into(),
            dir: "LEFT".into(),
            inr: vec![("+".into(), "F1".into())],
            trm: vec![("-".into(), "F2".into())],
            cnd: vec![],
            out: "(unify (proj TRM (F1)) INR)".into(),
        });
        let universe = universe();
        let alphabet = test_alphabet();
        let runtime = RuleRuntime::prepare(&rule, &universe, &alphabet);
        // second A follows a C terminator; A's own F1 is already +, C's F1
        // is 0, so the unify (left-biased on INR's side) leaves A unchanged.
        let out = runtime.apply_word(&["A", "C", "A"], &Config::default()).unwrap();
        assert_eq!(out, vec!["A", "C", "A"]);
    }

    #[test]
    fn reference_and_compiled_agree_under_compare() {
        let rule = compile(RawRule {
            id: "s2".into(),
            dir: "LEFT".into(),
            inr: vec![("+".into(), "F1".into())],
            trm: vec![("-".into(), "F2".into())],
            cnd: vec![],
            out: "(unify (proj TRM (F1)) INR)".into(),
        });
        let universe = universe();
        let alphabet = test_alphabet();
        let mut cfg = Config::default();
        cfg.compare = true;
        let out = run(&rule, &universe, &alphabet, &["A", "C", "A"], &cfg).unwrap();
        assert_eq!(out, vec!["A", "C", "A"]);
    }

    #[test]
    fn direction_override_reverses_scan_and_result() {
        let rule = compile(RawRule {
            id: "s2".into(),
            dir: "LEFT".into(),
            inr: vec![("+".into(), "F1".into())],
            trm: vec![("-".into(), "F2".into())],
            cnd: vec![],
            out: "(unify (proj TRM (F1)) INR)".into(),
        });
        let universe = universe();
        let alphabet = test_alphabet();
        let runtime = RuleRuntime::prepare(&rule, &universe, &alphabet);

        let word = ["A", "C", "A"];
        let mut reversed_word: Vec<&str> = word.to_vec();
        reversed_word.reverse();

        let left = runtime.apply_word(&word, &Config::default()).unwrap();

        let mut cfg_right = Config::default();
        cfg_right.direction_override = Some(Direction::Right);
        let mut right_on_reversed = runtime.apply_word(&reversed_word, &cfg_right).unwrap();
        right_on_reversed.reverse();

        // property 7: eval(RIGHT, w) == reverse(eval(LEFT, reverse(w)))
        assert_eq!(left, right_on_reversed);
    }

    #[test]
    fn unknown_symbol_is_an_error() {
        let rule = compile(RawRule {
            id: "s1".into(),
            dir: "LEFT".into(),
            inr: vec![],
            trm: vec![],
            cnd: vec![],
            out: "INR".into(),
        });
        let universe = universe();
        let alphabet = test_alphabet();
        let runtime = RuleRuntime::prepare(&rule, &universe, &alphabet);
        let err = runtime.apply_word(&["A", "Z"], &Config::default()).unwrap_err();
        assert!(matches!(err, Error::UnknownSymbol { position: 1, .. }));
    }

    #[test]
    fn pipeline_chains_rules_left_to_right() {
        let identity = compile(RawRule {
            id: "id".into(),
            dir: "LEFT".into(),
            inr: vec![],
            trm: vec![],
            cnd: vec![],
            out: "INR".into(),
        });
        let rewrite = compile(RawRule {
            id: "s2".into(),
            dir: "LEFT".into(),
            inr: vec![("+".into(), "F1".into())],
            trm: vec![("-".into(), "F2".into())],
            cnd: vec![],
            out: "(unify (proj TRM (F1)) INR)".into(),
        });
        let universe = universe();
        let alphabet = test_alphabet();
        let pipeline = Pipeline::new(vec![
            RuleRuntime::prepare(&identity, &universe, &alphabet),
            RuleRuntime::prepare(&rewrite, &universe, &alphabet),
        ]);
        let out = pipeline.apply(&["A", "C", "A"], &Config::default()).unwrap();
        assert_eq!(out, vec!["A", "C", "A"]);
    }

    #[test]
    fn run_document_produces_one_row_per_rule_per_word() {
        let identity = compile(RawRule {
            id: "id".into(),
            dir: "LEFT".into(),
            inr: vec![],
            trm: vec![],
            cnd: vec![],
            out: "INR".into(),
        });
        let rewrite = compile(RawRule {
            id: "s2".into(),
            dir: "LEFT".into(),
            inr: vec![("+".into(), "F1".into())],
            trm: vec![("-".into(), "F2".into())],
            cnd: vec![],
            out: "(unify (proj TRM (F1)) INR)".into(),
        });
        let universe = universe();
        let alphabet = test_alphabet();
        let doc = RulesDocument {
            id: "doc".into(),
            rules: vec![identity, rewrite],
        };
        let inputs = InputDocument {
            inputs: vec![vec!["A".into(), "C".into(), "A".into()]],
        };
        let run = run_document(&doc, &universe, &alphabet, &inputs, &Config::default()).unwrap();
        assert_eq!(run.output.id, "doc");
        assert_eq!(run.output.rows.len(), 2);
        assert_eq!(run.output.rows[0].rule_id, "id");
        assert_eq!(run.output.rows[0].outputs, vec!["A", "C", "A"]);
        assert!(run.output.rows[0].input.is_none());
        assert_eq!(run.output.rows[1].rule_id, "s2");
        assert_eq!(run.output.rows[1].outputs, vec!["A", "C", "A"]);
        assert!(run.dependencies.is_none(), "dump_vp defaults to false");
    }

    #[test]
    fn run_document_include_input_carries_each_rules_own_input() {
        let rewrite = compile(RawRule {
            id: "s2".into(),
            dir: "LEFT".into(),
            inr: vec![("+".into(), "F1".into())],
            trm: vec![("-".into(), "F2".into())],
            cnd: vec![],
            out: "(unify (proj TRM (F1)) INR)".into(),
        });
        let universe = universe();
        let alphabet = test_alphabet();
        let doc = RulesDocument {
            id: "doc".into(),
            rules: vec![rewrite],
        };
        let inputs = InputDocument {
            inputs: vec![vec!["A".into(), "C".into(), "A".into()]],
        };
        let mut cfg = Config::default();
        cfg.include_input = true;
        let run = run_document(&doc, &universe, &alphabet, &inputs, &cfg).unwrap();
        assert_eq!(
            run.output.rows[0].input,
            Some(vec!["A".to_string(), "C".to_string(), "A".to_string()])
        );
    }

    #[test]
    fn run_document_honors_compare() {
        let rewrite = compile(RawRule {
            id: "s2".into(),
            dir: "LEFT".into(),
            inr: vec![("+".into(), "F1".into())],
            trm: vec![("-".into(), "F2".into())],
            cnd: vec![],
            out: "(unify (proj TRM (F1)) INR)".into(),
        });
        let universe = universe();
        let alphabet = test_alphabet();
        let doc = RulesDocument {
            id: "doc".into(),
            rules: vec![rewrite],
        };
        let inputs = InputDocument {
            inputs: vec![vec!["A".into(), "C".into(), "A".into()]],
        };
        let mut cfg = Config::default();
        cfg.compare = true;
        let run = run_document(&doc, &universe, &alphabet, &inputs, &cfg).unwrap();
        assert_eq!(run.output.rows[0].outputs, vec!["A", "C", "A"]);
    }

    #[test]
    fn run_document_attaches_dependencies_only_when_dump_vp_is_set() {
        let rewrite = compile(RawRule {
            id: "s2".into(),
            dir: "LEFT".into(),
            inr: vec![("+".into(), "F1".into())],
            trm: vec![("-".into(), "F2".into())],
            cnd: vec![],
            out: "(unify (proj TRM (F1)) INR)".into(),
        });
        let universe = universe();
        let alphabet = test_alphabet();
        let doc = RulesDocument {
            id: "doc".into(),
            rules: vec![rewrite],
        };
        let inputs = InputDocument {
            inputs: vec![vec!["A".into(), "C".into(), "A".into()]],
        };
        let mut cfg = Config::default();
        cfg.dump_vp = true;
        let run = run_document(&doc, &universe, &alphabet, &inputs, &cfg).unwrap();
        let deps = run.dependencies.expect("dump_vp was set");
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].0, "s2");
        assert_eq!(deps[0].1.v_order.len(), 2);
        assert_eq!(deps[0].1.p_order.len(), 1);
    }

    #[test]
    fn dependencies_for_document_lists_v_and_p_per_rule_in_order() {
        let identity = compile(RawRule {
            id: "id".into(),
            dir: "LEFT".into(),
            inr: vec![],
            trm: vec![],
            cnd: vec![],
            out: "INR".into(),
        });
        let rewrite = compile(RawRule {
            id: "s2".into(),
            dir: "LEFT".into(),
            inr: vec![("+".into(), "F1".into())],
            trm: vec![("-".into(), "F2".into())],
            cnd: vec![],
            out: "(unify (proj TRM (F1)) INR)".into(),
        });
        let universe = universe();
        let doc = RulesDocument {
            id: "doc".into(),
            rules: vec![identity, rewrite],
        };
        let deps = dependencies_for_document(&doc, &universe);
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].0, "id");
        assert!(deps[0].1.v_order.is_empty());
        assert_eq!(deps[1].0, "s2");
        assert_eq!(deps[1].1.v_order.len(), 2);
        assert_eq!(deps[1].1.p_order.len(), 1);
    }
}
