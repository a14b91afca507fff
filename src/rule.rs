//! The validated rule model: natural classes, `Rule`, `RulesDocument`, and
//! the raw→validated compilation step.

use log::{debug, info};
use smol_str::SmolStr;

use crate::document::{RawClass, RawRule, RawRulesDocument};
use crate::dsl::ast::OutExpr;
use crate::dsl::parser;
use crate::error::Error;
use crate::feature::{FeatureIndex, FeatureUniverse, Ternary};

/// `dir ∈ {LEFT, RIGHT}` — the direction a rule's search scans in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LEFT" => Some(Direction::Left),
            "RIGHT" => Some(Direction::Right),
            _ => None,
        }
    }

    pub fn flip(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// A single feature literal `(polarity, feature)`. `polarity` is always
/// `Plus` or `Minus` — natural classes never name `UNSPEC` explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Literal {
    pub polarity: Ternary,
    pub feature: FeatureIndex,
}

/// A conjunction of feature literals. An empty class matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NaturalClass {
    literals: Vec<Literal>,
}

impl NaturalClass {
    pub fn new(literals: Vec<Literal>) -> Self {
        Self { literals }
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }
}

/// `(id, dir, inr, trm, cnd, out_ast)`.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: SmolStr,
    pub dir: Direction,
    pub inr: NaturalClass,
    pub trm: NaturalClass,
    pub cnd: NaturalClass,
    pub out: OutExpr,
}

#[derive(Debug, Clone)]
pub struct RulesDocument {
    pub id: SmolStr,
    pub rules: Vec<Rule>,
}

fn compile_class(raw: &RawClass, universe: &FeatureUniverse, rule_id: &str) -> Result<NaturalClass, Error> {
    let mut literals = Vec::with_capacity(raw.len());
    for (polarity, feature) in raw {
        let polarity = match polarity.as_str() {
            "+" => Ternary::Plus,
            "-" => Ternary::Minus,
            other => {
                return Err(Error::Schema(format!(
                    "rule '{rule_id}': invalid class polarity '{other}' (expected '+' or '-')"
                )))
            }
        };
        let feature = universe.index_of(feature).ok_or_else(|| {
            Error::Schema(format!(
                "rule '{rule_id}': class references unknown feature '{feature}'"
            ))
        })?;
        literals.push(Literal { polarity, feature });
    }
    Ok(NaturalClass::new(literals))
}

/// Compiles one decoded [`RawRule`] into a validated [`Rule`]. Stops at the
/// first error within this rule; batching errors *across* rules in a
/// document is [`compile_document`]'s job.
pub fn compile_rule(raw: &RawRule, universe: &FeatureUniverse) -> Result<Rule, Error> {
    let dir = Direction::parse(&raw.dir).ok_or_else(|| {
        Error::Schema(format!(
            "rule '{}': invalid dir '{}' (expected LEFT or RIGHT)",
            raw.id, raw.dir
        ))
    })?;
    let inr = compile_class(&raw.inr, universe, &raw.id)?;
    let trm = compile_class(&raw.trm, universe, &raw.id)?;
    let cnd = compile_class(&raw.cnd, universe, &raw.id)?;
    let out = parser::parse(&raw.out, universe).map_err(|e| match e {
        Error::Dsl { message, expr } => Error::Dsl {
            message: format!("rule '{}': {message}", raw.id),
            expr,
        },
        other => other,
    })?;
    Ok(Rule {
        id: SmolStr::new(&raw.id),
        dir,
        inr,
        trm,
        cnd,
        out,
    })
}

/// Compiles every rule in a document, collecting all validation errors
/// together rather than stopping at the first. Also rejects duplicate rule
/// ids.
pub fn compile_document(
    raw: &RawRulesDocument,
    universe: &FeatureUniverse,
) -> Result<RulesDocument, Vec<Error>> {
    debug!("compiling document '{}' ({} rules)", raw.id, raw.rules.len());
    let mut errors = Vec::new();
    let mut rules = Vec::with_capacity(raw.rules.len());
    let mut seen = std::collections::HashSet::new();

    for raw_rule in &raw.rules {
        if !seen.insert(raw_rule.id.clone()) {
            errors.push(Error::Schema(format!(
                "duplicate rule id '{}'",
                raw_rule.id
            )));
            continue;
        }
        match compile_rule(raw_rule, universe) {
            Ok(rule) => rules.push(rule),
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        info!("document '{}' compiled cleanly: {} rules", raw.id, rules.len());
        Ok(RulesDocument {
            id: SmolStr::new(&raw.id),
            rules,
        })
    } else {
        info!("document '{}' failed with {} error(s)", raw.id, errors.len());
        Err(errors)
    }
}
