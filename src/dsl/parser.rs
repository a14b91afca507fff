//! Recursive-descent parser for the Out DSL grammar, hand-written rather
//! than built on a parser-generator crate. Desugars `bundle`/`all` into the
//! canonical `Lit`/`Unify`/`Proj` forms at parse time.

use crate::error::Error;
use crate::feature::{FeatureUniverse, Ternary};

use super::ast::{OutExpr, ProjTarget};

#[derive(Debug, Clone)]
enum Token {
    LParen,
    RParen,
    Atom(String),
}

fn tokenize(src: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    macro_rules! flush {
        () => {
            if !current.is_empty() {
                tokens.push(Token::Atom(std::mem::take(&mut current)));
            }
        };
    }
    for c in src.chars() {
        match c {
            '(' => {
                flush!();
                tokens.push(Token::LParen);
            }
            ')' => {
                flush!();
                tokens.push(Token::RParen);
            }
            c if c.is_whitespace() => flush!(),
            c => current.push(c),
        }
    }
    flush!();
    tokens
}

fn parse_polarity(s: &str) -> Option<Ternary> {
    match s {
        "+" => Some(Ternary::Plus),
        "-" => Some(Ternary::Minus),
        _ => None,
    }
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    universe: &'a FeatureUniverse,
    src: &'a str,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn err(&self, message: impl Into<String>) -> Error {
        Error::Dsl {
            message: message.into(),
            expr: self.src.to_string(),
        }
    }

    fn expect_lparen(&mut self) -> Result<(), Error> {
        match self.bump() {
            Some(Token::LParen) => Ok(()),
            _ => Err(self.err("expected '('")),
        }
    }

    fn expect_rparen(&mut self) -> Result<(), Error> {
        match self.bump() {
            Some(Token::RParen) => Ok(()),
            _ => Err(self.err("expected ')'")),
        }
    }

    fn expect_atom(&mut self) -> Result<String, Error> {
        match self.bump() {
            Some(Token::Atom(s)) => Ok(s),
            _ => Err(self.err("expected an atom")),
        }
    }

    fn feature(&mut self, name: &str) -> Result<usize, Error> {
        self.universe
            .index_of(name)
            .ok_or_else(|| self.err(format!("unknown feature '{name}'")))
    }

    fn parse_expr(&mut self) -> Result<OutExpr, Error> {
        match self.peek() {
            Some(Token::Atom(a)) if a == "INR" => {
                self.bump();
                Ok(OutExpr::Inr)
            }
            Some(Token::Atom(a)) if a == "TRM" => {
                self.bump();
                Ok(OutExpr::Trm)
            }
            Some(Token::LParen) => self.parse_form(),
            _ => Err(self.err("expected INR, TRM, or a parenthesized form")),
        }
    }

    fn parse_form(&mut self) -> Result<OutExpr, Error> {
        self.expect_lparen()?;
        let head = self.expect_atom()?;
        let result = match head.as_str() {
            "lit" => {
                let polarity = self.expect_atom()?;
                let polarity = parse_polarity(&polarity)
                    .ok_or_else(|| self.err(format!("invalid polarity '{polarity}', expected '+' or '-'")))?;
                let feature_name = self.expect_atom()?;
                let idx = self.feature(&feature_name)?;
                OutExpr::Lit(polarity, idx)
            }
            "proj" => {
                let inner = self.parse_expr()?;
                let target = self.parse_proj_target()?;
                OutExpr::Proj(Box::new(inner), target)
            }
            "all" => {
                let inner = self.parse_expr()?;
                OutExpr::Proj(Box::new(inner), ProjTarget::All)
            }
            "unify" => {
                let a = self.parse_expr()?;
                let b = self.parse_expr()?;
                OutExpr::Unify(Box::new(a), Box::new(b))
            }
            "subtract" => {
                let a = self.parse_expr()?;
                let b = self.parse_expr()?;
                OutExpr::Subtract(Box::new(a), Box::new(b))
            }
            "bundle" => self.parse_bundle_sugar()?,
            other => return Err(self.err(format!("unknown operator '{other}'"))),
        };
        self.expect_rparen()?;
        Ok(result)
    }

    /// `(bundle (+ F1) (- F2) …)` desugars to a left-fold of `Unify` over
    /// the corresponding `Lit`s, in the order given.
    fn parse_bundle_sugar(&mut self) -> Result<OutExpr, Error> {
        let mut literals = Vec::new();
        while !matches!(self.peek(), Some(Token::RParen) | None) {
            self.expect_lparen()?;
            let polarity = self.expect_atom()?;
            let polarity = parse_polarity(&polarity)
                .ok_or_else(|| self.err(format!("invalid polarity '{polarity}' in bundle literal")))?;
            let feature_name = self.expect_atom()?;
            let idx = self.feature(&feature_name)?;
            self.expect_rparen()?;
            literals.push(OutExpr::Lit(polarity, idx));
        }
        if literals.is_empty() {
            return Err(self.err("bundle requires at least one literal"));
        }
        let mut iter = literals.into_iter();
        let first = iter.next().expect("checked non-empty above");
        Ok(iter.fold(first, |acc, next| OutExpr::Unify(Box::new(acc), Box::new(next))))
    }

    fn parse_proj_target(&mut self) -> Result<ProjTarget, Error> {
        match self.peek() {
            Some(Token::Atom(a)) if a == "*" => {
                self.bump();
                Ok(ProjTarget::All)
            }
            Some(Token::LParen) => {
                self.expect_lparen()?;
                let mut feats = Vec::new();
                while !matches!(self.peek(), Some(Token::RParen) | None) {
                    let name = self.expect_atom()?;
                    feats.push(self.feature(&name)?);
                }
                self.expect_rparen()?;
                Ok(ProjTarget::Features(feats))
            }
            _ => Err(self.err("expected a feature list or '*' in proj")),
        }
    }
}

/// Parses an Out expression string into its canonical [`OutExpr`] AST.
pub fn parse(src: &str, universe: &FeatureUniverse) -> Result<OutExpr, Error> {
    let tokens = tokenize(src);
    let mut parser = Parser {
        tokens,
        pos: 0,
        universe,
        src,
    };
    let expr = parser.parse_expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(parser.err("trailing tokens after a complete expression"));
    }
    Ok(expr)
}
