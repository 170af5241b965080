//! Boolean formulas as expression trees in negation normal form.
//!
//! Formulas are written with the BooleanNet operators (`!`, `&`, `|`,
//! parentheses, constants `0`/`1`). Negation of a compound term is pushed
//! down to the literals while parsing, so evaluation never sees a `Not` node.

use crate::error::{Error, Result};
use crate::layout::Configuration;

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Const(bool),
    Lit { node: NodeId, positive: bool },
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl Expr {
    pub fn eval(&self, x: &Configuration) -> bool {
        self.eval_with(&|j| x.get(j))
    }

    /// Evaluate with node values supplied by `value`.
    pub fn eval_with(&self, value: &dyn Fn(NodeId) -> bool) -> bool {
        match self {
            Expr::Const(b) => *b,
            Expr::Lit { node, positive } => value(*node) == *positive,
            Expr::And(terms) => terms.iter().all(|t| t.eval_with(value)),
            Expr::Or(terms) => terms.iter().any(|t| t.eval_with(value)),
        }
    }

    pub fn negate(self) -> Expr {
        match self {
            Expr::Const(b) => Expr::Const(!b),
            Expr::Lit { node, positive } => Expr::Lit {
                node,
                positive: !positive,
            },
            Expr::And(terms) => Expr::Or(terms.into_iter().map(Expr::negate).collect()),
            Expr::Or(terms) => Expr::And(terms.into_iter().map(Expr::negate).collect()),
        }
    }

    /// Every literal of the formula as `(node, positive)`, in occurrence order.
    pub fn literals(&self) -> Vec<(NodeId, bool)> {
        let mut out = Vec::new();
        self.collect_literals(&mut out);
        out
    }

    fn collect_literals(&self, out: &mut Vec<(NodeId, bool)>) {
        match self {
            Expr::Const(_) => {}
            Expr::Lit { node, positive } => out.push((*node, *positive)),
            Expr::And(terms) | Expr::Or(terms) => {
                for t in terms {
                    t.collect_literals(out);
                }
            }
        }
    }
}

fn is_symbol_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'_' | b'.' | b':')
}

/// Parse the formula of `node`, resolving identifiers through `lookup`.
pub fn parse_formula(
    node: &str,
    text: &str,
    lookup: &dyn Fn(&str) -> Option<NodeId>,
) -> Result<Expr> {
    let mut parser = Parser {
        node,
        bytes: text.as_bytes(),
        text,
        cursor: 0,
        lookup,
    };
    let expr = parser.or_expr()?;
    parser.skip_ws();
    if parser.cursor < parser.bytes.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}

struct Parser<'a> {
    node: &'a str,
    bytes: &'a [u8],
    text: &'a str,
    cursor: usize,
    lookup: &'a dyn Fn(&str) -> Option<NodeId>,
}

impl Parser<'_> {
    fn error(&self, message: &str) -> Error {
        Error::Parse {
            node: self.node.to_string(),
            position: self.cursor,
            message: message.to_string(),
        }
    }

    fn skip_ws(&mut self) {
        while self.cursor < self.bytes.len() && self.bytes[self.cursor].is_ascii_whitespace() {
            self.cursor += 1;
        }
    }

    fn eat(&mut self, c: u8) -> bool {
        self.skip_ws();
        if self.bytes.get(self.cursor) == Some(&c) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn or_expr(&mut self) -> Result<Expr> {
        let mut terms = vec![self.and_expr()?];
        while self.eat(b'|') {
            terms.push(self.and_expr()?);
        }
        Ok(flatten(terms, Expr::Or))
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut terms = vec![self.unary()?];
        while self.eat(b'&') {
            terms.push(self.unary()?);
        }
        Ok(flatten(terms, Expr::And))
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.eat(b'!') {
            return Ok(self.unary()?.negate());
        }
        if self.eat(b'(') {
            let inner = self.or_expr()?;
            if !self.eat(b')') {
                return Err(self.error("expected ')'"));
            }
            return Ok(inner);
        }
        self.skip_ws();
        let start = self.cursor;
        while self.cursor < self.bytes.len() && is_symbol_char(self.bytes[self.cursor]) {
            self.cursor += 1;
        }
        if start == self.cursor {
            return Err(self.error("expected identifier"));
        }
        let symbol = &self.text[start..self.cursor];
        match symbol {
            "0" => Ok(Expr::Const(false)),
            "1" => Ok(Expr::Const(true)),
            _ => match (self.lookup)(symbol) {
                Some(node) => Ok(Expr::Lit {
                    node,
                    positive: true,
                }),
                None => Err(Error::UndeclaredNode {
                    node: self.node.to_string(),
                    referenced: symbol.to_string(),
                }),
            },
        }
    }
}

fn flatten(mut terms: Vec<Expr>, wrap: fn(Vec<Expr>) -> Expr) -> Expr {
    if terms.len() == 1 {
        terms.remove(0)
    } else {
        wrap(terms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc(name: &str) -> Option<NodeId> {
        ["a", "b", "c"].iter().position(|n| *n == name)
    }

    fn parse(text: &str) -> Result<Expr> {
        parse_formula("t", text, &abc)
    }

    #[test]
    fn precedence_and_over_or() {
        let e = parse("a | b & !c").unwrap();
        assert_eq!(
            e,
            Expr::Or(vec![
                Expr::Lit {
                    node: 0,
                    positive: true
                },
                Expr::And(vec![
                    Expr::Lit {
                        node: 1,
                        positive: true
                    },
                    Expr::Lit {
                        node: 2,
                        positive: false
                    },
                ]),
            ])
        );
    }

    #[test]
    fn negation_pushed_to_literals() {
        let e = parse("!(a & !b)").unwrap();
        assert_eq!(e.literals(), vec![(0, false), (1, true)]);
        assert!(matches!(e, Expr::Or(_)));
    }

    #[test]
    fn eval_truth_table() {
        let e = parse("!a & b").unwrap();
        for (bits, expected) in [([0, 0], false), ([0, 1], true), ([1, 1], false)] {
            let x = Configuration::from_bools(bits.iter().map(|b| *b == 1).chain([false]));
            assert_eq!(e.eval(&x), expected);
        }
        assert!(parse("1").unwrap().eval(&Configuration::zeros(3)));
        assert!(!parse("!1 | 0").unwrap().eval(&Configuration::zeros(3)));
    }

    #[test]
    fn undeclared_node() {
        assert_eq!(
            parse("a & d").unwrap_err(),
            Error::UndeclaredNode {
                node: "t".into(),
                referenced: "d".into()
            }
        );
    }

    #[test]
    fn syntax_errors() {
        assert!(matches!(parse("(a | b"), Err(Error::Parse { .. })));
        assert!(matches!(parse("a &"), Err(Error::Parse { .. })));
        assert!(matches!(
            parse("a b"),
            Err(Error::Parse { position: 2, .. })
        ));
    }
}
