//! Prefix-form expression parser
//!
//! ```text
//! expr    := literal | attref | op '(' expr (',' expr)* ')'
//! literal := ('int' | 'double' | 'string' | 'bool') '[' text ']'
//! attref  := '[' name ']'
//! ```
//!
//! Examples: `+ ([val], int[1])`, `&& (== ([dept], string[eng]), > ([val], int[5]))`.

use std::fmt;

use super::errors::{ExprError, ExprResult};
use crate::record::{AttType, AttValue};

/// Operators of the expression language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
    Not,
}

impl Op {
    /// Returns the textual symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Gt => ">",
            Op::Le => "<=",
            Op::Ge => ">=",
            Op::And => "&&",
            Op::Or => "||",
            Op::Not => "!",
        }
    }

    fn from_symbol(s: &str) -> Option<Self> {
        Some(match s {
            "+" => Op::Add,
            "-" => Op::Sub,
            "*" => Op::Mul,
            "/" => Op::Div,
            "==" => Op::Eq,
            "!=" => Op::Ne,
            "<" => Op::Lt,
            ">" => Op::Gt,
            "<=" => Op::Le,
            ">=" => Op::Ge,
            "&&" => Op::And,
            "||" => Op::Or,
            "!" => Op::Not,
            _ => return None,
        })
    }
}

/// Parsed, unresolved expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(AttValue),
    Att(String),
    Call(Op, Vec<Expr>),
}

impl Expr {
    /// Names of every attribute referenced, in first-appearance order
    pub fn attributes(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_attributes(&mut names);
        names
    }

    fn collect_attributes<'e>(&'e self, names: &mut Vec<&'e str>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Att(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Expr::Call(_, args) => {
                for arg in args {
                    arg.collect_attributes(names);
                }
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::Att(name) => write!(f, "[{}]", name),
            Expr::Call(op, args) => {
                write!(f, "{} (", op.symbol())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Parses an expression string
pub fn parse(text: &str) -> ExprResult<Expr> {
    let mut parser = Parser { text, pos: 0 };
    let expr = parser.expr()?;
    parser.skip_ws();
    if parser.pos != text.len() {
        return Err(ExprError::parse(text, parser.pos, "unexpected trailing input"));
    }
    Ok(expr)
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.text.len() - trimmed.len();
    }

    fn error(&self, reason: impl Into<String>) -> ExprError {
        ExprError::parse(self.text, self.pos, reason)
    }

    fn expect(&mut self, c: char) -> ExprResult<()> {
        self.skip_ws();
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", c)))
        }
    }

    /// Reads a `[...]` body, returning the text between the brackets
    fn bracketed(&mut self) -> ExprResult<&'a str> {
        self.expect('[')?;
        let rest = self.rest();
        let close = rest
            .find(']')
            .ok_or_else(|| self.error("unterminated '['"))?;
        self.pos += close + 1;
        Ok(&rest[..close])
    }

    fn expr(&mut self) -> ExprResult<Expr> {
        self.skip_ws();
        let rest = self.rest();
        let first = rest
            .chars()
            .next()
            .ok_or_else(|| self.error("unexpected end of expression"))?;

        if first == '[' {
            let name = self.bracketed()?;
            if name.is_empty() {
                return Err(self.error("empty attribute name"));
            }
            return Ok(Expr::Att(name.to_string()));
        }

        if first.is_ascii_alphabetic() {
            let word_len = rest
                .find(|c: char| !c.is_ascii_alphabetic())
                .unwrap_or(rest.len());
            let word = &rest[..word_len];
            let ty = AttType::from_name(word)
                .ok_or_else(|| self.error(format!("unknown literal type '{}'", word)))?;
            self.pos += word_len;
            let body = self.bracketed()?;
            let value = AttValue::parse_literal(ty, body)?;
            return Ok(Expr::Literal(value));
        }

        let op_len = if rest.get(..2).and_then(Op::from_symbol).is_some() {
            2
        } else {
            1
        };
        let op = rest
            .get(..op_len)
            .and_then(Op::from_symbol)
            .ok_or_else(|| self.error(format!("unexpected character '{}'", first)))?;
        self.pos += op_len;

        self.expect('(')?;
        let mut args = vec![self.expr()?];
        loop {
            self.skip_ws();
            if self.rest().starts_with(',') {
                self.pos += 1;
                args.push(self.expr()?);
            } else {
                self.expect(')')?;
                break;
            }
        }
        Ok(Expr::Call(op, args))
    }
}
