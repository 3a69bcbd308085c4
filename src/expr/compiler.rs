//! Compilation of parsed expressions into stateless evaluators
//!
//! Attribute names are resolved against an ordered list of schemas. The first schema
//! containing the name wins, so a combined context `[aggregate, input]` resolves
//! running-value names before input names. An evaluator holds no record references;
//! callers pass the records (in the same order as the schemas) on every call.

use std::cmp::Ordering;

use super::errors::{ExprError, ExprResult};
use super::parser::{parse, Expr, Op};
use crate::record::{AttType, AttValue, Record, Schema};

#[derive(Debug, Clone)]
enum Node {
    Const(AttValue),
    Slot { record: usize, slot: usize },
    Neg(Box<Node>),
    Not(Box<Node>),
    Binary(Op, Box<Node>, Box<Node>),
}

/// A compiled scalar expression with a statically known result type
#[derive(Debug, Clone)]
pub struct Evaluator {
    root: Node,
    result_type: AttType,
    text: String,
}

impl Evaluator {
    /// Parses and compiles `text` against the given schemas
    pub fn compile(text: &str, schemas: &[&Schema]) -> ExprResult<Self> {
        let expr = parse(text)?;
        let (root, result_type) = resolve(&expr, schemas)?;
        Ok(Self {
            root,
            result_type,
            text: text.to_string(),
        })
    }

    /// The type every evaluation produces
    pub fn result_type(&self) -> AttType {
        self.result_type
    }

    /// The source text this evaluator was compiled from
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Evaluates against `records`, bound positionally to the compile-time schemas
    pub fn eval(&self, records: &[&Record]) -> ExprResult<AttValue> {
        eval_node(&self.root, records)
    }

    /// Evaluates and coerces the result to a boolean
    pub fn eval_bool(&self, records: &[&Record]) -> ExprResult<bool> {
        Ok(self.eval(records)?.to_bool())
    }
}

fn mismatch(op: Op, types: &[AttType]) -> ExprError {
    ExprError::TypeMismatch {
        op: op.symbol(),
        operands: types
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn resolve(expr: &Expr, schemas: &[&Schema]) -> ExprResult<(Node, AttType)> {
    match expr {
        Expr::Literal(v) => Ok((Node::Const(v.clone()), v.att_type())),
        Expr::Att(name) => schemas
            .iter()
            .enumerate()
            .find_map(|(record, schema)| {
                schema
                    .find(name)
                    .map(|(slot, ty)| (Node::Slot { record, slot }, ty))
            })
            .ok_or_else(|| ExprError::UnknownAttribute(name.clone())),
        Expr::Call(op, args) => {
            let mut resolved = args
                .iter()
                .map(|a| resolve(a, schemas))
                .collect::<ExprResult<Vec<_>>>()?;
            let types: Vec<AttType> = resolved.iter().map(|(_, t)| *t).collect();

            match (op, resolved.len()) {
                (Op::Sub, 1) => {
                    if !types[0].is_numeric() {
                        return Err(mismatch(*op, &types));
                    }
                    let (node, ty) = resolved.remove(0);
                    Ok((Node::Neg(Box::new(node)), ty))
                }
                (Op::Not, 1) => {
                    if types[0] != AttType::Bool {
                        return Err(mismatch(*op, &types));
                    }
                    let (node, _) = resolved.remove(0);
                    Ok((Node::Not(Box::new(node)), AttType::Bool))
                }
                (Op::Not, n) => Err(ExprError::Arity {
                    op: op.symbol(),
                    expected: "1",
                    found: n,
                }),
                (_, 2) => {
                    let result_type = binary_type(*op, types[0], types[1])
                        .ok_or_else(|| mismatch(*op, &types))?;
                    let (right, _) = resolved.remove(1);
                    let (left, _) = resolved.remove(0);
                    Ok((Node::Binary(*op, Box::new(left), Box::new(right)), result_type))
                }
                (_, n) => Err(ExprError::Arity {
                    op: op.symbol(),
                    expected: if *op == Op::Sub { "1 or 2" } else { "2" },
                    found: n,
                }),
            }
        }
    }
}

fn binary_type(op: Op, left: AttType, right: AttType) -> Option<AttType> {
    match op {
        Op::Add if left == AttType::String && right == AttType::String => Some(AttType::String),
        Op::Add | Op::Sub | Op::Mul => match (left, right) {
            (AttType::Int, AttType::Int) => Some(AttType::Int),
            (l, r) if l.is_numeric() && r.is_numeric() => Some(AttType::Double),
            _ => None,
        },
        Op::Div if left.is_numeric() && right.is_numeric() => Some(AttType::Double),
        Op::Eq | Op::Ne | Op::Lt | Op::Gt | Op::Le | Op::Ge if left.comparable_with(right) => {
            Some(AttType::Bool)
        }
        Op::And | Op::Or if left == AttType::Bool && right == AttType::Bool => Some(AttType::Bool),
        _ => None,
    }
}

fn eval_node(node: &Node, records: &[&Record]) -> ExprResult<AttValue> {
    match node {
        Node::Const(v) => Ok(v.clone()),
        Node::Slot { record, slot } => {
            let rec = records.get(*record).ok_or(ExprError::Unbound {
                index: *record,
                bound: records.len(),
            })?;
            Ok(rec.att(*slot)?.clone())
        }
        Node::Neg(inner) => Ok(eval_node(inner, records)?.negate()?),
        Node::Not(inner) => Ok(AttValue::Bool(!eval_node(inner, records)?.to_bool())),
        Node::Binary(Op::And, l, r) => Ok(AttValue::Bool(
            eval_node(l, records)?.to_bool() && eval_node(r, records)?.to_bool(),
        )),
        Node::Binary(Op::Or, l, r) => Ok(AttValue::Bool(
            eval_node(l, records)?.to_bool() || eval_node(r, records)?.to_bool(),
        )),
        Node::Binary(op, l, r) => {
            let left = eval_node(l, records)?;
            let right = eval_node(r, records)?;
            let value = match op {
                Op::Add => left.add(&right)?,
                Op::Sub => left.sub(&right)?,
                Op::Mul => left.mul(&right)?,
                Op::Div => left.div(&right)?,
                Op::Eq => AttValue::Bool(left.total_cmp(&right) == Ordering::Equal),
                Op::Ne => AttValue::Bool(left.total_cmp(&right) != Ordering::Equal),
                Op::Lt => AttValue::Bool(left.total_cmp(&right) == Ordering::Less),
                Op::Gt => AttValue::Bool(left.total_cmp(&right) == Ordering::Greater),
                Op::Le => AttValue::Bool(left.total_cmp(&right) != Ordering::Greater),
                Op::Ge => AttValue::Bool(left.total_cmp(&right) != Ordering::Less),
                Op::And | Op::Or | Op::Not => {
                    return Err(mismatch(*op, &[left.att_type(), right.att_type()]))
                }
            };
            Ok(value)
        }
    }
}
