//! Row filters and projections
//!
//! Both compile once at operator setup and are evaluated against the live
//! cursor records on every row. Compilation failures surface as
//! REL_INVALID_EXPRESSION before any row is read.

use std::sync::Arc;

use super::errors::{ExecutorError, ExecutorResult};
use crate::expr::Evaluator;
use crate::record::{Record, Schema};

/// Compiled row filter
#[derive(Debug, Clone)]
pub struct RowFilter {
    evaluator: Evaluator,
}

impl RowFilter {
    /// Compiles `text` against the given schemas, in resolution order
    pub fn compile(text: &str, schemas: &[&Schema]) -> ExecutorResult<Self> {
        let evaluator = Evaluator::compile(text, schemas)
            .map_err(|e| ExecutorError::from(e).with_context(format!("filter '{}'", text)))?;
        Ok(Self { evaluator })
    }

    /// Evaluates the filter with boolean coercion
    pub fn matches(&self, records: &[&Record]) -> ExecutorResult<bool> {
        Ok(self.evaluator.eval_bool(records)?)
    }

    pub fn text(&self) -> &str {
        self.evaluator.text()
    }
}

/// Projection list writing into a reused output record
#[derive(Debug)]
pub struct Projection {
    evaluators: Vec<Evaluator>,
    out: Record,
}

impl Projection {
    /// Compiles one expression per output slot.
    ///
    /// The sink schema must have exactly one attribute per expression and each
    /// attribute must accept the expression's result type.
    pub fn compile(
        exprs: &[&str],
        schemas: &[&Schema],
        sink_schema: &Arc<Schema>,
    ) -> ExecutorResult<Self> {
        if exprs.len() != sink_schema.len() {
            return Err(ExecutorError::arity_mismatch(exprs.len(), sink_schema.len()));
        }

        let mut evaluators = Vec::with_capacity(exprs.len());
        for (text, att) in exprs.iter().zip(sink_schema.atts()) {
            let evaluator = Evaluator::compile(text, schemas).map_err(|e| {
                ExecutorError::from(e).with_context(format!("projection '{}'", text))
            })?;
            if !att.att_type.accepts(evaluator.result_type()) {
                return Err(ExecutorError::invalid_expression(format!(
                    "projection '{}' yields {}, output attribute '{}' is {}",
                    text,
                    evaluator.result_type(),
                    att.name,
                    att.att_type
                )));
            }
            evaluators.push(evaluator);
        }

        Ok(Self {
            evaluators,
            out: Record::new(Arc::clone(sink_schema)),
        })
    }

    /// Evaluates every projection into the output record and returns it
    pub fn project(&mut self, records: &[&Record]) -> ExecutorResult<&Record> {
        for (slot, evaluator) in self.evaluators.iter().enumerate() {
            let value = evaluator.eval(records)?;
            self.out.set_att(slot, value)?;
        }
        Ok(&self.out)
    }

    pub fn len(&self) -> usize {
        self.evaluators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluators.is_empty()
    }
}
