//! Join key comparison

use std::cmp::Ordering;

use super::errors::{ExecutorError, ExecutorResult};
use crate::expr::Evaluator;
use crate::record::{AttValue, Schema};

/// Compiled left and right join keys with a type-checked ordering between them
#[derive(Debug, Clone)]
pub struct JoinKeyComparator {
    left: Evaluator,
    right: Evaluator,
}

impl JoinKeyComparator {
    /// Compiles each key against its own side.
    ///
    /// Fails with REL_JOIN_KEY_MISMATCH unless both keys are numeric or share a type.
    pub fn new(
        left_text: &str,
        right_text: &str,
        left_schema: &Schema,
        right_schema: &Schema,
    ) -> ExecutorResult<Self> {
        let left = Evaluator::compile(left_text, &[left_schema])
            .map_err(|e| ExecutorError::from(e).with_context("left join key"))?;
        let right = Evaluator::compile(right_text, &[right_schema])
            .map_err(|e| ExecutorError::from(e).with_context("right join key"))?;

        if !left.result_type().comparable_with(right.result_type()) {
            return Err(ExecutorError::join_key_mismatch(format!(
                "left key '{}' is {}, right key '{}' is {}",
                left_text,
                left.result_type(),
                right_text,
                right.result_type()
            )));
        }
        Ok(Self { left, right })
    }

    pub fn left(&self) -> &Evaluator {
        &self.left
    }

    pub fn right(&self) -> &Evaluator {
        &self.right
    }

    /// Orders a left key against a right key
    pub fn compare(&self, left: &AttValue, right: &AttValue) -> Ordering {
        left.total_cmp(right)
    }

    /// True when two keys are equal under the join ordering
    pub fn keys_equal(&self, a: &AttValue, b: &AttValue) -> bool {
        a.total_cmp(b) == Ordering::Equal
    }
}
