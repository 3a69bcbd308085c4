//! Hash aggregation with a spill table
//!
//! The running state of every group lives in one aggregate record per group,
//! stored as a binary image in an operator-owned page pool. The aggregate
//! schema is the output schema followed by an implicit `COUNT` slot:
//!
//! ```text
//! [ grouping 0 .. grouping g-1 | aggregate 0 .. aggregate a-1 | COUNT ]
//! ```
//!
//! Aggregates are expressed as synthesized expressions over that schema, so the
//! running arithmetic goes through the same evaluator as filters and
//! projections. Update expressions are compiled against the aggregate schema
//! followed by the input schema; a name present in both resolves to the
//! aggregate slot.
//!
//! A hit decodes the stored image, evaluates every update against the old
//! values, and overwrites the image in place. Slot types never change across
//! updates, so the image length is stable.

use std::fmt;
use std::sync::Arc;

use super::cursor::{advance_into, PageListIterator};
use super::errors::{ExecutorError, ExecutorResult};
use super::filters::RowFilter;
use super::group_table::GroupTable;
use super::result::{close_scope, RunSummary};
use crate::expr::{parse, Evaluator};
use crate::observability::{log_event_with_fields, Event, ObservationScope};
use crate::record::{AttType, Attribute, Record, Schema};
use crate::storage::{BufferManager, PagePool, RecordSink, Table};

/// Name of the implicit running count slot
pub const COUNT_SLOT: &str = "COUNT";

/// Seed of the implicit running count
pub const COUNT_SEED: &str = "int[1]";

/// Update of the implicit running count
pub const COUNT_UPDATE: &str = "+ ([COUNT], int[1])";

/// Aggregate function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggKind {
    Sum,
    Avg,
    /// Counts rows; its expression is ignored
    Count,
}

impl AggKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggKind::Sum => "SUM",
            AggKind::Avg => "AVG",
            AggKind::Count => "COUNT",
        }
    }

    /// Expression giving the first value of the slot
    pub fn seed_text(&self, expr: &str) -> String {
        match self {
            AggKind::Sum | AggKind::Avg => expr.to_string(),
            AggKind::Count => COUNT_SEED.to_string(),
        }
    }

    /// Expression folding one more row into the slot
    pub fn update_text(&self, expr: &str, slot: &str) -> String {
        match self {
            AggKind::Sum | AggKind::Avg => format!("+ ({}, [{}])", expr, slot),
            AggKind::Count => format!("+ ([{}], int[1])", slot),
        }
    }

    /// Expression producing the output value from the final aggregate record
    pub fn finalize_text(&self, slot: &str) -> String {
        match self {
            AggKind::Avg => format!("/ ([{}], [{}])", slot, COUNT_SLOT),
            AggKind::Sum | AggKind::Count => format!("[{}]", slot),
        }
    }
}

impl fmt::Display for AggKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn compile(text: &str, schemas: &[&Schema], what: &str) -> ExecutorResult<Evaluator> {
    Evaluator::compile(text, schemas)
        .map_err(|e| ExecutorError::from(e).with_context(format!("{} '{}'", what, text)))
}

fn check_slot(evaluator: &Evaluator, att: &Attribute, what: &str) -> ExecutorResult<()> {
    if att.att_type.accepts(evaluator.result_type()) {
        return Ok(());
    }
    Err(ExecutorError::invalid_expression(format!(
        "{} '{}' yields {}, slot '{}' is {}",
        what,
        evaluator.text(),
        evaluator.result_type(),
        att.name,
        att.att_type
    )))
}

/// Grouped aggregation of one table into a sink
pub struct HashAggregate<'a, O: RecordSink + ?Sized> {
    buffer: BufferManager,
    input: &'a Table,
    output: &'a mut O,
    agg_schema: Arc<Schema>,
    filter: RowFilter,
    groupings: Vec<Evaluator>,
    /// One per aggregate, then the implicit count
    seeds: Vec<Evaluator>,
    /// One per aggregate, then the implicit count
    updates: Vec<Evaluator>,
    finalizers: Vec<Evaluator>,
}

impl<'a, O: RecordSink + ?Sized> HashAggregate<'a, O> {
    /// Compiles every expression the run needs.
    ///
    /// The output schema must hold one attribute per grouping followed by one
    /// per aggregate. An output attribute may only be named `COUNT` if it is a
    /// COUNT aggregate, since the implicit count is resolved by that name.
    ///
    /// Update expressions resolve running slots before input attributes, so
    /// setup fails when an aggregate slot or `COUNT` also names an input
    /// attribute, or when an aggregate expression reads a grouping slot name.
    pub fn new(
        buffer: &BufferManager,
        input: &'a Table,
        output: &'a mut O,
        aggregates: &[(AggKind, &str)],
        groupings: &[&str],
        filter: &str,
    ) -> ExecutorResult<Self> {
        let out_schema = Arc::clone(output.schema());
        let expected = groupings.len() + aggregates.len();
        if out_schema.len() != expected {
            return Err(
                ExecutorError::arity_mismatch(expected, out_schema.len()).with_context("HASH_AGGREGATE")
            );
        }

        let input_schema: &Schema = input.schema();
        if input_schema.find(COUNT_SLOT).is_some() {
            return Err(ExecutorError::invalid_expression(format!(
                "input '{}' has an attribute named {}, which is reserved for the running count",
                input.name(),
                COUNT_SLOT
            )));
        }
        for (pos, att) in out_schema.atts().iter().enumerate() {
            let is_agg = pos >= groupings.len();
            let is_count = is_agg && aggregates[pos - groupings.len()].0 == AggKind::Count;
            if att.name == COUNT_SLOT && !is_count {
                return Err(ExecutorError::invalid_expression(format!(
                    "output attribute {} is reserved for the running count",
                    pos
                )));
            }
            // Update expressions see running slots before input attributes
            if is_agg && input_schema.find(&att.name).is_some() {
                return Err(ExecutorError::invalid_expression(format!(
                    "aggregate slot '{}' shadows the input attribute of the same name",
                    att.name
                )));
            }
        }

        let mut agg_schema = (*out_schema).clone();
        agg_schema.append_att(COUNT_SLOT, AttType::Int);
        let agg_schema = Arc::new(agg_schema);

        let combined = [&*agg_schema, input_schema];
        let filter = RowFilter::compile(filter, &[input_schema])?;

        let mut grouping_evals = Vec::with_capacity(groupings.len());
        for (text, att) in groupings.iter().zip(out_schema.atts()) {
            let evaluator = compile(text, &[input_schema], "grouping")?;
            check_slot(&evaluator, att, "grouping")?;
            grouping_evals.push(evaluator);
        }

        let mut seeds = Vec::with_capacity(aggregates.len() + 1);
        let mut updates = Vec::with_capacity(aggregates.len() + 1);
        let mut finalizers = Vec::with_capacity(aggregates.len());
        for (i, (kind, expr)) in aggregates.iter().enumerate() {
            let att = &out_schema.atts()[groupings.len() + i];

            let seed = compile(&kind.seed_text(expr), &[input_schema], "aggregate")?;
            if *kind != AggKind::Count && !seed.result_type().is_numeric() {
                return Err(ExecutorError::invalid_expression(format!(
                    "{} over '{}' needs a numeric expression, found {}",
                    kind,
                    expr,
                    seed.result_type()
                )));
            }
            check_slot(&seed, att, "aggregate")?;
            if *kind != AggKind::Count {
                let parsed = parse(expr)?;
                let shadowed = parsed
                    .attributes()
                    .into_iter()
                    .find(|name| agg_schema.find(name).is_some());
                if let Some(name) = shadowed {
                    return Err(ExecutorError::invalid_expression(format!(
                        "{} over '{}' reads '{}', which is also a running slot",
                        kind, expr, name
                    )));
                }
            }

            let update = compile(&kind.update_text(expr, &att.name), &combined, "update")?;
            check_slot(&update, att, "update")?;

            let finalizer = compile(&kind.finalize_text(&att.name), &[&*agg_schema], "finalize")?;
            check_slot(&finalizer, att, "finalize")?;

            seeds.push(seed);
            updates.push(update);
            finalizers.push(finalizer);
        }
        seeds.push(compile(COUNT_SEED, &[input_schema], "count")?);
        updates.push(compile(COUNT_UPDATE, &combined, "count")?);

        Ok(Self {
            buffer: buffer.clone(),
            input,
            output,
            agg_schema,
            filter,
            groupings: grouping_evals,
            seeds,
            updates,
            finalizers,
        })
    }

    /// Schema of the running aggregate records
    pub fn agg_schema(&self) -> &Arc<Schema> {
        &self.agg_schema
    }

    /// Runs the aggregation. Output rows follow first-seen group order.
    pub fn run(&mut self) -> ExecutorResult<RunSummary> {
        let scope = ObservationScope::with_fields("HASH_AGGREGATE", &[("input", self.input.name())]);
        let outcome = self.aggregate();
        close_scope(scope, &outcome);
        outcome
    }

    fn aggregate(&mut self) -> ExecutorResult<RunSummary> {
        let mut spill = PagePool::new(&self.buffer, "aggregate_spill");
        let mut groups = GroupTable::new();
        let mut summary = RunSummary::new();

        let mut row = Record::new(Arc::clone(self.input.schema()));
        let mut running = Record::new(Arc::clone(&self.agg_schema));
        let mut key = Vec::with_capacity(self.groupings.len());
        let mut next = Vec::with_capacity(self.updates.len());
        let first_agg = self.groupings.len();

        let mut scan = PageListIterator::scan(self.input);
        while advance_into(&mut scan, &mut row)? {
            summary.rows_scanned += 1;
            if !self.filter.matches(&[&row])? {
                continue;
            }
            summary.rows_passed += 1;

            key.clear();
            for grouping in &self.groupings {
                key.push(grouping.eval(&[&row])?);
            }
            let hash = GroupTable::hash_key(&key);

            match groups.lookup(hash, &key) {
                Some(loc) => {
                    spill.read_into(loc, &mut running)?;
                    next.clear();
                    for update in &self.updates {
                        next.push(update.eval(&[&running, &row])?);
                    }
                    for (i, value) in next.drain(..).enumerate() {
                        running.set_att(first_agg + i, value)?;
                    }
                    spill.overwrite(loc, &running)?;
                }
                None => {
                    for (i, value) in key.iter().enumerate() {
                        running.set_att(i, value.clone())?;
                    }
                    for (i, seed) in self.seeds.iter().enumerate() {
                        running.set_att(first_agg + i, seed.eval(&[&row])?)?;
                    }
                    let loc = spill.append_record(&running)?;
                    if groups.insert(hash, key.clone(), loc) {
                        let hash = format!("{:016x}", hash);
                        let group_count = groups.len().to_string();
                        log_event_with_fields(
                            Event::HashCollision,
                            &[("hash", &hash), ("groups", &group_count)],
                        );
                    }
                }
            }
        }

        let mut out = Record::new(Arc::clone(self.output.schema()));
        for loc in groups.locations() {
            spill.read_into(loc, &mut running)?;
            for slot in 0..first_agg {
                out.set_att(slot, running.att(slot)?.clone())?;
            }
            for (i, finalizer) in self.finalizers.iter().enumerate() {
                out.set_att(first_agg + i, finalizer.eval(&[&running])?)?;
            }
            self.output.append(&out)?;
            summary.rows_emitted += 1;
        }

        summary.groups = groups.len();
        summary.hash_collisions = groups.collisions();
        summary.spill_pages = spill.page_count();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecConfig;
    use crate::executor::errors::ExecutorErrorCode;
    use crate::record::AttValue;

    #[test]
    fn test_synthesized_text() {
        assert_eq!(AggKind::Sum.seed_text("[val]"), "[val]");
        assert_eq!(AggKind::Sum.update_text("[val]", "total"), "+ ([val], [total])");
        assert_eq!(AggKind::Sum.finalize_text("total"), "[total]");

        assert_eq!(AggKind::Avg.update_text("* ([val], int[2])", "mean"), "+ (* ([val], int[2]), [mean])");
        assert_eq!(AggKind::Avg.finalize_text("mean"), "/ ([mean], [COUNT])");

        assert_eq!(AggKind::Count.seed_text("*"), "int[1]");
        assert_eq!(AggKind::Count.update_text("*", "n"), "+ ([n], int[1])");
        assert_eq!(AggKind::Count.finalize_text("n"), "[n]");
    }

    fn input() -> Table {
        let schema = Arc::new(Schema::from_pairs([
            ("dept", AttType::String),
            ("val", AttType::Int),
        ]));
        let mut t = Table::new("emp", schema.clone(), 128);
        for (dept, val) in [("eng", 10), ("sales", 5), ("eng", 20)] {
            t.append_record(
                &Record::from_values(
                    schema.clone(),
                    vec![AttValue::String(dept.into()), AttValue::Int(val)],
                )
                .unwrap(),
            )
            .unwrap();
        }
        t
    }

    fn buffer() -> BufferManager {
        BufferManager::new(&ExecConfig::with_pages(128, 8))
    }

    fn out(pairs: &[(&str, AttType)]) -> Table {
        Table::new("out", Arc::new(Schema::from_pairs(pairs.iter().cloned())), 128)
    }

    #[test]
    fn test_sum_avg_count_by_dept() {
        let input = input();
        let mut output = out(&[
            ("dept", AttType::String),
            ("total", AttType::Int),
            ("mean", AttType::Double),
            ("n", AttType::Int),
        ]);
        let summary = HashAggregate::new(
            &buffer(),
            &input,
            &mut output,
            &[(AggKind::Sum, "[val]"), (AggKind::Avg, "[val]"), (AggKind::Count, "*")],
            &["[dept]"],
            "bool[true]",
        )
        .unwrap()
        .run()
        .unwrap();
        assert_eq!(summary.groups, 2);

        let rows: Vec<String> = output
            .rows()
            .unwrap()
            .iter()
            .map(|r| {
                r.values()
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        assert_eq!(
            rows,
            vec![
                "string[eng] int[30] double[15] int[2]",
                "string[sales] int[5] double[5] int[1]",
            ]
        );
    }

    #[test]
    fn test_agg_schema_appends_count() {
        let input = input();
        let mut output = out(&[("dept", AttType::String), ("total", AttType::Int)]);
        let agg = HashAggregate::new(
            &buffer(),
            &input,
            &mut output,
            &[(AggKind::Sum, "[val]")],
            &["[dept]"],
            "bool[true]",
        )
        .unwrap();
        let names: Vec<&str> = agg.agg_schema().atts().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["dept", "total", "COUNT"]);
    }

    #[test]
    fn test_avg_into_int_slot_rejected() {
        let input = input();
        let mut output = out(&[("dept", AttType::String), ("mean", AttType::Int)]);
        let err = HashAggregate::new(
            &buffer(),
            &input,
            &mut output,
            &[(AggKind::Avg, "[val]")],
            &["[dept]"],
            "bool[true]",
        )
        .err()
        .unwrap();
        assert_eq!(err.code(), ExecutorErrorCode::RelInvalidExpression);
    }

    #[test]
    fn test_sum_over_string_rejected() {
        let input = input();
        let mut output = out(&[("all", AttType::String)]);
        let err = HashAggregate::new(
            &buffer(),
            &input,
            &mut output,
            &[(AggKind::Sum, "[dept]")],
            &[],
            "bool[true]",
        )
        .err()
        .unwrap();
        assert_eq!(err.code(), ExecutorErrorCode::RelInvalidExpression);
    }

    #[test]
    fn test_count_name_reserved_for_count_aggregate() {
        let input = input();
        let mut output = out(&[("dept", AttType::String), ("COUNT", AttType::Int)]);
        let err = HashAggregate::new(
            &buffer(),
            &input,
            &mut output,
            &[(AggKind::Sum, "[val]")],
            &["[dept]"],
            "bool[true]",
        )
        .err()
        .unwrap();
        assert_eq!(err.code(), ExecutorErrorCode::RelInvalidExpression);

        let mut output = out(&[("dept", AttType::String), ("COUNT", AttType::Int)]);
        HashAggregate::new(
            &buffer(),
            &input,
            &mut output,
            &[(AggKind::Count, "*")],
            &["[dept]"],
            "bool[true]",
        )
        .unwrap()
        .run()
        .unwrap();
        assert_eq!(output.len(), 2);
    }

    #[test]
    fn test_slot_shadowing_input_rejected() {
        let input = input();
        let mut output = out(&[("dept", AttType::String), ("val", AttType::Int)]);
        let err = HashAggregate::new(
            &buffer(),
            &input,
            &mut output,
            &[(AggKind::Sum, "[val]")],
            &["[dept]"],
            "bool[true]",
        )
        .err()
        .unwrap();
        assert_eq!(err.code(), ExecutorErrorCode::RelInvalidExpression);
        assert!(err.message().contains("'val'"));

        // A COUNT slot named like an input attribute would shadow it too
        let mut output = out(&[("dept", AttType::String), ("val", AttType::Int)]);
        assert!(HashAggregate::new(
            &buffer(),
            &input,
            &mut output,
            &[(AggKind::Count, "*")],
            &["[dept]"],
            "bool[true]",
        )
        .is_err());
    }

    #[test]
    fn test_aggregate_reading_grouping_slot_rejected() {
        let schema = Arc::new(Schema::from_pairs([("qty", AttType::Int), ("price", AttType::Int)]));
        let mut input = Table::new("orders", schema.clone(), 128);
        input
            .append_record(
                &Record::from_values(schema, vec![AttValue::Int(2), AttValue::Int(7)]).unwrap(),
            )
            .unwrap();

        // Grouping slot 'qty' would capture the [qty] read inside SUM
        let mut output = out(&[("qty", AttType::Int), ("spend", AttType::Int)]);
        let err = HashAggregate::new(
            &buffer(),
            &input,
            &mut output,
            &[(AggKind::Sum, "* ([qty], [price])")],
            &["[qty]"],
            "bool[true]",
        )
        .err()
        .unwrap();
        assert_eq!(err.code(), ExecutorErrorCode::RelInvalidExpression);

        let mut output = out(&[("price", AttType::Int), ("units", AttType::Int)]);
        HashAggregate::new(
            &buffer(),
            &input,
            &mut output,
            &[(AggKind::Sum, "[qty]")],
            &["[price]"],
            "bool[true]",
        )
        .unwrap()
        .run()
        .unwrap();
        assert_eq!(output.rows().unwrap()[0].values(), &[AttValue::Int(7), AttValue::Int(2)]);
    }

    #[test]
    fn test_input_count_attribute_rejected() {
        let schema = Arc::new(Schema::from_pairs([("COUNT", AttType::Int)]));
        let input = Table::new("tallies", schema, 128);
        let mut output = out(&[("total", AttType::Int)]);
        let err = HashAggregate::new(
            &buffer(),
            &input,
            &mut output,
            &[(AggKind::Sum, "[COUNT]")],
            &[],
            "bool[true]",
        )
        .err()
        .unwrap();
        assert_eq!(err.code(), ExecutorErrorCode::RelInvalidExpression);
    }

    #[test]
    fn test_arity_mismatch() {
        let input = input();
        let mut output = out(&[("dept", AttType::String)]);
        let err = HashAggregate::new(
            &buffer(),
            &input,
            &mut output,
            &[(AggKind::Sum, "[val]")],
            &["[dept]"],
            "bool[true]",
        )
        .err()
        .unwrap();
        assert_eq!(err.code(), ExecutorErrorCode::RelArityMismatch);
    }

    #[test]
    fn test_global_group_and_empty_input() {
        let input = input();
        let mut output = out(&[("total", AttType::Int)]);
        HashAggregate::new(&buffer(), &input, &mut output, &[(AggKind::Sum, "[val]")], &[], "bool[true]")
            .unwrap()
            .run()
            .unwrap();
        let rows = output.rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].att(0).unwrap(), &AttValue::Int(35));

        let mut output = out(&[("total", AttType::Int)]);
        let summary = HashAggregate::new(
            &buffer(),
            &input,
            &mut output,
            &[(AggKind::Sum, "[val]")],
            &[],
            "bool[false]",
        )
        .unwrap()
        .run()
        .unwrap();
        assert_eq!(summary.rows_passed, 0);
        assert!(output.is_empty());
    }
}
