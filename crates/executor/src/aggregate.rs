//! `aggregate`: SUM/AVG/COUNT/MIN/MAX over a source `DbFile`, with optional
//! grouping.

use common::{DbError, DbResult, Tuple, Value};
use storage::DbFile;

/// `AggregateOp ∈ {Sum, Avg, Count, Min, Max}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateOp {
    Sum,
    Avg,
    Count,
    Min,
    Max,
}

/// `(field, op, group)`. When `group` is `Some(name)`, input tuples are
/// bucketed by the value of that column before the aggregate is applied
/// per bucket.
pub struct Aggregate {
    pub field: String,
    pub op: AggregateOp,
    pub group: Option<String>,
}

impl Aggregate {
    pub fn new(field: impl Into<String>, op: AggregateOp, group: Option<String>) -> Self {
        Self {
            field: field.into(),
            op,
            group,
        }
    }
}

/// Without grouping, emits exactly one tuple containing the aggregate
/// value. With grouping, buckets input tuples by the group column and
/// emits one `(group_value, agg_value)` tuple per bucket; bucket order is
/// unspecified (hash map iteration order). Empty input with a non-`Count`
/// aggregate and no grouping fails with `EmptyAggregate`.
pub fn aggregate(input: &mut dyn DbFile, output: &mut dyn DbFile, agg: &Aggregate) -> DbResult<()> {
    let field_idx = input.tuple_desc().index_of(&agg.field)?;
    let group_idx = agg
        .group
        .as_ref()
        .map(|name| input.tuple_desc().index_of(name))
        .transpose()?;

    let tuples: Vec<Tuple> = input.iter_tuples().collect::<DbResult<_>>()?;

    match group_idx {
        None => {
            let values: DbResult<Vec<Value>> = tuples
                .iter()
                .map(|t| t.get_field(field_idx).map(|v| v.clone()))
                .collect();
            let agg_value = apply(agg.op, &values?)?;
            output.insert_tuple(Tuple::new(vec![agg_value]))?;
        }
        Some(group_idx) => {
            // Linear-scan bucketing, matching the original's
            // key -> Vec<Tuple> grouping: `Value` has no `Hash` impl (only
            // same-tag equality), so buckets are found by `eq_same_type`
            // rather than a hash map keyed on the value itself.
            let mut buckets: Vec<(Value, Vec<Value>)> = Vec::new();
            for tuple in &tuples {
                let key = tuple.get_field(group_idx)?;
                let field_value = tuple.get_field(field_idx)?.clone();
                let bucket = buckets
                    .iter_mut()
                    .find(|(k, _)| k.eq_same_type(key) == Some(true));
                match bucket {
                    Some((_, values)) => values.push(field_value),
                    None => buckets.push((key.clone(), vec![field_value])),
                }
            }
            for (group_value, values) in buckets {
                let agg_value = apply(agg.op, &values)?;
                output.insert_tuple(Tuple::new(vec![group_value, agg_value]))?;
            }
        }
    }
    Ok(())
}

fn apply(op: AggregateOp, values: &[Value]) -> DbResult<Value> {
    if op == AggregateOp::Count {
        return Ok(Value::Int(values.len() as i64));
    }
    if values.is_empty() {
        return Err(DbError::EmptyAggregate);
    }

    match op {
        AggregateOp::Count => unreachable!("handled above"),
        AggregateOp::Sum => sum(values),
        AggregateOp::Avg => avg(values),
        AggregateOp::Min => extreme(values, true),
        AggregateOp::Max => extreme(values, false),
    }
}

fn sum(values: &[Value]) -> DbResult<Value> {
    let mut iter = values.iter();
    let first = iter.next().expect("non-empty checked by caller").clone();
    iter.try_fold(first, |acc, v| {
        acc.add_same_type(v).ok_or_else(|| {
            DbError::TypeMismatch("SUM requires a numeric field of uniform type".into())
        })
    })
}

fn avg(values: &[Value]) -> DbResult<Value> {
    let total = sum(values)?;
    let total = total
        .as_f64()
        .ok_or_else(|| DbError::TypeMismatch("AVG requires a numeric field".into()))?;
    Ok(Value::Double(total / values.len() as f64))
}

fn extreme(values: &[Value], want_min: bool) -> DbResult<Value> {
    let mut best = values[0].clone();
    for v in &values[1..] {
        let ord = v.cmp_same_type(&best).ok_or_else(|| {
            DbError::TypeMismatch("MIN/MAX requires values of uniform type".into())
        })?;
        let replace = if want_min {
            ord == std::cmp::Ordering::Less
        } else {
            ord == std::cmp::Ordering::Greater
        };
        if replace {
            best = v.clone();
        }
    }
    Ok(best)
}
