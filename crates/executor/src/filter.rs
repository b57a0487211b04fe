//! `filter`: keeps tuples from a source `DbFile` that satisfy every
//! predicate in a conjunction.

use common::{DbError, DbResult, PredicateOp, Tuple, Value};
use storage::DbFile;

/// `(field_name, op, value)`. A tuple passes a single predicate when its
/// named field compares against `value` as `op` demands.
pub struct FilterPredicate {
    pub field: String,
    pub op: PredicateOp,
    pub value: Value,
}

impl FilterPredicate {
    pub fn new(field: impl Into<String>, op: PredicateOp, value: Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }
}

/// A tuple passes iff every predicate holds (conjunction). Evaluation
/// short-circuits on the first failing predicate. Mismatched tags fail
/// with `TypeMismatch`.
pub fn filter(
    input: &mut dyn DbFile,
    output: &mut dyn DbFile,
    predicates: &[FilterPredicate],
) -> DbResult<()> {
    let indices: Vec<usize> = predicates
        .iter()
        .map(|p| input.tuple_desc().index_of(&p.field))
        .collect::<DbResult<_>>()?;

    let source_tuples: Vec<Tuple> = input.iter_tuples().collect::<DbResult<_>>()?;

    for tuple in source_tuples {
        if matches_all(&tuple, predicates, &indices)? {
            output.insert_tuple(tuple)?;
        }
    }
    Ok(())
}

fn matches_all(tuple: &Tuple, predicates: &[FilterPredicate], indices: &[usize]) -> DbResult<bool> {
    for (pred, &idx) in predicates.iter().zip(indices) {
        let field = tuple.get_field(idx)?;
        let ord = field.cmp_same_type(&pred.value).ok_or_else(|| {
            DbError::TypeMismatch(format!(
                "field '{}' cannot be compared to the filter value",
                pred.field
            ))
        })?;
        if !pred.op.matches(ord) {
            return Ok(false);
        }
    }
    Ok(true)
}
