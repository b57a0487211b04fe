//! `join`: nested-loop equi/theta join between two `DbFile`s.

use common::{DbError, DbResult, PredicateOp, Tuple};
use storage::DbFile;

/// `(left_field, right_field, op)`. A pair of tuples joins when
/// `left[left_field] OP right[right_field]`.
pub struct JoinPredicate {
    pub left_field: String,
    pub right_field: String,
    pub op: PredicateOp,
}

impl JoinPredicate {
    pub fn new(left_field: impl Into<String>, right_field: impl Into<String>, op: PredicateOp) -> Self {
        Self {
            left_field: left_field.into(),
            right_field: right_field.into(),
            op,
        }
    }
}

/// Nested-loop join: for every pair `(l, r)` in `left × right` satisfying
/// the predicate, emits the concatenation of `l`'s fields followed by
/// `r`'s fields. For `PredicateOp::Eq`, the right-side join column is
/// omitted from the emitted tuple (natural-join projection on that column
/// only); every other operator keeps all right-side columns.
///
/// Iteration order is left-major then right-major. The right side is
/// materialized into a `Vec<Tuple>` once, since it is rescanned for every
/// left tuple.
pub fn join(
    left: &mut dyn DbFile,
    right: &mut dyn DbFile,
    output: &mut dyn DbFile,
    pred: &JoinPredicate,
) -> DbResult<()> {
    let left_idx = left.tuple_desc().index_of(&pred.left_field)?;
    let right_idx = right.tuple_desc().index_of(&pred.right_field)?;
    let omit_right_join_column = pred.op == PredicateOp::Eq;

    let left_tuples: Vec<Tuple> = left.iter_tuples().collect::<DbResult<_>>()?;
    let right_tuples: Vec<Tuple> = right.iter_tuples().collect::<DbResult<_>>()?;

    for l in &left_tuples {
        let l_key = l.get_field(left_idx)?;
        for r in &right_tuples {
            let r_key = r.get_field(right_idx)?;
            let ord = l_key.cmp_same_type(r_key).ok_or_else(|| {
                DbError::TypeMismatch(format!(
                    "join columns '{}' and '{}' are not comparable",
                    pred.left_field, pred.right_field
                ))
            })?;
            if !pred.op.matches(ord) {
                continue;
            }

            let mut values = l.fields().to_vec();
            for (i, v) in r.fields().iter().enumerate() {
                if omit_right_join_column && i == right_idx {
                    continue;
                }
                values.push(v.clone());
            }
            output.insert_tuple(Tuple::new(values))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::TupleDesc;
    use storage::HeapFile;
    use tempfile::tempdir;
    use types::{SqlType, Value};

    fn file(dir: &tempfile::TempDir, name: &str, desc: TupleDesc) -> HeapFile {
        HeapFile::open(&dir.path().join(format!("{name}.tbl")), name, desc).unwrap()
    }

    /// S6: left (a,b) rows (1,2),(3,4); right (a,c) rows (1,9),(3,8); EQ
    /// join on a=a yields (1,2,9),(3,4,8) with right-side `a` omitted.
    #[test]
    fn s6_natural_eq_join() {
        let dir = tempdir().unwrap();
        let left_desc =
            TupleDesc::new(vec![("a".into(), SqlType::Int), ("b".into(), SqlType::Int)]).unwrap();
        let right_desc =
            TupleDesc::new(vec![("a".into(), SqlType::Int), ("c".into(), SqlType::Int)]).unwrap();

        let mut left = file(&dir, "left", left_desc);
        left.insert_tuple(Tuple::new(vec![Value::Int(1), Value::Int(2)]))
            .unwrap();
        left.insert_tuple(Tuple::new(vec![Value::Int(3), Value::Int(4)]))
            .unwrap();

        let mut right = file(&dir, "right", right_desc);
        right
            .insert_tuple(Tuple::new(vec![Value::Int(1), Value::Int(9)]))
            .unwrap();
        right
            .insert_tuple(Tuple::new(vec![Value::Int(3), Value::Int(8)]))
            .unwrap();

        let out_desc = TupleDesc::new(vec![
            ("a".into(), SqlType::Int),
            ("b".into(), SqlType::Int),
            ("c".into(), SqlType::Int),
        ])
        .unwrap();
        let mut output = file(&dir, "out", out_desc);

        let pred = JoinPredicate::new("a", "a", PredicateOp::Eq);
        join(&mut left, &mut right, &mut output, &pred).unwrap();

        let rows: Vec<_> = output.iter_tuples().collect::<DbResult<_>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 3);
        assert!(matches!(rows[0].get_field(2).unwrap(), Value::Int(9)));
        assert!(matches!(rows[1].get_field(2).unwrap(), Value::Int(8)));
    }

    #[test]
    fn non_eq_join_keeps_all_right_columns() {
        let dir = tempdir().unwrap();
        let left_desc = TupleDesc::new(vec![("a".into(), SqlType::Int)]).unwrap();
        let right_desc = TupleDesc::new(vec![("a".into(), SqlType::Int)]).unwrap();

        let mut left = file(&dir, "left", left_desc);
        left.insert_tuple(Tuple::new(vec![Value::Int(1)])).unwrap();
        left.insert_tuple(Tuple::new(vec![Value::Int(3)])).unwrap();

        let mut right = file(&dir, "right", right_desc);
        right.insert_tuple(Tuple::new(vec![Value::Int(1)])).unwrap();
        right
            .insert_tuple(Tuple::new(vec![Value::Int(3)]))
            .unwrap();

        let out_desc =
            TupleDesc::new(vec![("a".into(), SqlType::Int), ("a2".into(), SqlType::Int)]).unwrap();
        let mut output = file(&dir, "out", out_desc);

        let pred = JoinPredicate::new("a", "a", PredicateOp::Lt);
        join(&mut left, &mut right, &mut output, &pred).unwrap();

        let rows: Vec<_> = output.iter_tuples().collect::<DbResult<_>>().unwrap();
        // only (1,3) satisfies left.a < right.a
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 2);
    }

    #[test]
    fn join_symmetry_for_non_eq_operators() {
        let dir = tempdir().unwrap();
        let desc = TupleDesc::new(vec![("a".into(), SqlType::Int)]).unwrap();

        let mut left = file(&dir, "left", desc.clone());
        left.insert_tuple(Tuple::new(vec![Value::Int(1)])).unwrap();
        left.insert_tuple(Tuple::new(vec![Value::Int(5)])).unwrap();

        let mut right = file(&dir, "right", desc.clone());
        right.insert_tuple(Tuple::new(vec![Value::Int(2)])).unwrap();
        right.insert_tuple(Tuple::new(vec![Value::Int(4)])).unwrap();

        let out_desc =
            TupleDesc::new(vec![("a".into(), SqlType::Int), ("a2".into(), SqlType::Int)]).unwrap();

        let mut forward_out = file(&dir, "forward", out_desc.clone());
        join(
            &mut left,
            &mut right,
            &mut forward_out,
            &JoinPredicate::new("a", "a", PredicateOp::Lt),
        )
        .unwrap();

        let mut left2 = file(&dir, "left", desc.clone());
        let mut right2 = file(&dir, "right", desc);
        let mut reverse_out = file(&dir, "reverse", out_desc);
        join(
            &mut right2,
            &mut left2,
            &mut reverse_out,
            &JoinPredicate::new("a", "a", PredicateOp::Gt),
        )
        .unwrap();

        let forward: Vec<(i64, i64)> = forward_out
            .iter_tuples()
            .map(|t| {
                let t = t.unwrap();
                let a = match t.get_field(0).unwrap() {
                    Value::Int(v) => *v,
                    _ => unreachable!(),
                };
                let b = match t.get_field(1).unwrap() {
                    Value::Int(v) => *v,
                    _ => unreachable!(),
                };
                (a, b)
            })
            .collect();
        let reverse: Vec<(i64, i64)> = reverse_out
            .iter_tuples()
            .map(|t| {
                let t = t.unwrap();
                let a = match t.get_field(0).unwrap() {
                    Value::Int(v) => *v,
                    _ => unreachable!(),
                };
                let b = match t.get_field(1).unwrap() {
                    Value::Int(v) => *v,
                    _ => unreachable!(),
                };
                (b, a)
            })
            .collect();

        assert_eq!(forward, reverse);
    }
}
