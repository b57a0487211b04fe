//! Equi-width histogram for selectivity estimation over an `i64` column.
//!
//! Bucket boundaries are fixed at construction; `add_value` is strict about
//! domain, `estimate_cardinality` clamps for query-side robustness. Every
//! division here is integer division, and the multiply-then-divide order in
//! the range estimates is load-bearing — `h * delta / w` gives a different
//! (and wrong) answer than `h * (delta / w)`.

use common::{DbError, DbResult, PredicateOp};

/// Equi-width histogram over `[min, max]` split into `buckets` equal-width
/// ranges (the last range may be narrower if `max - min` does not divide
/// evenly).
#[derive(Clone, Debug)]
pub struct ColumnStats {
    buckets: usize,
    min: i64,
    max: i64,
    width: i64,
    histogram: Vec<usize>,
    total: usize,
}

impl ColumnStats {
    /// Builds an empty histogram. `width` is `ceil((max - min) / buckets)`.
    pub fn new(buckets: usize, min: i64, max: i64) -> DbResult<Self> {
        if buckets == 0 {
            return Err(DbError::Storage("histogram requires at least one bucket".into()));
        }
        if min > max {
            return Err(DbError::Storage(format!(
                "histogram range is empty: min {min} > max {max}"
            )));
        }
        let span = max - min;
        let width = span / buckets as i64 + if span % buckets as i64 != 0 { 1 } else { 0 };
        let width = width.max(1);
        Ok(Self {
            buckets,
            min,
            max,
            width,
            histogram: vec![0; buckets],
            total: 0,
        })
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn buckets(&self) -> usize {
        self.buckets
    }

    fn index(&self, v: i64) -> usize {
        let idx = (v - self.min) / self.width;
        idx.clamp(0, self.buckets as i64 - 1) as usize
    }

    /// Increments the bucket containing `v` and the running total. Fails
    /// with `OutOfRange` if `v` falls outside `[min, max]`.
    pub fn add_value(&mut self, v: i64) -> DbResult<()> {
        if v < self.min || v > self.max {
            return Err(DbError::OutOfRange {
                value: v,
                min: self.min,
                max: self.max,
            });
        }
        let idx = self.index(v);
        self.histogram[idx] += 1;
        self.total += 1;
        Ok(())
    }

    /// Estimates the number of rows satisfying `column OP v`. `v` is
    /// clamped into `[min, max]` first, unlike `add_value`.
    pub fn estimate_cardinality(&self, op: PredicateOp, v: i64) -> usize {
        let v = v.clamp(self.min, self.max);
        let i = self.index(v);
        let h = self.histogram[i] as i64;
        let w = self.width;
        let l = self.min + i as i64 * w;
        let r = l + w - 1;

        let below: i64 = self.histogram[..i].iter().map(|&c| c as i64).sum();
        let above: i64 = self.histogram[i + 1..].iter().map(|&c| c as i64).sum();

        let estimate = match op {
            PredicateOp::Eq => h / w,
            PredicateOp::Ne => self.total as i64 - h / w,
            PredicateOp::Lt => below + (h * (v - l)) / w,
            PredicateOp::Le => below + (h * (v - l + 1)) / w,
            PredicateOp::Gt => above + (h * (r - v)) / w,
            PredicateOp::Ge => above + (h * (r - v + 1)) / w,
        };
        estimate.max(0) as usize
    }
}
