//! Relational operator kernel: plain pull-style free functions over
//! `DbFile`, not an operator tree.
//!
//! Each operator reads every tuple from a source `DbFile` and pushes
//! results into an output `DbFile` via `insert_tuple`. None assume the
//! output's schema — the caller prepares it. Operators depend only on
//! `DbFile` and the shared types, never on the catalog or buffer pool, so
//! they run unchanged against a buffer-pool-backed file or a bare
//! `HeapFile` fixture.

pub mod aggregate;
pub mod filter;
pub mod join;
pub mod project;

pub use aggregate::{aggregate, Aggregate, AggregateOp};
pub use filter::{filter, FilterPredicate};
pub use join::{join, JoinPredicate};
pub use project::projection;
