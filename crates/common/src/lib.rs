//! Types and errors shared by every crate in the workspace: page identity,
//! tuple/schema representations, the canonical error enum, and runtime
//! configuration.


pub mod pretty;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::{io, path::PathBuf};
use thiserror::Error;
use types::SqlType;

pub use types::Value;

/// Fixed-size page allocation shared by the buffer pool and every `DbFile`.
pub const PAGE_SIZE: usize = 4096;

/// The buffer pool's default resident-page capacity.
pub const DEFAULT_NUM_PAGES: usize = 50;

/// Identity of a page: the file it belongs to plus its index within that file.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId {
    pub file: String,
    pub page: u32,
}

impl PageId {
    pub fn new(file: impl Into<String>, page: u32) -> Self {
        Self {
            file: file.into(),
            page,
        }
    }
}

/// Ordered schema for a `Tuple`: a sequence of uniquely-named, typed columns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TupleDesc {
    fields: Vec<(String, SqlType)>,
    index: HashMap<String, usize>,
}

impl TupleDesc {
    /// Builds a descriptor from ordered `(name, type)` pairs.
    ///
    /// Fails if any name repeats.
    pub fn new(fields: Vec<(String, SqlType)>) -> DbResult<Self> {
        let mut index = HashMap::with_capacity(fields.len());
        for (i, (name, _)) in fields.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(DbError::SchemaMiss(format!(
                    "duplicate field name '{name}' in tuple descriptor"
                )));
            }
        }
        Ok(Self { fields, index })
    }

    /// Resolves a field name to its ordinal position.
    pub fn index_of(&self, name: &str) -> DbResult<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| DbError::SchemaMiss(name.to_string()))
    }

    /// The type of the field at the given ordinal.
    pub fn field_type(&self, i: usize) -> DbResult<SqlType> {
        self.fields
            .get(i)
            .map(|(_, ty)| *ty)
            .ok_or_else(|| DbError::SchemaMiss(format!("no field at index {i}")))
    }

    /// The name of the field at the given ordinal.
    pub fn field_name(&self, i: usize) -> DbResult<&str> {
        self.fields
            .get(i)
            .map(|(name, _)| name.as_str())
            .ok_or_else(|| DbError::SchemaMiss(format!("no field at index {i}")))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[(String, SqlType)] {
        &self.fields
    }
}

/// An ordered record of `Value`s whose positions line up with some `TupleDesc`.
///
/// Tuples do not carry their own descriptor; the `DbFile` they came from owns
/// the schema they are interpreted against.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tuple(pub Vec<Value>);

impl Tuple {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn get_field(&self, i: usize) -> DbResult<&Value> {
        self.0
            .get(i)
            .ok_or_else(|| DbError::SchemaMiss(format!("no field at index {i}")))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[Value] {
        &self.0
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }
}

impl From<Vec<Value>> for Tuple {
    fn from(values: Vec<Value>) -> Self {
        Tuple::new(values)
    }
}

/// Canonical error type shared across every subsystem.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("catalog miss: no file named '{0}' is registered")]
    CatalogMiss(String),
    #[error("duplicate name: a file named '{0}' is already registered")]
    DuplicateName(String),
    #[error("unknown name: no file named '{0}' is registered")]
    UnknownName(String),
    #[error("page {0:?} is not resident in the buffer pool")]
    NotResident(PageId),
    #[error("schema miss: {0}")]
    SchemaMiss(String),
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("value {value} is out of range [{min}, {max}]")]
    OutOfRange { value: i64, min: i64, max: i64 },
    #[error("aggregate over empty input requires grouping or COUNT")]
    EmptyAggregate,
    #[error("storage: {0}")]
    Storage(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Result alias that carries a `DbError`.
pub type DbResult<T> = Result<T, DbError>;

/// Runtime configuration for the storage and buffer pool layers.
#[derive(Clone, Debug, bon::Builder)]
pub struct Config {
    /// Directory where table files live.
    #[builder(default = PathBuf::from("./db_data"))]
    pub data_dir: PathBuf,
    /// Fixed-size page allocation in bytes. Must equal [`PAGE_SIZE`]; kept as
    /// a field, rather than hard-coded, so a `Config` built from user input
    /// fails with a clear error instead of silently corrupting pages.
    #[builder(default = PAGE_SIZE)]
    pub page_size: usize,
    /// Number of pages the buffer pool keeps resident.
    #[builder(default = DEFAULT_NUM_PAGES)]
    pub buffer_pool_pages: usize,
}

impl Config {
    /// Checks that `page_size` agrees with the build-time [`PAGE_SIZE`] constant.
    pub fn validated(self) -> DbResult<Self> {
        if self.page_size != PAGE_SIZE {
            return Err(DbError::Storage(format!(
                "configured page_size {} does not match PAGE_SIZE {}",
                self.page_size, PAGE_SIZE
            )));
        }
        Ok(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./db_data"),
            page_size: PAGE_SIZE,
            buffer_pool_pages: DEFAULT_NUM_PAGES,
        }
    }
}

/// The six comparison operators shared by `filter`, `join`, and the
/// selectivity estimator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredicateOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl PredicateOp {
    /// Applies this operator to an already-computed ordering.
    pub fn matches(self, ord: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            PredicateOp::Eq => ord == Equal,
            PredicateOp::Ne => ord != Equal,
            PredicateOp::Lt => ord == Less,
            PredicateOp::Le => ord != Greater,
            PredicateOp::Gt => ord == Greater,
            PredicateOp::Ge => ord != Less,
        }
    }
}

/// Convenient re-exports for downstream crates.
pub mod prelude {
    pub use crate::{Config, DbError, DbResult, PageId, PredicateOp, Tuple, TupleDesc, PAGE_SIZE};
    pub use types::{SqlType, Value};
}
