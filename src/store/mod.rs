//! Record-store contract used by the ingestion engine.
//!
//! The engine never talks to a storage engine directly. It needs typed
//! `select` / `get` / `insert` / `update` over a handful of tables and
//! nestable transactions; any backend offering that can host the import.
//! [`MemoryStore`] is the reference backend.

mod memory;
mod transaction;

pub use memory::MemoryStore;
pub use transaction::{Transaction, with_transaction};

use std::fmt;

use thiserror::Error;

/// Store-assigned row identifier.
pub type RecordId = u64;

/// Errors reported by a [`RecordStore`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    #[error("{table} record {id} not found")]
    NotFound { table: &'static str, id: RecordId },

    /// The backend refused a write (constraint, permission, ...).
    #[error("{table} write rejected: {reason}")]
    Rejected { table: &'static str, reason: String },

    #[error("no open transaction")]
    NoTransaction,

    /// A table name is registered with a different record type.
    #[error("table {0} is registered with another record type")]
    SchemaMismatch(&'static str),
}

/// A persisted record type.
pub trait Table: Clone + fmt::Debug + 'static {
    /// Table name, unique per backend.
    const NAME: &'static str;

    /// Columns that can appear in a [`Predicate`].
    type Field: Copy + fmt::Debug;

    /// Current value of a filterable column.
    fn field(&self, field: Self::Field) -> FieldValue;

    /// Fill values the store owns (generated codes, computed totals).
    /// Called on every insert and update; an error rejects the write.
    fn before_write(&mut self, _id: RecordId) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Comparable column value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Id(RecordId),
    Null,
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<RecordId> for FieldValue {
    fn from(id: RecordId) -> Self {
        Self::Id(id)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Row filter over the columns of one table.
#[derive(Debug, Clone)]
pub enum Predicate<F> {
    Eq(F, FieldValue),
    Ne(F, FieldValue),
    And(Vec<Predicate<F>>),
}

impl<F: Copy> Predicate<F> {
    pub fn eq(field: F, value: impl Into<FieldValue>) -> Self {
        Self::Eq(field, value.into())
    }

    pub fn ne(field: F, value: impl Into<FieldValue>) -> Self {
        Self::Ne(field, value.into())
    }

    /// Conjunction with another predicate.
    pub fn and(self, other: Predicate<F>) -> Self {
        match self {
            Self::And(mut all) => {
                all.push(other);
                Self::And(all)
            }
            first => Self::And(vec![first, other]),
        }
    }

    pub fn matches<T: Table<Field = F>>(&self, record: &T) -> bool {
        match self {
            Self::Eq(f, v) => record.field(*f) == *v,
            Self::Ne(f, v) => record.field(*f) != *v,
            Self::And(all) => all.iter().all(|p| p.matches(record)),
        }
    }
}

/// A record together with its identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Row<T> {
    pub id: RecordId,
    pub record: T,
}

/// Transactional record store.
///
/// Transactions nest: every `begin` opens a scope that the matching
/// `commit` folds into its parent and `rollback` discards. Writes outside
/// any transaction apply immediately.
pub trait RecordStore {
    /// All rows of `T` matching `predicate`, in insertion order.
    fn select<T: Table>(&self, predicate: &Predicate<T::Field>) -> Result<Vec<Row<T>>, StoreError>;

    fn get<T: Table>(&self, id: RecordId) -> Result<T, StoreError>;

    /// Insert a new row; returns it as stored, including store-filled values.
    fn insert<T: Table>(&mut self, record: T) -> Result<Row<T>, StoreError>;

    fn update<T: Table>(&mut self, id: RecordId, record: T) -> Result<(), StoreError>;

    fn begin(&mut self) -> Result<(), StoreError>;

    fn commit(&mut self) -> Result<(), StoreError>;

    fn rollback(&mut self) -> Result<(), StoreError>;

    /// First row matching `predicate`.
    fn find_one<T: Table>(
        &self,
        predicate: &Predicate<T::Field>,
    ) -> Result<Option<Row<T>>, StoreError> {
        Ok(self.select(predicate)?.into_iter().next())
    }
}
