use std::any::Any;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use super::{Predicate, RecordId, RecordStore, Row, StoreError, Table};

/// Type-erased row map so tables of different record types share one store.
trait AnyRows: fmt::Debug {
    fn clone_box(&self) -> Box<dyn AnyRows>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Table> AnyRows for BTreeMap<RecordId, T> {
    fn clone_box(&self) -> Box<dyn AnyRows> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug)]
struct State {
    tables: HashMap<&'static str, Box<dyn AnyRows>>,
    next_id: RecordId,
}

impl Default for State {
    fn default() -> Self {
        Self {
            tables: HashMap::new(),
            next_id: 1,
        }
    }
}

impl Clone for State {
    fn clone(&self) -> Self {
        Self {
            tables: self
                .tables
                .iter()
                .map(|(name, rows)| (*name, rows.clone_box()))
                .collect(),
            next_id: self.next_id,
        }
    }
}

/// In-memory [`RecordStore`].
///
/// Each `begin` snapshots the whole state; `rollback` restores the
/// snapshot, `commit` discards it. Identifiers are never reused, even
/// across rollbacks.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: State,
    savepoints: Vec<State>,
    rejected: HashSet<&'static str>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later insert/update on `table` fail with
    /// [`StoreError::Rejected`].
    pub fn reject_writes(&mut self, table: &'static str) {
        self.rejected.insert(table);
    }

    pub fn accept_writes(&mut self, table: &'static str) {
        self.rejected.remove(table);
    }

    /// Number of open transaction scopes.
    pub fn depth(&self) -> usize {
        self.savepoints.len()
    }

    /// Every row of `T`, in insertion order.
    pub fn all<T: Table>(&self) -> Vec<Row<T>> {
        self.rows::<T>()
            .ok()
            .flatten()
            .map(|rows| {
                rows.iter()
                    .map(|(id, record)| Row {
                        id: *id,
                        record: record.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn rows<T: Table>(&self) -> Result<Option<&BTreeMap<RecordId, T>>, StoreError> {
        match self.state.tables.get(T::NAME) {
            None => Ok(None),
            Some(rows) => rows
                .as_any()
                .downcast_ref::<BTreeMap<RecordId, T>>()
                .map(Some)
                .ok_or(StoreError::SchemaMismatch(T::NAME)),
        }
    }

    fn rows_mut<T: Table>(&mut self) -> Result<&mut BTreeMap<RecordId, T>, StoreError> {
        if self.rejected.contains(T::NAME) {
            return Err(StoreError::Rejected {
                table: T::NAME,
                reason: "table is read-only".into(),
            });
        }
        self.state
            .tables
            .entry(T::NAME)
            .or_insert_with(|| Box::new(BTreeMap::<RecordId, T>::new()))
            .as_any_mut()
            .downcast_mut::<BTreeMap<RecordId, T>>()
            .ok_or(StoreError::SchemaMismatch(T::NAME))
    }
}

impl RecordStore for MemoryStore {
    fn select<T: Table>(&self, predicate: &Predicate<T::Field>) -> Result<Vec<Row<T>>, StoreError> {
        let Some(rows) = self.rows::<T>()? else {
            return Ok(Vec::new());
        };
        Ok(rows
            .iter()
            .filter(|(_, record)| predicate.matches(*record))
            .map(|(id, record)| Row {
                id: *id,
                record: record.clone(),
            })
            .collect())
    }

    fn get<T: Table>(&self, id: RecordId) -> Result<T, StoreError> {
        self.rows::<T>()?
            .and_then(|rows| rows.get(&id))
            .cloned()
            .ok_or(StoreError::NotFound { table: T::NAME, id })
    }

    fn insert<T: Table>(&mut self, mut record: T) -> Result<Row<T>, StoreError> {
        let id = self.state.next_id;
        record.before_write(id)?;
        self.rows_mut::<T>()?.insert(id, record.clone());
        self.state.next_id += 1;
        Ok(Row { id, record })
    }

    fn update<T: Table>(&mut self, id: RecordId, mut record: T) -> Result<(), StoreError> {
        let rows = self.rows_mut::<T>()?;
        let slot = rows
            .get_mut(&id)
            .ok_or(StoreError::NotFound { table: T::NAME, id })?;
        record.before_write(id)?;
        *slot = record;
        Ok(())
    }

    fn begin(&mut self) -> Result<(), StoreError> {
        self.savepoints.push(self.state.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.savepoints
            .pop()
            .map(|_| ())
            .ok_or(StoreError::NoTransaction)
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        let snapshot = self.savepoints.pop().ok_or(StoreError::NoTransaction)?;
        let next_id = self.state.next_id;
        self.state = snapshot;
        self.state.next_id = next_id;
        Ok(())
    }
}
