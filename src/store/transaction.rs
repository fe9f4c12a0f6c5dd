use std::ops::{Deref, DerefMut};

use super::{RecordStore, StoreError};

/// Scoped transaction over a [`RecordStore`].
///
/// Opened with [`Transaction::begin`]; finished explicitly with
/// [`commit`](Transaction::commit) or [`rollback`](Transaction::rollback).
/// Dropping an unfinished guard (early return, `?`, panic unwind) rolls
/// the scope back.
pub struct Transaction<'a, S: RecordStore> {
    store: &'a mut S,
    open: bool,
}

impl<'a, S: RecordStore> Transaction<'a, S> {
    pub fn begin(store: &'a mut S) -> Result<Self, StoreError> {
        store.begin()?;
        Ok(Self { store, open: true })
    }

    pub fn commit(mut self) -> Result<(), StoreError> {
        self.open = false;
        self.store.commit()
    }

    pub fn rollback(mut self) -> Result<(), StoreError> {
        self.open = false;
        self.store.rollback()
    }
}

impl<S: RecordStore> Deref for Transaction<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.store
    }
}

impl<S: RecordStore> DerefMut for Transaction<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.store
    }
}

impl<S: RecordStore> Drop for Transaction<'_, S> {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.store.rollback() {
                tracing::error!(error = %e, "rollback of abandoned transaction failed");
            }
        }
    }
}

/// Run `body` inside its own transaction: commit when it returns `Ok`,
/// roll back on any other exit.
pub fn with_transaction<S, T, E, F>(store: &mut S, body: F) -> Result<T, E>
where
    S: RecordStore,
    E: From<StoreError>,
    F: FnOnce(&mut S) -> Result<T, E>,
{
    let mut tx = Transaction::begin(store)?;
    let value = body(&mut *tx)?;
    tx.commit()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Customer, CustomerField};
    use crate::store::{MemoryStore, Predicate};

    fn customer(code: &str) -> Customer {
        Customer {
            code: code.into(),
            ..Customer::default()
        }
    }

    fn count(store: &MemoryStore) -> usize {
        store.all::<Customer>().len()
    }

    #[test]
    fn commit_keeps_writes() {
        let mut store = MemoryStore::new();
        let result: Result<(), StoreError> = with_transaction(&mut store, |s| {
            s.insert(customer("C1"))?;
            Ok(())
        });
        assert!(result.is_ok());
        assert_eq!(count(&store), 1);
    }

    #[test]
    fn error_rolls_back() {
        let mut store = MemoryStore::new();
        let result: Result<(), StoreError> = with_transaction(&mut store, |s| {
            s.insert(customer("C1"))?;
            Err(StoreError::NoTransaction)
        });
        assert!(result.is_err());
        assert_eq!(count(&store), 0);
        assert_eq!(store.depth(), 0);
    }

    #[test]
    fn dropped_guard_rolls_back() {
        let mut store = MemoryStore::new();
        {
            let mut tx = Transaction::begin(&mut store).unwrap();
            tx.insert(customer("C1")).unwrap();
        }
        assert_eq!(count(&store), 0);
    }

    #[test]
    fn nested_scope_rollback_keeps_outer_writes() {
        let mut store = MemoryStore::new();
        let mut outer = Transaction::begin(&mut store).unwrap();
        outer.insert(customer("C1")).unwrap();
        let _: Result<(), StoreError> = with_transaction(&mut *outer, |s| {
            s.insert(customer("C2"))?;
            Err(StoreError::NoTransaction)
        });
        outer.commit().unwrap();

        let rows = store
            .select::<Customer>(&Predicate::eq(CustomerField::Code, "C1"))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(count(&store), 1);
    }
}
