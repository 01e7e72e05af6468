//! A thin transactional wrapper around an [`Engine`], in the spirit of the
//! embedded B-tree environments (BerkeleyDB, LMDB) that wallet-style
//! key/value stores are usually built on: a handle to a shared engine, a
//! single active read-write transaction per handle, and serialization of
//! concurrent handles via a mutex rather than true MVCC snapshotting.
//!
//! Unlike `crate::mvcc` style snapshot isolation, this keeps a single undo
//! log per transaction (mirroring `Key::TxnWrite` in larger MVCC engines)
//! and applies writes to the engine immediately; an aborted transaction
//! replays the undo log to restore the prior state.

use std::sync::{Arc, Mutex};

use crate::error::CResult;
use crate::storage::engine::Engine;
use crate::storage::Status;

/// Handle shared by every open `Db` wrapping the same engine. Holds the
/// engine itself plus the update counter that a periodic flusher can poll.
pub struct Shared<E: Engine> {
    engine: Mutex<E>,
    update_counter: std::sync::atomic::AtomicU64,
}

/// A handle to a transactional key/value database.
///
/// Cloning a `Db` is cheap and shares the same underlying engine; the
/// engine itself serializes concurrent access from cloned handles.
pub struct Db<E: Engine> {
    shared: Arc<Shared<E>>,
}

impl<E: Engine> Clone for Db<E> {
    fn clone(&self) -> Self {
        Db { shared: self.shared.clone() }
    }
}

impl<E: Engine> Db<E> {
    pub fn new(engine: E) -> Self {
        Db {
            shared: Arc::new(Shared {
                engine: Mutex::new(engine),
                update_counter: std::sync::atomic::AtomicU64::new(0),
            }),
        }
    }

    /// The current update counter value, incremented on every successful
    /// mutating operation across every handle and transaction. Used by the
    /// flush scheduler as a liveness hint; never locks the engine.
    pub fn update_counter(&self) -> u64 {
        self.shared.update_counter.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Reads a value directly against committed engine state, bypassing any
    /// transaction. Used for auto-commit reads outside a batch transaction.
    pub fn get(&self, key: &[u8]) -> CResult<Option<Vec<u8>>> {
        self.shared.engine.lock().expect("engine mutex poisoned").get(key)
    }

    pub fn status(&self) -> CResult<Status> {
        self.shared.engine.lock().expect("engine mutex poisoned").status()
    }

    pub fn flush(&self) -> CResult<()> {
        self.shared.engine.lock().expect("engine mutex poisoned").flush()
    }

    /// Snapshot of every (key, value) pair currently stored, taken under a
    /// single lock acquisition. Used by the loader's cursor pass and by
    /// the recovery hook, both of which need a point-in-time view they can
    /// iterate without holding the engine lock for the whole scan.
    pub fn scan_all(&self) -> CResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut engine = self.shared.engine.lock().expect("engine mutex poisoned");
        engine.scan(..).collect()
    }

    /// Like [`Db::scan_all`], restricted to keys with the given prefix.
    pub fn scan_prefix(&self, prefix: &[u8]) -> CResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut engine = self.shared.engine.lock().expect("engine mutex poisoned");
        engine.scan_prefix(prefix).collect()
    }

    /// Begins a new write transaction against this database. A handle may
    /// have at most one active transaction open; use [`Db::clone`] if a
    /// second concurrent writer is genuinely needed.
    pub fn begin(&self) -> Txn<E> {
        Txn { db: self.clone(), undo: Vec::new() }
    }

    fn write_ic(&self, key: &[u8], value: Vec<u8>, overwrite: bool) -> CResult<Option<Vec<u8>>> {
        let mut engine = self.shared.engine.lock().expect("engine mutex poisoned");
        let prior = engine.get(key)?;
        if !overwrite && prior.is_some() {
            return Err(crate::error::Error::Internal(format!(
                "key already exists and overwrite=false: {key:?}"
            )));
        }
        engine.set(key, value)?;
        self.shared.update_counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(prior)
    }

    fn erase_ic(&self, key: &[u8]) -> CResult<Option<Vec<u8>>> {
        let mut engine = self.shared.engine.lock().expect("engine mutex poisoned");
        let prior = engine.get(key)?;
        engine.delete(key)?;
        self.shared.update_counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(prior)
    }
}

enum Undo {
    /// Key did not exist before the write; remove it on abort.
    Insert(Vec<u8>),
    /// Key held this value before the write/erase; restore it on abort.
    Restore(Vec<u8>, Vec<u8>),
}

/// A single open transaction against a [`Db`]. Every write and erase is
/// applied to the engine immediately (so reads within the same transaction
/// see its own writes) but recorded in an undo log; `abort()` replays the
/// undo log in reverse to restore the pre-transaction state. `commit()`
/// simply discards it.
pub struct Txn<E: Engine> {
    db: Db<E>,
    undo: Vec<Undo>,
}

impl<E: Engine> Txn<E> {
    pub fn get(&self, key: &[u8]) -> CResult<Option<Vec<u8>>> {
        self.db.get(key)
    }

    /// Writes `key`/`value`. If `overwrite` is false, fails when `key`
    /// already exists rather than replacing it.
    pub fn write(&mut self, key: &[u8], value: Vec<u8>, overwrite: bool) -> CResult<()> {
        let prior = self.db.write_ic(key, value, overwrite)?;
        self.undo.push(match prior {
            Some(old) => Undo::Restore(key.to_vec(), old),
            None => Undo::Insert(key.to_vec()),
        });
        Ok(())
    }

    pub fn erase(&mut self, key: &[u8]) -> CResult<()> {
        if let Some(old) = self.db.erase_ic(key)? {
            self.undo.push(Undo::Restore(key.to_vec(), old));
        }
        Ok(())
    }

    /// Commits the transaction. Writes are already visible (they were
    /// applied as they happened); this only discards the undo log.
    pub fn commit(self) -> CResult<()> {
        Ok(())
    }

    /// Aborts the transaction, restoring the engine to its pre-transaction
    /// state by replaying the undo log in reverse order.
    pub fn abort(self) -> CResult<()> {
        let mut engine = self.db.shared.engine.lock().expect("engine mutex poisoned");
        for entry in self.undo.into_iter().rev() {
            match entry {
                Undo::Insert(key) => engine.delete(&key)?,
                Undo::Restore(key, value) => engine.set(&key, value)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::Memory;

    #[test]
    fn commit_is_durable() -> CResult<()> {
        let db = Db::new(Memory::new());
        let mut txn = db.begin();
        txn.write(b"a", vec![1], true)?;
        txn.commit()?;
        assert_eq!(db.get(b"a")?, Some(vec![1]));
        Ok(())
    }

    #[test]
    fn abort_restores_prior_state() -> CResult<()> {
        let db = Db::new(Memory::new());
        {
            let mut txn = db.begin();
            txn.write(b"a", vec![1], true)?;
            txn.commit()?;
        }
        let before = db.scan_all()?;

        let mut txn = db.begin();
        txn.write(b"a", vec![2], true)?;
        txn.write(b"b", vec![9], true)?;
        txn.erase(b"a")?;
        txn.abort()?;

        assert_eq!(db.scan_all()?, before);
        Ok(())
    }

    #[test]
    fn update_counter_advances_on_write_and_erase() -> CResult<()> {
        let db = Db::new(Memory::new());
        let before = db.update_counter();
        let mut txn = db.begin();
        txn.write(b"a", vec![1], true)?;
        txn.commit()?;
        assert!(db.update_counter() > before);

        let mid = db.update_counter();
        let mut txn = db.begin();
        txn.erase(b"a")?;
        txn.commit()?;
        assert!(db.update_counter() > mid);
        Ok(())
    }

    #[test]
    fn write_no_overwrite_rejects_existing_key() -> CResult<()> {
        let db = Db::new(Memory::new());
        let mut txn = db.begin();
        txn.write(b"a", vec![1], false)?;
        assert!(txn.write(b"a", vec![2], false).is_err());
        txn.commit()?;
        Ok(())
    }
}
