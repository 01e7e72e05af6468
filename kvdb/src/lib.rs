//! `kvdb` is a small embedded key/value engine: keys and values are
//! arbitrary byte strings written to an append-only log file, with an
//! in-memory index (the keydir) mapping live keys to file positions.
//! All live keys must fit in memory. Deletes write a tombstone to the log;
//! `compact()` rewrites the log to drop replaced values and tombstones.
//!
//! [`txn`] layers a single-writer transaction on top of an [`storage::engine::Engine`],
//! giving callers begin/commit/abort semantics and an update counter, in
//! the spirit of the embedded B-tree environments (BerkeleyDB, LMDB) that
//! higher-level record stores are usually built on.
//!
//! ## Getting started
//!
//! ```rust
//! use kvdb::error::CResult;
//! use kvdb::storage::memory::Memory;
//! use kvdb::txn::Db;
//!
//! fn run() -> CResult<()> {
//!     let db = Db::new(Memory::new());
//!     let mut txn = db.begin();
//!     txn.write(b"a", vec![1], true)?;
//!     txn.commit()?;
//!     assert_eq!(db.get(b"a")?, Some(vec![1]));
//!     Ok(())
//! }
//! # run().unwrap();
//! ```

pub mod error;
pub mod storage;
pub mod txn;
