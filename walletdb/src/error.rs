//! Error types for the wallet persistence core.
//!
//! `Error` covers things that abort an operation outright (I/O failure,
//! corrupt bytes, a caller misusing the batch facade). Loader outcomes are
//! deliberately not modeled as `Err` variants — a scan that finds a stray
//! unknown tag or a too-new wallet still *completes*, it just reports a
//! degraded [`crate::loader::LoadResult`].

use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("key/value store error: {0}")]
    Store(#[from] kvdb::error::Error),

    #[error("unknown record tag: {0}")]
    UnknownTag(String),

    #[error("batch misuse: {0}")]
    Misuse(String),

    #[error("wallet is locked")]
    Locked,

    #[error("backup failed: {0}")]
    Backup(String),
}

pub type Result<T> = std::result::Result<T, Error>;
