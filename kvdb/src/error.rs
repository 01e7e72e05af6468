use thiserror::Error;

/// Errors surfaced by the storage engine.
///
/// `Corrupt` is distinguished from `Io` because callers up the stack (the
/// wallet loader in particular) classify corruption differently from a bare
/// I/O failure.
#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt data: {0}")]
    Corrupt(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("already locked: {0}")]
    Lock(String),
}

pub type CResult<T> = std::result::Result<T, Error>;
