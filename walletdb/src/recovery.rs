//! Salvage pass: replays whatever raw records a possibly-corrupted file
//! still yields through the loader's per-record handling, optionally
//! filtered, without requiring a clean full scan to succeed first.

use crate::error::Result;
use crate::record::{Key, RecordClass};

/// The KV engine's own environment/file verification and raw salvage
/// entrypoints. Out of scope per the core purpose; implemented by the
/// embedding application against its actual storage engine.
pub trait EngineVerifier {
    fn verify_environment(&self, path: &str) -> Result<bool>;
    fn verify_database_file(&self, path: &str) -> Result<bool>;
    /// Yields every (key, value) pair extractable from a possibly
    /// corrupted file, bypassing the usual cursor.
    fn salvage(&self, path: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
}

/// A predicate over raw (key, value) pairs used to filter a salvage pass.
pub trait RecordFilter {
    fn accept(&mut self, key: &[u8], value: &[u8]) -> bool;
}

impl<F: FnMut(&[u8], &[u8]) -> bool> RecordFilter for F {
    fn accept(&mut self, key: &[u8], value: &[u8]) -> bool {
        self(key, value)
    }
}

/// Accepts only records whose tag is key-bearing or `hdchain`, decided
/// purely from the tag classification, with no access to a wallet sink.
pub struct KeysOnlyFilter;

impl RecordFilter for KeysOnlyFilter {
    fn accept(&mut self, key: &[u8], _value: &[u8]) -> bool {
        match Key::decode(key) {
            Ok(decoded) => matches!(decoded.class(), RecordClass::KeyBearing) || matches!(decoded, Key::HdChain),
            Err(_) => false,
        }
    }
}

/// Salvages all records from `path` via the engine's raw salvage routine,
/// optionally restricting the result with `filter`. Records the filter
/// rejects are logged and skipped, never treated as fatal.
pub fn recover(
    engine: &dyn EngineVerifier,
    path: &str,
    filter: Option<&mut dyn RecordFilter>,
) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
    let salvaged = engine.salvage(path)?;
    let Some(filter) = filter else {
        return Ok(salvaged);
    };
    let mut accepted = Vec::new();
    for (key, value) in salvaged {
        if filter.accept(&key, &value) {
            accepted.push((key, value));
        } else {
            log::warn!("recovery: dropped record rejected by filter");
        }
    }
    Ok(accepted)
}
