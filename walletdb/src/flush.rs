//! Periodic checkpoint scheduler. A single re-entrancy guard ensures at
//! most one flush pass runs at any instant; the core never spawns a
//! thread to drive it, a caller invokes [`DbRegistry::run_once`] on a
//! schedule of its own choosing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use kvdb::storage::engine::Engine;
use kvdb::txn::Db;

use crate::error::Result;

/// How long a database must go without an update before it is considered
/// quiet enough to flush.
const QUIET_PERIOD: Duration = Duration::from_secs(2);

struct Tracked<E: Engine> {
    db: Db<E>,
    last_seen_counter: u64,
    last_update_time: Instant,
    last_flushed_counter: u64,
}

/// Owns the set of open databases the flush scheduler checkpoints, plus
/// the process-scoped re-entrancy flag. Modeled as a named capability
/// rather than free-standing global state.
pub struct DbRegistry<E: Engine> {
    databases: Mutex<HashMap<String, Tracked<E>>>,
    running: AtomicBool,
}

impl<E: Engine> Default for DbRegistry<E> {
    fn default() -> Self {
        DbRegistry { databases: Mutex::new(HashMap::new()), running: AtomicBool::new(false) }
    }
}

impl<E: Engine> DbRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, db: Db<E>) {
        let counter = db.update_counter();
        self.databases.lock().expect("registry mutex poisoned").insert(
            name.into(),
            Tracked { db, last_seen_counter: counter, last_update_time: Instant::now(), last_flushed_counter: counter },
        );
    }

    pub fn unregister(&self, name: &str) {
        self.databases.lock().expect("registry mutex poisoned").remove(name);
    }

    /// Runs one scheduler pass over every registered database. If another
    /// call is already in progress, returns immediately without doing any
    /// work (the re-entrancy guard).
    pub fn run_once(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let result = self.run_once_inner();
        self.running.store(false, Ordering::SeqCst);
        result
    }

    fn run_once_inner(&self) -> Result<()> {
        let mut databases = self.databases.lock().expect("registry mutex poisoned");
        let now = Instant::now();
        for tracked in databases.values_mut() {
            let current = tracked.db.update_counter();
            if current != tracked.last_seen_counter {
                tracked.last_seen_counter = current;
                tracked.last_update_time = now;
            }
            let quiet_long_enough = now.duration_since(tracked.last_update_time) >= QUIET_PERIOD;
            if current != tracked.last_flushed_counter && quiet_long_enough {
                tracked.db.flush()?;
                tracked.last_flushed_counter = current;
            }
        }
        Ok(())
    }

    #[cfg(test)]
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
