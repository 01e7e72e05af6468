//! Selective scan and bulk erase of `tx` records, bypassing the full
//! loader so recovery tools can manipulate transactions without running
//! the validation pipeline.

use kvdb::storage::engine::Engine;
use kvdb::txn::Db;

use crate::error::Result;
use crate::record::{Key, TxRecord};

/// Cursor walk collecting every `tx` record without dispatching it to the
/// wallet. Returns `(hash, record)` pairs in on-disk key order.
pub fn find_wallet_tx<E: Engine>(db: &Db<E>) -> Result<Vec<([u8; 32], TxRecord)>> {
    let mut found = Vec::new();
    for (key_bytes, value_bytes) in db.scan_all()? {
        if let Ok(Key::Tx { hash }) = Key::decode(&key_bytes) {
            if let Ok(record) = TxRecord::decode(&value_bytes) {
                found.push((hash, record));
            }
        }
    }
    Ok(found)
}

/// Erases every wallet `tx` record whose hash appears in `hashes`. Returns
/// the hashes that were actually found and erased (a subset of `hashes`).
pub fn zap_select_tx<E: Engine>(db: &Db<E>, hashes: &[[u8; 32]]) -> Result<Vec<[u8; 32]>> {
    let mut wanted: Vec<[u8; 32]> = hashes.to_vec();
    wanted.sort_unstable();

    let mut present: Vec<[u8; 32]> = find_wallet_tx(db)?.into_iter().map(|(h, _)| h).collect();
    present.sort_unstable();

    let mut erased = Vec::new();
    let mut txn = db.begin();
    // Two-pointer merge over both sorted lists.
    let (mut i, mut j) = (0usize, 0usize);
    while i < wanted.len() && j < present.len() {
        match wanted[i].cmp(&present[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                txn.erase(&Key::Tx { hash: present[j] }.encode())?;
                erased.push(present[j]);
                i += 1;
                j += 1;
            }
        }
    }
    txn.commit()?;
    Ok(erased)
}

/// Erases every `tx` record unconditionally, returning the records that
/// were erased.
pub fn zap_wallet_tx<E: Engine>(db: &Db<E>) -> Result<Vec<([u8; 32], TxRecord)>> {
    let all = find_wallet_tx(db)?;
    let mut txn = db.begin();
    for (hash, _) in &all {
        txn.erase(&Key::Tx { hash: *hash }.encode())?;
    }
    txn.commit()?;
    Ok(all)
}
