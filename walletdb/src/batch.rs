//! Typed write/erase/read operations layered over a `kvdb` transaction.
//! Every mutation funnels through [`Batch::write_ic`]/[`Batch::erase_ic`],
//! which is where the update counter actually advances (inside `kvdb`
//! itself, not reimplemented here).

use kvdb::storage::engine::Engine;
use kvdb::txn::{Db, Txn};

use crate::error::{Error, Result};
use crate::record::{
    HdChain, Key, KeyMetadata, KeyPoolEntry, KeyValue, Locator, MasterKeyRecord, TxRecord, WKeyValue,
};

/// Holds at most one active transaction against a database. Nested
/// `txn_begin` calls fail rather than silently nesting.
pub struct Batch<E: Engine> {
    db: Db<E>,
    txn: Option<Txn<E>>,
}

impl<E: Engine> Batch<E> {
    pub fn new(db: Db<E>) -> Self {
        Batch { db, txn: None }
    }

    pub fn txn_begin(&mut self) -> Result<()> {
        if self.txn.is_some() {
            return Err(Error::Misuse("a transaction is already active on this batch".into()));
        }
        self.txn = Some(self.db.begin());
        Ok(())
    }

    pub fn txn_commit(&mut self) -> Result<()> {
        let txn = self.txn.take().ok_or_else(|| Error::Misuse("no active transaction".into()))?;
        txn.commit().map_err(Error::Store)
    }

    pub fn txn_abort(&mut self) -> Result<()> {
        let txn = self.txn.take().ok_or_else(|| Error::Misuse("no active transaction".into()))?;
        txn.abort().map_err(Error::Store)
    }

    fn with_txn<T>(&mut self, f: impl FnOnce(&mut Txn<E>) -> kvdb::error::CResult<T>) -> Result<T> {
        match &mut self.txn {
            Some(txn) => f(txn).map_err(Error::Store),
            None => {
                let mut txn = self.db.begin();
                let result = f(&mut txn).map_err(Error::Store)?;
                txn.commit()?;
                Ok(result)
            }
        }
    }

    /// The single write primitive every `Write*` operation funnels through.
    pub fn write_ic(&mut self, key: &Key, value: Vec<u8>, overwrite: bool) -> Result<()> {
        let encoded_key = key.encode();
        self.with_txn(|txn| txn.write(&encoded_key, value, overwrite))
    }

    /// The single erase primitive every `Erase*` operation funnels through.
    pub fn erase_ic(&mut self, key: &Key) -> Result<()> {
        let encoded_key = key.encode();
        self.with_txn(|txn| txn.erase(&encoded_key))
    }

    fn read_raw(&self, key: &Key) -> Result<Option<Vec<u8>>> {
        self.db.get(&key.encode()).map_err(Error::Store)
    }

    // ---- name / purpose ----

    pub fn write_name(&mut self, address: &str, label: &str) -> Result<()> {
        let mut w = crate::codec::Writer::new();
        w.write_var_string(label);
        self.write_ic(&Key::Name { address: address.to_string() }, w.into_bytes(), true)
    }

    pub fn erase_name(&mut self, address: &str) -> Result<()> {
        self.erase_ic(&Key::Name { address: address.to_string() })
    }

    pub fn write_purpose(&mut self, address: &str, purpose: &str) -> Result<()> {
        let mut w = crate::codec::Writer::new();
        w.write_var_string(purpose);
        self.write_ic(&Key::Purpose { address: address.to_string() }, w.into_bytes(), true)
    }

    pub fn erase_purpose(&mut self, address: &str) -> Result<()> {
        self.erase_ic(&Key::Purpose { address: address.to_string() })
    }

    // ---- tx ----

    pub fn write_tx(&mut self, hash: [u8; 32], record: &TxRecord) -> Result<()> {
        self.write_ic(&Key::Tx { hash }, record.encode(), true)
    }

    pub fn erase_tx(&mut self, hash: [u8; 32]) -> Result<()> {
        self.erase_ic(&Key::Tx { hash })
    }

    pub fn read_tx(&self, hash: [u8; 32]) -> Result<Option<TxRecord>> {
        self.read_raw(&Key::Tx { hash })?.map(|b| TxRecord::decode(&b)).transpose()
    }

    // ---- key / keymeta (compound, transactional per Design Note) ----

    /// Writes `keymeta` then `key` inside a single KV transaction, both
    /// non-overwriting. A crash or error between the two leaves neither
    /// visible, never a `keymeta` orphaned without its key.
    pub fn write_key(&mut self, pubkey: &[u8], privkey: &[u8], meta: &KeyMetadata, integrity_hash: [u8; 32]) -> Result<()> {
        self.txn_begin()?;
        let result = (|| -> Result<()> {
            self.write_ic(&Key::KeyMeta { pubkey: pubkey.to_vec() }, meta.encode(), false)?;
            let value = KeyValue { privkey: privkey.to_vec(), integrity_hash: Some(integrity_hash) };
            self.write_ic(&Key::Key { pubkey: pubkey.to_vec() }, value.encode(), false)?;
            Ok(())
        })();
        match result {
            Ok(()) => self.txn_commit(),
            Err(e) => {
                self.txn_abort()?;
                Err(e)
            }
        }
    }

    pub fn write_wkey(&mut self, pubkey: &[u8], wkey: &WKeyValue) -> Result<()> {
        self.write_ic(&Key::WKey { pubkey: pubkey.to_vec() }, wkey.encode(), true)
    }

    pub fn write_key_metadata(&mut self, pubkey: &[u8], meta: &KeyMetadata) -> Result<()> {
        self.write_ic(&Key::KeyMeta { pubkey: pubkey.to_vec() }, meta.encode(), true)
    }

    pub fn write_watch_metadata(&mut self, script: &[u8], meta: &KeyMetadata) -> Result<()> {
        self.write_ic(&Key::WatchMeta { script: script.to_vec() }, meta.encode(), true)
    }

    /// Writes `keymeta` (overwrite), `ckey` (no-overwrite), and erases any
    /// prior `key`/`wkey` for the same public key, all in one transaction.
    /// Per invariant 2, a public key has at most one of {`key`, `wkey`,
    /// `ckey`} at a time.
    pub fn write_crypted_key(&mut self, pubkey: &[u8], encrypted_privkey: &[u8], meta: &KeyMetadata) -> Result<()> {
        self.txn_begin()?;
        let result = (|| -> Result<()> {
            self.write_ic(&Key::KeyMeta { pubkey: pubkey.to_vec() }, meta.encode(), true)?;
            self.write_ic(&Key::CKey { pubkey: pubkey.to_vec() }, encrypted_privkey.to_vec(), false)?;
            self.erase_ic(&Key::Key { pubkey: pubkey.to_vec() })?;
            self.erase_ic(&Key::WKey { pubkey: pubkey.to_vec() })?;
            Ok(())
        })();
        match result {
            Ok(()) => self.txn_commit(),
            Err(e) => {
                self.txn_abort()?;
                Err(e)
            }
        }
    }

    // ---- mkey ----

    pub fn write_master_key(&mut self, id: u32, record: &MasterKeyRecord) -> Result<()> {
        self.write_ic(&Key::MKey { id }, record.encode(), false)
    }

    // ---- watch-only ----

    pub fn write_watch_only(&mut self, script: &[u8]) -> Result<()> {
        self.write_ic(&Key::WatchS { script: script.to_vec() }, vec![b'1'], true)
    }

    pub fn erase_watch_only(&mut self, script: &[u8]) -> Result<()> {
        self.txn_begin()?;
        let result = (|| -> Result<()> {
            self.erase_ic(&Key::WatchS { script: script.to_vec() })?;
            self.erase_ic(&Key::WatchMeta { script: script.to_vec() })?;
            Ok(())
        })();
        match result {
            Ok(()) => self.txn_commit(),
            Err(e) => {
                self.txn_abort()?;
                Err(e)
            }
        }
    }

    // ---- cscript ----

    pub fn write_cscript(&mut self, script_hash: [u8; 20], redeem_script: &[u8]) -> Result<()> {
        self.write_ic(&Key::CScript { script_hash }, redeem_script.to_vec(), true)
    }

    // ---- keypool ----

    pub fn write_pool(&mut self, index: u64, entry: &KeyPoolEntry) -> Result<()> {
        self.write_ic(&Key::Pool { index }, entry.encode(), true)
    }

    pub fn erase_pool(&mut self, index: u64) -> Result<()> {
        self.erase_ic(&Key::Pool { index })
    }

    // ---- bookkeeping ----

    pub fn write_order_pos_next(&mut self, value: i64) -> Result<()> {
        let mut w = crate::codec::Writer::new();
        w.write_i64_le(value);
        self.write_ic(&Key::OrderPosNext, w.into_bytes(), true)
    }

    /// Always writes an empty locator, per invariant 7; the authoritative
    /// locator is kept under `bestblock_nomerkle`.
    pub fn write_best_block(&mut self) -> Result<()> {
        self.write_ic(&Key::BestBlock, Locator::default().encode(), true)
    }

    pub fn write_best_block_no_merkle(&mut self, locator: &Locator) -> Result<()> {
        self.write_ic(&Key::BestBlockNoMerkle, locator.encode(), true)
    }

    pub fn write_min_version(&mut self, version: u32) -> Result<()> {
        let mut w = crate::codec::Writer::new();
        w.write_u32_le(version);
        self.write_ic(&Key::MinVersion, w.into_bytes(), true)
    }

    pub fn write_version(&mut self, version: u32) -> Result<()> {
        let mut w = crate::codec::Writer::new();
        w.write_u32_le(version);
        self.write_ic(&Key::Version, w.into_bytes(), true)
    }

    pub fn write_default_key(&mut self, pubkey: &[u8]) -> Result<()> {
        self.write_ic(&Key::DefaultKey, pubkey.to_vec(), true)
    }

    pub fn write_dest_data(&mut self, address: &str, key: &str, value: &str) -> Result<()> {
        let mut w = crate::codec::Writer::new();
        w.write_var_string(value);
        self.write_ic(&Key::DestData { address: address.to_string(), key: key.to_string() }, w.into_bytes(), true)
    }

    pub fn erase_dest_data(&mut self, address: &str, key: &str) -> Result<()> {
        self.erase_ic(&Key::DestData { address: address.to_string(), key: key.to_string() })
    }

    pub fn write_hd_chain(&mut self, chain: &HdChain) -> Result<()> {
        self.write_ic(&Key::HdChain, chain.encode(), true)
    }

    pub fn write_flags(&mut self, flags: u64) -> Result<()> {
        let mut w = crate::codec::Writer::new();
        w.write_u64_le(flags);
        self.write_ic(&Key::Flags, w.into_bytes(), true)
    }
}
