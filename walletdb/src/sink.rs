//! The narrow capability surfaces the loader is generic over, standing in
//! for the in-memory wallet object and the cryptographic/consensus
//! primitives that are out-of-scope external collaborators. The loader
//! never constructs a wallet or holds one beyond a single call; it takes a
//! `&mut dyn WalletSink` borrowed for the duration of the load.

use crate::record::{HdChain, KeyMetadata, KeyPoolEntry};

/// Callback surface the loader dispatches decoded records into. Each method
/// corresponds to one of the legacy `Load*` entry points; a caller's wallet
/// type implements this trait once and the loader never needs to know
/// anything else about it.
pub trait WalletSink {
    fn load_key(&mut self, pubkey: &[u8], privkey: &[u8]);
    fn load_crypted_key(&mut self, pubkey: &[u8], encrypted_privkey: &[u8]);
    fn load_key_metadata(&mut self, pubkey: &[u8], meta: &KeyMetadata);
    fn load_script_metadata(&mut self, script: &[u8], meta: &KeyMetadata);
    fn load_cscript(&mut self, script_hash: &[u8; 20], redeem_script: &[u8]);
    fn load_watch_only(&mut self, script: &[u8]);
    fn load_key_pool(&mut self, index: u64, entry: &KeyPoolEntry);
    fn load_to_wallet(&mut self, hash: &[u8; 32], raw_tx: &[u8], order_pos: i64, from_me: bool, spent: bool);
    fn load_dest_data(&mut self, address: &str, key: &str, value: &str);
    fn set_hd_chain(&mut self, chain: &HdChain);
    fn set_wallet_flags(&mut self, flags: u64);

    /// `name`/`purpose` records; not part of the legacy `Load*` set by name
    /// but required to reconstruct the address book.
    fn load_address_book_entry(&mut self, address: &str, label: Option<&str>, purpose: Option<&str>);

    fn load_min_version(&mut self, version: u32);
    fn set_master_key(&mut self, id: u32, record: &crate::record::MasterKeyRecord);
    fn set_default_key(&mut self, pubkey: &[u8]);
    fn set_best_block(&mut self, locator: &crate::record::Locator);

    /// Invoked once per load if any `tx` record carried the unordered
    /// sentinel; the wallet assigns fresh order positions.
    fn reorder_transactions(&mut self);

    /// Invoked when `nKeys + nCKeys + nWatchKeys != nKeyMeta`, marking the
    /// wallet's first-key timestamp unreliable.
    fn update_time_first_key(&mut self, unreliable: bool);
}

/// Verifies an embedded transaction, returning the hash it believes its own
/// identity is, so the loader can check it against the record's key hash.
/// Out of scope per the core purpose; callers plug in their own consensus
/// engine or a fake in tests.
pub trait TxVerifier {
    fn verify_and_hash(&self, raw_tx: &[u8]) -> Option<[u8; 32]>;
}

/// Derives a public key from a private key and hashes pubkey∥privkey for the
/// `key` record's integrity tag. Out of scope per the core purpose.
pub trait KeyVerifier {
    fn derive_pubkey(&self, privkey: &[u8]) -> Option<Vec<u8>>;
    fn integrity_hash(&self, pubkey: &[u8], privkey: &[u8]) -> [u8; 32];
}
