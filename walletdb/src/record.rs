//! The record taxonomy: every on-disk (key, value) shape the wallet file
//! can hold, modeled as a closed sum type instead of the legacy `if`/`else
//! if` chain on a string tag. Encoding/decoding lives here next to the
//! shapes they serialize; the loader becomes a `match` over [`Key`].

use crate::codec::{Reader, Writer};
use crate::error::{Error, Result};

macro_rules! tags {
    ($($konst:ident => $tag:literal),+ $(,)?) => {
        $(pub const $konst: &str = $tag;)+
    };
}

tags! {
    TAG_NAME => "name",
    TAG_PURPOSE => "purpose",
    TAG_TX => "tx",
    TAG_KEY => "key",
    TAG_WKEY => "wkey",
    TAG_CKEY => "ckey",
    TAG_MKEY => "mkey",
    TAG_KEYMETA => "keymeta",
    TAG_WATCHMETA => "watchmeta",
    TAG_WATCHS => "watchs",
    TAG_CSCRIPT => "cscript",
    TAG_POOL => "pool",
    TAG_ORDERPOSNEXT => "orderposnext",
    TAG_BESTBLOCK => "bestblock",
    TAG_BESTBLOCK_NOMERKLE => "bestblock_nomerkle",
    TAG_MINVERSION => "minversion",
    TAG_VERSION => "version",
    TAG_DEFAULTKEY => "defaultkey",
    TAG_DESTDATA => "destdata",
    TAG_HDCHAIN => "hdchain",
    TAG_FLAGS => "flags",
    TAG_ACENTRY => "acentry",
    TAG_ZCSERIAL => "zcserial",
    TAG_ZEROCOIN => "zerocoin",
    TAG_UNLOADEDZEROCOIN => "unloadedzerocoin",
    TAG_ZCACCUMULATOR => "zcaccumulator",
    TAG_CALCULATEDZCBLOCK => "calculatedzcblock",
}

/// Error-classification bucket a record's tag falls into, per the loader's
/// classification table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordClass {
    /// Loss is catastrophic: `key`, `wkey`, `mkey`, `ckey`, `defaultkey`.
    KeyBearing,
    /// `flags`: unknown required bits refuse the whole load.
    Flags,
    /// `tx`: failures are non-critical and trigger a rescan flag.
    Tx,
    /// Any other tag in the fixed taxonomy.
    OtherKnown,
    /// Not in the fixed taxonomy at all; counted, never rejected.
    Unknown,
}

impl RecordClass {
    pub fn of_tag(tag: &str) -> Self {
        match tag {
            TAG_KEY | TAG_WKEY | TAG_MKEY | TAG_CKEY | TAG_DEFAULTKEY => RecordClass::KeyBearing,
            TAG_FLAGS => RecordClass::Flags,
            TAG_TX => RecordClass::Tx,
            TAG_NAME | TAG_PURPOSE | TAG_KEYMETA | TAG_WATCHMETA | TAG_WATCHS | TAG_CSCRIPT
            | TAG_POOL | TAG_ORDERPOSNEXT | TAG_BESTBLOCK | TAG_BESTBLOCK_NOMERKLE
            | TAG_MINVERSION | TAG_VERSION | TAG_DESTDATA | TAG_HDCHAIN | TAG_ACENTRY
            | TAG_ZCSERIAL | TAG_ZEROCOIN | TAG_UNLOADEDZEROCOIN | TAG_ZCACCUMULATOR
            | TAG_CALCULATEDZCBLOCK => RecordClass::OtherKnown,
            _ => RecordClass::Unknown,
        }
    }
}

/// The discriminator tuple: tag plus record-specific sub-key, in the order
/// fields are concatenated on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Key {
    Name { address: String },
    Purpose { address: String },
    Tx { hash: [u8; 32] },
    Key { pubkey: Vec<u8> },
    WKey { pubkey: Vec<u8> },
    CKey { pubkey: Vec<u8> },
    MKey { id: u32 },
    KeyMeta { pubkey: Vec<u8> },
    WatchMeta { script: Vec<u8> },
    WatchS { script: Vec<u8> },
    CScript { script_hash: [u8; 20] },
    Pool { index: u64 },
    OrderPosNext,
    BestBlock,
    BestBlockNoMerkle,
    MinVersion,
    Version,
    DefaultKey,
    DestData { address: String, key: String },
    HdChain,
    Flags,
    AcEntry { account: String, entry: u64 },
    ZcSerial { serial: Vec<u8> },
    Zerocoin { value: Vec<u8> },
    UnloadedZerocoin { value: Vec<u8> },
    ZcAccumulator { denom: u32, pubcoin_id: Vec<u8> },
    CalculatedZcBlock,
    /// Any tag outside the fixed taxonomy. `raw` holds the sub-key bytes
    /// undecoded, since an unknown tag's sub-key shape is unknowable.
    Unknown { tag: String, raw: Vec<u8> },
}

impl Key {
    pub fn tag(&self) -> &str {
        match self {
            Key::Name { .. } => TAG_NAME,
            Key::Purpose { .. } => TAG_PURPOSE,
            Key::Tx { .. } => TAG_TX,
            Key::Key { .. } => TAG_KEY,
            Key::WKey { .. } => TAG_WKEY,
            Key::CKey { .. } => TAG_CKEY,
            Key::MKey { .. } => TAG_MKEY,
            Key::KeyMeta { .. } => TAG_KEYMETA,
            Key::WatchMeta { .. } => TAG_WATCHMETA,
            Key::WatchS { .. } => TAG_WATCHS,
            Key::CScript { .. } => TAG_CSCRIPT,
            Key::Pool { .. } => TAG_POOL,
            Key::OrderPosNext => TAG_ORDERPOSNEXT,
            Key::BestBlock => TAG_BESTBLOCK,
            Key::BestBlockNoMerkle => TAG_BESTBLOCK_NOMERKLE,
            Key::MinVersion => TAG_MINVERSION,
            Key::Version => TAG_VERSION,
            Key::DefaultKey => TAG_DEFAULTKEY,
            Key::DestData { .. } => TAG_DESTDATA,
            Key::HdChain => TAG_HDCHAIN,
            Key::Flags => TAG_FLAGS,
            Key::AcEntry { .. } => TAG_ACENTRY,
            Key::ZcSerial { .. } => TAG_ZCSERIAL,
            Key::Zerocoin { .. } => TAG_ZEROCOIN,
            Key::UnloadedZerocoin { .. } => TAG_UNLOADEDZEROCOIN,
            Key::ZcAccumulator { .. } => TAG_ZCACCUMULATOR,
            Key::CalculatedZcBlock => TAG_CALCULATEDZCBLOCK,
            Key::Unknown { tag, .. } => tag,
        }
    }

    pub fn class(&self) -> RecordClass {
        RecordClass::of_tag(self.tag())
    }

    /// Serializes the full on-disk key: tag followed by sub-key fields, with
    /// no wrapping header.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_var_string(self.tag());
        match self {
            Key::Name { address } | Key::Purpose { address } => {
                w.write_var_string(address);
            }
            Key::Tx { hash } => {
                w.write_fixed(hash);
            }
            Key::Key { pubkey } | Key::WKey { pubkey } | Key::CKey { pubkey } | Key::KeyMeta { pubkey } => {
                w.write_var_bytes(pubkey);
            }
            Key::MKey { id } => {
                w.write_u32_le(*id);
            }
            Key::WatchMeta { script } | Key::WatchS { script } => {
                w.write_var_bytes(script);
            }
            Key::CScript { script_hash } => {
                w.write_fixed(script_hash);
            }
            Key::Pool { index } => {
                w.write_u64_le(*index);
            }
            Key::DestData { address, key } => {
                w.write_var_string(address);
                w.write_var_string(key);
            }
            Key::AcEntry { account, entry } => {
                w.write_var_string(account);
                w.write_u64_le(*entry);
            }
            Key::ZcSerial { serial } => {
                w.write_var_bytes(serial);
            }
            Key::Zerocoin { value } | Key::UnloadedZerocoin { value } => {
                w.write_var_bytes(value);
            }
            Key::ZcAccumulator { denom, pubcoin_id } => {
                w.write_u32_le(*denom);
                w.write_var_bytes(pubcoin_id);
            }
            Key::Unknown { raw, .. } => {
                w.write_fixed(raw);
            }
            Key::OrderPosNext
            | Key::BestBlock
            | Key::BestBlockNoMerkle
            | Key::MinVersion
            | Key::Version
            | Key::DefaultKey
            | Key::HdChain
            | Key::Flags
            | Key::CalculatedZcBlock => {}
        }
        w.into_bytes()
    }

    /// Decodes a full on-disk key. Unknown tags are preserved verbatim
    /// rather than rejected, per invariant 1.
    pub fn decode(bytes: &[u8]) -> Result<Key> {
        let mut r = Reader::new(bytes);
        let tag = r.read_var_string().map_err(|_| Error::Corrupt("unreadable record tag".into()))?;
        let key = match tag.as_str() {
            TAG_NAME => Key::Name { address: r.read_var_string()? },
            TAG_PURPOSE => Key::Purpose { address: r.read_var_string()? },
            TAG_TX => Key::Tx { hash: r.read_fixed32()? },
            TAG_KEY => Key::Key { pubkey: r.read_var_bytes()? },
            TAG_WKEY => Key::WKey { pubkey: r.read_var_bytes()? },
            TAG_CKEY => Key::CKey { pubkey: r.read_var_bytes()? },
            TAG_MKEY => Key::MKey { id: r.read_u32_le()? },
            TAG_KEYMETA => Key::KeyMeta { pubkey: r.read_var_bytes()? },
            TAG_WATCHMETA => Key::WatchMeta { script: r.read_var_bytes()? },
            TAG_WATCHS => Key::WatchS { script: r.read_var_bytes()? },
            TAG_CSCRIPT => Key::CScript { script_hash: r.read_fixed20()? },
            TAG_POOL => Key::Pool { index: r.read_u64_le()? },
            TAG_ORDERPOSNEXT => Key::OrderPosNext,
            TAG_BESTBLOCK => Key::BestBlock,
            TAG_BESTBLOCK_NOMERKLE => Key::BestBlockNoMerkle,
            TAG_MINVERSION => Key::MinVersion,
            TAG_VERSION => Key::Version,
            TAG_DEFAULTKEY => Key::DefaultKey,
            TAG_DESTDATA => Key::DestData { address: r.read_var_string()?, key: r.read_var_string()? },
            TAG_HDCHAIN => Key::HdChain,
            TAG_FLAGS => Key::Flags,
            TAG_ACENTRY => Key::AcEntry { account: r.read_var_string()?, entry: r.read_u64_le()? },
            TAG_ZCSERIAL => Key::ZcSerial { serial: r.read_var_bytes()? },
            TAG_ZEROCOIN => Key::Zerocoin { value: r.read_var_bytes()? },
            TAG_UNLOADEDZEROCOIN => Key::UnloadedZerocoin { value: r.read_var_bytes()? },
            TAG_ZCACCUMULATOR => Key::ZcAccumulator { denom: r.read_u32_le()?, pubcoin_id: r.read_var_bytes()? },
            TAG_CALCULATEDZCBLOCK => Key::CalculatedZcBlock,
            other => Key::Unknown { tag: other.to_string(), raw: r.remaining_bytes().to_vec() },
        };
        Ok(key)
    }
}

/// 32-bit block-locator-free representation used by `bestblock`/
/// `bestblock_nomerkle`. The zero-knowledge-coin and consensus layers are
/// out-of-scope collaborators, so a locator is modeled as an opaque,
/// possibly empty, ordered list of block hash bytes.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Locator {
    pub hashes: Vec<[u8; 32]>,
}

impl Locator {
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_compact_size(self.hashes.len() as u64);
        for h in &self.hashes {
            w.write_fixed(h);
        }
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Locator> {
        let mut r = Reader::new(bytes);
        let n = r.read_compact_size()?;
        let mut hashes = Vec::with_capacity(n as usize);
        for _ in 0..n {
            hashes.push(r.read_fixed32()?);
        }
        Ok(Locator { hashes })
    }
}

/// Wallet's view of a transaction record (the `tx` value). The embedded
/// transaction itself is an opaque blob: verifying and interpreting it is
/// the consensus layer's job, supplied through [`crate::sink::TxVerifier`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxRecord {
    pub raw_tx: Vec<u8>,
    /// Sentinel `-1` means "unordered"; the loader's post-scan reordering
    /// routine is invoked whenever any record carries this sentinel.
    pub order_pos: i64,
    /// Drives the legacy timestamp-quirk repair when in `[31404, 31703]`.
    pub time_received_is_tx_time: u32,
    pub from_me: bool,
    pub spent: bool,
}

pub const UNORDERED: i64 = -1;

impl TxRecord {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_var_bytes(&self.raw_tx);
        w.write_i64_le(self.order_pos);
        w.write_u32_le(self.time_received_is_tx_time);
        w.write_bool(self.from_me);
        w.write_bool(self.spent);
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<TxRecord> {
        let mut r = Reader::new(bytes);
        Ok(TxRecord {
            raw_tx: r.read_var_bytes()?,
            order_pos: r.read_i64_le()?,
            time_received_is_tx_time: r.read_u32_le()?,
            from_me: r.read_bool()?,
            spent: r.read_bool()?,
        })
    }

    pub fn is_legacy_timestamp_band(&self) -> bool {
        (31404..=31703).contains(&self.time_received_is_tx_time)
    }

    /// Applies the legacy timestamp-quirk repair for writer versions in
    /// `[31404, 31703]`: those versions appended the real receive time as a
    /// trailing 3-byte little-endian triple on `raw_tx` instead of using
    /// `time_received_is_tx_time`. The repair reads that triple off the end
    /// of `raw_tx`, installs it as the corrected timestamp, and strips it.
    /// A no-op if `raw_tx` is shorter than 3 bytes.
    pub fn apply_legacy_timestamp_repair(&mut self) {
        if self.raw_tx.len() < 3 {
            return;
        }
        let split_at = self.raw_tx.len() - 3;
        let tail = &self.raw_tx[split_at..];
        let corrected = tail[0] as u32 | (tail[1] as u32) << 8 | (tail[2] as u32) << 16;
        self.time_received_is_tx_time = corrected;
        self.raw_tx.truncate(split_at);
    }
}

/// Plaintext private key with an optional trailing integrity hash (the
/// `key` record's value). Absent on very old wallets; see the
/// optional-trailing-field codec rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyValue {
    pub privkey: Vec<u8>,
    pub integrity_hash: Option<[u8; 32]>,
}

impl KeyValue {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_var_bytes(&self.privkey);
        if let Some(hash) = &self.integrity_hash {
            w.write_fixed(hash);
        }
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<KeyValue> {
        let mut r = Reader::new(bytes);
        let privkey = r.read_var_bytes()?;
        let integrity_hash = if r.at_end() { None } else { Some(r.read_fixed32()?) };
        Ok(KeyValue { privkey, integrity_hash })
    }
}

/// Legacy wrapper form of [`KeyValue`] (the `wkey` record). Carries the
/// same integrity-bearing private key plus bookkeeping timestamps that
/// were never carried forward into the `key` format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WKeyValue {
    pub privkey: Vec<u8>,
    pub created_at: i64,
    pub expires_at: i64,
    pub comment: String,
}

impl WKeyValue {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_var_bytes(&self.privkey);
        w.write_i64_le(self.created_at);
        w.write_i64_le(self.expires_at);
        w.write_var_string(&self.comment);
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<WKeyValue> {
        let mut r = Reader::new(bytes);
        Ok(WKeyValue {
            privkey: r.read_var_bytes()?,
            created_at: r.read_i64_le()?,
            expires_at: r.read_i64_le()?,
            comment: r.read_var_string()?,
        })
    }
}

/// KDF parameters and encrypted master secret (the `mkey` value).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MasterKeyRecord {
    pub encrypted_key: Vec<u8>,
    pub salt: Vec<u8>,
    pub derivation_method: u32,
    pub derivation_iterations: u32,
    pub other_derivation_params: Vec<u8>,
}

impl MasterKeyRecord {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_var_bytes(&self.encrypted_key);
        w.write_var_bytes(&self.salt);
        w.write_u32_le(self.derivation_method);
        w.write_u32_le(self.derivation_iterations);
        w.write_var_bytes(&self.other_derivation_params);
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<MasterKeyRecord> {
        let mut r = Reader::new(bytes);
        Ok(MasterKeyRecord {
            encrypted_key: r.read_var_bytes()?,
            salt: r.read_var_bytes()?,
            derivation_method: r.read_u32_le()?,
            derivation_iterations: r.read_u32_le()?,
            other_derivation_params: r.read_var_bytes()?,
        })
    }
}

/// Key metadata (creation time, HD derivation path) for the `keymeta` and
/// `watchmeta` records, which share a value shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyMetadata {
    pub version: u32,
    pub create_time: i64,
    pub hd_keypath: String,
    pub hd_seed_id: [u8; 20],
}

impl KeyMetadata {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_u32_le(self.version);
        w.write_i64_le(self.create_time);
        w.write_var_string(&self.hd_keypath);
        w.write_fixed(&self.hd_seed_id);
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<KeyMetadata> {
        let mut r = Reader::new(bytes);
        Ok(KeyMetadata {
            version: r.read_u32_le()?,
            create_time: r.read_i64_le()?,
            hd_keypath: r.read_var_string()?,
            hd_seed_id: r.read_fixed20()?,
        })
    }
}

/// Pre-generated reserve key (the `pool` value). `internal` is a
/// comparatively recent addition to the format and is read with the
/// optional-trailing-field rule, defaulting to `false` when absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPoolEntry {
    pub time: i64,
    pub pubkey: Vec<u8>,
    pub internal: bool,
}

impl KeyPoolEntry {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_i64_le(self.time);
        w.write_var_bytes(&self.pubkey);
        w.write_bool(self.internal);
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<KeyPoolEntry> {
        let mut r = Reader::new(bytes);
        let time = r.read_i64_le()?;
        let pubkey = r.read_var_bytes()?;
        let internal = if r.at_end() { false } else { r.read_bool()? };
        Ok(KeyPoolEntry { time, pubkey, internal })
    }
}

/// HD chain record: the single active master-seed derivation counter set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HdChain {
    pub version: u32,
    pub seed_id: [u8; 20],
    pub next_external_index: u32,
    pub next_internal_index: u32,
}

impl HdChain {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_u32_le(self.version);
        w.write_fixed(&self.seed_id);
        w.write_u32_le(self.next_external_index);
        w.write_u32_le(self.next_internal_index);
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<HdChain> {
        let mut r = Reader::new(bytes);
        Ok(HdChain {
            version: r.read_u32_le()?,
            seed_id: r.read_fixed20()?,
            next_external_index: r.read_u32_le()?,
            next_internal_index: r.read_u32_le()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_key(k: Key) {
        let bytes = k.encode();
        let decoded = Key::decode(&bytes).expect("decode");
        assert_eq!(decoded, k);
    }

    #[test]
    fn key_round_trips_every_fixed_shape_tag() {
        roundtrip_key(Key::Name { address: "1BoatSLRHtKNngkdXEeobR76b53LETtpyT".into() });
        roundtrip_key(Key::Purpose { address: "1BoatSLRHtKNngkdXEeobR76b53LETtpyT".into() });
        roundtrip_key(Key::Tx { hash: [7u8; 32] });
        roundtrip_key(Key::Key { pubkey: vec![2, 3, 4] });
        roundtrip_key(Key::WKey { pubkey: vec![2, 3, 4] });
        roundtrip_key(Key::CKey { pubkey: vec![2, 3, 4] });
        roundtrip_key(Key::MKey { id: 1 });
        roundtrip_key(Key::KeyMeta { pubkey: vec![9, 9] });
        roundtrip_key(Key::WatchMeta { script: vec![0xa9, 0x14] });
        roundtrip_key(Key::WatchS { script: vec![0xa9, 0x14] });
        roundtrip_key(Key::CScript { script_hash: [1u8; 20] });
        roundtrip_key(Key::Pool { index: 42 });
        roundtrip_key(Key::OrderPosNext);
        roundtrip_key(Key::BestBlock);
        roundtrip_key(Key::BestBlockNoMerkle);
        roundtrip_key(Key::MinVersion);
        roundtrip_key(Key::Version);
        roundtrip_key(Key::DefaultKey);
        roundtrip_key(Key::DestData { address: "addr".into(), key: "memo".into() });
        roundtrip_key(Key::HdChain);
        roundtrip_key(Key::Flags);
        roundtrip_key(Key::AcEntry { account: "".into(), entry: 3 });
        roundtrip_key(Key::ZcSerial { serial: vec![1, 2, 3] });
        roundtrip_key(Key::Zerocoin { value: vec![4, 5] });
        roundtrip_key(Key::UnloadedZerocoin { value: vec![4, 5] });
        roundtrip_key(Key::ZcAccumulator { denom: 1, pubcoin_id: vec![1] });
        roundtrip_key(Key::CalculatedZcBlock);
    }

    #[test]
    fn classification_matches_taxonomy() {
        assert_eq!(Key::Key { pubkey: vec![] }.class(), RecordClass::KeyBearing);
        assert_eq!(Key::WKey { pubkey: vec![] }.class(), RecordClass::KeyBearing);
        assert_eq!(Key::MKey { id: 0 }.class(), RecordClass::KeyBearing);
        assert_eq!(Key::CKey { pubkey: vec![] }.class(), RecordClass::KeyBearing);
        assert_eq!(Key::DefaultKey.class(), RecordClass::KeyBearing);
        assert_eq!(Key::Flags.class(), RecordClass::Flags);
        assert_eq!(Key::Tx { hash: [0; 32] }.class(), RecordClass::Tx);
        assert_eq!(Key::Name { address: "x".into() }.class(), RecordClass::OtherKnown);
        assert_eq!(
            Key::Unknown { tag: "mystery".into(), raw: vec![] }.class(),
            RecordClass::Unknown
        );
    }

    #[test]
    fn tx_record_detects_legacy_timestamp_band() {
        let mut tx = TxRecord { raw_tx: vec![0u8; 4], order_pos: UNORDERED, time_received_is_tx_time: 31404, from_me: false, spent: false };
        assert!(tx.is_legacy_timestamp_band());
        tx.time_received_is_tx_time = 31703;
        assert!(tx.is_legacy_timestamp_band());
        tx.time_received_is_tx_time = 31704;
        assert!(!tx.is_legacy_timestamp_band());
        tx.time_received_is_tx_time = 31403;
        assert!(!tx.is_legacy_timestamp_band());
    }

    #[test]
    fn legacy_timestamp_repair_reinterprets_trailing_triple() {
        let mut tx = TxRecord {
            raw_tx: vec![0xde, 0xad, 0xbe, 0xef, 0x01, 0x02, 0x03],
            order_pos: UNORDERED,
            time_received_is_tx_time: 31404,
            from_me: false,
            spent: false,
        };
        tx.apply_legacy_timestamp_repair();
        assert_eq!(tx.raw_tx, vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(tx.time_received_is_tx_time, 0x01 | (0x02 << 8) | (0x03 << 16));
    }

    #[test]
    fn legacy_timestamp_repair_is_noop_on_short_raw_tx() {
        let mut tx = TxRecord {
            raw_tx: vec![0x01, 0x02],
            order_pos: 0,
            time_received_is_tx_time: 31500,
            from_me: false,
            spent: false,
        };
        tx.apply_legacy_timestamp_repair();
        assert_eq!(tx.raw_tx, vec![0x01, 0x02]);
        assert_eq!(tx.time_received_is_tx_time, 31500);
    }

    #[test]
    fn key_value_round_trips_with_and_without_integrity_hash() -> Result<()> {
        let with_hash = KeyValue { privkey: vec![1, 2, 3], integrity_hash: Some([9u8; 32]) };
        assert_eq!(KeyValue::decode(&with_hash.encode())?, with_hash);

        let without_hash = KeyValue { privkey: vec![1, 2, 3], integrity_hash: None };
        assert_eq!(KeyValue::decode(&without_hash.encode())?, without_hash);
        Ok(())
    }

    #[test]
    fn key_pool_entry_defaults_internal_to_false_when_trailing_field_absent() -> Result<()> {
        // Simulate a legacy-format pool entry written before `internal`
        // existed: only time and pubkey.
        use crate::codec::Writer;
        let mut w = Writer::new();
        w.write_i64_le(1234);
        w.write_var_bytes(&[1, 2, 3]);
        let bytes = w.into_bytes();

        let entry = KeyPoolEntry::decode(&bytes)?;
        assert_eq!(entry.time, 1234);
        assert_eq!(entry.pubkey, vec![1, 2, 3]);
        assert!(!entry.internal);
        Ok(())
    }

    #[test]
    fn locator_empty_vs_populated() -> Result<()> {
        let empty = Locator::default();
        assert!(empty.is_empty());
        assert_eq!(Locator::decode(&empty.encode())?, empty);

        let populated = Locator { hashes: vec![[1u8; 32], [2u8; 32]] };
        assert!(!populated.is_empty());
        assert_eq!(Locator::decode(&populated.encode())?, populated);
        Ok(())
    }

    #[test]
    fn unknown_tag_is_preserved_not_rejected() -> Result<()> {
        let mut w = Writer::new();
        w.write_var_string("futuretag");
        w.write_fixed(&[1, 2, 3, 4]);
        let bytes = w.into_bytes();
        let key = Key::decode(&bytes)?;
        assert_eq!(key.class(), RecordClass::Unknown);
        assert_eq!(key.tag(), "futuretag");
        Ok(())
    }
}
