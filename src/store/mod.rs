/// Persistent seed storage.
///
/// Seeds live in an ordered name → bytes map behind the [`SeedBackend`]
/// trait. Every payload crossing the storage boundary passes through the
/// scrambler: an XOR with fresh random bytes, so the on-disk bit pattern
/// never matches the bytes any generator consumed while the entropy content
/// is preserved (the mask is never persisted). Callers operate through a
/// scoped [`Session`] whose gets and puts share one backend transaction.
pub mod memory;
pub mod sqlite;
pub mod writeback;


use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use lazy_static::lazy_static;

use crate::drbg::SeedSource;

/// Storage key for a pool checkpoint.
pub fn pool_seed_name(pool_id: usize) -> String {
    format!("Fortuna.{}", pool_id)
}

/// Storage key for a cached network seed slot.
pub fn net_seed_name(slot: usize) -> String {
    format!("NetRandom.{}", slot)
}

/// Storage key for the instant-entropy carryover seed.
pub const INSTANT_SEED_NAME: &str = "instant";

/// A backing map of seed records.
pub trait SeedBackend: Send {
    fn get_raw(&mut self, name: &str) -> Result<Option<Vec<u8>>>;
    fn put_raw(&mut self, name: &str, bytes: &[u8]) -> Result<()>;
    fn remove(&mut self, name: &str) -> Result<()>;
    /// Open a transaction covering the whole session.
    fn begin(&mut self) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
    /// Flush and release; called once at process exit.
    fn close(&mut self) -> Result<()>;
}

/// Type-specific trailer carried after the scrambled payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedTrailer {
    None,
    Network {
        /// Wall-clock load time, milliseconds since the epoch.
        load_time: i64,
        usage: u32,
        cursor: u32,
    },
}

/// One seed as callers see it (payload unscrambled).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedRecord {
    pub name: String,
    pub data: Vec<u8>,
    pub trailer: SeedTrailer,
}

impl SeedRecord {
    pub fn plain(name: impl Into<String>, data: Vec<u8>) -> SeedRecord {
        SeedRecord {
            name: name.into(),
            data,
            trailer: SeedTrailer::None,
        }
    }
}

const NETWORK_TRAILER_LEN: usize = 8 + 4 + 4;

/// Encode a record for storage. The payload is already scrambled by the
/// session; this is purely the wire layout:
/// `u16_be(name_len) ∥ name ∥ u16_be(data_len) ∥ data ∥ trailer`.
fn encode_record(name: &str, data: &[u8], trailer: &SeedTrailer) -> Vec<u8> {
    let name_bytes = name.as_bytes();
    let mut out = Vec::with_capacity(4 + name_bytes.len() + data.len() + NETWORK_TRAILER_LEN);
    out.extend_from_slice(&(name_bytes.len() as u16).to_be_bytes());
    out.extend_from_slice(name_bytes);
    out.extend_from_slice(&(data.len() as u16).to_be_bytes());
    out.extend_from_slice(data);
    if let SeedTrailer::Network {
        load_time,
        usage,
        cursor,
    } = trailer
    {
        out.extend_from_slice(&load_time.to_be_bytes());
        out.extend_from_slice(&(*usage as i32).to_be_bytes());
        out.extend_from_slice(&(*cursor as i32).to_be_bytes());
    }
    out
}

/// Decode a stored record. None means corruption; the caller removes the
/// record and reports absent.
fn decode_record(raw: &[u8]) -> Option<(String, Vec<u8>, SeedTrailer)> {
    if raw.len() < 2 {
        return None;
    }
    let name_len = u16::from_be_bytes([raw[0], raw[1]]) as usize;
    let rest = &raw[2..];
    if rest.len() < name_len + 2 {
        return None;
    }
    let name = String::from_utf8(rest[..name_len].to_vec()).ok()?;
    let rest = &rest[name_len..];
    let data_len = u16::from_be_bytes([rest[0], rest[1]]) as usize;
    let rest = &rest[2..];
    if rest.len() < data_len {
        return None;
    }
    let data = rest[..data_len].to_vec();
    let trailer_bytes = &rest[data_len..];

    let trailer = match trailer_bytes.len() {
        0 => SeedTrailer::None,
        NETWORK_TRAILER_LEN => SeedTrailer::Network {
            load_time: i64::from_be_bytes(trailer_bytes[..8].try_into().ok()?),
            usage: i32::from_be_bytes(trailer_bytes[8..12].try_into().ok()?) as u32,
            cursor: i32::from_be_bytes(trailer_bytes[12..16].try_into().ok()?) as u32,
        },
        _ => return None,
    };

    Some((name, data, trailer))
}

/// XOR `data` with a fresh mask from `source`. Applying the same mask twice
/// restores the input; with a fresh mask each way the stored and in-memory
/// bit patterns stay unrelated while the entropy carries through.
pub fn scramble_with(source: &dyn SeedSource, data: &mut [u8]) {
    if data.is_empty() {
        return;
    }
    let mask = source.get_seed(data.len());
    for (byte, m) in data.iter_mut().zip(mask.iter()) {
        *byte ^= m;
    }
}

/// The seed store: one backend plus the scrambler's mask source.
pub struct SeedStore {
    backend: Mutex<Box<dyn SeedBackend>>,
    mask_source: Arc<dyn SeedSource>,
}

impl SeedStore {
    pub fn new(backend: Box<dyn SeedBackend>, mask_source: Arc<dyn SeedSource>) -> SeedStore {
        SeedStore {
            backend: Mutex::new(backend),
            mask_source,
        }
    }

    /// Scramble in place with this store's mask source.
    pub fn scramble(&self, data: &mut [u8]) {
        scramble_with(&*self.mask_source, data);
    }

    /// Acquire the storage session. The backend transaction spans the
    /// guard's lifetime; it commits on drop on every exit path.
    pub fn session(&self) -> Session<'_> {
        let mut backend = self.backend.lock().expect("seed store lock");
        if let Err(e) = backend.begin() {
            tracing::warn!(error = %e, "seed store transaction failed to open");
        }
        Session {
            backend,
            store: self,
        }
    }

    /// Flush and close the backend; part of process shutdown.
    pub fn close(&self) {
        let mut backend = self.backend.lock().expect("seed store lock");
        if let Err(e) = backend.close() {
            tracing::warn!(error = %e, "seed store close failed");
        }
    }
}

/// Scoped storage access; all operations share one transaction.
pub struct Session<'a> {
    backend: MutexGuard<'a, Box<dyn SeedBackend>>,
    store: &'a SeedStore,
}

impl Session<'_> {
    /// Fetch and unscramble a seed. Corrupt records are removed and read
    /// as absent; storage errors read as absent.
    pub fn get_seed(&mut self, name: &str) -> Option<SeedRecord> {
        let raw = match self.backend.get_raw(name) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(seed = name, error = %e, "seed read failed");
                return None;
            }
        };

        match decode_record(&raw) {
            Some((stored_name, mut data, trailer)) if stored_name == name => {
                self.store.scramble(&mut data);
                Some(SeedRecord {
                    name: stored_name,
                    data,
                    trailer,
                })
            }
            _ => {
                tracing::warn!(seed = name, "corrupt seed record removed");
                let _ = self.backend.remove(name);
                None
            }
        }
    }

    /// Scramble and persist a seed. Failures drop the seed with a log
    /// record; in-memory state is unaffected.
    pub fn put_seed(&mut self, record: &SeedRecord) {
        let mut data = record.data.clone();
        self.store.scramble(&mut data);
        let encoded = encode_record(&record.name, &data, &record.trailer);
        if let Err(e) = self.backend.put_raw(&record.name, &encoded) {
            tracing::warn!(seed = %record.name, error = %e, "seed write failed; dropping");
        }
    }

    pub fn remove(&mut self, name: &str) {
        if let Err(e) = self.backend.remove(name) {
            tracing::warn!(seed = name, error = %e, "seed remove failed");
        }
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.backend.commit() {
            tracing::warn!(error = %e, "seed store commit failed");
        }
    }
}

lazy_static! {
    static ref STORE: SeedStore = boot_store();
}

/// The process-wide store configured by `storage.*`.
pub fn store() -> &'static SeedStore {
    &STORE
}

fn boot_store() -> SeedStore {
    let settings = crate::config::settings();
    let mask_source: Arc<dyn SeedSource> = crate::entropy::system::multiplexer();

    let backend: Box<dyn SeedBackend> = match settings.storage_backend().as_str() {
        "memory" => Box::new(memory::MemoryBackend::new()),
        _ => {
            let path = settings.storage_file();
            match sqlite::SqliteBackend::open(&path) {
                Ok(backend) => Box::new(backend),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "seed database unavailable; storage is in-memory for this run");
                    Box::new(memory::MemoryBackend::new())
                }
            }
        }
    };

    SeedStore::new(backend, mask_source)
}

/// Persisted pool checkpoints, as (pool id, payload) pairs.
pub fn load_pool_seeds() -> Result<Vec<(usize, Vec<u8>)>> {
    let mut session = store().session();
    let mut seeds = Vec::new();
    for pool_id in 0..crate::fortuna::POOLS {
        if let Some(record) = session.get_seed(&pool_seed_name(pool_id)) {
            if !record.data.is_empty() {
                seeds.push((pool_id, record.data));
            }
        }
    }
    Ok(seeds)
}
