/// The Fortuna-style entropy accumulator.
///
/// Thirty-two pools, each an independent DRBG, absorb entropy events;
/// the output engine is AES-256 in counter mode keyed from the pools on a
/// power-of-two schedule. On the R'th reseed, pools 0..trailing_zeros(R)+1
/// are drawn, so pool i contributes to every 2^i'th reseed and the deeper
/// pools hold entropy back from an attacker who can read early outputs.
///
/// One lock protects the output engine and orders pool access; each pool
/// has its own lock so checkpoint resolution never re-enters the outer one.
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes256;
use lazy_static::lazy_static;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::drbg::{Algorithm, Drbg, SeedSource};
use crate::hash::HashSpec;


/// Number of entropy pools; the hard upper bound of the reseed schedule.
pub const POOLS: usize = 32;

/// Bytes drawn from each selected pool per reseed.
const POOL_DRAW: usize = 32;

/// Bytes a pool is seeded with at construction.
const POOL_INIT_ENTROPY: usize = 128;

/// Output generated between generator rekeys.
const REKEY_INTERVAL: usize = 1 << 20;

const BLOCK_LEN: usize = 16;

/// Pool constructions, assigned round-robin.
const POOL_ALGORITHMS: [Algorithm; 5] = [
    Algorithm::CtrAes256,
    Algorithm::Hash(HashSpec::Sha256),
    Algorithm::Hash(HashSpec::Sha512),
    Algorithm::Hmac(HashSpec::Sha256),
    Algorithm::Hmac(HashSpec::Sha512),
];

lazy_static! {
    static ref ACCUMULATOR: Arc<Fortuna> = Arc::new(boot_accumulator());
}

/// The process-wide accumulator. First use seeds every pool from the
/// system multiplexer, mixes in persisted pool seeds and enqueues fresh
/// checkpoints.
pub fn accumulator() -> Arc<Fortuna> {
    ACCUMULATOR.clone()
}

struct Generator {
    cipher: Aes256,
    key: [u8; 32],
    counter: [u8; BLOCK_LEN],
    reseed_count: u64,
}

pub struct Fortuna {
    pools: Vec<Mutex<Drbg>>,
    generator: Mutex<Generator>,
    pool_draws: Vec<AtomicU64>,
    events: AtomicU64,
    checkpointing: AtomicBool,
}

impl Fortuna {
    /// Build an accumulator whose pools are keyed from `source`. No
    /// persistence is touched; the global instance layers that on.
    pub fn with_source(source: Arc<dyn SeedSource>) -> Fortuna {
        let pools = (0..POOLS)
            .map(|i| {
                let algorithm = POOL_ALGORITHMS[i % POOL_ALGORITHMS.len()];
                let entropy = source.get_seed(POOL_INIT_ENTROPY);
                // Explicitly empty nonce: distinctness comes from the
                // per-pool entropy draw, and construction stays
                // reproducible given the source.
                Mutex::new(Drbg::with_materials(
                    algorithm,
                    source.clone(),
                    u64::MAX,
                    Some(&entropy),
                    Some(&[]),
                    None,
                ))
            })
            .collect();

        let key = [0u8; 32];
        Fortuna {
            pools,
            generator: Mutex::new(Generator {
                cipher: Aes256::new(GenericArray::from_slice(&key)),
                key,
                counter: [0u8; BLOCK_LEN],
                reseed_count: 0,
            }),
            pool_draws: (0..POOLS).map(|_| AtomicU64::new(0)).collect(),
            events: AtomicU64::new(0),
            checkpointing: AtomicBool::new(false),
        }
    }

    /// Route an entropy event into pool `pool mod 32` and, when persistence
    /// is on, enqueue a fresh deferred checkpoint of that pool.
    pub fn add_event(&self, pool: usize, data: &[u8]) {
        let pool_id = pool % POOLS;

        {
            let _guard = self.generator.lock().expect("fortuna lock");
            let mut pool = self.pools[pool_id].lock().expect("pool lock");
            pool.set_seed(data);
        }

        self.events.fetch_add(1, Ordering::Relaxed);
        if self.checkpointing.load(Ordering::Relaxed) {
            self.enqueue_checkpoint(pool_id);
        }
    }

    /// Produce `n` seed bytes: advance the reseed schedule, rekey from the
    /// selected pools, then run the counter-mode engine.
    pub fn get_seed_bytes(&self, n: usize) -> Vec<u8> {
        let mut generator = self.generator.lock().expect("fortuna lock");

        generator.reseed_count += 1;
        let depth = ((generator.reseed_count.trailing_zeros() + 1) as usize).min(POOLS);

        let mut material = Vec::with_capacity(depth * POOL_DRAW);
        for i in 0..depth {
            let mut pool = self.pools[i].lock().expect("pool lock");
            let mut draw = [0u8; POOL_DRAW];
            pool.next_bytes(&mut draw);
            material.extend_from_slice(&draw);
            self.pool_draws[i].fetch_add(1, Ordering::Relaxed);
        }

        generator.rekey_from(&material);
        let out = generator.generate(n);
        drop(generator);

        // Output demand: collectors snap back to full cadence.
        crate::entropy::collectors::scheduler().reset_speed();

        out
    }

    /// Pool consultation counts, for status output and schedule checks.
    pub fn pool_draw_counts(&self) -> Vec<u64> {
        self.pool_draws
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .collect()
    }

    pub fn event_count(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }

    pub fn reseed_count(&self) -> u64 {
        self.generator.lock().expect("fortuna lock").reseed_count
    }

    /// Turn on checkpoint persistence and enqueue one deferred checkpoint
    /// per pool. Only meaningful on the global instance: deferred entries
    /// resolve through the global handle at flush time.
    pub fn enable_checkpoints(&self) {
        self.checkpointing.store(true, Ordering::Relaxed);
        for pool_id in 0..POOLS {
            self.enqueue_checkpoint(pool_id);
        }
    }

    /// 32 bytes snapshotted from one pool; runs under the pool lock only,
    /// so the write-back thread never re-enters the accumulator lock.
    pub fn checkpoint_bytes(&self, pool_id: usize) -> Vec<u8> {
        let mut pool = self.pools[pool_id % POOLS].lock().expect("pool lock");
        let mut out = vec![0u8; POOL_DRAW];
        pool.next_bytes(&mut out);
        out
    }

    /// Mix a persisted seed back into one pool.
    pub fn restore_pool_seed(&self, pool_id: usize, seed: &[u8]) {
        let mut pool = self.pools[pool_id % POOLS].lock().expect("pool lock");
        pool.set_seed(seed);
    }

    fn enqueue_checkpoint(&self, pool_id: usize) {
        crate::store::writeback::enqueue_deferred(
            crate::store::pool_seed_name(pool_id),
            move || accumulator().checkpoint_bytes(pool_id),
        );
    }
}

impl SeedSource for Fortuna {
    fn get_seed(&self, n: usize) -> Vec<u8> {
        self.get_seed_bytes(n)
    }
}

impl Generator {
    /// `key ← SHA-256(old_key ∥ material)`; the old key is wiped and the
    /// 128-bit counter advances so old and new streams never overlap.
    fn rekey_from(&mut self, material: &[u8]) {
        let mut hasher = Sha256::new();
        hasher.update(self.key);
        hasher.update(material);
        let new_key: [u8; 32] = hasher.finalize().into();

        self.key.zeroize();
        self.key = new_key;
        self.cipher = Aes256::new(GenericArray::from_slice(&self.key));
        increment_le(&mut self.counter);
    }

    fn generate(&mut self, n: usize) -> Vec<u8> {
        let mut out = vec![0u8; n];
        let mut produced = 0;
        let mut since_rekey = 0usize;

        while produced < n {
            increment_le(&mut self.counter);
            let mut block = GenericArray::clone_from_slice(&self.counter);
            self.cipher.encrypt_block(&mut block);
            let take = BLOCK_LEN.min(n - produced);
            out[produced..produced + take].copy_from_slice(&block[..take]);
            produced += take;

            since_rekey += BLOCK_LEN;
            if since_rekey >= REKEY_INTERVAL {
                self.rekey_from_counter();
                since_rekey = 0;
            }
        }

        out
    }

    /// Rekey from the engine's own stream: the next two counter blocks
    /// become the new key.
    fn rekey_from_counter(&mut self) {
        let mut new_key = [0u8; 32];
        for chunk in new_key.chunks_exact_mut(BLOCK_LEN) {
            increment_le(&mut self.counter);
            let mut block = GenericArray::clone_from_slice(&self.counter);
            self.cipher.encrypt_block(&mut block);
            chunk.copy_from_slice(&block);
        }

        self.key.zeroize();
        self.key = new_key;
        self.cipher = Aes256::new(GenericArray::from_slice(&self.key));
    }
}

impl Drop for Generator {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

fn increment_le(counter: &mut [u8; BLOCK_LEN]) {
    for byte in counter.iter_mut() {
        let (next, overflow) = byte.overflowing_add(1);
        *byte = next;
        if !overflow {
            break;
        }
    }
}

fn boot_accumulator() -> Fortuna {
    let accumulator = Fortuna::with_source(crate::entropy::system::multiplexer());

    // Mix any persisted pool checkpoints back in before the first output.
    match crate::store::load_pool_seeds() {
        Ok(seeds) => {
            for (pool_id, seed) in seeds {
                accumulator.restore_pool_seed(pool_id, &seed);
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "persisted pool seeds unavailable");
        }
    }

    accumulator
}
