/// Bootstrap entropy, available before any pool has accumulated anything.
///
/// A batch of 256 short prime-search races runs on a scoped pool of 20
/// threads; which thread finds which prime, and how long each search takes,
/// depends on scheduler interleaving. Every finding is folded into one
/// synchronized SHA-512 whose digest is the entropy. Each batch also
/// reseeds the shared ISAAC through the FNV-256 schedule.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use lazy_static::lazy_static;
use sha2::{Digest, Sha512};

use crate::drbg::SeedSource;
use crate::isaac;

/// Entropy produced per batch.
pub const BATCH_LEN: usize = 64;

const SLOTS: usize = 64;
const FINDERS: usize = 256;
const MAX_SEARCH_THREADS: usize = 20;

/// Residues of primes greater than 5 modulo 30.
const RESIDUES: [u64; 8] = [1, 7, 11, 13, 17, 19, 23, 29];

lazy_static! {
    static ref INSTANT: Arc<InstantEntropy> = Arc::new(InstantEntropy::new());
}

/// The process-wide instant-entropy holder.
pub fn holder() -> Arc<InstantEntropy> {
    INSTANT.clone()
}

/// 64-slot holder releasing batches in ISAAC-chosen order. Consumed slots
/// refill asynchronously on the worker pool.
pub struct InstantEntropy {
    slots: Mutex<Vec<Option<[u8; BATCH_LEN]>>>,
    ready: Condvar,
    primed: AtomicUsize,
}

impl InstantEntropy {
    fn new() -> InstantEntropy {
        InstantEntropy {
            slots: Mutex::new(vec![None; SLOTS]),
            ready: Condvar::new(),
            primed: AtomicUsize::new(0),
        }
    }

    /// Take one 64-byte batch, waiting for a refill when the holder is dry.
    pub fn take(self: &Arc<Self>) -> [u8; BATCH_LEN] {
        // First consumer kicks off the initial fills.
        if self.primed.swap(1, Ordering::SeqCst) == 0 {
            for index in 0..4 {
                self.spawn_refill(index);
            }
        }

        let mut slots = self.slots.lock().expect("instant holder lock");
        for waited in [false, true] {
            let filled: Vec<usize> = slots
                .iter()
                .enumerate()
                .filter_map(|(i, s)| s.is_some().then_some(i))
                .collect();

            if !filled.is_empty() {
                let pick = {
                    let shared = isaac::shared();
                    let mut rng = shared.lock().expect("shared isaac lock");
                    filled[rng.next_below(filled.len() as u32) as usize]
                };
                let batch = slots[pick].take().expect("slot was filled");
                drop(slots);
                self.spawn_refill(pick);
                return batch;
            }

            if !waited {
                slots = self
                    .ready
                    .wait_timeout(slots, std::time::Duration::from_millis(250))
                    .expect("instant holder lock")
                    .0;
            }
        }

        // Still dry; generate inline rather than stalling the caller when
        // the worker pool is saturated.
        drop(slots);
        let batch = generate();
        self.spawn_refill_all_empty();
        batch
    }

    fn spawn_refill(self: &Arc<Self>, index: usize) {
        let holder = self.clone();
        crate::exec::workers().spawn_blocking(move || {
            let batch = generate();
            let mut slots = holder.slots.lock().expect("instant holder lock");
            slots[index] = Some(batch);
            holder.ready.notify_all();
        });
    }

    fn spawn_refill_all_empty(self: &Arc<Self>) {
        let holder = self.clone();
        crate::exec::workers().spawn_blocking(move || {
            let empty: Vec<usize> = {
                let slots = holder.slots.lock().expect("instant holder lock");
                slots
                    .iter()
                    .enumerate()
                    .filter_map(|(i, s)| s.is_none().then_some(i))
                    .take(4)
                    .collect()
            };
            for index in empty {
                let batch = generate();
                let mut slots = holder.slots.lock().expect("instant holder lock");
                slots[index] = Some(batch);
                holder.ready.notify_all();
            }
        });
    }

    /// Number of slots currently filled.
    pub fn filled(&self) -> usize {
        self.slots
            .lock()
            .expect("instant holder lock")
            .iter()
            .filter(|s| s.is_some())
            .count()
    }
}

impl SeedSource for InstantEntropy {
    fn get_seed(&self, n: usize) -> Vec<u8> {
        let holder = INSTANT.clone();
        let mut out = Vec::with_capacity(n + BATCH_LEN);
        while out.len() < n {
            out.extend_from_slice(&holder.take());
        }
        out.truncate(n);
        out
    }
}

/// Run one batch of prime-search races and return the digest. Also reseeds
/// the shared ISAAC from the result.
pub fn generate() -> [u8; BATCH_LEN] {
    let digest = Mutex::new(Sha512::new());
    let next_finder = AtomicUsize::new(0);
    let workers = MAX_SEARCH_THREADS.min(2 * num_cpus::get().max(1));

    std::thread::scope(|scope| {
        for worker in 0..workers {
            let digest = &digest;
            let next_finder = &next_finder;
            scope.spawn(move || loop {
                let index = next_finder.fetch_add(1, Ordering::Relaxed);
                if index >= FINDERS {
                    break;
                }

                let started = Instant::now();
                let prime = find_prime(index as u64);
                let elapsed = started.elapsed().as_nanos() as u64;

                let mut hasher = digest.lock().expect("race digest lock");
                hasher.update((worker as u64).to_le_bytes());
                hasher.update((index as u64).to_le_bytes());
                hasher.update(prime.to_le_bytes());
                hasher.update(elapsed.to_le_bytes());
            });
        }
    });

    let output: [u8; BATCH_LEN] = digest
        .into_inner()
        .expect("race digest lock")
        .finalize()
        .into();

    let shared = isaac::shared();
    shared
        .lock()
        .expect("shared isaac lock")
        .reseed(&fnv_seed_buffer(&output));

    output
}

/// Search upward from a jitter-derived base for a prime of the form
/// 30·k + c.
fn find_prime(salt: u64) -> u64 {
    let residue = RESIDUES[(salt & 7) as usize];
    let mut k = (nanos() ^ salt.wrapping_mul(0x9e37_79b9_7f4a_7c15)) >> 24;
    loop {
        let candidate = 30u64.wrapping_mul(k).wrapping_add(residue);
        if is_prime(candidate) {
            return candidate;
        }
        k = k.wrapping_add(1);
    }
}

/// Deterministic Miller-Rabin for u64.
pub(crate) fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    for p in [2u64, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37] {
        if n == p {
            return true;
        }
        if n % p == 0 {
            return false;
        }
    }

    let mut d = n - 1;
    let mut r = 0u32;
    while d % 2 == 0 {
        d /= 2;
        r += 1;
    }

    'witness: for a in [2u64, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37] {
        let mut x = pow_mod(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 0..r - 1 {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

fn mul_mod(a: u64, b: u64, m: u64) -> u64 {
    ((a as u128 * b as u128) % m as u128) as u64
}

fn pow_mod(mut base: u64, mut exp: u64, m: u64) -> u64 {
    let mut result = 1u64;
    base %= m;
    while exp > 0 {
        if exp & 1 == 1 {
            result = mul_mod(result, base, m);
        }
        base = mul_mod(base, base, m);
        exp >>= 1;
    }
    result
}

// 256-bit FNV-1a parameters. The prime is 2^168 + 2^8 + 0x63.
const FNV256_OFFSET: [u64; 4] = [
    0x1023_b4c8_caee_0535,
    0xc8b1_5368_47b6_bbb3,
    0x2d98_c384_c4e5_76cc,
    0xdd26_8dbc_aac5_5036,
];

/// Build the 1 KiB ISAAC seed buffer: iterate FNV-256 over the seed and the
/// nanosecond timer, emit the low byte each step, then permute the buffer
/// with FNV-derived swaps.
pub(crate) fn fnv_seed_buffer(seed: &[u8]) -> [u8; 1024] {
    let mut state = FNV256_OFFSET;
    for &byte in seed {
        fnv256_step(&mut state, byte);
    }

    let mut buf = [0u8; 1024];
    for (i, slot) in buf.iter_mut().enumerate() {
        let t = nanos();
        fnv256_step(&mut state, (t >> ((i & 7) * 8)) as u8);
        *slot = state[0] as u8;
    }

    for i in (1..1024usize).rev() {
        fnv256_step(&mut state, i as u8);
        let j = (state[0] % (i as u64 + 1)) as usize;
        buf.swap(i, j);
    }

    buf
}

/// One FNV-1a round: state = (state ⊕ byte) · prime mod 2^256, where
/// multiplication by the prime is (x << 168) + (x << 8) + 0x63·x.
fn fnv256_step(state: &mut [u64; 4], byte: u8) {
    state[0] ^= byte as u64;

    let shifted168 = shl(state, 168);
    let shifted8 = shl(state, 8);
    let small = mul_small(state, 0x63);

    let mut acc = shifted168;
    add_into(&mut acc, &shifted8);
    add_into(&mut acc, &small);
    *state = acc;
}

fn shl(x: &[u64; 4], bits: u32) -> [u64; 4] {
    let limb_shift = (bits / 64) as usize;
    let bit_shift = bits % 64;
    let mut out = [0u64; 4];
    for i in (limb_shift..4).rev() {
        let mut limb = x[i - limb_shift] << bit_shift;
        if bit_shift > 0 && i > limb_shift {
            limb |= x[i - limb_shift - 1] >> (64 - bit_shift);
        }
        out[i] = limb;
    }
    out
}

fn mul_small(x: &[u64; 4], factor: u64) -> [u64; 4] {
    let mut out = [0u64; 4];
    let mut carry = 0u128;
    for i in 0..4 {
        let product = x[i] as u128 * factor as u128 + carry;
        out[i] = product as u64;
        carry = product >> 64;
    }
    out
}

fn add_into(acc: &mut [u64; 4], addend: &[u64; 4]) {
    let mut carry = 0u128;
    for i in 0..4 {
        let sum = acc[i] as u128 + addend[i] as u128 + carry;
        acc[i] = sum as u64;
        carry = sum >> 64;
    }
}

fn nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
