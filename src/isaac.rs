/// ISAAC stream generator with the ISAAC+ amendments.
///
/// 256-word state `mm`, 256-word result buffer, scalars a/b/c. The mixing
/// step uses rotations in place of the original shifts and the output
/// function folds `a` into the emitted word. Fast and non-cryptographic;
/// the shared instance serves internal scheduling and permutation choices
/// only, never application output.
use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use lazy_static::lazy_static;

#[cfg(test)]
mod isaac_tests;

const WORDS: usize = 256;

pub struct Isaac {
    mm: [u32; WORDS],
    rsl: [u32; WORDS],
    a: u32,
    b: u32,
    c: u32,
    /// Words of `rsl` not yet handed out.
    count: usize,
}

impl Isaac {
    /// Build from exactly 256 seed words.
    pub fn from_seed(seed: &[u32; WORDS]) -> Isaac {
        let mut isaac = Isaac {
            mm: [0u32; WORDS],
            rsl: *seed,
            a: 0,
            b: 0,
            c: 0,
            count: 0,
        };
        isaac.double_mix();
        isaac.round();
        isaac
    }

    /// Build from up to 1024 seed bytes, loaded as little-endian words.
    pub fn from_bytes(seed: &[u8]) -> Isaac {
        Isaac::from_seed(&words_from_bytes(seed))
    }

    /// XOR fresh seed words into the unused output, then re-run the double
    /// mixing pass. The previous state keeps contributing; this is never a
    /// cold reset.
    pub fn reseed(&mut self, seed: &[u8]) {
        let words = words_from_bytes(seed);
        for (slot, word) in self.rsl.iter_mut().zip(words.iter()) {
            *slot ^= word;
        }
        self.double_mix();
        self.round();
    }

    pub fn next_u32(&mut self) -> u32 {
        if self.count == 0 {
            self.round();
        }
        self.count -= 1;
        self.rsl[self.count]
    }

    pub fn next_u64(&mut self) -> u64 {
        (self.next_u32() as u64) << 32 | self.next_u32() as u64
    }

    /// Uniform value in [0, bound) by rejection sampling.
    pub fn next_below(&mut self, bound: u32) -> u32 {
        debug_assert!(bound > 0);
        let zone = u32::MAX - (u32::MAX % bound);
        loop {
            let candidate = self.next_u32();
            if candidate < zone {
                return candidate % bound;
            }
        }
    }

    pub fn fill_bytes(&mut self, out: &mut [u8]) {
        for chunk in out.chunks_mut(4) {
            let word = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
    }

    /// One full ISAAC round, refilling the result buffer. The mixing step
    /// uses the ISAAC+ rotation schedule and output function.
    fn round(&mut self) {
        self.c = self.c.wrapping_add(1);
        self.b = self.b.wrapping_add(self.c);

        for i in 0..WORDS {
            let x = self.mm[i];
            self.a = match i & 3 {
                0 => self.a ^ self.a.rotate_left(13),
                1 => self.a ^ self.a.rotate_right(6),
                2 => self.a ^ self.a.rotate_left(2),
                _ => self.a ^ self.a.rotate_right(16),
            };
            self.a = self.a.wrapping_add(self.mm[(i + WORDS / 2) & 0xFF]);
            let y = self.mm[((x >> 2) & 0xFF) as usize]
                .wrapping_add(self.a)
                .wrapping_add(self.b);
            self.mm[i] = y;
            self.b = x.wrapping_add(self.mm[((y >> 10) & 0xFF) as usize] ^ self.a);
            self.rsl[i] = self.b;
        }

        self.count = WORDS;
    }

    /// The standard two-pass initialization mix, folding the result buffer
    /// and the existing state into `mm`.
    fn double_mix(&mut self) {
        let mut v = [0x9e37_79b9u32; 8];
        for _ in 0..4 {
            mix(&mut v);
        }

        for base in (0..WORDS).step_by(8) {
            for (j, value) in v.iter_mut().enumerate() {
                *value = value.wrapping_add(self.rsl[base + j]);
            }
            mix(&mut v);
            self.mm[base..base + 8].copy_from_slice(&v);
        }

        for base in (0..WORDS).step_by(8) {
            for (j, value) in v.iter_mut().enumerate() {
                *value = value.wrapping_add(self.mm[base + j]);
            }
            mix(&mut v);
            self.mm[base..base + 8].copy_from_slice(&v);
        }
    }
}

fn mix(v: &mut [u32; 8]) {
    v[0] ^= v[1] << 11;
    v[3] = v[3].wrapping_add(v[0]);
    v[1] = v[1].wrapping_add(v[2]);
    v[1] ^= v[2] >> 2;
    v[4] = v[4].wrapping_add(v[1]);
    v[2] = v[2].wrapping_add(v[3]);
    v[2] ^= v[3] << 8;
    v[5] = v[5].wrapping_add(v[2]);
    v[3] = v[3].wrapping_add(v[4]);
    v[3] ^= v[4] >> 16;
    v[6] = v[6].wrapping_add(v[3]);
    v[4] = v[4].wrapping_add(v[5]);
    v[4] ^= v[5] << 10;
    v[7] = v[7].wrapping_add(v[4]);
    v[5] = v[5].wrapping_add(v[6]);
    v[5] ^= v[6] >> 4;
    v[0] = v[0].wrapping_add(v[5]);
    v[6] = v[6].wrapping_add(v[7]);
    v[6] ^= v[7] << 8;
    v[1] = v[1].wrapping_add(v[6]);
    v[7] = v[7].wrapping_add(v[0]);
    v[7] ^= v[0] >> 9;
    v[2] = v[2].wrapping_add(v[7]);
    v[0] = v[0].wrapping_add(v[1]);
}

fn words_from_bytes(seed: &[u8]) -> [u32; WORDS] {
    let mut words = [0u32; WORDS];
    for (i, chunk) in seed.chunks(4).take(WORDS).enumerate() {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        words[i] = u32::from_le_bytes(word);
    }
    words
}

lazy_static! {
    static ref SHARED: Arc<Mutex<Isaac>> = Arc::new(Mutex::new(boot_instance()));
}

/// The process-wide shared instance. Seeded at first use from timer jitter;
/// the instant-entropy bootstrap reseeds it with digest-quality material.
pub fn shared() -> Arc<Mutex<Isaac>> {
    SHARED.clone()
}

fn boot_instance() -> Isaac {
    let epoch = Instant::now();
    let mut seed = [0u32; WORDS];
    let wall = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    for (i, word) in seed.iter_mut().enumerate() {
        let jitter = epoch.elapsed().as_nanos() as u64;
        *word = (wall ^ jitter.rotate_left((i & 63) as u32)) as u32 ^ (i as u32).wrapping_mul(0x9e37_79b9);
    }
    Isaac::from_seed(&seed)
}
