/// Shared generator behavior: the reseed-resistance policy and the
/// combining of instantiation material.
use std::sync::Arc;

use super::{Algorithm, Mechanism, SeedSource};

/// One deterministic generator with its reseed policy.
///
/// `resistance` is the number of generate operations permitted between
/// automatic reseeds; 0 means reseed on every call. The operation counter
/// starts at 1 so a fresh instance with nonzero resistance generates
/// `resistance` times before pulling from its source again.
pub struct Drbg {
    algorithm: Algorithm,
    mechanism: Mechanism,
    source: Arc<dyn SeedSource>,
    resistance: u64,
    ops: u64,
}

impl Drbg {
    /// Instantiate with material combined from the source, the nonce
    /// factory and the process personalization string.
    pub fn new(algorithm: Algorithm, source: Arc<dyn SeedSource>, resistance: u64) -> Drbg {
        let seed_len = algorithm.seed_len();
        let material = combine_materials_from(&*source, None, None, None, seed_len, seed_len);
        Drbg {
            algorithm,
            mechanism: Mechanism::instantiate(algorithm, &material),
            source,
            resistance,
            ops: 1,
        }
    }

    /// Instantiate with caller-supplied materials. Absent parts are filled
    /// exactly as in [`combine_materials`].
    pub fn with_materials(
        algorithm: Algorithm,
        source: Arc<dyn SeedSource>,
        resistance: u64,
        entropy: Option<&[u8]>,
        nonce: Option<&[u8]>,
        personalization: Option<&[u8]>,
    ) -> Drbg {
        let seed_len = algorithm.seed_len();
        let material =
            combine_materials_from(&*source, entropy, nonce, personalization, seed_len, seed_len);
        Drbg {
            algorithm,
            mechanism: Mechanism::instantiate(algorithm, &material),
            source,
            resistance,
            ops: 1,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn seed_len(&self) -> usize {
        self.algorithm.seed_len()
    }

    /// Fill `buf` with generator output, reseeding first when the policy
    /// requires it. Callers always receive `buf.len()` bytes.
    pub fn next_bytes(&mut self, buf: &mut [u8]) {
        if self.ops > self.resistance {
            let seed = self.source.get_seed(self.seed_len());
            self.set_seed(&seed);
        }
        self.mechanism.generate(buf);
        self.ops += 1;
    }

    /// Mix external seed material into the state.
    pub fn set_seed(&mut self, seed: &[u8]) {
        self.mechanism.reseed(seed);
        if self.resistance != 0 {
            self.ops = 1;
        }
    }

    /// Produce seed material suitable for instantiating another generator.
    pub fn new_seed(&mut self) -> Vec<u8> {
        let mut out = vec![0u8; self.seed_len()];
        self.next_bytes(&mut out);
        out
    }
}

/// Combine instantiation material: entropy ∥ nonce ∥ personalization.
///
/// Absent entropy is drawn (`desired` bytes) from the accumulator; short
/// entropy is padded from the accumulator up to `min`. An absent nonce comes
/// from the nonce factory, an absent personalization from the process
/// personalization string. The result is always at least `min` bytes.
pub fn combine_materials(
    entropy: Option<&[u8]>,
    nonce: Option<&[u8]>,
    personalization: Option<&[u8]>,
    min: usize,
    desired: usize,
) -> Vec<u8> {
    let accumulator = crate::fortuna::accumulator();
    combine_materials_from(&*accumulator, entropy, nonce, personalization, min, desired)
}

/// [`combine_materials`] against an explicit source; the wrapper above binds
/// the accumulator, instantiation paths bind whatever source the generator
/// was built with.
pub fn combine_materials_from(
    source: &dyn SeedSource,
    entropy: Option<&[u8]>,
    nonce: Option<&[u8]>,
    personalization: Option<&[u8]>,
    min: usize,
    desired: usize,
) -> Vec<u8> {
    let mut material = match entropy {
        Some(bytes) => {
            let mut m = bytes.to_vec();
            if m.len() < min {
                m.extend_from_slice(&source.get_seed(min - m.len()));
            }
            m
        }
        None => source.get_seed(desired),
    };

    match nonce {
        Some(bytes) => material.extend_from_slice(bytes),
        None => material.extend_from_slice(&super::nonce::next_nonce()),
    }

    match personalization {
        Some(bytes) => material.extend_from_slice(bytes),
        None => material.extend_from_slice(super::nonce::personalization()),
    }

    material
}
