/// Deterministic random bit generators.
///
/// Three SP 800-90A mechanisms share one operations vocabulary
/// (`next_bytes`, `set_seed`, `new_seed`) through the [`Drbg`] wrapper:
/// reseed-resistance bookkeeping lives in [`base`], state shapes live in the
/// per-mechanism modules. Mechanisms are a sum type, not a trait hierarchy;
/// the wrapper owns the entropy source and the reseed policy.
pub mod base;
pub mod ctr_drbg;
pub mod hash_drbg;
pub mod hmac_drbg;
pub mod nonce;

#[cfg(test)]
mod drbg_tests;
#[cfg(test)]
mod hash_drbg_tests;
#[cfg(test)]
mod hmac_drbg_tests;

pub use base::{combine_materials, Drbg};
pub use ctr_drbg::CtrDrbg;
pub use hash_drbg::{hash_df, HashDrbg};
pub use hmac_drbg::HmacDrbg;

use std::sync::{Arc, Mutex};

use crate::hash::HashSpec;

/// A supplier of seed material. The accumulator, the system multiplexer and
/// the instant-entropy bootstrap all implement this; DRBGs only ever see the
/// trait.
pub trait SeedSource: Send + Sync {
    /// Produce exactly `n` bytes of seed material. Implementations degrade
    /// (never block indefinitely, never return short).
    fn get_seed(&self, n: usize) -> Vec<u8>;
}

/// The generator constructions offered by the provider surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Hash(HashSpec),
    Hmac(HashSpec),
    CtrAes256,
}

impl Algorithm {
    /// Seed length in bytes drawn from the entropy source on reseed.
    pub const fn seed_len(self) -> usize {
        match self {
            Algorithm::Hash(spec) | Algorithm::Hmac(spec) => spec.seed_len(),
            Algorithm::CtrAes256 => ctr_drbg::SEED_LEN,
        }
    }

    /// Provider name for this construction.
    pub const fn name(self) -> &'static str {
        match self {
            Algorithm::Hash(HashSpec::Sha1) => "Nist/SHA-1",
            Algorithm::Hash(HashSpec::Sha256) => "Nist/SHA-256",
            Algorithm::Hash(HashSpec::Sha512) => "Nist/SHA-512",
            Algorithm::Hmac(HashSpec::Sha1) => "Nist/HmacSHA-1",
            Algorithm::Hmac(HashSpec::Sha256) => "Nist/HmacSHA-256",
            Algorithm::Hmac(HashSpec::Sha512) => "Nist/HmacSHA-512",
            Algorithm::CtrAes256 => "Nist/AES",
        }
    }

    /// All constructions the provider registers.
    pub const ALL: [Algorithm; 7] = [
        Algorithm::Hash(HashSpec::Sha1),
        Algorithm::Hash(HashSpec::Sha256),
        Algorithm::Hash(HashSpec::Sha512),
        Algorithm::Hmac(HashSpec::Sha1),
        Algorithm::Hmac(HashSpec::Sha256),
        Algorithm::Hmac(HashSpec::Sha512),
        Algorithm::CtrAes256,
    ];

    /// Resolve a provider name.
    pub fn by_name(name: &str) -> Option<Algorithm> {
        Algorithm::ALL.iter().copied().find(|a| a.name() == name)
    }
}

/// Mechanism state, one variant per SP 800-90A construction.
pub enum Mechanism {
    Hash(HashDrbg),
    Hmac(HmacDrbg),
    Ctr(CtrDrbg),
}

impl Mechanism {
    /// Instantiate from combined seed material.
    pub fn instantiate(algorithm: Algorithm, material: &[u8]) -> Mechanism {
        match algorithm {
            Algorithm::Hash(spec) => Mechanism::Hash(HashDrbg::instantiate(spec, material)),
            Algorithm::Hmac(spec) => Mechanism::Hmac(HmacDrbg::instantiate(spec, material)),
            Algorithm::CtrAes256 => Mechanism::Ctr(CtrDrbg::instantiate(material)),
        }
    }

    /// Algorithm-specific generation step.
    pub fn generate(&mut self, out: &mut [u8]) {
        match self {
            Mechanism::Hash(d) => d.generate(out),
            Mechanism::Hmac(d) => d.generate(out),
            Mechanism::Ctr(d) => d.generate(out),
        }
    }

    /// Algorithm-specific reseed step.
    pub fn reseed(&mut self, seed: &[u8]) {
        match self {
            Mechanism::Hash(d) => d.reseed(seed),
            Mechanism::Hmac(d) => d.reseed(seed),
            Mechanism::Ctr(d) => d.reseed(seed),
        }
    }
}

/// A DRBG shared across threads; all access is linearized by its lock.
pub type SharedDrbg = Arc<Mutex<Drbg>>;

/// Names of every algorithm the provider surface exposes.
pub fn provider_algorithms() -> Vec<&'static str> {
    Algorithm::ALL.iter().map(|a| a.name()).collect()
}

/// Resolve a provider algorithm name to a fresh generator with per-call
/// reseed (resistance 0) wired to the accumulator as its seed source.
pub fn provider_instance(name: &str) -> Option<SharedDrbg> {
    let algorithm = Algorithm::by_name(name)?;
    let source: Arc<dyn SeedSource> = crate::fortuna::accumulator();
    Some(Arc::new(Mutex::new(Drbg::new(algorithm, source, 0))))
}

/// The generator honoring `provider.strong_algorithm`, falling back to
/// HMAC-SHA-512 when the configured name does not resolve.
pub fn provider_strong() -> SharedDrbg {
    let configured = crate::config::settings().provider_strong_algorithm();
    if let Some(drbg) = provider_instance(&configured) {
        return drbg;
    }
    tracing::warn!(
        algorithm = %configured,
        "configured strong algorithm is unknown, using Nist/HmacSHA-512"
    );
    provider_instance("Nist/HmacSHA-512").expect("builtin algorithm resolves")
}
