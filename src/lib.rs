// Cryptographic engine: SP 800-90A DRBGs fed by a Fortuna-style
// accumulator, which in turn drinks from host RNGs, periodic collectors,
// on-line entropy services and a persistent scrambled seed store.
#![allow(clippy::upper_case_acronyms)]

pub mod config;
pub mod drbg;
pub mod entropy;
pub mod exec;
pub mod fortuna;
pub mod hash;
pub mod isaac;
pub mod net;
pub mod store;

#[cfg(test)]
mod lib_tests;

// Re-export the provider surface for convenience
pub use drbg::{provider_algorithms, provider_instance, provider_strong, Drbg, SeedSource};
pub use hash::shannon_entropy;

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

static STARTED: AtomicBool = AtomicBool::new(false);
static SHUTTING_DOWN: AtomicBool = AtomicBool::new(false);

/// Boundary errors. Generator output paths never fail: callers of
/// `next_bytes` always receive the requested bytes, degrading to system or
/// instant entropy under starvation. These surface only from the named
/// fallible operations.
#[derive(Error, Debug)]
pub enum RngError {
    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("entropy starvation: {0}")]
    EntropyStarvation(String),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("network failure: {0}")]
    Network(#[from] net::NetworkError),

    #[error("corrupt seed record: {0}")]
    Corrupt(String),

    #[error("permission denied: {0}")]
    Permission(String),
}

pub type RngResult<T> = Result<T, RngError>;

/// Bring the full engine up: pool checkpointing, the periodic collectors
/// and the network injection schedule. Idempotent; the accumulator and
/// multiplexer initialize lazily regardless.
pub fn start() {
    if STARTED.swap(true, Ordering::SeqCst) {
        return;
    }

    fortuna::accumulator().enable_checkpoints();
    entropy::collectors::scheduler().start_default();
    if net::start() {
        tracing::info!("network entropy schedule started");
    }

    // Carry the previous run's bootstrap entropy forward, and checkpoint a
    // fresh batch for the next one.
    {
        let mut session = store::store().session();
        if let Some(record) = session.get_seed(store::INSTANT_SEED_NAME) {
            entropy::system::multiplexer().inject_seed(record.data);
        }
    }
    store::writeback::enqueue_deferred(store::INSTANT_SEED_NAME.to_string(), || {
        entropy::instant::generate().to_vec()
    });

    tracing::info!("entropy engine started");
}

/// Stop collectors, drain the seed write-back queue and close storage.
/// Safe to call more than once; called from the signal path.
pub fn shutdown() {
    if SHUTTING_DOWN.swap(true, Ordering::SeqCst) {
        return;
    }
    entropy::collectors::scheduler().stop_all();
    store::writeback::shutdown();
    tracing::info!("entropy engine shut down");
}

pub fn is_shutting_down() -> bool {
    SHUTTING_DOWN.load(Ordering::SeqCst)
}

/// Draw `n` bytes from a named provider algorithm (per-call reseed, seeded
/// from the accumulator).
pub fn random_bytes(algorithm: &str, n: usize) -> RngResult<Vec<u8>> {
    let drbg = provider_instance(algorithm)
        .ok_or_else(|| RngError::UnknownAlgorithm(algorithm.to_string()))?;
    let mut out = vec![0u8; n];
    drbg.lock().expect("provider drbg lock").next_bytes(&mut out);
    Ok(out)
}
