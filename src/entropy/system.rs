/// System-RNG multiplexer.
///
/// Every available host source is wrapped with a 256-byte refill block and
/// drawn from one byte at a time, round-robin from a random starting point.
/// Refills run asynchronously on the multiplexer's own runtime so a host
/// facility that blocks waiting for kernel entropy never stalls a caller;
/// `available` stays at −1 until the first refill lands. Wrappers
/// cross-pollinate through a completion channel of 32-byte seeds and accept
/// externally injected seed material through a bounded queue.
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use lazy_static::lazy_static;
use sha2::{Digest, Sha256};
use tokio::runtime::{Builder, Runtime};

use super::sources::{self, EntropySource};
use crate::drbg::SeedSource;
use crate::isaac;

const BLOCK_LEN: usize = 256;
const INJECT_QUEUE_MAX: usize = 16;

lazy_static! {
    static ref SYSTEM: Arc<SystemRng> = Arc::new(SystemRng::new(sources::discover()));
}

/// The process-wide multiplexer over every host RNG.
pub fn multiplexer() -> Arc<SystemRng> {
    SYSTEM.clone()
}

struct WrapperState {
    block: [u8; BLOCK_LEN],
    /// −1 before the first refill completes; number of unread bytes after.
    available: i32,
    /// Refills left before this wrapper consumes a cross-pollination seed.
    reseed_countdown: i32,
    injected: VecDeque<Vec<u8>>,
}

struct HostRng {
    source: Box<dyn EntropySource>,
    state: Mutex<WrapperState>,
    refilling: AtomicBool,
    failed: AtomicBool,
    served: AtomicU64,
}

impl HostRng {
    /// One byte from the refill block, or None while empty/initializing.
    /// The second tuple element reports that this draw drained the block
    /// and a refill is due.
    fn take_byte(&self) -> Option<(u8, bool)> {
        let mut state = self.state.lock().expect("wrapper lock");
        if state.available <= 0 {
            return None;
        }
        state.available -= 1;
        let byte = state.block[state.available as usize];
        let drained = state.available == 0;
        drop(state);

        self.served.fetch_add(1, Ordering::Relaxed);
        Some((byte, drained))
    }
}

/// Status snapshot for one wrapped source.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SourceStatus {
    pub name: &'static str,
    pub quality: f64,
    pub available: i32,
    pub served: u64,
    pub failed: bool,
}

pub struct SystemRng {
    wrappers: Vec<Arc<HostRng>>,
    pollination_tx: Mutex<Sender<Vec<u8>>>,
    pollination_rx: Mutex<Receiver<Vec<u8>>>,
    runtime: Runtime,
}

impl SystemRng {
    /// Wrap the available sources and dispatch their initial refills. Never
    /// blocks: callers fall back to instant entropy until blocks land.
    pub fn new(discovered: Vec<Box<dyn EntropySource>>) -> SystemRng {
        let available: Vec<Box<dyn EntropySource>> = discovered
            .into_iter()
            .filter(|source| source.is_available())
            .collect();
        let count = available.len().max(1);

        let runtime = Builder::new_multi_thread()
            .worker_threads(2 * count)
            .thread_name("system-rng")
            .enable_time()
            .build()
            .expect("system rng runtime");

        let (pollination_tx, pollination_rx) = mpsc::channel();

        let wrappers: Vec<Arc<HostRng>> = available
            .into_iter()
            .map(|source| {
                let countdown = {
                    let shared = isaac::shared();
                    let mut rng = shared.lock().expect("shared isaac lock");
                    rng.next_below(count as u32) as i32
                };
                Arc::new(HostRng {
                    source,
                    state: Mutex::new(WrapperState {
                        block: [0u8; BLOCK_LEN],
                        available: -1,
                        reseed_countdown: countdown,
                        injected: VecDeque::new(),
                    }),
                    refilling: AtomicBool::new(false),
                    failed: AtomicBool::new(false),
                    served: AtomicU64::new(0),
                })
            })
            .collect();

        let rng = SystemRng {
            wrappers,
            pollination_tx: Mutex::new(pollination_tx),
            pollination_rx: Mutex::new(pollination_rx),
            runtime,
        };

        for wrapper in &rng.wrappers {
            rng.submit_seed_task(wrapper.clone());
            rng.trigger_refill(wrapper.clone());
        }

        rng
    }

    /// Draw `n` bytes, one at a time, round-robin across the wrappers from
    /// a random starting source. Bytes no wrapper can supply come from
    /// instant entropy.
    pub fn get_seed_bytes(&self, n: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(n);
        if self.wrappers.is_empty() {
            return super::instant::holder().get_seed(n);
        }

        let start = {
            let shared = isaac::shared();
            let mut rng = shared.lock().expect("shared isaac lock");
            rng.next_below(self.wrappers.len() as u32) as usize
        };

        let mut fallback: Vec<u8> = Vec::new();
        for i in 0..n {
            let mut byte = None;
            for offset in 0..self.wrappers.len() {
                let wrapper = &self.wrappers[(start + i + offset) % self.wrappers.len()];
                if let Some((b, drained)) = wrapper.take_byte() {
                    if drained {
                        self.trigger_refill(wrapper.clone());
                    }
                    byte = Some(b);
                    break;
                }
            }

            match byte {
                Some(b) => out.push(b),
                None => {
                    if fallback.is_empty() {
                        fallback = super::instant::holder().get_seed(n - i);
                        fallback.reverse();
                    }
                    out.push(fallback.pop().unwrap_or(0));
                }
            }
        }

        out
    }

    /// Push seed material into a random wrapper's injection queue. A full
    /// queue combines its oldest entry with the newcomer by digest; entropy
    /// is never dropped.
    pub fn inject_seed(&self, data: Vec<u8>) {
        if self.wrappers.is_empty() || data.is_empty() {
            return;
        }
        let pick = {
            let shared = isaac::shared();
            let mut rng = shared.lock().expect("shared isaac lock");
            rng.next_below(self.wrappers.len() as u32) as usize
        };
        let wrapper = &self.wrappers[pick];
        let mut state = wrapper.state.lock().expect("wrapper lock");
        if state.injected.len() >= INJECT_QUEUE_MAX {
            let oldest = state.injected.pop_front().unwrap_or_default();
            let mut hasher = Sha256::new();
            hasher.update(&oldest);
            hasher.update(&data);
            state.injected.push_front(hasher.finalize().to_vec());
        } else {
            state.injected.push_back(data);
        }
    }

    /// Snapshot for status reporting.
    pub fn status(&self) -> Vec<SourceStatus> {
        self.wrappers
            .iter()
            .map(|w| {
                let state = w.state.lock().expect("wrapper lock");
                SourceStatus {
                    name: w.source.name(),
                    quality: w.source.quality(),
                    available: state.available,
                    served: w.served.load(Ordering::Relaxed),
                    failed: w.failed.load(Ordering::Relaxed),
                }
            })
            .collect()
    }

    fn trigger_refill(&self, wrapper: Arc<HostRng>) {
        if wrapper.failed.load(Ordering::Relaxed) {
            return;
        }
        if wrapper
            .refilling
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let (rx_seed, pollinated) = self.take_refill_seed(&wrapper);

        let task_wrapper = wrapper.clone();
        self.runtime.spawn_blocking(move || {
            refill(&task_wrapper, rx_seed);
        });

        // A consumed (or even attempted) cross-pollination draw re-enrolls
        // this wrapper's seed task so the completion channel stays fed.
        if pollinated {
            self.submit_seed_task(wrapper);
        }
    }

    /// Seed material for the next refill: an injected seed when one is
    /// queued, otherwise — once the wrapper's countdown expires — a
    /// cross-pollination seed from the completion channel.
    fn take_refill_seed(&self, wrapper: &Arc<HostRng>) -> (Option<Vec<u8>>, bool) {
        let mut state = wrapper.state.lock().expect("wrapper lock");

        if let Some(injected) = state.injected.pop_front() {
            return (Some(injected), false);
        }

        state.reseed_countdown -= 1;
        if state.reseed_countdown >= 0 {
            return (None, false);
        }
        state.reseed_countdown = {
            let shared = isaac::shared();
            let mut rng = shared.lock().expect("shared isaac lock");
            rng.next_below(self.wrappers.len() as u32) as i32
        };
        drop(state);

        let seed = {
            let rx = self.pollination_rx.lock().expect("pollination lock");
            rx.try_recv().ok()
        };
        (seed, true)
    }

    /// Enroll a task producing one 32-byte seed from this wrapper's host
    /// source into the shared completion channel.
    fn submit_seed_task(&self, wrapper: Arc<HostRng>) {
        let tx = self
            .pollination_tx
            .lock()
            .expect("pollination lock")
            .clone();
        self.runtime.spawn_blocking(move || {
            let mut seed = [0u8; 32];
            if wrapper.source.fill_bytes(&mut seed).is_ok() {
                let _ = tx.send(seed.to_vec());
            }
        });
    }
}

/// Refill the wrapper's block from its host source, folding in any seed
/// material. Failure logs once and idles the wrapper.
fn refill(wrapper: &Arc<HostRng>, seed: Option<Vec<u8>>) {
    let mut block = [0u8; BLOCK_LEN];
    let result = wrapper.source.fill_bytes(&mut block);

    match result {
        Ok(()) => {
            if let Some(seed) = seed {
                fold_seed(&mut block, &seed);
            }
            let mut state = wrapper.state.lock().expect("wrapper lock");
            state.block = block;
            state.available = BLOCK_LEN as i32;
        }
        Err(e) => {
            tracing::warn!(source = wrapper.source.name(), error = %e, "host RNG refill failed; idling source");
            wrapper.failed.store(true, Ordering::Relaxed);
            let mut state = wrapper.state.lock().expect("wrapper lock");
            state.available = -1;
        }
    }

    wrapper.refilling.store(false, Ordering::SeqCst);
}

/// XOR a SHA-256 expansion of the seed across the block so injected
/// material perturbs every byte.
fn fold_seed(block: &mut [u8; BLOCK_LEN], seed: &[u8]) {
    for (lane, chunk) in block.chunks_mut(32).enumerate() {
        let mut hasher = Sha256::new();
        hasher.update(seed);
        hasher.update([lane as u8]);
        let mask = hasher.finalize();
        for (byte, m) in chunk.iter_mut().zip(mask.iter()) {
            *byte ^= m;
        }
    }
}

impl SeedSource for SystemRng {
    fn get_seed(&self, n: usize) -> Vec<u8> {
        self.get_seed_bytes(n)
    }
}
