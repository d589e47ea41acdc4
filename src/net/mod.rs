/// Network entropy manager.
///
/// Sixty-four cached 128-byte seeds, refreshed from weighted-random on-line
/// sources under a freshness/usage policy, are sampled for 16-byte events
/// injected into the accumulator. A slot is refetched when its data is
/// missing, when it is older than [`MAX_AGE_MS`], or when it is past
/// [`MIN_AGE_MS`] with at least [`MIN_USAGE`] uses — and opportunistically
/// with probability 1/expected_usage on every injection.
pub mod beacon;
pub mod binary;
pub mod json_rpc;
pub mod source;

#[cfg(test)]
mod net_tests;

use std::sync::{Arc, Mutex};

use lazy_static::lazy_static;

use crate::entropy::collectors::PoolCounter;
use crate::isaac;
use crate::store::{self, writeback, SeedRecord, SeedTrailer};

pub use source::{load, NetworkError, NetworkSource, SEED_LEN};

/// Number of cached seed slots.
pub const SLOTS: usize = 64;

/// Age below which a used-up seed is still retained.
pub const MIN_AGE_MS: i64 = 24 * 60 * 60 * 1000;

/// Age beyond which a seed is always refetched.
pub const MAX_AGE_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Uses after which an old-enough seed is refetched.
pub const MIN_USAGE: u32 = 32;

/// Bytes sampled from a cached block per injected event.
const EVENT_LEN: usize = 16;

/// One cached network seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetSeed {
    pub data: Vec<u8>,
    /// Wall-clock load time, milliseconds since the epoch.
    pub load_time: i64,
    pub usage: u32,
    pub cursor: u32,
}

impl NetSeed {
    fn fresh(data: Vec<u8>, now_ms: i64) -> NetSeed {
        NetSeed {
            data,
            load_time: now_ms,
            usage: 0,
            cursor: 0,
        }
    }

    /// The refresh predicate: missing data, past the hard age limit, or
    /// old enough and used enough.
    pub fn needs_refresh(&self, now_ms: i64) -> bool {
        if self.data.is_empty() {
            return true;
        }
        let age = now_ms - self.load_time;
        age > MAX_AGE_MS || (age > MIN_AGE_MS && self.usage >= MIN_USAGE)
    }
}

struct WeightedSource {
    source: Box<dyn NetworkSource>,
    weight: f64,
}

pub struct NetworkManager {
    sources: Vec<WeightedSource>,
    slots: Mutex<Vec<Option<NetSeed>>>,
    pool: Mutex<PoolCounter>,
    expected_usage: u32,
    seeds_used: u32,
    persist: bool,
}

/// Status of one slot, for diagnostics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SlotStatus {
    pub slot: usize,
    pub age_ms: i64,
    pub usage: u32,
}

impl NetworkManager {
    /// Build from configuration: sources with weight > 0, normalized, plus
    /// the cached slots from storage. None when no source is enabled.
    pub fn from_config() -> Option<NetworkManager> {
        let settings = crate::config::settings();

        let json_rpc = json_rpc::JsonRpcSource::from_config();
        let json_rpc_default = if json_rpc.has_api_key() { 1.0 } else { 0.0 };

        let candidates: Vec<(Box<dyn NetworkSource>, f64)> = vec![
            (
                Box::new(beacon::BeaconSource::from_config()) as Box<dyn NetworkSource>,
                settings.network_source_weight("beacon", 1.0),
            ),
            (
                Box::new(binary::BinaryHttpSource::decay()),
                settings.network_source_weight("decay", 1.0),
            ),
            (
                Box::new(binary::BinaryHttpSource::quantum()),
                settings.network_source_weight("quantum", 1.0),
            ),
            (
                Box::new(json_rpc),
                settings.network_source_weight("json_rpc", json_rpc_default),
            ),
        ];

        let mut manager = NetworkManager::with_sources(candidates)?;
        manager.persist = true;
        manager.load_cached();
        Some(manager)
    }

    /// Build from explicit sources and weights; no persistence. None when
    /// every weight is zero.
    pub fn with_sources(
        candidates: Vec<(Box<dyn NetworkSource>, f64)>,
    ) -> Option<NetworkManager> {
        let mut sources: Vec<WeightedSource> = candidates
            .into_iter()
            .filter(|(_, weight)| *weight > 0.0)
            .map(|(source, weight)| WeightedSource { source, weight })
            .collect();

        if sources.is_empty() {
            tracing::info!("no network entropy sources enabled");
            return None;
        }

        let total: f64 = sources.iter().map(|s| s.weight).sum();
        for entry in &mut sources {
            entry.weight /= total;
        }

        let settings = crate::config::settings();
        Some(NetworkManager {
            sources,
            slots: Mutex::new((0..SLOTS).map(|_| None).collect()),
            pool: Mutex::new(PoolCounter::new()),
            expected_usage: settings.network_expected_usage(),
            seeds_used: settings.network_seeds_used(),
            persist: false,
        })
    }

    /// One injection cycle: `seeds_used` events sampled from (possibly
    /// refreshed) random slots, fed into the accumulator.
    pub fn inject(&self) {
        for _ in 0..self.seeds_used {
            let (slot_index, opportunistic) = {
                let shared = isaac::shared();
                let mut rng = shared.lock().expect("shared isaac lock");
                (
                    rng.next_below(SLOTS as u32) as usize,
                    rng.next_below(self.expected_usage) == 0,
                )
            };

            let now = now_ms();
            let stale = {
                let slots = self.slots.lock().expect("net slot lock");
                slots[slot_index]
                    .as_ref()
                    .map_or(true, |seed| seed.needs_refresh(now))
            };

            if stale || opportunistic {
                self.refresh_slot(slot_index, now);
            }

            let sampled = {
                let mut slots = self.slots.lock().expect("net slot lock");
                match slots[slot_index].as_mut() {
                    Some(seed) if !seed.data.is_empty() => {
                        let indices = random_indices();
                        let event = sample_at(&seed.data, &indices);
                        seed.usage += 1;
                        seed.cursor = seed.cursor.wrapping_add(EVENT_LEN as u32);
                        Some((event, seed.clone()))
                    }
                    _ => None,
                }
            };

            if let Some((event, snapshot)) = sampled {
                self.persist_slot(slot_index, &snapshot);
                let pool = self.pool.lock().expect("net pool lock").next();
                crate::fortuna::accumulator().add_event(pool, &event);
            }
        }
    }

    /// Fill every empty slot now. Populated slots are left alone, however
    /// stale; aging out is `inject`'s business.
    pub fn fetch(&self) {
        let now = now_ms();
        for slot_index in 0..SLOTS {
            let empty = {
                let slots = self.slots.lock().expect("net slot lock");
                slots[slot_index].is_none()
            };
            if empty {
                self.refresh_slot(slot_index, now);
            }
        }
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.source.name()).collect()
    }

    /// Snapshot of the populated slots.
    pub fn status(&self) -> Vec<SlotStatus> {
        let now = now_ms();
        let slots = self.slots.lock().expect("net slot lock");
        slots
            .iter()
            .enumerate()
            .filter_map(|(slot, seed)| {
                seed.as_ref().map(|seed| SlotStatus {
                    slot,
                    age_ms: now - seed.load_time,
                    usage: seed.usage,
                })
            })
            .collect()
    }

    /// Fetch one block from a weighted-random source into a slot. A failed
    /// fetch evicts whatever the slot held: from here on it reads as empty
    /// rather than serving stale bytes.
    fn refresh_slot(&self, slot_index: usize, now: i64) {
        let roll = {
            let shared = isaac::shared();
            let mut rng = shared.lock().expect("shared isaac lock");
            rng.next_u32() as f64 / (u32::MAX as f64 + 1.0)
        };
        let pick = pick_weighted(
            &self.sources.iter().map(|s| s.weight).collect::<Vec<f64>>(),
            roll,
        );
        let source = &self.sources[pick].source;

        let data = source::load(&**source);
        if data.is_empty() {
            let mut slots = self.slots.lock().expect("net slot lock");
            slots[slot_index] = None;
            return;
        }

        let seed = NetSeed::fresh(data, now);
        self.persist_slot(slot_index, &seed);
        let mut slots = self.slots.lock().expect("net slot lock");
        slots[slot_index] = Some(seed);
    }

    fn persist_slot(&self, slot_index: usize, seed: &NetSeed) {
        if !self.persist {
            return;
        }
        writeback::enqueue(SeedRecord {
            name: store::net_seed_name(slot_index),
            data: seed.data.clone(),
            trailer: SeedTrailer::Network {
                load_time: seed.load_time,
                usage: seed.usage,
                cursor: seed.cursor,
            },
        });
    }

    #[cfg(test)]
    pub(crate) fn set_slot(&self, slot_index: usize, seed: Option<NetSeed>) {
        self.slots.lock().expect("net slot lock")[slot_index] = seed;
    }

    #[cfg(test)]
    pub(crate) fn slot(&self, slot_index: usize) -> Option<NetSeed> {
        self.slots.lock().expect("net slot lock")[slot_index].clone()
    }

    fn load_cached(&mut self) {
        let mut session = store::store().session();
        let mut loaded = 0;
        let mut slots = self.slots.lock().expect("net slot lock");
        for (slot_index, slot) in slots.iter_mut().enumerate() {
            if let Some(record) = session.get_seed(&store::net_seed_name(slot_index)) {
                if let SeedTrailer::Network {
                    load_time,
                    usage,
                    cursor,
                } = record.trailer
                {
                    if !record.data.is_empty() {
                        *slot = Some(NetSeed {
                            data: record.data,
                            load_time,
                            usage,
                            cursor,
                        });
                        loaded += 1;
                    }
                }
            }
        }
        drop(slots);
        if loaded > 0 {
            tracing::debug!(slots = loaded, "cached network seeds loaded");
        }
    }
}

/// Weighted pick over normalized weights: the index whose cumulative
/// weight first exceeds `roll` in [0, 1).
pub(crate) fn pick_weighted(weights: &[f64], roll: f64) -> usize {
    let mut cumulative = 0.0;
    for (index, weight) in weights.iter().enumerate() {
        cumulative += weight;
        if roll < cumulative {
            return index;
        }
    }
    weights.len().saturating_sub(1)
}

/// Sixteen bytes picked from a block by explicit indices.
pub(crate) fn sample_at(block: &[u8], indices: &[usize; EVENT_LEN]) -> Vec<u8> {
    indices.iter().map(|&i| block[i % block.len()]).collect()
}

/// Sixteen random 7-bit indices into a 128-byte block.
fn random_indices() -> [usize; EVENT_LEN] {
    let shared = isaac::shared();
    let mut rng = shared.lock().expect("shared isaac lock");
    let mut indices = [0usize; EVENT_LEN];
    for slot in indices.iter_mut() {
        *slot = rng.next_below(SEED_LEN as u32) as usize;
    }
    indices
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

lazy_static! {
    static ref MANAGER: Option<Arc<NetworkManager>> = NetworkManager::from_config().map(Arc::new);
}

/// The configured global manager; None when no source is enabled.
pub fn manager() -> Option<Arc<NetworkManager>> {
    MANAGER.clone()
}

/// Schedule periodic injection cycles for the global manager. Returns
/// false when networking is disabled.
pub fn start() -> bool {
    let Some(manager) = manager() else {
        return false;
    };
    if !crate::config::settings().collector_enabled("network") {
        return false;
    }

    let delay = crate::config::settings().collector_delay("network", 30_000);
    crate::exec::scheduler().spawn(async move {
        loop {
            tokio::time::sleep(delay).await;
            let cycle = manager.clone();
            // Fetches may block for the full timeout; keep them off the
            // scheduler thread.
            crate::exec::workers().spawn_blocking(move || cycle.inject());
        }
    });
    true
}
