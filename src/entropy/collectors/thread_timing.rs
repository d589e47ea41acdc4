/// Thread timing: spawn/start/join latencies of a short-lived thread,
/// which depend on run-queue depth and core migration.
use std::time::{Duration, Instant};

use super::{EntropyCollector, PoolCounter};

pub struct ThreadTiming {
    pool: PoolCounter,
    delay: Duration,
}

impl ThreadTiming {
    pub fn new() -> ThreadTiming {
        ThreadTiming {
            pool: PoolCounter::new(),
            delay: crate::config::settings().collector_delay("thread_timing", 500),
        }
    }
}

impl Default for ThreadTiming {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropyCollector for ThreadTiming {
    fn name(&self) -> &'static str {
        "thread_timing"
    }

    fn initialise(&mut self) -> bool {
        true
    }

    fn delay(&self) -> Duration {
        self.delay
    }

    fn sample(&mut self) -> Option<Vec<u8>> {
        let spawned = Instant::now();
        let handle = std::thread::Builder::new()
            .name("entropy-probe".to_string())
            .spawn(move || spawned.elapsed().as_nanos() as u64);

        let handle = match handle {
            Ok(handle) => handle,
            Err(e) => {
                tracing::debug!(error = %e, "thread timing probe failed to spawn");
                return None;
            }
        };

        let startup = handle.join().ok()?;
        let total = spawned.elapsed().as_nanos() as u64;

        let mut event = Vec::with_capacity(16);
        event.extend_from_slice(&startup.to_le_bytes());
        event.extend_from_slice(&total.to_le_bytes());
        Some(event)
    }

    fn pool_counter(&mut self) -> &mut PoolCounter {
        &mut self.pool
    }
}
