/// Heap entropy: the address of a fresh allocation, the closest native
/// analogue of an identity hash, mixed with the nanosecond timer.
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::{EntropyCollector, PoolCounter};

pub struct HeapEntropy {
    pool: PoolCounter,
    delay: Duration,
}

impl HeapEntropy {
    pub fn new() -> HeapEntropy {
        HeapEntropy {
            pool: PoolCounter::new(),
            delay: crate::config::settings().collector_delay("heap", 100),
        }
    }
}

impl Default for HeapEntropy {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropyCollector for HeapEntropy {
    fn name(&self) -> &'static str {
        "heap"
    }

    fn initialise(&mut self) -> bool {
        true
    }

    fn delay(&self) -> Duration {
        self.delay
    }

    fn sample(&mut self) -> Option<Vec<u8>> {
        // A size that varies per event keeps the allocator from handing the
        // same block straight back.
        let len = 32 + (self.pool.peek() % 7) * 16;
        let allocation = vec![0u8; len];
        let address = allocation.as_ptr() as usize as u64;
        std::hint::black_box(&allocation);

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);

        Some((address ^ nanos).to_le_bytes().to_vec())
    }

    fn pool_counter(&mut self) -> &mut PoolCounter {
        &mut self.pool
    }
}
