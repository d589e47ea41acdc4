/// Free-memory noise: the low bits of the runtime's reported free and
/// available memory wander with every allocation on the host.
use std::time::Duration;

use sysinfo::System;

use super::{EntropyCollector, PoolCounter};

pub struct FreeMemory {
    pool: PoolCounter,
    delay: Duration,
    system: System,
}

impl FreeMemory {
    pub fn new() -> FreeMemory {
        FreeMemory {
            pool: PoolCounter::new(),
            delay: crate::config::settings().collector_delay("free_memory", 250),
            system: System::new(),
        }
    }
}

impl Default for FreeMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropyCollector for FreeMemory {
    fn name(&self) -> &'static str {
        "free_memory"
    }

    fn initialise(&mut self) -> bool {
        self.system.refresh_memory();
        self.system.total_memory() > 0
    }

    fn delay(&self) -> Duration {
        self.delay
    }

    fn sample(&mut self) -> Option<Vec<u8>> {
        self.system.refresh_memory();
        let free = self.system.free_memory();
        let available = self.system.available_memory();

        let mut event = Vec::with_capacity(8);
        event.extend_from_slice(&(free as u32).to_le_bytes());
        event.extend_from_slice(&(available as u32).to_le_bytes());
        Some(event)
    }

    fn pool_counter(&mut self) -> &mut PoolCounter {
        &mut self.pool
    }
}
