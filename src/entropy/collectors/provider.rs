/// Other-provider output: periodically pull bytes from named host sources
/// so their internal state keeps leaking into the pools even when the
/// multiplexer is idle.
use std::time::Duration;

use super::{EntropyCollector, PoolCounter};
use crate::entropy::sources::{self, EntropySource};

const PULL_LEN: usize = 32;

pub struct ProviderOutput {
    pool: PoolCounter,
    delay: Duration,
    sources: Vec<Box<dyn EntropySource>>,
    next: usize,
}

impl ProviderOutput {
    pub fn new() -> ProviderOutput {
        ProviderOutput {
            pool: PoolCounter::new(),
            delay: crate::config::settings().collector_delay("provider", 5_000),
            sources: Vec::new(),
            next: 0,
        }
    }
}

impl Default for ProviderOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropyCollector for ProviderOutput {
    fn name(&self) -> &'static str {
        "provider"
    }

    fn initialise(&mut self) -> bool {
        for name in crate::config::settings().provider_collector_algorithms() {
            match sources::by_name(&name) {
                Some(source) if source.is_available() => self.sources.push(source),
                Some(_) => tracing::debug!(source = %name, "provider source unavailable"),
                None => tracing::warn!(source = %name, "unknown provider source name"),
            }
        }
        !self.sources.is_empty()
    }

    fn delay(&self) -> Duration {
        self.delay
    }

    fn sample(&mut self) -> Option<Vec<u8>> {
        if self.sources.is_empty() {
            return None;
        }

        let index = self.next % self.sources.len();
        self.next = self.next.wrapping_add(1);

        let mut event = vec![0u8; PULL_LEN];
        match self.sources[index].fill_bytes(&mut event) {
            Ok(()) => Some(event),
            Err(e) => {
                tracing::debug!(source = self.sources[index].name(), error = %e, "provider pull failed");
                None
            }
        }
    }

    fn pool_counter(&mut self) -> &mut PoolCounter {
        &mut self.pool
    }
}
