/// Scheduling jitter: differences of successive high-resolution timestamps.
use std::time::{Duration, Instant};

use super::{EntropyCollector, PoolCounter};

const SAMPLES: usize = 32;

pub struct SchedulingJitter {
    pool: PoolCounter,
    delay: Duration,
}

impl SchedulingJitter {
    pub fn new() -> SchedulingJitter {
        SchedulingJitter {
            pool: PoolCounter::new(),
            delay: crate::config::settings().collector_delay("jitter", 50),
        }
    }
}

impl Default for SchedulingJitter {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropyCollector for SchedulingJitter {
    fn name(&self) -> &'static str {
        "jitter"
    }

    fn initialise(&mut self) -> bool {
        true
    }

    fn delay(&self) -> Duration {
        self.delay
    }

    fn sample(&mut self) -> Option<Vec<u8>> {
        let mut event = Vec::with_capacity(SAMPLES);
        let mut previous = Instant::now();

        for _ in 0..SAMPLES {
            // A little work between reads so the deltas carry scheduler
            // noise rather than a constant instruction count.
            let mut x = 0u64;
            for i in 0..16u64 {
                x = x.wrapping_add(i).rotate_left(7);
                std::hint::black_box(&x);
            }

            let now = Instant::now();
            let delta = now.duration_since(previous).as_nanos() as u64;
            previous = now;
            event.push(delta as u8);
        }

        Some(event)
    }

    fn pool_counter(&mut self) -> &mut PoolCounter {
        &mut self.pool
    }
}
