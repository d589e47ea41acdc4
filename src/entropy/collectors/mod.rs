/// Periodic entropy collectors.
///
/// Each collector probes its requirements once (`initialise`; false disables
/// it for the process lifetime), then produces one event per `run`. A single
/// scheduler owns every periodic task; events route into the accumulator
/// pool named by the low five bits of a per-collector round-robin counter.
///
/// Demand drives cadence: without consumers the scheduler doubles the delay
/// ratio every slow-down period up to `collector.max_ratio` (optionally
/// suspending outright); any accumulator draw resets the ratio.
pub mod audio;
pub mod framebuffer;
pub mod heap;
pub mod jitter;
pub mod memory;
pub mod provider;
pub mod thread_timing;


use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lazy_static::lazy_static;

/// Round-robin pool router; an event goes to pool `counter & 0x1F`.
pub struct PoolCounter(u32);

impl PoolCounter {
    pub fn new() -> PoolCounter {
        PoolCounter(0)
    }

    pub fn next(&mut self) -> usize {
        let pool = (self.0 & 0x1F) as usize;
        self.0 = self.0.wrapping_add(1);
        pool
    }

    /// Events routed so far.
    pub fn peek(&self) -> usize {
        self.0 as usize
    }
}

impl Default for PoolCounter {
    fn default() -> Self {
        PoolCounter::new()
    }
}

/// One periodic entropy sampler.
pub trait EntropyCollector: Send {
    /// Configuration and status name.
    fn name(&self) -> &'static str;

    /// Probe requirements. Returning false disables the collector; it is
    /// not retried.
    fn initialise(&mut self) -> bool;

    /// Nominal delay between events.
    fn delay(&self) -> Duration;

    /// Gather the bytes for one event. None when this cycle produced
    /// nothing usable.
    fn sample(&mut self) -> Option<Vec<u8>>;

    fn pool_counter(&mut self) -> &mut PoolCounter;

    /// Produce one event and feed it to the accumulator.
    fn run(&mut self) {
        if let Some(data) = self.sample() {
            let pool = self.pool_counter().next();
            crate::fortuna::accumulator().add_event(pool, &data);
        }
    }
}

lazy_static! {
    static ref SCHEDULER: Scheduler = Scheduler::new();
}

/// The process-wide collector scheduler.
pub fn scheduler() -> &'static Scheduler {
    &SCHEDULER
}

struct TaskHandle {
    cancel: Arc<AtomicBool>,
    handle: tokio::task::JoinHandle<()>,
}

pub struct Scheduler {
    tasks: Mutex<HashMap<&'static str, TaskHandle>>,
    suspended: Arc<AtomicBool>,
    ratio: Arc<AtomicU32>,
    slow_down_started: AtomicBool,
}

impl Scheduler {
    fn new() -> Scheduler {
        Scheduler {
            tasks: Mutex::new(HashMap::new()),
            suspended: Arc::new(AtomicBool::new(false)),
            ratio: Arc::new(AtomicU32::new(1)),
            slow_down_started: AtomicBool::new(false),
        }
    }

    /// Register every built-in collector the configuration enables.
    pub fn start_default(&self) {
        self.register(Box::new(jitter::SchedulingJitter::new()));
        self.register(Box::new(heap::HeapEntropy::new()));
        self.register(Box::new(memory::FreeMemory::new()));
        self.register(Box::new(thread_timing::ThreadTiming::new()));
        self.register(Box::new(framebuffer::FramebufferCapture::new()));
        self.register(Box::new(audio::AudioCapture::new()));
        self.register(Box::new(provider::ProviderOutput::new()));
        self.start_slow_down_task();
    }

    /// Schedule one collector. Disabled or failed-probe collectors are
    /// dropped here, once.
    pub fn register(&self, mut collector: Box<dyn EntropyCollector>) {
        let name = collector.name();
        if !crate::config::settings().collector_enabled(name) {
            tracing::debug!(collector = name, "collector disabled by configuration");
            return;
        }
        if !collector.initialise() {
            tracing::info!(collector = name, "collector unavailable; disabled");
            return;
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let task_cancel = cancel.clone();
        let suspended = self.suspended.clone();
        let ratio = self.ratio.clone();

        let handle = crate::exec::scheduler().spawn(async move {
            loop {
                let factor = ratio.load(Ordering::Relaxed).max(1);
                tokio::time::sleep(collector.delay() * factor).await;
                if task_cancel.load(Ordering::Relaxed) {
                    break;
                }
                if suspended.load(Ordering::Relaxed) {
                    continue;
                }
                collector.run();
            }
        });

        let mut tasks = self.tasks.lock().expect("scheduler task lock");
        if let Some(previous) = tasks.insert(name, TaskHandle { cancel, handle }) {
            previous.cancel.store(true, Ordering::Relaxed);
            previous.handle.abort();
        }
        tracing::debug!(collector = name, "collector scheduled");
    }

    /// Cancel one collector's task.
    pub fn cancel(&self, name: &str) {
        let mut tasks = self.tasks.lock().expect("scheduler task lock");
        if let Some(task) = tasks.remove(name) {
            task.cancel.store(true, Ordering::Relaxed);
            task.handle.abort();
        }
    }

    /// Stop every scheduled task.
    pub fn stop_all(&self) {
        let mut tasks = self.tasks.lock().expect("scheduler task lock");
        for (_, task) in tasks.drain() {
            task.cancel.store(true, Ordering::Relaxed);
            task.handle.abort();
        }
    }

    /// Atomically pause all collectors; scheduled tasks stay registered.
    pub fn suspend(&self) {
        self.suspended.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.suspended.store(false, Ordering::SeqCst);
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }

    /// Output demand: snap the cadence back to the configured minimum and
    /// lift a demand-driven suspension.
    pub fn reset_speed(&self) {
        let min_ratio = crate::config::settings().collector_min_ratio();
        self.ratio.store(min_ratio, Ordering::Relaxed);
        self.resume();
    }

    pub fn current_ratio(&self) -> u32 {
        self.ratio.load(Ordering::Relaxed)
    }

    fn start_slow_down_task(&self) {
        if self.slow_down_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let ratio = self.ratio.clone();
        let suspended = self.suspended.clone();
        let period = crate::config::settings().collector_slow_down_period();
        let max_ratio = crate::config::settings().collector_max_ratio();
        let allow_suspend = crate::config::settings().collector_allow_suspend();

        crate::exec::scheduler().spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                let current = ratio.load(Ordering::Relaxed).max(1);
                let next = (current.saturating_mul(2)).min(max_ratio);
                ratio.store(next, Ordering::Relaxed);
                if next >= max_ratio && allow_suspend {
                    suspended.store(true, Ordering::SeqCst);
                }
            }
        });
    }
}
