/// Bounded background executors.
///
/// The engine runs no event loop of its own; these runtimes are the fixed
/// pools everything schedules onto: a single-worker scheduler for the
/// periodic collectors and a two-worker pool for seed-holder refills,
/// deferred-seed resolution and the store write-back. The system
/// multiplexer sizes its own runtime from its source count.
use lazy_static::lazy_static;
use tokio::runtime::{Builder, Runtime};

lazy_static! {
    static ref SCHEDULER: Runtime = Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("entropy-sched")
        .enable_time()
        .build()
        .expect("scheduler runtime");
    static ref WORKERS: Runtime = Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("seed-worker")
        .enable_time()
        .build()
        .expect("worker runtime");
}

/// The single-threaded periodic executor shared by all collectors.
pub fn scheduler() -> &'static Runtime {
    &SCHEDULER
}

/// The two-worker pool for refills, futures and write-back.
pub fn workers() -> &'static Runtime {
    &WORKERS
}
