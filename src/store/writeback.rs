/// Deferred write-back of seeds.
///
/// Producers enqueue either materialized seeds or deferred entries (a name
/// plus a closure producing the payload); one entry per name, newest wins.
/// The writer resolves deferred entries at flush time so checkpoints
/// capture state as of the write, not the enqueue. The delay between
/// flushes grows from `storage.save_period` by the configured multiplier
/// and increment up to `storage.save_period_max`.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use lazy_static::lazy_static;

use super::{SeedRecord, SeedTrailer};

pub enum SeedEntry {
    Direct(SeedRecord),
    Deferred {
        name: String,
        produce: Box<dyn Fn() -> Vec<u8> + Send + Sync>,
    },
}

impl SeedEntry {
    fn name(&self) -> &str {
        match self {
            SeedEntry::Direct(record) => &record.name,
            SeedEntry::Deferred { name, .. } => name,
        }
    }

    /// Materialize the payload; deferred entries resolve here.
    fn resolve(self) -> SeedRecord {
        match self {
            SeedEntry::Direct(record) => record,
            SeedEntry::Deferred { name, produce } => SeedRecord {
                name,
                data: produce(),
                trailer: SeedTrailer::None,
            },
        }
    }
}

lazy_static! {
    static ref QUEUE: Mutex<HashMap<String, SeedEntry>> = Mutex::new(HashMap::new());
}

static WRITER_STARTED: AtomicBool = AtomicBool::new(false);
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Queue a materialized seed for the next flush.
pub fn enqueue(record: SeedRecord) {
    push(SeedEntry::Direct(record));
}

/// Queue a deferred seed; `produce` runs on the write-back thread at flush
/// time.
pub fn enqueue_deferred(
    name: String,
    produce: impl Fn() -> Vec<u8> + Send + Sync + 'static,
) {
    push(SeedEntry::Deferred {
        name,
        produce: Box::new(produce),
    });
}

pub fn pending() -> usize {
    QUEUE.lock().expect("write-back queue lock").len()
}

/// Resolve and persist everything queued, now, on the calling thread.
pub fn flush_now() {
    let entries: Vec<SeedEntry> = {
        let mut queue = QUEUE.lock().expect("write-back queue lock");
        queue.drain().map(|(_, entry)| entry).collect()
    };

    if entries.is_empty() {
        return;
    }

    let count = entries.len();
    let mut session = super::store().session();
    for entry in entries {
        let record = entry.resolve();
        session.put_seed(&record);
    }
    drop(session);

    tracing::debug!(seeds = count, "seed write-back flushed");
}

/// Stop the writer, flush the queue and close the backend. Called from the
/// shutdown path; safe to call more than once.
pub fn shutdown() {
    SHUTDOWN.store(true, Ordering::SeqCst);
    flush_now();
    super::store().close();
}

fn push(entry: SeedEntry) {
    if SHUTDOWN.load(Ordering::SeqCst) {
        return;
    }
    {
        let mut queue = QUEUE.lock().expect("write-back queue lock");
        queue.insert(entry.name().to_string(), entry);
    }
    ensure_writer();
}


fn ensure_writer() {
    if WRITER_STARTED.swap(true, Ordering::SeqCst) {
        return;
    }

    let settings = crate::config::settings();
    let mut delay = settings.storage_save_period();
    let add = settings.storage_save_period_add();
    let max = settings.storage_save_period_max();
    let multiplier = settings.storage_save_period_multiplier();

    crate::exec::workers().spawn(async move {
        loop {
            tokio::time::sleep(delay).await;
            if SHUTDOWN.load(Ordering::SeqCst) {
                break;
            }

            let flushed = tokio::task::spawn_blocking(flush_now).await;
            if let Err(e) = flushed {
                tracing::warn!(error = %e, "seed write-back task failed");
            }

            delay = delay
                .saturating_mul(multiplier as u32)
                .saturating_add(add)
                .min(max);
        }
    });
}
