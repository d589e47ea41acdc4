/// Nonce factory and process personalization string.
///
/// Nonces are 256 bits: SHA-256 over a time-based UUID (timestamp, clock
/// sequence, node id) and the per-process identifier digest. The
/// personalization string is a SHA-512 over the identifier material plus
/// the executable path, the argument list and the environment.
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use lazy_static::lazy_static;
use sha2::{Digest, Sha256, Sha512};
use sysinfo::{Pid, ProcessRefreshKind, RefreshKind, System};
use uuid::timestamp::context::Context;
use uuid::{Timestamp, Uuid};

static NONCE_COUNTER: AtomicU64 = AtomicU64::new(0);

lazy_static! {
    static ref UUID_CONTEXT: Context = Context::new(nanos() as u16);
    static ref NODE_ID: [u8; 6] = derive_node_id();
    static ref PROCESS_ID: [u8; 32] = derive_process_id();
    static ref PERSONALIZATION: Vec<u8> = derive_personalization();
}

/// A fresh 256-bit nonce. Uniqueness comes from the UUID timestamp and
/// clock sequence plus a process-local counter.
pub fn next_nonce() -> [u8; 32] {
    let uuid = Uuid::new_v1(Timestamp::now(&*UUID_CONTEXT), &NODE_ID);

    let mut hasher = Sha256::new();
    hasher.update(uuid.as_bytes());
    hasher.update(*PROCESS_ID);
    hasher.update(NONCE_COUNTER.fetch_add(1, Ordering::Relaxed).to_be_bytes());
    hasher.finalize().into()
}

/// The process personalization string, stable for the process lifetime.
pub fn personalization() -> &'static [u8] {
    &PERSONALIZATION
}

fn nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn derive_node_id() -> [u8; 6] {
    let mut hasher = Sha256::new();
    hasher.update(std::process::id().to_be_bytes());
    if let Ok(hostname) = std::env::var("HOSTNAME") {
        hasher.update(hostname.as_bytes());
    }
    if let Ok(exe) = std::env::current_exe() {
        hasher.update(exe.to_string_lossy().as_bytes());
    }
    let digest = hasher.finalize();
    let mut node = [0u8; 6];
    node.copy_from_slice(&digest[..6]);
    node
}

/// Digest identifying this process: executable name, start time, the
/// address of a boot-time allocation, the nanosecond timer and the calling
/// thread id.
fn derive_process_id() -> [u8; 32] {
    let pid = std::process::id();
    let mut hasher = Sha256::new();
    hasher.update(pid.to_be_bytes());

    let system = System::new_with_specifics(
        RefreshKind::new().with_processes(ProcessRefreshKind::new()),
    );
    if let Some(process) = system.process(Pid::from_u32(pid)) {
        hasher.update(process.name().as_bytes());
        hasher.update(process.start_time().to_be_bytes());
    }

    let marker = Box::new(0u64);
    hasher.update((&*marker as *const u64 as usize).to_be_bytes());
    hasher.update(nanos().to_be_bytes());
    hasher.update(format!("{:?}", std::thread::current().id()).as_bytes());
    hasher.finalize().into()
}

fn derive_personalization() -> Vec<u8> {
    let mut hasher = Sha512::new();
    hasher.update(*PROCESS_ID);

    if let Ok(exe) = std::env::current_exe() {
        hasher.update(exe.to_string_lossy().as_bytes());
    }
    for arg in std::env::args() {
        hasher.update(arg.as_bytes());
    }
    for (key, value) in std::env::vars() {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
    }

    hasher.finalize().to_vec()
}
