/// Framebuffer capture: a random rectangle of the console framebuffer,
/// digested to 32 bytes. Requires a readable `/dev/fb0`; headless or
/// unprivileged processes simply disable this collector at probe time.
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::time::Duration;

use sha2::{Digest, Sha256};

use super::{EntropyCollector, PoolCounter};
use crate::isaac;

const DEVICE: &str = "/dev/fb0";

pub struct FramebufferCapture {
    pool: PoolCounter,
    delay: Duration,
    sample_len: usize,
    device: Option<File>,
}

impl FramebufferCapture {
    pub fn new() -> FramebufferCapture {
        let settings = crate::config::settings();
        let width = settings.framebuffer_sample_width() as usize;
        let height = settings.framebuffer_sample_height() as usize;
        FramebufferCapture {
            pool: PoolCounter::new(),
            delay: settings.collector_delay("framebuffer", 1_000),
            sample_len: (width * height).max(1),
            device: None,
        }
    }
}

impl Default for FramebufferCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropyCollector for FramebufferCapture {
    fn name(&self) -> &'static str {
        "framebuffer"
    }

    fn initialise(&mut self) -> bool {
        match File::open(DEVICE) {
            Ok(mut file) => {
                let mut probe = [0u8; 1];
                if file.read(&mut probe).is_err() {
                    return false;
                }
                self.device = Some(file);
                true
            }
            Err(_) => false,
        }
    }

    fn delay(&self) -> Duration {
        self.delay
    }

    fn sample(&mut self) -> Option<Vec<u8>> {
        let device = self.device.as_mut()?;

        // A random window; framebuffers are small so keep offsets modest.
        let offset = {
            let shared = isaac::shared();
            let mut rng = shared.lock().expect("shared isaac lock");
            rng.next_below(1 << 20) as u64
        };

        let mut window = vec![0u8; self.sample_len];
        if device.seek(SeekFrom::Start(offset)).is_err() {
            let _ = device.seek(SeekFrom::Start(0));
        }
        let read = match device.read(&mut window) {
            Ok(0) => {
                // Past the end; retry from the origin.
                device.seek(SeekFrom::Start(0)).ok()?;
                device.read(&mut window).ok()?
            }
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(error = %e, "framebuffer read failed");
                return None;
            }
        };

        if read == 0 {
            return None;
        }

        Some(Sha256::digest(&window[..read]).to_vec())
    }

    fn pool_counter(&mut self) -> &mut PoolCounter {
        &mut self.pool
    }
}
