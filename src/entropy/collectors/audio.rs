/// Audio capture: 128 raw frames from an OSS capture device, digested to
/// 32 bytes. The frame width is picked at random among the common sample
/// formats. Hosts without `/dev/dsp` (ALSA-only or headless) disable this
/// collector at probe time.
use std::fs::File;
use std::io::Read;
use std::time::Duration;

use sha2::{Digest, Sha256};

use super::{EntropyCollector, PoolCounter};
use crate::isaac;

const DEVICE: &str = "/dev/dsp";
const FRAMES: usize = 128;
/// Bytes per frame: 8-bit mono, 16-bit mono, 16-bit stereo, 32-bit stereo.
const FRAME_WIDTHS: [usize; 4] = [1, 2, 4, 8];

pub struct AudioCapture {
    pool: PoolCounter,
    delay: Duration,
    device: Option<File>,
}

impl AudioCapture {
    pub fn new() -> AudioCapture {
        AudioCapture {
            pool: PoolCounter::new(),
            delay: crate::config::settings().collector_delay("audio", 1_000),
            device: None,
        }
    }
}

impl Default for AudioCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropyCollector for AudioCapture {
    fn name(&self) -> &'static str {
        "audio"
    }

    fn initialise(&mut self) -> bool {
        match File::open(DEVICE) {
            Ok(file) => {
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

        let width = {
            let shared = isaac::shared();
            let mut rng = shared.lock().expect("shared isaac lock");
            FRAME_WIDTHS[rng.next_below(FRAME_WIDTHS.len() as u32) as usize]
        };

        let mut frames = vec![0u8; FRAMES * width];
        let read = match device.read(&mut frames) {
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(error = %e, "audio read failed");
                return None;
            }
        };

        if read == 0 {
            return None;
        }

        Some(Sha256::digest(&frames[..read]).to_vec())
    }

    fn pool_counter(&mut self) -> &mut PoolCounter {
        &mut self.pool
    }
}
