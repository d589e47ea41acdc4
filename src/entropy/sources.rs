/// Host-provided random sources.
///
/// Each source wraps one facility the platform already offers. Quality is a
/// coarse estimate used for status reporting; availability is probed once at
/// construction and a source that loses its backing device reports errors
/// rather than blocking.
use std::fs::File;
use std::io::Read;
use std::sync::Mutex;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha512};

/// One host entropy facility.
pub trait EntropySource: Send + Sync {
    /// Fill the buffer with random bytes.
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<()>;
    /// Entropy quality estimate in [0.0, 1.0].
    fn quality(&self) -> f64;
    /// Whether the backing facility was present at construction.
    fn is_available(&self) -> bool;
    /// Stable name used in configuration and status output.
    fn name(&self) -> &'static str;
}

/// Every host source this build knows, available or not. The multiplexer
/// keeps only the available ones.
pub fn discover() -> Vec<Box<dyn EntropySource>> {
    vec![
        Box::new(HardwareRng::new()),
        Box::new(RingSystem::new()),
        Box::new(DevURandom::new()),
        Box::new(OsRandom::new()),
        Box::new(TimerJitter::new()),
    ]
}

/// Look up a single source by its configuration name.
pub fn by_name(name: &str) -> Option<Box<dyn EntropySource>> {
    discover().into_iter().find(|s| s.name() == name)
}

/// Hardware RNG device (`/dev/hwrng` on Linux).
pub struct HardwareRng {
    available: bool,
}

impl Default for HardwareRng {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareRng {
    pub fn new() -> HardwareRng {
        let mut available = std::path::Path::new("/dev/hwrng").exists();
        if available {
            // A tiny probe read; the node can exist without being usable.
            match File::open("/dev/hwrng").and_then(|mut f| {
                let mut buf = [0u8; 1];
                f.read_exact(&mut buf)
            }) {
                Ok(_) => tracing::debug!("hardware RNG detected and readable"),
                Err(e) => {
                    tracing::debug!(error = %e, "/dev/hwrng exists but is not readable");
                    available = false;
                }
            }
        }
        HardwareRng { available }
    }
}

impl EntropySource for HardwareRng {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<()> {
        if !self.available {
            return Err(anyhow!("hardware RNG not available"));
        }

        let mut file =
            File::open("/dev/hwrng").map_err(|e| anyhow!("failed to open /dev/hwrng: {}", e))?;

        let mut total_read = 0usize;
        while total_read < dest.len() {
            let n = file
                .read(&mut dest[total_read..])
                .map_err(|e| anyhow!("failed to read /dev/hwrng: {}", e))?;
            if n == 0 {
                return Err(anyhow!("unexpected EOF reading /dev/hwrng"));
            }
            total_read += n;
        }

        Ok(())
    }

    fn quality(&self) -> f64 {
        if self.available {
            1.0
        } else {
            0.0
        }
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn name(&self) -> &'static str {
        "hwrng"
    }
}

/// `ring`'s SystemRandom (OS cryptographic facility).
pub struct RingSystem {
    rng: SystemRandom,
}

impl Default for RingSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl RingSystem {
    pub fn new() -> RingSystem {
        RingSystem {
            rng: SystemRandom::new(),
        }
    }
}

impl EntropySource for RingSystem {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<()> {
        self.rng
            .fill(dest)
            .map_err(|_| anyhow!("ring SystemRandom failed"))?;
        Ok(())
    }

    fn quality(&self) -> f64 {
        0.95
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "ring"
    }
}

/// `/dev/urandom`.
pub struct DevURandom {
    available: bool,
}

impl Default for DevURandom {
    fn default() -> Self {
        Self::new()
    }
}

impl DevURandom {
    pub fn new() -> DevURandom {
        DevURandom {
            available: std::path::Path::new("/dev/urandom").exists(),
        }
    }
}

impl EntropySource for DevURandom {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<()> {
        if !self.available {
            return Err(anyhow!("/dev/urandom not available"));
        }

        let mut file = File::open("/dev/urandom")
            .map_err(|e| anyhow!("failed to open /dev/urandom: {}", e))?;
        file.read_exact(dest)
            .map_err(|e| anyhow!("failed to read /dev/urandom: {}", e))?;

        Ok(())
    }

    fn quality(&self) -> f64 {
        if self.available {
            0.9
        } else {
            0.0
        }
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn name(&self) -> &'static str {
        "urandom"
    }
}

/// The getrandom-backed OS generator.
pub struct OsRandom;

impl Default for OsRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl OsRandom {
    pub fn new() -> OsRandom {
        OsRandom
    }
}

impl EntropySource for OsRandom {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<()> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| anyhow!("OS RNG failed: {}", e))?;
        Ok(())
    }

    fn quality(&self) -> f64 {
        0.9
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "osrng"
    }
}

/// CPU timing jitter, whitened through SHA-512. Lowest quality, always
/// available; keeps the multiplexer alive when every device is gone.
pub struct TimerJitter {
    last_value: Mutex<u64>,
}

impl Default for TimerJitter {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerJitter {
    pub fn new() -> TimerJitter {
        TimerJitter {
            last_value: Mutex::new(0),
        }
    }

    fn collect(&self) -> Vec<u8> {
        let mut entropy = Vec::with_capacity(256 * 8 + 32 * 8);

        for _ in 0..256 {
            let start = Instant::now();

            let mut x = 1u64;
            for i in 1..100 {
                x = x.wrapping_mul(i).wrapping_add(i);
                std::hint::black_box(&x);
            }

            let elapsed = start.elapsed().as_nanos() as u64;
            let sys_time = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0);

            let mut last = self.last_value.lock().expect("jitter lock");
            let diff = elapsed ^ *last ^ sys_time;
            *last = elapsed;
            drop(last);

            entropy.extend_from_slice(&diff.to_le_bytes());
        }

        // Allocation timing adds a second, independent noise channel.
        for _ in 0..32 {
            let start = Instant::now();
            let v: Vec<u8> = Vec::with_capacity(1024);
            std::hint::black_box(&v);
            entropy.extend_from_slice(&(start.elapsed().as_nanos() as u64).to_le_bytes());
        }

        entropy
    }
}

impl EntropySource for TimerJitter {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<()> {
        let raw = self.collect();

        let mut offset = 0;
        let mut counter = 0u64;
        while offset < dest.len() {
            let mut hasher = Sha512::new();
            hasher.update(&raw);
            hasher.update(counter.to_le_bytes());
            let hash = hasher.finalize();

            let n = hash.len().min(dest.len() - offset);
            dest[offset..offset + n].copy_from_slice(&hash[..n]);
            offset += n;
            counter += 1;
        }

        Ok(())
    }

    fn quality(&self) -> f64 {
        0.5
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "jitter"
    }
}
