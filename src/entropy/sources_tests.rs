#[cfg(test)]
mod tests {
    use crate::entropy::sources::{self, DevURandom, EntropySource, OsRandom, RingSystem, TimerJitter};

    #[test]
    fn test_discover_never_empty() {
        let sources = sources::discover();
        assert!(sources.len() >= 5);
        // ring, the OS RNG and jitter carry no device dependency.
        assert!(sources
            .iter()
            .filter(|s| s.is_available())
            .count() >= 3);
    }

    #[test]
    fn test_by_name() {
        for name in ["hwrng", "ring", "urandom", "osrng", "jitter"] {
            let source = sources::by_name(name).expect("known source name");
            assert_eq!(source.name(), name);
        }
        assert!(sources::by_name("quantum-foam").is_none());
    }

    #[test]
    fn test_ring_fills() {
        let ring = RingSystem::new();
        assert!(ring.is_available());
        let mut buf = [0u8; 64];
        ring.fill_bytes(&mut buf).expect("ring fills");
        assert!(buf.iter().any(|&b| b != 0));
    }

    #[test]
    fn test_os_rng_fills() {
        let rng = OsRandom::new();
        assert!(rng.is_available());
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        rng.fill_bytes(&mut a).expect("os rng fills");
        rng.fill_bytes(&mut b).expect("os rng fills");
        assert_ne!(a, b);
    }

    #[test]
    fn test_urandom_when_present() {
        let urandom = DevURandom::new();
        if urandom.is_available() {
            let mut buf = [0u8; 32];
            urandom.fill_bytes(&mut buf).expect("urandom fills");
            assert!(urandom.quality() > 0.0);
        } else {
            let mut buf = [0u8; 4];
            assert!(urandom.fill_bytes(&mut buf).is_err());
        }
    }

    /// Jitter is always available and never produces the same block twice.
    #[test]
    fn test_jitter() {
        let jitter = TimerJitter::new();
        assert!(jitter.is_available());

        let mut a = [0u8; 96];
        let mut b = [0u8; 96];
        jitter.fill_bytes(&mut a).expect("jitter fills");
        jitter.fill_bytes(&mut b).expect("jitter fills");
        assert_ne!(a, b);

        // Requests larger than one digest still fill completely.
        let mut large = [0u8; 200];
        jitter.fill_bytes(&mut large).expect("jitter fills");
        assert!(large[64..].iter().any(|&b| b != 0));
    }

    #[test]
    fn test_quality_ranges() {
        for source in sources::discover() {
            let quality = source.quality();
            assert!((0.0..=1.0).contains(&quality), "{} quality", source.name());
        }
    }
}
