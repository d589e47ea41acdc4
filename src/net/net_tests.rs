#[cfg(test)]
mod tests {
    use crate::net::beacon::BeaconSource;
    use crate::net::binary::BinaryHttpSource;
    use crate::net::json_rpc::JsonRpcSource;
    use crate::net::NetworkError;
    use crate::net::{
        pick_weighted, sample_at, NetSeed, NetworkManager, NetworkSource, MAX_AGE_MS, MIN_AGE_MS,
        MIN_USAGE, SEED_LEN, SLOTS,
    };
    use sha2::{Digest, Sha512};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn seed_with(age_ms: i64, usage: u32) -> (NetSeed, i64) {
        let now = 1_700_000_000_000i64;
        let seed = NetSeed {
            data: vec![0xAA; SEED_LEN],
            load_time: now - age_ms,
            usage,
            cursor: 0,
        };
        (seed, now)
    }

    /// Deterministic source: counts fetches, optionally always failing.
    struct StubSource {
        fetches: Arc<AtomicU32>,
        fail: bool,
    }

    impl NetworkSource for StubSource {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn url(&self) -> &str {
            "http://stub.invalid/"
        }

        fn fetch(&self) -> Result<[u8; SEED_LEN], NetworkError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(NetworkError::Status(503))
            } else {
                Ok([0x2A; SEED_LEN])
            }
        }
    }

    fn stub_manager(fail: bool) -> (NetworkManager, Arc<AtomicU32>) {
        let fetches = Arc::new(AtomicU32::new(0));
        let source = StubSource {
            fetches: fetches.clone(),
            fail,
        };
        let manager = NetworkManager::with_sources(vec![(
            Box::new(source) as Box<dyn NetworkSource>,
            1.0,
        )])
        .expect("one weighted source");
        (manager, fetches)
    }

    fn wall_now() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    /// The freshness predicate and its boundary cases.
    #[test]
    fn test_refresh_predicate() {
        // Empty data always refreshes.
        let (mut seed, now) = seed_with(0, 0);
        seed.data.clear();
        assert!(seed.needs_refresh(now));

        // Young and lightly used: keep.
        let (seed, now) = seed_with(1000, 0);
        assert!(!seed.needs_refresh(now));

        // Past the hard age limit: refresh regardless of usage.
        let (seed, now) = seed_with(MAX_AGE_MS + 1, 0);
        assert!(seed.needs_refresh(now));

        // Exactly at the hard limit: keep.
        let (seed, now) = seed_with(MAX_AGE_MS, 0);
        assert!(!seed.needs_refresh(now));

        // Old enough but one use short: keep.
        let (seed, now) = seed_with(MIN_AGE_MS, MIN_USAGE - 1);
        assert!(!seed.needs_refresh(now));

        // Just past the soft age with the usage quota met: refresh.
        let (seed, now) = seed_with(MIN_AGE_MS + 1, MIN_USAGE);
        assert!(seed.needs_refresh(now));

        // At the soft age boundary the age test is strict: keep.
        let (seed, now) = seed_with(MIN_AGE_MS, MIN_USAGE);
        assert!(!seed.needs_refresh(now));

        // Used up but still young: keep.
        let (seed, now) = seed_with(1000, MIN_USAGE + 10);
        assert!(!seed.needs_refresh(now));
    }

    /// The 128-integer JSON-RPC body decodes to exactly its low bytes.
    #[test]
    fn test_json_rpc_decode() {
        let data: Vec<String> = (0..128).map(|i| i.to_string()).collect();
        let body = format!(
            "{{\"result\":{{\"random\":{{\"data\":[{}]}}}}}}",
            data.join(",")
        );

        let block = JsonRpcSource::decode(&body).expect("decodes");
        let expected: Vec<u8> = (0..128).map(|i| i as u8).collect();
        assert_eq!(&block[..], &expected[..]);
    }

    /// 127 elements is a count mismatch, not a parse error.
    #[test]
    fn test_json_rpc_wrong_count() {
        let data: Vec<String> = (0..127).map(|i| i.to_string()).collect();
        let body = format!(
            "{{\"result\":{{\"random\":{{\"data\":[{}]}}}}}}",
            data.join(",")
        );

        match JsonRpcSource::decode(&body) {
            Err(NetworkError::WrongCount(127)) => {}
            other => panic!("expected WrongCount(127), got {:?}", other.map(|b| b.len())),
        }
    }

    #[test]
    fn test_json_rpc_malformed() {
        assert!(matches!(
            JsonRpcSource::decode("not json"),
            Err(NetworkError::Payload(_))
        ));
        assert!(matches!(
            JsonRpcSource::decode("{\"result\":{}}"),
            Err(NetworkError::Payload(_))
        ));
        // Non-integer elements.
        let body = format!(
            "{{\"result\":{{\"random\":{{\"data\":[{}\"x\"]}}}}}}",
            "1,".repeat(127)
        );
        assert!(matches!(
            JsonRpcSource::decode(&body),
            Err(NetworkError::Payload(_))
        ));
    }

    /// Values above 255 contribute their low eight bits.
    #[test]
    fn test_json_rpc_low_bits() {
        let data: Vec<String> = (0..128).map(|i| (256 + i).to_string()).collect();
        let body = format!(
            "{{\"result\":{{\"random\":{{\"data\":[{}]}}}}}}",
            data.join(",")
        );
        let block = JsonRpcSource::decode(&body).expect("decodes");
        let expected: Vec<u8> = (0..128).map(|i| i as u8).collect();
        assert_eq!(&block[..], &expected[..]);
    }

    #[test]
    fn test_binary_decode() {
        let exact: Vec<u8> = (0..128).map(|i| i as u8).collect();
        assert_eq!(&BinaryHttpSource::decode(&exact).unwrap()[..], &exact[..]);

        assert!(matches!(
            BinaryHttpSource::decode(&exact[..127]),
            Err(NetworkError::WrongCount(127))
        ));
        let long = vec![0u8; 129];
        assert!(matches!(
            BinaryHttpSource::decode(&long),
            Err(NetworkError::WrongCount(129))
        ));
    }

    /// Beacon fold: SHA-512(0x00 ∥ body) ∥ SHA-512(0xFF ∥ body).
    #[test]
    fn test_beacon_digest_fold() {
        let body = b"pulse body bytes";
        let block = BeaconSource::digest_fold(body);

        let mut low = Sha512::new();
        low.update([0x00u8]);
        low.update(body);
        assert_eq!(&block[..64], &low.finalize()[..]);

        let mut high = Sha512::new();
        high.update([0xFFu8]);
        high.update(body);
        assert_eq!(&block[64..], &high.finalize()[..]);
    }

    #[test]
    fn test_pick_weighted() {
        let weights = [0.5, 0.25, 0.25];
        assert_eq!(pick_weighted(&weights, 0.0), 0);
        assert_eq!(pick_weighted(&weights, 0.49), 0);
        assert_eq!(pick_weighted(&weights, 0.5), 1);
        assert_eq!(pick_weighted(&weights, 0.74), 1);
        assert_eq!(pick_weighted(&weights, 0.75), 2);
        assert_eq!(pick_weighted(&weights, 0.999), 2);
        // Floating-point slop lands on the last source.
        assert_eq!(pick_weighted(&weights, 1.0), 2);
    }

    /// fetch() walks the 64 slots and fetches only into the empty ones;
    /// populated slots are untouched no matter how stale.
    #[test]
    fn test_fetch_fills_only_empty_slots() {
        let (manager, fetches) = stub_manager(false);
        let now = wall_now();

        // Every slot populated and fresh, except: slot 3 stale-but-present,
        // slot 7 left empty.
        let stale_load_time = now - MAX_AGE_MS - 60_000;
        for slot in 0..SLOTS {
            if slot == 7 {
                continue;
            }
            let load_time = if slot == 3 { stale_load_time } else { now };
            manager.set_slot(
                slot,
                Some(NetSeed {
                    data: vec![0xAA; SEED_LEN],
                    load_time,
                    usage: MIN_USAGE,
                    cursor: 0,
                }),
            );
        }

        manager.fetch();

        assert_eq!(fetches.load(Ordering::SeqCst), 1, "only the empty slot fetches");

        let filled = manager.slot(7).expect("empty slot was filled");
        assert_eq!(filled.data.len(), SEED_LEN);
        assert_eq!(filled.usage, 0);

        // The stale slot kept its cached block and timestamp.
        let stale = manager.slot(3).expect("stale slot retained");
        assert_eq!(stale.data, vec![0xAA; SEED_LEN]);
        assert_eq!(stale.load_time, stale_load_time);
    }

    /// A failed fetch evicts the slot: it reads as empty afterwards
    /// instead of serving the old bytes.
    #[test]
    fn test_failed_fetch_evicts_slot() {
        let (manager, fetches) = stub_manager(true);
        let now = wall_now();

        manager.set_slot(
            5,
            Some(NetSeed {
                data: vec![0xAA; SEED_LEN],
                load_time: now - MAX_AGE_MS - 60_000,
                usage: MIN_USAGE,
                cursor: 0,
            }),
        );

        manager.refresh_slot(5, now);

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert!(manager.slot(5).is_none(), "failed fetch leaves the slot empty");

        // And fetch() now treats it as any other empty slot.
        manager.fetch();
        assert!(manager.slot(5).is_none());
        assert_eq!(fetches.load(Ordering::SeqCst) as usize, 1 + SLOTS);
    }

    /// with_sources() refuses a configuration with every weight at zero.
    #[test]
    fn test_with_sources_requires_a_weight() {
        let fetches = Arc::new(AtomicU32::new(0));
        let source = StubSource {
            fetches,
            fail: false,
        };
        assert!(NetworkManager::with_sources(vec![(
            Box::new(source) as Box<dyn NetworkSource>,
            0.0,
        )])
        .is_none());
    }

    #[test]
    fn test_sample_at() {
        let block: Vec<u8> = (0..128).map(|i| i as u8).collect();
        let indices = [0usize, 1, 2, 3, 10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 110, 127];
        let event = sample_at(&block, &indices);
        assert_eq!(event.len(), 16);
        for (value, index) in event.iter().zip(indices.iter()) {
            assert_eq!(*value as usize, *index);
        }
    }
}
