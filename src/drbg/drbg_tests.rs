#[cfg(test)]
mod tests {
    use crate::drbg::base::combine_materials_from;
    use crate::drbg::{nonce, Algorithm, Drbg, SeedSource};
    use crate::hash::HashSpec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Deterministic source that counts how many times it was drawn from.
    struct CountingSource {
        calls: AtomicUsize,
        fill: u8,
    }

    impl CountingSource {
        fn new(fill: u8) -> Arc<CountingSource> {
            Arc::new(CountingSource {
                calls: AtomicUsize::new(0),
                fill,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl SeedSource for CountingSource {
        fn get_seed(&self, n: usize) -> Vec<u8> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            vec![self.fill; n]
        }
    }

    #[test]
    fn test_algorithm_names_round_trip() {
        for algorithm in Algorithm::ALL {
            assert_eq!(Algorithm::by_name(algorithm.name()), Some(algorithm));
        }
        assert_eq!(Algorithm::by_name("Nist/ChaCha"), None);
    }

    #[test]
    fn test_seed_lengths() {
        assert_eq!(Algorithm::Hash(HashSpec::Sha256).seed_len(), 55);
        assert_eq!(Algorithm::Hash(HashSpec::Sha512).seed_len(), 111);
        assert_eq!(Algorithm::Hmac(HashSpec::Sha1).seed_len(), 55);
        assert_eq!(Algorithm::CtrAes256.seed_len(), 48);
    }

    /// resistance = 0 reseeds on every call: two next_bytes draw from the
    /// source twice (beyond the instantiation draw).
    #[test]
    fn test_zero_resistance_reseeds_every_call() {
        let source = CountingSource::new(0x5A);
        let mut drbg = Drbg::with_materials(
            Algorithm::Hmac(HashSpec::Sha256),
            source.clone(),
            0,
            Some(&[0xA5; 55]),
            Some(&[]),
            Some(&[]),
        );
        assert_eq!(source.calls(), 0);

        let mut buf = [0u8; 16];
        drbg.next_bytes(&mut buf);
        drbg.next_bytes(&mut buf);
        assert_eq!(source.calls(), 2);
    }

    /// resistance = 3 allows three generates per seed draw.
    #[test]
    fn test_resistance_window() {
        let source = CountingSource::new(0x5A);
        let mut drbg = Drbg::with_materials(
            Algorithm::Hmac(HashSpec::Sha256),
            source.clone(),
            3,
            Some(&[0xA5; 55]),
            Some(&[]),
            Some(&[]),
        );

        let mut buf = [0u8; 16];
        for _ in 0..3 {
            drbg.next_bytes(&mut buf);
        }
        assert_eq!(source.calls(), 0);

        drbg.next_bytes(&mut buf);
        assert_eq!(source.calls(), 1);

        // The reseed reopened the window.
        for _ in 0..2 {
            drbg.next_bytes(&mut buf);
        }
        assert_eq!(source.calls(), 1);
    }

    /// Identical configuration is deterministic; a different seed diverges.
    #[test]
    fn test_deterministic_given_materials() {
        let make = |entropy: &[u8]| {
            let source = CountingSource::new(0x00);
            Drbg::with_materials(
                Algorithm::Hash(HashSpec::Sha256),
                source,
                u64::MAX,
                Some(entropy),
                Some(&[]),
                Some(&[]),
            )
        };

        let mut a = make(&[0x01; 55]);
        let mut b = make(&[0x01; 55]);
        let mut c = make(&[0x02; 55]);

        let mut out_a = [0u8; 64];
        let mut out_b = [0u8; 64];
        let mut out_c = [0u8; 64];
        a.next_bytes(&mut out_a);
        b.next_bytes(&mut out_b);
        c.next_bytes(&mut out_c);

        assert_eq!(out_a, out_b);
        assert_ne!(out_a, out_c);
    }

    /// Every mechanism honors the requested length and never repeats.
    #[test]
    fn test_all_mechanisms_fill_requests() {
        for algorithm in Algorithm::ALL {
            let source = CountingSource::new(0x77);
            let mut drbg = Drbg::new(algorithm, source, 0);

            for len in [1usize, 16, 33, 100] {
                let mut first = vec![0u8; len];
                let mut second = vec![0u8; len];
                drbg.next_bytes(&mut first);
                drbg.next_bytes(&mut second);
                assert_eq!(first.len(), len);
                assert_ne!(first, second, "{} repeated output", algorithm.name());
            }
        }
    }

    /// new_seed produces seed_len bytes usable to instantiate a sibling.
    #[test]
    fn test_new_seed() {
        let source = CountingSource::new(0x10);
        let mut drbg = Drbg::new(Algorithm::Hash(HashSpec::Sha512), source, 0);
        let seed = drbg.new_seed();
        assert_eq!(seed.len(), 111);

        let second = CountingSource::new(0x20);
        let mut sibling = Drbg::with_materials(
            Algorithm::Hash(HashSpec::Sha512),
            second,
            0,
            Some(&seed),
            Some(&[]),
            Some(&[]),
        );
        let mut out = [0u8; 32];
        sibling.next_bytes(&mut out);
        assert!(out.iter().any(|&b| b != 0));
    }

    /// set_seed perturbs the stream.
    #[test]
    fn test_set_seed_changes_output() {
        let source = CountingSource::new(0x33);
        let mut a = Drbg::with_materials(
            Algorithm::Hmac(HashSpec::Sha512),
            source.clone(),
            u64::MAX,
            Some(&[0x44; 111]),
            Some(&[]),
            Some(&[]),
        );
        let mut b = Drbg::with_materials(
            Algorithm::Hmac(HashSpec::Sha512),
            source,
            u64::MAX,
            Some(&[0x44; 111]),
            Some(&[]),
            Some(&[]),
        );

        b.set_seed(b"diverge");
        let mut out_a = [0u8; 32];
        let mut out_b = [0u8; 32];
        a.next_bytes(&mut out_a);
        b.next_bytes(&mut out_b);
        assert_ne!(out_a, out_b);
    }

    /// combine_materials(None, None, None, m, d) is at least m bytes and
    /// carries the nonce and personalization tails.
    #[test]
    fn test_combine_materials_defaults() {
        let source = CountingSource::new(0x01);
        let material = combine_materials_from(&*source, None, None, None, 48, 64);
        // 64 entropy + 32 nonce + 64 personalization.
        assert_eq!(material.len(), 64 + 32 + nonce::personalization().len());
        assert!(material.len() >= 48);
        assert_eq!(source.calls(), 1);
    }

    /// Short explicit entropy is padded from the source up to min.
    #[test]
    fn test_combine_materials_padding() {
        let source = CountingSource::new(0xEE);
        let material =
            combine_materials_from(&*source, Some(&[0xAA; 10]), Some(&[]), Some(&[]), 32, 64);
        assert_eq!(material.len(), 32);
        assert_eq!(&material[..10], &[0xAA; 10]);
        assert_eq!(&material[10..], &[0xEE; 22]);
    }

    /// Explicit full-length materials touch neither the source nor the
    /// factories.
    #[test]
    fn test_combine_materials_explicit() {
        let source = CountingSource::new(0x00);
        let material = combine_materials_from(
            &*source,
            Some(&[0x01; 48]),
            Some(&[0x02; 16]),
            Some(&[0x03; 8]),
            48,
            48,
        );
        assert_eq!(material.len(), 48 + 16 + 8);
        assert_eq!(source.calls(), 0);
    }

    /// Nonces are 32 bytes and never repeat; the personalization string is
    /// stable.
    #[test]
    fn test_nonce_factory() {
        let a = nonce::next_nonce();
        let b = nonce::next_nonce();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
        assert_eq!(nonce::personalization(), nonce::personalization());
        assert_eq!(nonce::personalization().len(), 64);
    }
}
