#[cfg(test)]
mod tests {
    use crate::drbg::hmac_drbg::HmacDrbg;
    use crate::hash::HashSpec;
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> Vec<u8> {
        let mut mac = Hmac::<Sha256>::new_from_slice(key).unwrap();
        for part in parts {
            mac.update(part);
        }
        mac.finalize().into_bytes().to_vec()
    }

    /// Reference HMAC_DRBG_Update from the definition.
    fn reference_update(k: &mut Vec<u8>, v: &mut Vec<u8>, data: &[u8]) {
        *k = hmac_sha256(k, &[v, &[0x00], data]);
        *v = hmac_sha256(k, &[v]);
        if !data.is_empty() {
            *k = hmac_sha256(k, &[v, &[0x01], data]);
            *v = hmac_sha256(k, &[v]);
        }
    }

    /// Instantiation from K = 0x00…, V = 0x01… plus one seeded update.
    #[test]
    fn test_instantiate_state() {
        let material = b"hmac drbg instantiation material";
        let drbg = HmacDrbg::instantiate(HashSpec::Sha256, material);

        let mut k = vec![0x00u8; 32];
        let mut v = vec![0x01u8; 32];
        reference_update(&mut k, &mut v, material);

        let (got_k, got_v) = drbg.state();
        assert_eq!(got_k, &k[..]);
        assert_eq!(got_v, &v[..]);
    }

    /// Generate emits successive V = HMAC(K, V) blocks, truncates the last
    /// one, and finishes with the no-input update.
    #[test]
    fn test_generate_matches_definition() {
        let material = b"hmac drbg generate material";
        let mut drbg = HmacDrbg::instantiate(HashSpec::Sha256, material);

        let mut k = vec![0x00u8; 32];
        let mut v = vec![0x01u8; 32];
        reference_update(&mut k, &mut v, material);

        let mut out = [0u8; 80];
        drbg.generate(&mut out);

        let mut expected = Vec::new();
        for _ in 0..3 {
            v = hmac_sha256(&k, &[&v]);
            expected.extend_from_slice(&v);
        }
        assert_eq!(&out[..], &expected[..80]);

        // The no-input update still ran exactly once.
        reference_update(&mut k, &mut v, &[]);
        let (got_k, got_v) = drbg.state();
        assert_eq!(got_k, &k[..]);
        assert_eq!(got_v, &v[..]);
    }

    /// Two generate calls without reseed track the reference state machine.
    #[test]
    fn test_two_generates_track_reference() {
        let material = b"two generates";
        let mut drbg = HmacDrbg::instantiate(HashSpec::Sha256, material);

        let mut k = vec![0x00u8; 32];
        let mut v = vec![0x01u8; 32];
        reference_update(&mut k, &mut v, material);

        for _ in 0..2 {
            let mut out = [0u8; 48];
            drbg.generate(&mut out);

            let mut expected = Vec::new();
            for _ in 0..2 {
                v = hmac_sha256(&k, &[&v]);
                expected.extend_from_slice(&v);
            }
            assert_eq!(&out[..], &expected[..48]);
            reference_update(&mut k, &mut v, &[]);
        }
    }

    /// Reseed is a seeded update: both rounds must run.
    #[test]
    fn test_reseed_matches_definition() {
        let mut drbg = HmacDrbg::instantiate(HashSpec::Sha256, b"initial");
        let (k0, v0) = drbg.state();
        let mut k = k0.to_vec();
        let mut v = v0.to_vec();

        let seed = b"reseed material";
        drbg.reseed(seed);
        reference_update(&mut k, &mut v, seed);

        let (got_k, got_v) = drbg.state();
        assert_eq!(got_k, &k[..]);
        assert_eq!(got_v, &v[..]);
    }

    /// State width follows the digest, and distinct digests diverge from
    /// identical material.
    #[test]
    fn test_state_widths() {
        let sha1 = HmacDrbg::instantiate(HashSpec::Sha1, b"m");
        assert_eq!(sha1.state().0.len(), 20);

        let sha512 = HmacDrbg::instantiate(HashSpec::Sha512, b"m");
        assert_eq!(sha512.state().0.len(), 64);

        let mut a = HmacDrbg::instantiate(HashSpec::Sha256, b"same material");
        let mut b = HmacDrbg::instantiate(HashSpec::Sha512, b"same material");
        let mut out_a = [0u8; 32];
        let mut out_b = [0u8; 32];
        a.generate(&mut out_a);
        b.generate(&mut out_b);
        assert_ne!(out_a, out_b);
    }
}
