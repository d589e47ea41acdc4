#[cfg(test)]
mod tests {
    use crate::drbg::hash_drbg::{hash_df, HashDrbg};
    use crate::hash::HashSpec;
    use sha2::{Digest, Sha256};

    /// Independent Hash_df written straight from the definition.
    fn reference_hash_df(material: &[u8], out_len: usize) -> Vec<u8> {
        let bits = (out_len as u32) * 8;
        let mut out = Vec::new();
        let mut counter: u8 = 1;
        while out.len() < out_len {
            let mut hasher = Sha256::new();
            hasher.update([counter]);
            hasher.update(bits.to_be_bytes());
            hasher.update(material);
            out.extend_from_slice(&hasher.finalize());
            counter += 1;
        }
        out.truncate(out_len);
        out
    }

    fn reference_add(acc: &[u8], addend: &[u8]) -> Vec<u8> {
        let mut out = acc.to_vec();
        let mut carry = 0u16;
        let mut addend_iter = addend.iter().rev();
        for byte in out.iter_mut().rev() {
            let add = addend_iter.next().copied().unwrap_or(0) as u16;
            let sum = *byte as u16 + add + carry;
            *byte = sum as u8;
            carry = sum >> 8;
        }
        out
    }

    fn reference_increment(buf: &[u8]) -> Vec<u8> {
        reference_add(buf, &[1])
    }

    /// hash_df must emit the counter ∥ bit-length prefix on every block;
    /// requesting two output lengths from the same material exposes a wrong
    /// prefix immediately.
    #[test]
    fn test_hash_df_matches_definition() {
        let material = b"hash_df derivation input";
        assert_eq!(
            hash_df(HashSpec::Sha256, &[material], 55),
            reference_hash_df(material, 55)
        );
        assert_eq!(
            hash_df(HashSpec::Sha256, &[material], 111),
            reference_hash_df(material, 111)
        );
        // Multi-part input is the concatenation.
        assert_eq!(
            hash_df(HashSpec::Sha256, &[b"hash_df ", b"derivation ", b"input"], 55),
            reference_hash_df(material, 55)
        );
    }

    /// hash_df(m, k·outlen) is NOT a concatenation of independent runs; the
    /// counter prefix must keep the blocks chained to one derivation.
    #[test]
    fn test_hash_df_not_naive_concatenation() {
        let material = b"counter prefix check";
        let single = hash_df(HashSpec::Sha256, &[material], 32);
        let double = hash_df(HashSpec::Sha256, &[material], 64);
        assert_eq!(&double[..32], &single[..]);
        assert_ne!(&double[32..], &single[..]);
    }

    /// Instantiation: V = hashDF(material), C = hashDF(0x00 ∥ V).
    #[test]
    fn test_instantiate_state() {
        let material = [0xA5u8; 32];
        let drbg = HashDrbg::instantiate(HashSpec::Sha256, &material);
        let (v, c, count) = drbg.state();

        let expected_v = reference_hash_df(&material, 55);
        let mut prefixed = vec![0x00];
        prefixed.extend_from_slice(&expected_v);
        let expected_c = reference_hash_df(&prefixed, 55);

        assert_eq!(v, &expected_v[..]);
        assert_eq!(c, &expected_c[..]);
        assert_eq!(count, 1);
    }

    /// Generate: output blocks are digest(V), digest(V+1), …, and the state
    /// update is V' = V + digest(0x03 ∥ V) + C + reseed_count.
    #[test]
    fn test_generate_matches_definition() {
        let material = [0xA5u8; 32];
        let mut drbg = HashDrbg::instantiate(HashSpec::Sha256, &material);
        let (v0, c0, _) = drbg.state();
        let v0 = v0.to_vec();
        let c0 = c0.to_vec();

        let mut out = [0u8; 80];
        drbg.generate(&mut out);

        // hashgen over a working copy of V.
        let mut expected = Vec::new();
        let mut data = v0.clone();
        for _ in 0..3 {
            expected.extend_from_slice(&Sha256::digest(&data));
            data = reference_increment(&data);
        }
        assert_eq!(&out[..], &expected[..80]);

        // State update.
        let mut prefixed = vec![0x03];
        prefixed.extend_from_slice(&v0);
        let h = Sha256::digest(&prefixed);
        let mut expected_v = reference_add(&v0, &h);
        expected_v = reference_add(&expected_v, &c0);
        expected_v = reference_add(&expected_v, &1u64.to_be_bytes());

        let (v1, c1, count) = drbg.state();
        assert_eq!(v1, &expected_v[..]);
        assert_eq!(c1, &c0[..]);
        assert_eq!(count, 2);
    }

    /// Two generates without reseed give distinct output and the counter
    /// joins the second update with its incremented value.
    #[test]
    fn test_successive_generates_differ() {
        let mut drbg = HashDrbg::instantiate(HashSpec::Sha256, &[0xA5u8; 32]);
        let mut first = [0u8; 80];
        let mut second = [0u8; 80];
        drbg.generate(&mut first);
        drbg.generate(&mut second);
        assert_ne!(first, second);
        assert_eq!(drbg.state().2, 3);
    }

    /// Reseed: V = hashDF(0x01 ∥ V ∥ seed), C = hashDF(0x00 ∥ V), counter
    /// back to 1.
    #[test]
    fn test_reseed_matches_definition() {
        let mut drbg = HashDrbg::instantiate(HashSpec::Sha256, &[0x11u8; 55]);
        let v0 = drbg.state().0.to_vec();
        let seed = [0x42u8; 55];
        drbg.reseed(&seed);

        let mut input = vec![0x01];
        input.extend_from_slice(&v0);
        input.extend_from_slice(&seed);
        let expected_v = reference_hash_df(&input, 55);
        let mut prefixed = vec![0x00];
        prefixed.extend_from_slice(&expected_v);
        let expected_c = reference_hash_df(&prefixed, 55);

        let (v, c, count) = drbg.state();
        assert_eq!(v, &expected_v[..]);
        assert_eq!(c, &expected_c[..]);
        assert_eq!(count, 1);
    }

    /// SHA-512 instances carry the 111-byte state length.
    #[test]
    fn test_sha512_state_length() {
        let drbg = HashDrbg::instantiate(HashSpec::Sha512, b"material");
        let (v, c, _) = drbg.state();
        assert_eq!(v.len(), 111);
        assert_eq!(c.len(), 111);
    }

    /// Byte-wise modular arithmetic, cross-checked against u128.
    #[test]
    fn test_modular_arithmetic() {
        use crate::drbg::hash_drbg::{add_be, increment_be};

        let mut wrapped = [0xFFu8, 0xFF];
        increment_be(&mut wrapped);
        assert_eq!(wrapped, [0x00, 0x00]);

        let a = 0x0123_4567_89AB_CDEF_0011_2233_4455_6677u128;
        let b = 0xFEDC_BA98_7654_3210_8899_AABB_CCDD_EEFFu128;
        let mut acc = a.to_be_bytes();
        add_be(&mut acc, &b.to_be_bytes());
        assert_eq!(acc, a.wrapping_add(b).to_be_bytes());

        // Short addend lands in the low-order bytes.
        let mut acc = 0x0000_0000_0000_0000_0000_0000_FFFF_FFFFu128.to_be_bytes();
        add_be(&mut acc, &[0x01]);
        assert_eq!(acc, 0x0000_0000_0000_0000_0000_0001_0000_0000u128.to_be_bytes());
    }
}
