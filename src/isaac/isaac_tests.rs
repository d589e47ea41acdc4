#[cfg(test)]
mod tests {
    use crate::isaac::Isaac;

    fn counting_seed() -> [u32; 256] {
        let mut seed = [0u32; 256];
        for (i, word) in seed.iter_mut().enumerate() {
            *word = i as u32;
        }
        seed
    }

    /// Identical seeds produce identical streams.
    #[test]
    fn test_deterministic() {
        let mut a = Isaac::from_seed(&counting_seed());
        let mut b = Isaac::from_seed(&counting_seed());

        for _ in 0..1000 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    /// A single flipped seed word changes the stream.
    #[test]
    fn test_seed_sensitivity() {
        let mut seed = counting_seed();
        let mut a = Isaac::from_seed(&seed);
        seed[17] ^= 1;
        let mut b = Isaac::from_seed(&seed);

        let stream_a: Vec<u32> = (0..256).map(|_| a.next_u32()).collect();
        let stream_b: Vec<u32> = (0..256).map(|_| b.next_u32()).collect();
        assert_ne!(stream_a, stream_b);
    }

    /// The result buffer refills transparently past 256 words.
    #[test]
    fn test_refill_across_rounds() {
        let mut isaac = Isaac::from_seed(&counting_seed());
        let words: Vec<u32> = (0..600).map(|_| isaac.next_u32()).collect();
        assert_eq!(words.len(), 600);

        // A second instance consumed via fill_bytes sees the same words.
        let mut sibling = Isaac::from_seed(&counting_seed());
        let mut bytes = vec![0u8; 600 * 4];
        sibling.fill_bytes(&mut bytes);
        for (i, word) in words.iter().enumerate() {
            let got = u32::from_le_bytes(bytes[i * 4..i * 4 + 4].try_into().unwrap());
            assert_eq!(got, *word);
        }
    }

    /// Reseeding perturbs the stream without resetting it: the post-reseed
    /// stream differs both from the unseeded continuation and from a fresh
    /// instance built from the same seed bytes.
    #[test]
    fn test_reseed_is_not_cold_reset() {
        let mut reseeded = Isaac::from_seed(&counting_seed());
        let mut untouched = Isaac::from_seed(&counting_seed());

        // Advance both identically, then diverge one by reseeding.
        for _ in 0..100 {
            reseeded.next_u32();
            untouched.next_u32();
        }
        let injected = [0xABu8; 1024];
        reseeded.reseed(&injected);

        let continued: Vec<u32> = (0..64).map(|_| untouched.next_u32()).collect();
        let perturbed: Vec<u32> = (0..64).map(|_| reseeded.next_u32()).collect();
        assert_ne!(continued, perturbed);

        let mut fresh = Isaac::from_bytes(&injected);
        let fresh_stream: Vec<u32> = (0..64).map(|_| fresh.next_u32()).collect();
        assert_ne!(fresh_stream, perturbed);
    }

    /// Reseeding is itself deterministic given identical histories.
    #[test]
    fn test_reseed_deterministic() {
        let mut a = Isaac::from_seed(&counting_seed());
        let mut b = Isaac::from_seed(&counting_seed());
        for _ in 0..10 {
            a.next_u32();
            b.next_u32();
        }
        a.reseed(b"same material");
        b.reseed(b"same material");
        for _ in 0..100 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn test_next_below_bounds() {
        let mut isaac = Isaac::from_seed(&counting_seed());
        for bound in [1u32, 2, 7, 32, 64, 1000] {
            for _ in 0..100 {
                assert!(isaac.next_below(bound) < bound);
            }
        }
    }

    /// fill_bytes handles lengths that are not word multiples.
    #[test]
    fn test_fill_bytes_partial_word() {
        let mut a = Isaac::from_seed(&counting_seed());
        let mut b = Isaac::from_seed(&counting_seed());

        let mut bytes = [0u8; 7];
        a.fill_bytes(&mut bytes);

        let first = b.next_u32().to_le_bytes();
        let second = b.next_u32().to_le_bytes();
        assert_eq!(&bytes[..4], &first);
        assert_eq!(&bytes[4..], &second[..3]);
    }

    /// Output should not be wildly skewed: over 16 KiB every byte value
    /// appears and the bit balance is near half.
    #[test]
    fn test_output_spread() {
        let mut isaac = Isaac::from_seed(&counting_seed());
        let mut bytes = vec![0u8; 16384];
        isaac.fill_bytes(&mut bytes);

        let mut seen = [false; 256];
        for &b in &bytes {
            seen[b as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));

        let ones: u64 = bytes.iter().map(|b| b.count_ones() as u64).sum();
        let total = (bytes.len() * 8) as f64;
        let ratio = ones as f64 / total;
        assert!(ratio > 0.48 && ratio < 0.52, "bit ratio {}", ratio);
    }
}
