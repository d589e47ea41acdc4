#[cfg(test)]
mod tests {
    use crate::drbg::SeedSource;
    use crate::entropy::instant::{self, fnv_seed_buffer, is_prime};

    #[test]
    fn test_is_prime_small() {
        let primes = [2u64, 3, 5, 7, 11, 13, 31, 37, 41, 97, 101, 7919];
        for p in primes {
            assert!(is_prime(p), "{} is prime", p);
        }

        let composites = [0u64, 1, 4, 6, 9, 15, 21, 25, 91, 561, 7917];
        for c in composites {
            assert!(!is_prime(c), "{} is composite", c);
        }
    }

    #[test]
    fn test_is_prime_large() {
        // Mersenne prime 2^61 - 1.
        assert!(is_prime(2_305_843_009_213_693_951));
        assert!(!is_prime(2_305_843_009_213_693_953));
        // Strong pseudoprime to several small bases.
        assert!(!is_prime(3_215_031_751));
    }

    /// The ISAAC seed buffer is a full kilobyte and carries the seed's
    /// influence.
    #[test]
    fn test_fnv_seed_buffer() {
        let a = fnv_seed_buffer(&[0u8; 64]);
        assert_eq!(a.len(), 1024);
        assert!(a.iter().any(|&b| b != 0));

        // The timer feeds every step, so even identical seeds diverge.
        let b = fnv_seed_buffer(&[0u8; 64]);
        assert_ne!(a[..], b[..]);
    }

    /// Batches are digest-sized and never repeat.
    #[test]
    fn test_generate_batches_differ() {
        let first = instant::generate();
        let second = instant::generate();
        assert_eq!(first.len(), 64);
        assert_ne!(first, second);
    }

    /// The holder serves any requested length and refills itself.
    #[test]
    fn test_holder_serves_requests() {
        let holder = instant::holder();
        let seed = holder.get_seed(100);
        assert_eq!(seed.len(), 100);
        assert!(seed.iter().any(|&b| b != 0));

        let batch = holder.take();
        assert_eq!(batch.len(), 64);
    }
}
