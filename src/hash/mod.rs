/// Hash primitives shared by every DRBG mechanism.
///
/// Enumerates the approved digests with the lengths the generators need:
/// the digest size in bytes and the seed length from SP 800-90A Table 2
/// (440 bits for SHA-1/SHA-256, 888 bits for SHA-512).
use digest::Digest;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha512};


/// Supported hash algorithms with their DRBG parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashSpec {
    Sha1,
    Sha256,
    Sha512,
}

impl HashSpec {
    /// Digest size in bytes.
    pub const fn output_len(self) -> usize {
        match self {
            HashSpec::Sha1 => 20,
            HashSpec::Sha256 => 32,
            HashSpec::Sha512 => 64,
        }
    }

    /// Seed length in bytes for the hash-based generators (SP 800-90A
    /// Table 2: 440 bits for SHA-1/SHA-256, 888 bits for SHA-512).
    pub const fn seed_len(self) -> usize {
        match self {
            HashSpec::Sha1 => 55,
            HashSpec::Sha256 => 55,
            HashSpec::Sha512 => 111,
        }
    }

    /// Canonical name, matching the provider surface.
    pub const fn name(self) -> &'static str {
        match self {
            HashSpec::Sha1 => "SHA-1",
            HashSpec::Sha256 => "SHA-256",
            HashSpec::Sha512 => "SHA-512",
        }
    }

    /// One-shot digest.
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            HashSpec::Sha1 => Sha1::digest(data).to_vec(),
            HashSpec::Sha256 => Sha256::digest(data).to_vec(),
            HashSpec::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    /// One-shot HMAC under this hash.
    ///
    /// HMAC accepts keys of any length, so construction cannot fail; a
    /// failure here is an invariant violation and aborts.
    pub fn hmac(self, key: &[u8], data: &[u8]) -> Vec<u8> {
        match self {
            HashSpec::Sha1 => {
                let mut mac = Hmac::<Sha1>::new_from_slice(key)
                    .expect("HMAC accepts any key length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            HashSpec::Sha256 => {
                let mut mac = Hmac::<Sha256>::new_from_slice(key)
                    .expect("HMAC accepts any key length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            HashSpec::Sha512 => {
                let mut mac = Hmac::<Sha512>::new_from_slice(key)
                    .expect("HMAC accepts any key length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
        }
    }

    /// Begin an incremental digest.
    pub fn begin(self) -> RunningDigest {
        match self {
            HashSpec::Sha1 => RunningDigest::Sha1(Sha1::new()),
            HashSpec::Sha256 => RunningDigest::Sha256(Sha256::new()),
            HashSpec::Sha512 => RunningDigest::Sha512(Sha512::new()),
        }
    }

    /// HMAC over several concatenated parts without building one buffer.
    pub fn hmac_parts(self, key: &[u8], parts: &[&[u8]]) -> Vec<u8> {
        match self {
            HashSpec::Sha1 => {
                let mut mac = Hmac::<Sha1>::new_from_slice(key)
                    .expect("HMAC accepts any key length");
                for part in parts {
                    mac.update(part);
                }
                mac.finalize().into_bytes().to_vec()
            }
            HashSpec::Sha256 => {
                let mut mac = Hmac::<Sha256>::new_from_slice(key)
                    .expect("HMAC accepts any key length");
                for part in parts {
                    mac.update(part);
                }
                mac.finalize().into_bytes().to_vec()
            }
            HashSpec::Sha512 => {
                let mut mac = Hmac::<Sha512>::new_from_slice(key)
                    .expect("HMAC accepts any key length");
                for part in parts {
                    mac.update(part);
                }
                mac.finalize().into_bytes().to_vec()
            }
        }
    }
}

/// Incremental digest over one of the supported hashes.
pub enum RunningDigest {
    Sha1(Sha1),
    Sha256(Sha256),
    Sha512(Sha512),
}

impl RunningDigest {
    pub fn update(&mut self, data: &[u8]) {
        match self {
            RunningDigest::Sha1(h) => h.update(data),
            RunningDigest::Sha256(h) => h.update(data),
            RunningDigest::Sha512(h) => h.update(data),
        }
    }

    /// Finalize and return the full digest.
    pub fn finish(self) -> Vec<u8> {
        match self {
            RunningDigest::Sha1(h) => h.finalize().to_vec(),
            RunningDigest::Sha256(h) => h.finalize().to_vec(),
            RunningDigest::Sha512(h) => h.finalize().to_vec(),
        }
    }

    /// Finalize into a caller buffer at `offset`, writing at most `len`
    /// bytes. Returns the number of bytes written.
    pub fn digest_into(self, out: &mut [u8], offset: usize, len: usize) -> usize {
        let digest = self.finish();
        let n = len.min(digest.len()).min(out.len().saturating_sub(offset));
        out[offset..offset + n].copy_from_slice(&digest[..n]);
        n
    }
}

/// Shannon entropy of a byte slice in bits per byte. Used by the self test
/// and the test suite as a coarse sanity check on generator output.
pub fn shannon_entropy(data: &[u8]) -> f64 {
    let mut counts = [0u64; 256];
    for &byte in data {
        counts[byte as usize] += 1;
    }

    let length = data.len() as f64;
    let mut entropy = 0.0;

    for &count in &counts {
        if count > 0 {
            let probability = count as f64 / length;
            entropy -= probability * probability.log2();
        }
    }

    entropy
}
