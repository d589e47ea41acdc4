/// SP 800-90A-style CTR_DRBG over AES-256.
///
/// Seed material of any length is compressed to exactly 48 bytes with
/// SHA-384 before touching the state. The 16-byte counter V is incremented
/// as a 128-bit little-endian integer before every block; after every
/// generate and reseed the key and V are refreshed from three cipher blocks
/// XORed with the seed material.
use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes256;
use sha2::{Digest, Sha384};
use zeroize::Zeroize;

pub const KEY_LEN: usize = 32;
pub const BLOCK_LEN: usize = 16;
pub const SEED_LEN: usize = KEY_LEN + BLOCK_LEN;

pub struct CtrDrbg {
    cipher: Aes256,
    key: [u8; KEY_LEN],
    v: [u8; BLOCK_LEN],
}

impl CtrDrbg {
    pub fn instantiate(material: &[u8]) -> CtrDrbg {
        let key = [0u8; KEY_LEN];
        let mut drbg = CtrDrbg {
            cipher: Aes256::new(GenericArray::from_slice(&key)),
            key,
            v: [0u8; BLOCK_LEN],
        };
        drbg.refresh(&derive_seed(material));
        drbg
    }

    pub fn reseed(&mut self, seed: &[u8]) {
        self.refresh(&derive_seed(seed));
    }

    /// Encrypt successive counter values, truncating the final block, then
    /// refresh the key and V.
    pub fn generate(&mut self, out: &mut [u8]) {
        let mut produced = 0;

        while produced < out.len() {
            increment_le(&mut self.v);
            let mut block = GenericArray::clone_from_slice(&self.v);
            self.cipher.encrypt_block(&mut block);
            let n = BLOCK_LEN.min(out.len() - produced);
            out[produced..produced + n].copy_from_slice(&block[..n]);
            produced += n;
        }

        self.refresh(&[0u8; SEED_LEN]);
    }

    /// Three counter blocks form a 48-byte T; `T ⊕ seed` becomes the new
    /// key (first 32 bytes) and V (last 16). The outgoing key is wiped.
    fn refresh(&mut self, seed: &[u8; SEED_LEN]) {
        let mut t = [0u8; SEED_LEN];
        for chunk in t.chunks_exact_mut(BLOCK_LEN) {
            increment_le(&mut self.v);
            let mut block = GenericArray::clone_from_slice(&self.v);
            self.cipher.encrypt_block(&mut block);
            chunk.copy_from_slice(&block);
        }

        for (byte, mask) in t.iter_mut().zip(seed.iter()) {
            *byte ^= mask;
        }

        self.key.zeroize();
        self.key.copy_from_slice(&t[..KEY_LEN]);
        self.v.copy_from_slice(&t[KEY_LEN..]);
        self.cipher = Aes256::new(GenericArray::from_slice(&self.key));
        t.zeroize();
    }

    #[cfg(test)]
    pub fn state(&self) -> (&[u8; KEY_LEN], &[u8; BLOCK_LEN]) {
        (&self.key, &self.v)
    }
}

impl Drop for CtrDrbg {
    fn drop(&mut self) {
        self.key.zeroize();
        self.v.zeroize();
    }
}

/// Compress arbitrary seed material to exactly 48 bytes. Material already
/// 48 bytes long passes through untouched.
pub fn derive_seed(material: &[u8]) -> [u8; SEED_LEN] {
    let mut seed = [0u8; SEED_LEN];
    if material.len() == SEED_LEN {
        seed.copy_from_slice(material);
    } else {
        seed.copy_from_slice(&Sha384::digest(material));
    }
    seed
}

/// 128-bit little-endian increment.
pub(crate) fn increment_le(v: &mut [u8; BLOCK_LEN]) {
    for byte in v.iter_mut() {
        let (next, overflow) = byte.overflowing_add(1);
        *byte = next;
        if !overflow {
            break;
        }
    }
}
