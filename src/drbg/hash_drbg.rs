/// SP 800-90A Hash_DRBG.
///
/// State is a value `V` and constant `C`, both `seed_len` bytes, treated as
/// big-endian integers modulo 2^(8·seed_len). The reseed counter joins the
/// post-generate state update and is bumped only at the end of a generate
/// call.
use crate::hash::HashSpec;

pub struct HashDrbg {
    spec: HashSpec,
    v: Vec<u8>,
    c: Vec<u8>,
    reseed_count: u64,
}

impl HashDrbg {
    pub fn instantiate(spec: HashSpec, material: &[u8]) -> HashDrbg {
        let seed_len = spec.seed_len();
        let v = hash_df(spec, &[material], seed_len);
        let c = hash_df(spec, &[&[0x00], &v], seed_len);
        HashDrbg {
            spec,
            v,
            c,
            reseed_count: 1,
        }
    }

    /// `V ← hashDF(0x01 ∥ V ∥ seed)`, `C ← hashDF(0x00 ∥ V)`.
    pub fn reseed(&mut self, seed: &[u8]) {
        let seed_len = self.spec.seed_len();
        self.v = hash_df(self.spec, &[&[0x01], &self.v, seed], seed_len);
        self.c = hash_df(self.spec, &[&[0x00], &self.v], seed_len);
        self.reseed_count = 1;
    }

    /// hashgen followed by the state update
    /// `V ← (V + H + C + reseed_count) mod 2^(8·seed_len)`.
    pub fn generate(&mut self, out: &mut [u8]) {
        self.hashgen(out);

        let mut prefixed = Vec::with_capacity(1 + self.v.len());
        prefixed.push(0x03);
        prefixed.extend_from_slice(&self.v);
        let h = self.spec.digest(&prefixed);

        add_be(&mut self.v, &h);
        let c = self.c.clone();
        add_be(&mut self.v, &c);
        add_be(&mut self.v, &self.reseed_count.to_be_bytes());
        self.reseed_count += 1;
    }

    /// Concatenate `digest(V + i)` for i = 0, 1, …, truncating the final
    /// block. V itself is not modified; a working copy is incremented.
    fn hashgen(&self, out: &mut [u8]) {
        let output_len = self.spec.output_len();
        let mut data = self.v.clone();
        let mut produced = 0;

        while produced < out.len() {
            let block = self.spec.digest(&data);
            let n = output_len.min(out.len() - produced);
            out[produced..produced + n].copy_from_slice(&block[..n]);
            produced += n;
            increment_be(&mut data);
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> (&[u8], &[u8], u64) {
        (&self.v, &self.c, self.reseed_count)
    }
}

/// SP 800-90A Hash_df: `digest(counter ∥ bits_be32 ∥ material)` for
/// counter = 1, 2, …, concatenated and truncated to `out_len` bytes.
pub fn hash_df(spec: HashSpec, material: &[&[u8]], out_len: usize) -> Vec<u8> {
    let bits = (out_len as u32) * 8;
    let mut out = Vec::with_capacity(out_len + spec.output_len());
    let mut counter: u8 = 1;

    while out.len() < out_len {
        let mut running = spec.begin();
        running.update(&[counter]);
        running.update(&bits.to_be_bytes());
        for part in material {
            running.update(part);
        }
        out.extend_from_slice(&running.finish());
        counter = counter.wrapping_add(1);
    }

    out.truncate(out_len);
    out
}

/// Big-endian `acc ← (acc + addend) mod 2^(8·acc.len())`.
pub(crate) fn add_be(acc: &mut [u8], addend: &[u8]) {
    let mut carry = 0u16;
    let mut addend_iter = addend.iter().rev();

    for byte in acc.iter_mut().rev() {
        let add = addend_iter.next().copied().unwrap_or(0) as u16;
        let sum = *byte as u16 + add + carry;
        *byte = sum as u8;
        carry = sum >> 8;
    }
}

/// Big-endian increment by one, wrapping.
pub(crate) fn increment_be(buf: &mut [u8]) {
    for byte in buf.iter_mut().rev() {
        let (next, overflow) = byte.overflowing_add(1);
        *byte = next;
        if !overflow {
            break;
        }
    }
}
