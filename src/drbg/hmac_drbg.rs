/// SP 800-90A HMAC_DRBG.
///
/// State is a key `K` and value `V`, each one digest wide. Every operation
/// that consumes external bytes runs the two-round update; a generate with
/// no external material still performs the no-input round.
use crate::hash::HashSpec;

pub struct HmacDrbg {
    spec: HashSpec,
    k: Vec<u8>,
    v: Vec<u8>,
}

impl HmacDrbg {
    /// K = 0x00…00, V = 0x01…01, then update with the seed material.
    pub fn instantiate(spec: HashSpec, material: &[u8]) -> HmacDrbg {
        let output_len = spec.output_len();
        let mut drbg = HmacDrbg {
            spec,
            k: vec![0x00; output_len],
            v: vec![0x01; output_len],
        };
        drbg.update(material);
        drbg
    }

    pub fn reseed(&mut self, seed: &[u8]) {
        self.update(seed);
    }

    /// Emit successive `V ← HMAC(K, V)` blocks, truncate the last, then run
    /// the no-input update.
    pub fn generate(&mut self, out: &mut [u8]) {
        let output_len = self.spec.output_len();
        let mut produced = 0;

        while produced < out.len() {
            self.v = self.spec.hmac(&self.k, &self.v);
            let n = output_len.min(out.len() - produced);
            out[produced..produced + n].copy_from_slice(&self.v[..n]);
            produced += n;
        }

        self.update(&[]);
    }

    /// SP 800-90A HMAC_DRBG_Update. The second round only runs when
    /// `data` is non-empty.
    fn update(&mut self, data: &[u8]) {
        self.k = self.spec.hmac_parts(&self.k, &[&self.v, &[0x00], data]);
        self.v = self.spec.hmac(&self.k, &self.v);

        if !data.is_empty() {
            self.k = self.spec.hmac_parts(&self.k, &[&self.v, &[0x01], data]);
            self.v = self.spec.hmac(&self.k, &self.v);
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> (&[u8], &[u8]) {
        (&self.k, &self.v)
    }
}
