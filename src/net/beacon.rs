/// Time-beacon source: the full response body is folded through two
/// SHA-512 digests, one prefixed with 0x00 and one with 0xFF, and the
/// concatenated digests form the 128-byte block. The pulse itself is
/// public, so the fold (and the scramble every network block passes
/// through) is what keeps the derived bytes private to this process.
use sha2::{Digest, Sha512};

use super::source::{NetworkError, NetworkSource, SEED_LEN};

const DEFAULT_URL: &str = "https://beacon.nist.gov/beacon/2.0/pulse/last";

pub struct BeaconSource {
    url: String,
}

impl BeaconSource {
    pub fn from_config() -> BeaconSource {
        BeaconSource {
            url: crate::config::settings()
                .network_source_url("beacon")
                .unwrap_or_else(|| DEFAULT_URL.to_string()),
        }
    }

    pub fn new(url: impl Into<String>) -> BeaconSource {
        BeaconSource { url: url.into() }
    }

    /// Fold arbitrary-length pulse bytes down to the 128-byte block.
    pub fn digest_fold(body: &[u8]) -> [u8; SEED_LEN] {
        let mut low = Sha512::new();
        low.update([0x00]);
        low.update(body);

        let mut high = Sha512::new();
        high.update([0xFF]);
        high.update(body);

        let mut block = [0u8; SEED_LEN];
        block[..64].copy_from_slice(&low.finalize());
        block[64..].copy_from_slice(&high.finalize());
        block
    }
}

impl NetworkSource for BeaconSource {
    fn name(&self) -> &'static str {
        "beacon"
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn fetch(&self) -> Result<[u8; SEED_LEN], NetworkError> {
        let response = super::source::http_client().get(&self.url).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status(status.as_u16()));
        }

        let body = response.bytes()?;
        if body.is_empty() {
            return Err(NetworkError::Payload("empty pulse body".to_string()));
        }
        Ok(BeaconSource::digest_fold(&body))
    }
}
