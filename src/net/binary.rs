/// Raw binary HTTP sources: a GET whose body must be exactly 128 bytes.
/// Two presets ship, a quantum-noise sampler and a radioactive-decay
/// service; both speak the same wire shape.
use super::source::{NetworkError, NetworkSource, SEED_LEN};

const DECAY_URL: &str = "https://www.fourmilab.ch/cgi-bin/Hotbits?nbytes=128&fmt=bin";
const QUANTUM_URL: &str = "https://qrng.physik.hu-berlin.de/download/block.bin";

pub struct BinaryHttpSource {
    name: &'static str,
    url: String,
}

impl BinaryHttpSource {
    /// Radioactive-decay service preset.
    pub fn decay() -> BinaryHttpSource {
        BinaryHttpSource {
            name: "decay",
            url: crate::config::settings()
                .network_source_url("decay")
                .unwrap_or_else(|| DECAY_URL.to_string()),
        }
    }

    /// Quantum-noise service preset.
    pub fn quantum() -> BinaryHttpSource {
        BinaryHttpSource {
            name: "quantum",
            url: crate::config::settings()
                .network_source_url("quantum")
                .unwrap_or_else(|| QUANTUM_URL.to_string()),
        }
    }

    pub fn new(name: &'static str, url: impl Into<String>) -> BinaryHttpSource {
        BinaryHttpSource {
            name,
            url: url.into(),
        }
    }

    /// The body is the block; any other length is an error.
    pub fn decode(body: &[u8]) -> Result<[u8; SEED_LEN], NetworkError> {
        if body.len() != SEED_LEN {
            return Err(NetworkError::WrongCount(body.len()));
        }
        let mut block = [0u8; SEED_LEN];
        block.copy_from_slice(body);
        Ok(block)
    }
}

impl NetworkSource for BinaryHttpSource {
    fn name(&self) -> &'static str {
        self.name
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
        BinaryHttpSource::decode(&body)
    }
}
