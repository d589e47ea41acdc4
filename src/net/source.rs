/// On-line entropy sources.
///
/// A source fetches exactly 128 bytes from its service. The `load` wrapper
/// is the only path the manager uses: it tolerates every failure mode by
/// returning an empty vec, and always scrambles a successful block before
/// anyone else sees it.
use lazy_static::lazy_static;
use thiserror::Error;

/// Bytes every source must deliver.
pub const SEED_LEN: usize = 128;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("malformed payload: {0}")]
    Payload(String),

    #[error("expected {SEED_LEN} bytes, got {0}")]
    WrongCount(usize),
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> NetworkError {
        NetworkError::Transport(err.to_string())
    }
}

/// One on-line entropy service.
pub trait NetworkSource: Send + Sync {
    /// Configuration and logging name.
    fn name(&self) -> &'static str;

    /// Endpoint being queried.
    fn url(&self) -> &str;

    /// Fetch exactly [`SEED_LEN`] bytes. May block for the configured
    /// connect plus read timeouts.
    fn fetch(&self) -> Result<[u8; SEED_LEN], NetworkError>;
}

lazy_static! {
    static ref CLIENT: reqwest::blocking::Client = build_client();
}

/// The shared blocking client with the configured timeouts.
pub fn http_client() -> &'static reqwest::blocking::Client {
    &CLIENT
}

fn build_client() -> reqwest::blocking::Client {
    let settings = crate::config::settings();
    reqwest::blocking::Client::builder()
        .connect_timeout(settings.network_connection_timeout())
        .timeout(settings.network_read_timeout())
        .user_agent(concat!("wellspring/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}

/// Fetch through a source's full failure envelope: any error logs and
/// yields an empty vec, and successful blocks are scrambled so the raw
/// service bytes never reach a pool.
pub fn load(source: &dyn NetworkSource) -> Vec<u8> {
    match source.fetch() {
        Ok(block) => {
            let mut data = block.to_vec();
            crate::store::store().scramble(&mut data);
            data
        }
        Err(e) => {
            tracing::warn!(source = source.name(), error = %e, "network seed fetch failed");
            Vec::new()
        }
    }
}
