/// JSON-RPC integer-array source (random.org wire shape).
///
/// POSTs a request for 128 integers in [0, 255] and takes the low eight
/// bits of each element of `result.random.data`. The response's advisory
/// delay hint is not consulted.
use serde_json::{json, Value};

use super::source::{NetworkError, NetworkSource, SEED_LEN};

const DEFAULT_URL: &str = "https://api.random.org/json-rpc/4/invoke";

pub struct JsonRpcSource {
    url: String,
    api_key: Option<String>,
}

impl JsonRpcSource {
    pub fn from_config() -> JsonRpcSource {
        let settings = crate::config::settings();
        JsonRpcSource {
            url: settings
                .network_source_url("json_rpc")
                .unwrap_or_else(|| DEFAULT_URL.to_string()),
            api_key: settings.network_json_rpc_api_key(),
        }
    }

    pub fn new(url: impl Into<String>, api_key: Option<String>) -> JsonRpcSource {
        JsonRpcSource {
            url: url.into(),
            api_key,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn request_body(&self) -> Value {
        json!({
            "jsonrpc": "2.0",
            "method": "generateIntegers",
            "params": {
                "apiKey": self.api_key.as_deref().unwrap_or(""),
                "n": SEED_LEN,
                "min": 0,
                "max": 255,
            },
            "id": 1,
        })
    }

    /// Decode `result.random.data` into the seed block.
    pub fn decode(body: &str) -> Result<[u8; SEED_LEN], NetworkError> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| NetworkError::Payload(e.to_string()))?;

        let data = value
            .pointer("/result/random/data")
            .and_then(Value::as_array)
            .ok_or_else(|| NetworkError::Payload("missing result.random.data".to_string()))?;

        if data.len() != SEED_LEN {
            return Err(NetworkError::WrongCount(data.len()));
        }

        let mut block = [0u8; SEED_LEN];
        for (slot, element) in block.iter_mut().zip(data.iter()) {
            let integer = element
                .as_i64()
                .ok_or_else(|| NetworkError::Payload("non-integer element".to_string()))?;
            *slot = (integer & 0xFF) as u8;
        }
        Ok(block)
    }
}

impl NetworkSource for JsonRpcSource {
    fn name(&self) -> &'static str {
        "json_rpc"
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn fetch(&self) -> Result<[u8; SEED_LEN], NetworkError> {
        let response = super::source::http_client()
            .post(&self.url)
            .json(&self.request_body())
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status(status.as_u16()));
        }

        let body = response.text()?;
        JsonRpcSource::decode(&body)
    }
}
