/// Layered configuration.
///
/// Keys resolve left to right: built-in defaults, then an optional config
/// file (`WELLSPRING_CONFIG` or the per-user project directory), then
/// `WELLSPRING__`-prefixed environment variables. String values may embed
/// `${NAME}` references expanded against the process environment;
/// unresolved references stay verbatim with a warning.
use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File};
use directories::ProjectDirs;
use lazy_static::lazy_static;
use regex::Regex;

#[cfg(test)]
mod config_tests;

lazy_static! {
    static ref SETTINGS: Settings = Settings::load();
    static ref ENV_REF: Regex = Regex::new(r"\$\{([A-Za-z0-9_.]+)\}").expect("env reference pattern");
}

/// The resolved configuration for this process.
pub fn settings() -> &'static Settings {
    &SETTINGS
}

pub struct Settings {
    config: Config,
}

impl Settings {
    fn load() -> Settings {
        let mut builder = Config::builder();

        if let Some(path) = config_file_path() {
            builder = builder.add_source(File::from(path).required(false));
        }
        builder = builder.add_source(
            Environment::with_prefix("WELLSPRING")
                .separator("__")
                .try_parsing(true),
        );

        let config = match builder.build() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "configuration failed to load; using defaults");
                Config::default()
            }
        };

        Settings { config }
    }

    /// Raw string lookup with `${NAME}` expansion.
    pub fn string(&self, key: &str) -> Option<String> {
        self.config.get_string(key).ok().map(expand)
    }

    pub fn boolean(&self, key: &str, default: bool) -> bool {
        match self.config.get_bool(key) {
            Ok(value) => value,
            Err(_) => self
                .string(key)
                .and_then(|s| s.parse().ok())
                .unwrap_or(default),
        }
    }

    pub fn integer(&self, key: &str, default: u64) -> u64 {
        match self.config.get_int(key) {
            Ok(value) if value >= 0 => value as u64,
            _ => self
                .string(key)
                .and_then(|s| s.parse().ok())
                .unwrap_or(default),
        }
    }

    pub fn float(&self, key: &str, default: f64) -> f64 {
        match self.config.get_float(key) {
            Ok(value) => value,
            Err(_) => self
                .string(key)
                .and_then(|s| s.parse().ok())
                .unwrap_or(default),
        }
    }

    // Collector settings.

    pub fn collector_enabled(&self, name: &str) -> bool {
        self.boolean(&format!("collector.{}", name), true)
    }

    pub fn collector_delay(&self, name: &str, default_ms: u64) -> Duration {
        Duration::from_millis(self.integer(&format!("collector.{}.delay", name), default_ms))
    }

    pub fn collector_slow_down_period(&self) -> Duration {
        Duration::from_millis(self.integer("collector.slow_down_period", 60_000))
    }

    pub fn collector_min_ratio(&self) -> u32 {
        self.integer("collector.min_ratio", 1).max(1) as u32
    }

    pub fn collector_max_ratio(&self) -> u32 {
        self.integer("collector.max_ratio", 32).max(1) as u32
    }

    pub fn collector_allow_suspend(&self) -> bool {
        self.boolean("collector.allow_suspend", false)
    }

    pub fn framebuffer_sample_width(&self) -> u32 {
        self.integer("collector.framebuffer.sample_width", 64) as u32
    }

    pub fn framebuffer_sample_height(&self) -> u32 {
        self.integer("collector.framebuffer.sample_height", 32) as u32
    }

    pub fn provider_collector_algorithms(&self) -> Vec<String> {
        self.string("collector.provider.algorithms")
            .unwrap_or_else(|| "ring,urandom".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    // Network settings.

    pub fn network_expected_usage(&self) -> u32 {
        self.integer("network.expected_usage", 32).max(1) as u32
    }

    pub fn network_connection_timeout(&self) -> Duration {
        Duration::from_millis(self.integer("network.connection_timeout", 120_000))
    }

    pub fn network_read_timeout(&self) -> Duration {
        Duration::from_millis(self.integer("network.read_timeout", 120_000))
    }

    pub fn network_seeds_used(&self) -> u32 {
        self.integer("network.seeds_used", 4).min(32) as u32
    }

    pub fn network_source_weight(&self, name: &str, default: f64) -> f64 {
        self.float(&format!("network.source.{}", name), default).max(0.0)
    }

    pub fn network_source_url(&self, name: &str) -> Option<String> {
        self.string(&format!("network.source.{}.url", name))
    }

    pub fn network_json_rpc_api_key(&self) -> Option<String> {
        self.string("network.source.json_rpc.api_key")
    }

    // Storage settings.

    pub fn storage_backend(&self) -> String {
        self.string("storage.backend").unwrap_or_else(|| "sqlite".to_string())
    }

    pub fn storage_file(&self) -> PathBuf {
        if let Some(path) = self.string("storage.file") {
            return PathBuf::from(path);
        }
        ProjectDirs::from("io", "wellspring", "wellspring")
            .map(|dirs| dirs.data_dir().join("seeds.db"))
            .unwrap_or_else(|| PathBuf::from("wellspring-seeds.db"))
    }

    pub fn storage_save_period(&self) -> Duration {
        Duration::from_millis(self.integer("storage.save_period", 5_000))
    }

    pub fn storage_save_period_add(&self) -> Duration {
        Duration::from_millis(self.integer("storage.save_period_add", 5_000))
    }

    pub fn storage_save_period_max(&self) -> Duration {
        Duration::from_millis(self.integer("storage.save_period_max", 86_400_000))
    }

    pub fn storage_save_period_multiplier(&self) -> u64 {
        self.integer("storage.save_period_multiplier", 1).max(1)
    }

    // Provider settings.

    pub fn provider_strong_algorithm(&self) -> String {
        self.string("provider.strong_algorithm")
            .unwrap_or_else(|| "Nist/HmacSHA-512".to_string())
    }
}

fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("WELLSPRING_CONFIG") {
        return Some(PathBuf::from(path));
    }
    ProjectDirs::from("io", "wellspring", "wellspring")
        .map(|dirs| dirs.config_dir().join("wellspring.toml"))
}

/// Expand `${NAME}` references against the environment. Unresolved
/// references are kept as written.
pub fn expand(value: String) -> String {
    if !value.contains("${") {
        return value;
    }

    let mut out = String::with_capacity(value.len());
    let mut last = 0;
    for captures in ENV_REF.captures_iter(&value) {
        let whole = captures.get(0).expect("whole match");
        let name = &captures[1];
        out.push_str(&value[last..whole.start()]);
        match std::env::var(name) {
            Ok(resolved) => out.push_str(&resolved),
            Err(_) => {
                tracing::warn!(reference = name, "unresolved configuration reference");
                out.push_str(whole.as_str());
            }
        }
        last = whole.end();
    }
    out.push_str(&value[last..]);
    out
}
