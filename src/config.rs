use crate::session::{BridgeSettings, DEFAULT_LANGUAGE};
use crate::upstream::DEFAULT_ENDPOINT;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Prefix for environment overrides, e.g. `DREAMTRANS__UPSTREAM__ENDPOINT`
pub const ENV_PREFIX: &str = "DREAMTRANS";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub upstream: UpstreamConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub streaming: StreamingDefaults,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    pub endpoint: String,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
    #[serde(default = "default_drain_timeout_millis")]
    pub drain_timeout_millis: u64,
    pub audio_buffer: usize,
    pub event_buffer: usize,
}

fn default_drain_timeout_millis() -> u64 {
    1000
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Environment variable holding the upstream API key
    pub api_key_env: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamingDefaults {
    pub language: String,
}

impl Default for StreamingDefaults {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "dreamtrans-bridge".to_string(),
            },
            upstream: UpstreamConfig {
                endpoint: DEFAULT_ENDPOINT.to_string(),
                connect_timeout_secs: 10,
                read_timeout_secs: 60,
                write_timeout_secs: 10,
                drain_timeout_millis: default_drain_timeout_millis(),
                audio_buffer: 100,
                event_buffer: 100,
            },
            auth: AuthConfig {
                api_key_env: "SM_API_KEY".to_string(),
            },
            streaming: StreamingDefaults::default(),
        }
    }
}

impl Config {
    /// Load from a config file (any format the `config` crate knows) with
    /// `DREAMTRANS__SECTION__KEY` environment overrides on top.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("Failed to load config from {}", path))?;

        let cfg: Config = settings
            .try_deserialize()
            .context("Failed to parse config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.upstream.audio_buffer == 0 || self.upstream.event_buffer == 0 {
            anyhow::bail!("upstream channel buffers must be greater than zero");
        }
        if self.upstream.read_timeout_secs == 0 || self.upstream.write_timeout_secs == 0 {
            anyhow::bail!("upstream timeouts must be greater than zero");
        }
        Ok(())
    }

    pub fn bridge_settings(&self) -> BridgeSettings {
        BridgeSettings {
            connect_timeout: Duration::from_secs(self.upstream.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.upstream.read_timeout_secs),
            write_timeout: Duration::from_secs(self.upstream.write_timeout_secs),
            drain_timeout: Duration::from_millis(self.upstream.drain_timeout_millis),
            audio_buffer: self.upstream.audio_buffer,
            event_buffer: self.upstream.event_buffer,
        }
    }
}
