use serde::Deserialize;
use std::fs;

use crate::allocation::BucketWidth;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSourceConfig {
    pub http_bind_addr: String,
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SinkConfig {
    pub batch_size: usize,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub source: HttpSourceConfig,
    pub sink: SinkConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AllocationConfig {
    /// Width of the buckets readings are aligned on, in seconds.
    #[serde(default, rename = "bucket_width_secs")]
    pub bucket_width: BucketWidth,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Currency per exported kWh.
    #[serde(default)]
    pub feed_in_tariff: f64,
}

fn default_currency() -> String {
    "EUR".to_string()
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            feed_in_tariff: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub allocation: AllocationConfig,
    #[serde(default)]
    pub billing: BillingConfig,
    pub consumption_readings: PipelineConfig,
    pub generation_readings: PipelineConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("BILLING_CONFIG").unwrap_or_else(|_| "billing-config.toml".to_string());
        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read config '{path}': {e}"))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        if cfg.billing.feed_in_tariff < 0.0 {
            anyhow::bail!("billing.feed_in_tariff must be non-negative");
        }
        Ok(cfg)
    }
}
