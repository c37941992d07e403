use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Quality bounds a time-of-day slot must meet to be recommended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotThresholds {
    pub wifi_min_link_speed: f64,
    pub wifi_min_bytes_per_second: f64,
    pub wifi_max_bytes_per_second: f64,
    pub wifi_min_signal_strength: f64,
    pub mobile_min_bytes_per_second: f64,
    pub mobile_max_bytes_per_second: f64,
    pub mobile_min_signal_strength: f64,
}

impl Default for SlotThresholds {
    fn default() -> Self {
        Self {
            wifi_min_link_speed: 4.0,
            wifi_min_bytes_per_second: 200.0,
            wifi_max_bytes_per_second: 30_000.0,
            wifi_min_signal_strength: 25.0,
            mobile_min_bytes_per_second: 100.0,
            mobile_max_bytes_per_second: 10_000.0,
            mobile_min_signal_strength: 25.0,
        }
    }
}

/// Exclusive lower bounds for the live admission check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchThresholds {
    pub link_speed_above: f64,
    pub signal_strength_above: f64,
}

impl Default for FetchThresholds {
    fn default() -> Self {
        Self {
            link_speed_above: 4.0,
            signal_strength_above: 24.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedPlan {
    pub weeks: u32,
    pub rng_seed: u64,
}

impl Default for SeedPlan {
    fn default() -> Self {
        Self {
            weeks: 4,
            rng_seed: 0x6e65_7473,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetStatsConfig {
    pub thresholds: SlotThresholds,
    pub fetch: FetchThresholds,
    pub lookahead_minutes: i64,
    pub bucket_minutes: u32,
    pub seed: SeedPlan,
}

impl Default for NetStatsConfig {
    fn default() -> Self {
        Self {
            thresholds: SlotThresholds::default(),
            fetch: FetchThresholds::default(),
            lookahead_minutes: 60,
            bucket_minutes: 15,
            seed: SeedPlan::default(),
        }
    }
}

impl NetStatsConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("invalid config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bucket_minutes == 0 || 1440 % self.bucket_minutes != 0 {
            anyhow::bail!(
                "bucket_minutes must divide a day evenly, got {}",
                self.bucket_minutes
            );
        }
        if self.lookahead_minutes < 0 {
            anyhow::bail!("lookahead_minutes must not be negative");
        }
        Ok(())
    }
}
