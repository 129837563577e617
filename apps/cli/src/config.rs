use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};
use railspeed_speed_data::{BackoffConfig, OrchestratorConfig, DEFAULT_TEST_URL};

use crate::output::OutputFormat;

/// A speed source selectable through `RAILSPEED_PROVIDERS`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    IcePortal,
    Oebb,
    Test,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "iceportal" | "ice" => Ok(Self::IcePortal),
            "oebb" => Ok(Self::Oebb),
            "test" => Ok(Self::Test),
            other => bail!("unknown provider '{other}' (expected iceportal, oebb or test)"),
        }
    }
}

pub struct Config {
    pub providers: Vec<ProviderKind>,
    pub test_url: String,
    pub backoff: BackoffConfig,
    pub idle_wake_secs: u64,
    pub fast_refresh: Duration,
    pub request_timeout: Duration,
    pub output: OutputFormat,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let providers = lookup("RAILSPEED_PROVIDERS")
            .unwrap_or_else(|| "iceportal,oebb".into())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ProviderKind::from_str)
            .collect::<anyhow::Result<Vec<_>>>()
            .context("Invalid RAILSPEED_PROVIDERS")?;
        let test_url = lookup("RAILSPEED_TEST_URL").unwrap_or_else(|| DEFAULT_TEST_URL.into());

        let defaults = BackoffConfig::default();
        let backoff = BackoffConfig {
            initial_delay_secs: parse_or(
                &lookup,
                "RAILSPEED_BACKOFF_INITIAL_SECS",
                defaults.initial_delay_secs,
            )?,
            max_delay_secs: parse_or(
                &lookup,
                "RAILSPEED_BACKOFF_MAX_SECS",
                defaults.max_delay_secs,
            )?,
            growth_factor: parse_or(&lookup, "RAILSPEED_BACKOFF_FACTOR", defaults.growth_factor)?,
        };
        if !(backoff.growth_factor.is_finite() && backoff.growth_factor > 1.0) {
            bail!(
                "Invalid RAILSPEED_BACKOFF_FACTOR: {} (must be greater than 1)",
                backoff.growth_factor
            );
        }
        if backoff.max_delay_secs < backoff.initial_delay_secs {
            bail!("RAILSPEED_BACKOFF_MAX_SECS must not be below RAILSPEED_BACKOFF_INITIAL_SECS");
        }

        let idle_wake_secs = parse_or(&lookup, "RAILSPEED_IDLE_WAKE_SECS", 60u64)?;
        let fast_refresh_secs = parse_or(&lookup, "RAILSPEED_FAST_REFRESH_SECS", 1u64)?;
        let timeout_ms = parse_or(&lookup, "RAILSPEED_REQUEST_TIMEOUT_MS", 10_000u64)?;
        let output = lookup("RAILSPEED_OUTPUT")
            .map(|raw| raw.parse::<OutputFormat>())
            .transpose()
            .context("Invalid RAILSPEED_OUTPUT")?
            .unwrap_or_default();

        Ok(Self {
            providers,
            test_url,
            backoff,
            idle_wake_secs,
            fast_refresh: Duration::from_secs(fast_refresh_secs),
            request_timeout: Duration::from_millis(timeout_ms),
            output,
        })
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            backoff: self.backoff.clone(),
            idle_wake_secs: self.idle_wake_secs,
            ..OrchestratorConfig::default()
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key}: '{raw}'")),
        None => Ok(default),
    }
}
