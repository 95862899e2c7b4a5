//! Agent configuration loaded from environment variables.
//!
//! | Variable                   | Required | Default      |
//! |----------------------------|----------|--------------|
//! | `SLACK_WEBHOOK_URL`        | yes      | --           |
//! | `GPU_ALERT_THRESHOLD`      | no       | `95`         |
//! | `GPU_TEMP_THRESHOLD`       | no       | `85`         |
//! | `GPU_CHECK_INTERVAL`       | no       | `300`        |
//! | `GPU_ALERT_COOLDOWN_SECS`  | no       | `300`        |
//! | `GPU_SMI_COMMAND`          | no       | `nvidia-smi` |
//! | `GPU_COMMAND_TIMEOUT_SECS` | no       | `10`         |
//! | `GPU_WEBHOOK_TIMEOUT_SECS` | no       | `10`         |
//!
//! `GPU_CHECK_INTERVAL=0` runs a single poll cycle and exits. Empty values
//! count as unset; anything else that does not parse is rejected.

use std::str::FromStr;
use std::time::Duration;

use gpuwatch_core::hardware::gate::ALERT_COOLDOWN;
use gpuwatch_core::hardware::thresholds::{
    ThresholdConfig, DEFAULT_TEMPERATURE_LIMIT, DEFAULT_UTILIZATION_LIMIT,
};

use crate::collector::{DEFAULT_COMMAND_TIMEOUT, DEFAULT_SMI_COMMAND};
use crate::notifier::DEFAULT_WEBHOOK_TIMEOUT;

/// Default seconds between poll cycles.
const DEFAULT_CHECK_INTERVAL_SECS: u64 = 300;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub webhook_url: String,
    pub thresholds: ThresholdConfig,
    /// Zero means run one cycle and exit.
    pub check_interval: Duration,
    pub alert_cooldown: Duration,
    /// Program plus leading arguments; the query arguments are appended.
    pub smi_command: Vec<String>,
    pub command_timeout: Duration,
    pub webhook_timeout: Duration,
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let webhook_url = get("SLACK_WEBHOOK_URL")
            .map(|v| v.trim().to_string())
            .ok_or(ConfigError::Missing("SLACK_WEBHOOK_URL"))?;

        let utilization_limit = parse_limit(
            "GPU_ALERT_THRESHOLD",
            get("GPU_ALERT_THRESHOLD"),
            DEFAULT_UTILIZATION_LIMIT,
        )?;
        let temperature_limit = parse_limit(
            "GPU_TEMP_THRESHOLD",
            get("GPU_TEMP_THRESHOLD"),
            DEFAULT_TEMPERATURE_LIMIT,
        )?;

        let check_interval = Duration::from_secs(parse_or(
            "GPU_CHECK_INTERVAL",
            get("GPU_CHECK_INTERVAL"),
            DEFAULT_CHECK_INTERVAL_SECS,
        )?);
        let alert_cooldown = Duration::from_secs(parse_or(
            "GPU_ALERT_COOLDOWN_SECS",
            get("GPU_ALERT_COOLDOWN_SECS"),
            ALERT_COOLDOWN.as_secs(),
        )?);
        let command_timeout = parse_timeout(
            "GPU_COMMAND_TIMEOUT_SECS",
            get("GPU_COMMAND_TIMEOUT_SECS"),
            DEFAULT_COMMAND_TIMEOUT,
        )?;
        let webhook_timeout = parse_timeout(
            "GPU_WEBHOOK_TIMEOUT_SECS",
            get("GPU_WEBHOOK_TIMEOUT_SECS"),
            DEFAULT_WEBHOOK_TIMEOUT,
        )?;

        let smi_command = get("GPU_SMI_COMMAND")
            .unwrap_or_else(|| DEFAULT_SMI_COMMAND.to_string())
            .split_whitespace()
            .map(str::to_string)
            .collect();

        Ok(Self {
            webhook_url,
            thresholds: ThresholdConfig {
                utilization_limit,
                temperature_limit,
            },
            check_interval,
            alert_cooldown,
            smi_command,
            command_timeout,
            webhook_timeout,
        })
    }

    pub fn run_once(&self) -> bool {
        self.check_interval.is_zero()
    }
}

fn parse_or<T: FromStr>(
    var: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            value,
            reason: "not a valid number",
        }),
    }
}

fn parse_limit(var: &'static str, raw: Option<String>, default: f64) -> Result<f64, ConfigError> {
    let value = raw.clone();
    let limit = parse_or(var, raw, default)?;
    if !limit.is_finite() {
        return Err(ConfigError::Invalid {
            var,
            value: value.unwrap_or_default(),
            reason: "must be a finite number",
        });
    }
    Ok(limit)
}

fn parse_timeout(
    var: &'static str,
    raw: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let value = raw.clone();
    let secs = parse_or(var, raw, default.as_secs())?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            var,
            value: value.unwrap_or_default(),
            reason: "must be greater than zero",
        });
    }
    Ok(Duration::from_secs(secs))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
