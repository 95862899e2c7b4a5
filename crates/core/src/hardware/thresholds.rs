//! Threshold evaluation for GPU samples.
//!
//! Pure logic. The caller collects samples, evaluates them here, and runs
//! the resulting conditions through the [`AlertGate`](super::gate::AlertGate).

use crate::alert::AlertCondition;
use crate::telemetry::MetricSample;

/// Default utilization limit in percent.
pub const DEFAULT_UTILIZATION_LIMIT: f64 = 95.0;

/// Default temperature limit in degrees Celsius.
pub const DEFAULT_TEMPERATURE_LIMIT: f64 = 85.0;

/// Limits a sample must exceed (strictly) to raise a condition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdConfig {
    pub utilization_limit: f64,
    pub temperature_limit: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            utilization_limit: DEFAULT_UTILIZATION_LIMIT,
            temperature_limit: DEFAULT_TEMPERATURE_LIMIT,
        }
    }
}

/// Evaluate a batch of samples and return every violation, in sample order.
///
/// Per sample, a utilization condition (if any) comes before a temperature
/// condition. A value equal to its limit does not alert.
pub fn evaluate(samples: &[MetricSample], config: &ThresholdConfig) -> Vec<AlertCondition> {
    let mut conditions = Vec::new();

    for sample in samples {
        if sample.utilization_percent > config.utilization_limit {
            conditions.push(AlertCondition::utilization_high(
                sample.gpu_index,
                sample.utilization_percent,
            ));
        }

        if sample.temperature_celsius > config.temperature_limit {
            conditions.push(AlertCondition::temperature_high(
                sample.gpu_index,
                sample.temperature_celsius,
            ));
        }
    }

    conditions
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
