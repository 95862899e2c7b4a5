//! Alert kinds, alert conditions and their notification text.

use std::fmt;

use serde::Serialize;

use crate::types::GpuIndex;

/// Which cooldown bucket an alert belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// GPU utilization above the configured limit.
    UtilizationHigh,
    /// GPU core temperature above the configured limit.
    TemperatureHigh,
    /// The diagnostic command failed or its output was unreadable.
    CommandFailure,
}

impl AlertKind {
    pub const ALL: [AlertKind; 3] = [
        AlertKind::UtilizationHigh,
        AlertKind::TemperatureHigh,
        AlertKind::CommandFailure,
    ];

    /// Stable label used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UtilizationHigh => "utilization_high",
            Self::TemperatureHigh => "temperature_high",
            Self::CommandFailure => "command_failure",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected problem prior to rate limiting.
///
/// Threshold conditions carry the GPU and observed value; a command failure
/// carries the underlying error text instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertCondition {
    pub kind: AlertKind,
    pub gpu_index: Option<GpuIndex>,
    pub value: Option<f64>,
    pub detail: Option<String>,
}

impl AlertCondition {
    pub fn utilization_high(gpu_index: GpuIndex, value: f64) -> Self {
        Self {
            kind: AlertKind::UtilizationHigh,
            gpu_index: Some(gpu_index),
            value: Some(value),
            detail: None,
        }
    }

    pub fn temperature_high(gpu_index: GpuIndex, value: f64) -> Self {
        Self {
            kind: AlertKind::TemperatureHigh,
            gpu_index: Some(gpu_index),
            value: Some(value),
            detail: None,
        }
    }

    /// Wrap any error's display text as a command failure condition.
    pub fn command_failure(error: impl fmt::Display) -> Self {
        Self {
            kind: AlertKind::CommandFailure,
            gpu_index: None,
            value: None,
            detail: Some(error.to_string()),
        }
    }

    /// Notification text. Receivers match on these exact prefixes, so the
    /// wording must not change.
    pub fn message(&self) -> String {
        match self.kind {
            AlertKind::UtilizationHigh => {
                format!("⚠️ High GPU utilization: {}%", self.value.unwrap_or_default())
            }
            AlertKind::TemperatureHigh => {
                format!("⚠️ High temperature: {}°C", self.value.unwrap_or_default())
            }
            AlertKind::CommandFailure => format!(
                "❌ Error checking GPU status: {}",
                self.detail.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utilization_message_drops_trailing_zero() {
        let cond = AlertCondition::utilization_high(0, 98.0);
        assert_eq!(cond.message(), "⚠️ High GPU utilization: 98%");
    }

    #[test]
    fn utilization_message_keeps_fraction() {
        let cond = AlertCondition::utilization_high(1, 97.5);
        assert_eq!(cond.message(), "⚠️ High GPU utilization: 97.5%");
    }

    #[test]
    fn temperature_message() {
        let cond = AlertCondition::temperature_high(0, 88.0);
        assert_eq!(cond.message(), "⚠️ High temperature: 88°C");
    }

    #[test]
    fn command_failure_message() {
        let cond = AlertCondition::command_failure("nvidia-smi exited with code 9");
        assert_eq!(cond.kind, AlertKind::CommandFailure);
        assert_eq!(cond.gpu_index, None);
        assert_eq!(
            cond.message(),
            "❌ Error checking GPU status: nvidia-smi exited with code 9"
        );
    }

    #[test]
    fn kind_labels_are_distinct() {
        let labels: std::collections::HashSet<_> =
            AlertKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(labels.len(), AlertKind::ALL.len());
        assert_eq!(AlertKind::TemperatureHigh.to_string(), "temperature_high");
    }
}
