//! GPU telemetry samples and the `nvidia-smi` CSV parser.
//!
//! The agent runs the diagnostic command with [`SMI_QUERY_ARGS`] and passes
//! stdout to [`parse_smi_csv`]. The query and the parser agree on field
//! order; change one and you must change the other.

use std::fmt;

use serde::Serialize;

use crate::error::TelemetryParseError;
use crate::types::GpuIndex;

/// Query arguments appended to the diagnostic program.
///
/// Produces one header-free, unit-free CSV row per GPU:
/// `index, utilization.gpu, memory.used, memory.total, temperature.gpu`.
pub const SMI_QUERY_ARGS: [&str; 2] = [
    "--query-gpu=index,utilization.gpu,memory.used,memory.total,temperature.gpu",
    "--format=csv,noheader,nounits",
];

/// Field names in row order, used in parse error messages.
const FIELDS: [&str; 5] = [
    "index",
    "utilization.gpu",
    "memory.used",
    "memory.total",
    "temperature.gpu",
];

/// Per-GPU snapshot parsed from one row of diagnostic output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub gpu_index: GpuIndex,
    pub utilization_percent: f64,
    pub memory_used_mb: f64,
    pub memory_total_mb: f64,
    pub temperature_celsius: f64,
}

impl MetricSample {
    /// VRAM used as a percentage of total, or `None` when total is zero.
    pub fn memory_used_percent(&self) -> Option<f64> {
        if self.memory_total_mb > 0.0 {
            Some(self.memory_used_mb * 100.0 / self.memory_total_mb)
        } else {
            None
        }
    }
}

/// One-line human summary, e.g.
/// `GPU 0 • ⚡ GPU: 98% | 🧠 Mem: 10000/16000 MiB | 🌡️ 70°C`.
impl fmt::Display for MetricSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GPU {} • ⚡ GPU: {}% | 🧠 Mem: {}/{} MiB | 🌡️ {}°C",
            self.gpu_index,
            self.utilization_percent,
            self.memory_used_mb,
            self.memory_total_mb,
            self.temperature_celsius,
        )
    }
}

/// Parse `nvidia-smi --format=csv,noheader,nounits` output.
///
/// Blank lines are skipped. Any malformed row fails the whole parse: a
/// partially readable table is reported as an error rather than silently
/// dropping GPUs. Output with no rows at all is also an error.
pub fn parse_smi_csv(output: &str) -> Result<Vec<MetricSample>, TelemetryParseError> {
    let mut samples = Vec::new();

    for (idx, raw) in output.lines().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }
        samples.push(parse_row(idx + 1, raw)?);
    }

    if samples.is_empty() {
        return Err(TelemetryParseError::Empty);
    }
    Ok(samples)
}

fn parse_row(line: usize, raw: &str) -> Result<MetricSample, TelemetryParseError> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() != FIELDS.len() {
        return Err(TelemetryParseError::FieldCount {
            line,
            expected: FIELDS.len(),
            found: parts.len(),
        });
    }

    let gpu_index = parts[0]
        .parse::<GpuIndex>()
        .map_err(|_| not_numeric(line, 0, parts[0]))?;

    Ok(MetricSample {
        gpu_index,
        utilization_percent: parse_number(line, 1, parts[1])?,
        memory_used_mb: parse_number(line, 2, parts[2])?,
        memory_total_mb: parse_number(line, 3, parts[3])?,
        temperature_celsius: parse_number(line, 4, parts[4])?,
    })
}

/// Finite numbers only; `[N/A]`, `NaN` and `inf` are rejected.
fn parse_number(line: usize, field: usize, value: &str) -> Result<f64, TelemetryParseError> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(not_numeric(line, field, value)),
    }
}

fn not_numeric(line: usize, field: usize, value: &str) -> TelemetryParseError {
    TelemetryParseError::NotNumeric {
        line,
        field: FIELDS[field],
        value: value.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parses_single_row() {
        let samples = parse_smi_csv("0, 98, 10000, 16000, 70\n").unwrap();
        assert_eq!(
            samples,
            vec![MetricSample {
                gpu_index: 0,
                utilization_percent: 98.0,
                memory_used_mb: 10000.0,
                memory_total_mb: 16000.0,
                temperature_celsius: 70.0,
            }]
        );
    }

    #[test]
    fn parses_multiple_gpus_and_skips_blank_lines() {
        let out = "0, 10, 100, 1000, 40\n\n1, 20, 200, 2000, 50\n   \n";
        let samples = parse_smi_csv(out).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].gpu_index, 1);
        assert_eq!(samples[1].temperature_celsius, 50.0);
    }

    #[test]
    fn accepts_fractional_values() {
        let samples = parse_smi_csv("3,12.5,1.5,2,61.25").unwrap();
        assert_eq!(samples[0].utilization_percent, 12.5);
        assert_eq!(samples[0].temperature_celsius, 61.25);
    }

    #[test]
    fn rejects_wrong_field_count() {
        let err = parse_smi_csv("0, 98, 10000, 16000\n").unwrap_err();
        assert_eq!(
            err,
            TelemetryParseError::FieldCount {
                line: 1,
                expected: 5,
                found: 4
            }
        );
    }

    #[test]
    fn rejects_not_available_field() {
        let err = parse_smi_csv("0, 10, 100, 1000, 40\n1, [N/A], 100, 1000, 40").unwrap_err();
        assert_matches!(
            err,
            TelemetryParseError::NotNumeric { line: 2, field: "utilization.gpu", ref value } if value == "[N/A]"
        );
    }

    #[test]
    fn rejects_non_finite_numbers() {
        assert_matches!(
            parse_smi_csv("0, NaN, 100, 1000, 40"),
            Err(TelemetryParseError::NotNumeric { .. })
        );
        assert_matches!(
            parse_smi_csv("0, 10, 100, 1000, inf"),
            Err(TelemetryParseError::NotNumeric { field: "temperature.gpu", .. })
        );
    }

    #[test]
    fn rejects_fractional_gpu_index() {
        assert_matches!(
            parse_smi_csv("0.5, 10, 100, 1000, 40"),
            Err(TelemetryParseError::NotNumeric { field: "index", .. })
        );
    }

    #[test]
    fn empty_output_is_an_error() {
        assert_eq!(parse_smi_csv(""), Err(TelemetryParseError::Empty));
        assert_eq!(parse_smi_csv("\n  \n"), Err(TelemetryParseError::Empty));
    }

    #[test]
    fn memory_percent_guards_zero_total() {
        let mut sample = parse_smi_csv("0, 10, 4000, 16000, 40").unwrap().remove(0);
        assert_eq!(sample.memory_used_percent(), Some(25.0));
        sample.memory_total_mb = 0.0;
        assert_eq!(sample.memory_used_percent(), None);
    }

    #[test]
    fn display_summary_line() {
        let sample = parse_smi_csv("0, 98, 10000, 16000, 70").unwrap().remove(0);
        assert_eq!(
            sample.to_string(),
            "GPU 0 • ⚡ GPU: 98% | 🧠 Mem: 10000/16000 MiB | 🌡️ 70°C"
        );
    }

    #[test]
    fn error_display() {
        let err = TelemetryParseError::FieldCount {
            line: 3,
            expected: 5,
            found: 2,
        };
        assert_eq!(err.to_string(), "line 3: expected 5 fields, got 2");
    }
}
