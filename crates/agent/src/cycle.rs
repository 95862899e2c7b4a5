//! The poll cycle: read telemetry, evaluate, gate, notify.
//!
//! [`Watchdog`] owns the collaborators (metrics source, notifier, clock) and
//! the static configuration. The [`AlertGate`] is owned by the caller and
//! passed into every cycle, so its state survives from one cycle to the
//! next and tests can inspect it.

use std::time::Duration;

use chrono::Utc;

use gpuwatch_core::alert::{AlertCondition, AlertKind};
use gpuwatch_core::hardware::gate::AlertGate;
use gpuwatch_core::hardware::thresholds::{evaluate, ThresholdConfig};
use gpuwatch_core::telemetry::MetricSample;
use gpuwatch_core::types::Timestamp;

use crate::collector::MetricsSource;
use crate::notifier::Notifier;

/// Source of wall-clock time for gate decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// What happened during one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// GPUs read successfully (zero when the command failed).
    pub samples: usize,
    /// Conditions raised, including a command failure.
    pub conditions: usize,
    pub sent: usize,
    pub suppressed: usize,
    pub failed: usize,
}

pub struct Watchdog<S, N, C = SystemClock> {
    source: S,
    notifier: N,
    clock: C,
    thresholds: ThresholdConfig,
    webhook_url: String,
}

impl<S, N, C> Watchdog<S, N, C>
where
    S: MetricsSource,
    N: Notifier,
    C: Clock,
{
    pub fn new(
        source: S,
        notifier: N,
        clock: C,
        thresholds: ThresholdConfig,
        webhook_url: impl Into<String>,
    ) -> Self {
        Self {
            source,
            notifier,
            clock,
            thresholds,
            webhook_url: webhook_url.into(),
        }
    }

    /// Run one poll cycle against `gate`.
    ///
    /// Never fails: a telemetry error becomes a [`AlertKind::CommandFailure`]
    /// condition and a delivery error is logged and counted.
    pub async fn run_cycle(&self, gate: &mut AlertGate) -> CycleReport {
        let mut report = CycleReport::default();

        let (samples, conditions) = match self.source.read().await {
            Ok(samples) => {
                for sample in &samples {
                    tracing::debug!(
                        gpu_index = sample.gpu_index,
                        utilization = sample.utilization_percent,
                        temperature = sample.temperature_celsius,
                        memory_used_percent = ?sample.memory_used_percent(),
                        "GPU sample",
                    );
                }
                let conditions = evaluate(&samples, &self.thresholds);
                if conditions.is_empty() {
                    tracing::info!(gpu_count = samples.len(), "All GPUs are healthy");
                }
                (samples, conditions)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to read GPU telemetry");
                (Vec::new(), vec![AlertCondition::command_failure(&e)])
            }
        };

        report.samples = samples.len();
        report.conditions = conditions.len();

        for condition in &conditions {
            let kind = condition.kind;
            tracing::warn!(
                kind = %kind,
                gpu_index = ?condition.gpu_index,
                value = ?condition.value,
                alert = %condition.message(),
                "GPU alert condition",
            );

            let now = self.clock.now();
            if !gate.should_send(kind, now) {
                tracing::info!(
                    kind = %kind,
                    next_allowed = ?gate.next_allowed(kind),
                    "Alert recently sent, suppressing",
                );
                report.suppressed += 1;
                continue;
            }

            let text = compose_text(condition, &samples);
            match self.notifier.notify(&text, &self.webhook_url).await {
                Ok(()) => {
                    gate.record_sent(kind, now);
                    report.sent += 1;
                    tracing::info!(kind = %kind, "Alert delivered");
                }
                Err(e) => {
                    // Not recorded: the next cycle retries without waiting.
                    report.failed += 1;
                    tracing::error!(kind = %kind, error = %e, "Failed to deliver alert");
                }
            }
        }

        report
    }

    /// Run cycles every `interval` until Ctrl-C.
    ///
    /// The interrupt is honoured while sleeping between cycles; a cycle in
    /// progress always completes.
    pub async fn run(&self, gate: &mut AlertGate, interval: Duration) {
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            let report = self.run_cycle(gate).await;
            tracing::debug!(?report, "Poll cycle complete");

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = &mut shutdown => {
                    tracing::info!("Stopping GPU monitor");
                    return;
                }
            }
        }
    }
}

/// Notification text: the condition's message, plus the GPU's status line
/// when the sample is available.
fn compose_text(condition: &AlertCondition, samples: &[MetricSample]) -> String {
    let message = condition.message();
    let sample = condition
        .gpu_index
        .and_then(|idx| samples.iter().find(|s| s.gpu_index == idx));

    match sample {
        Some(sample) if condition.kind != AlertKind::CommandFailure => {
            format!("{message}\n{sample}")
        }
        _ => message,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
