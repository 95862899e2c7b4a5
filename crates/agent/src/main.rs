//! `gpuwatch` -- GPU threshold watchdog.
//!
//! Polls `nvidia-smi`, compares utilization and temperature against
//! thresholds, and posts rate-limited alerts to a Slack incoming webhook.
//! Configuration is read from the environment (and `.env`); see
//! [`gpuwatch_agent::config`] for the full table.
//!
//! With `GPU_CHECK_INTERVAL=0` a single cycle runs and the process exits,
//! which suits cron. Otherwise it loops until Ctrl-C.

use gpuwatch_agent::collector::SmiCollector;
use gpuwatch_agent::config::AgentConfig;
use gpuwatch_agent::cycle::{SystemClock, Watchdog};
use gpuwatch_agent::notifier::WebhookNotifier;
use gpuwatch_core::hardware::gate::AlertGate;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gpuwatch=info,gpuwatch_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AgentConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    let notifier = WebhookNotifier::new(config.webhook_timeout).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to build HTTP client");
        std::process::exit(1);
    });

    let collector = SmiCollector::from_command_line(&config.smi_command, config.command_timeout);

    tracing::info!(
        utilization_limit = config.thresholds.utilization_limit,
        temperature_limit = config.thresholds.temperature_limit,
        cooldown_secs = config.alert_cooldown.as_secs(),
        interval_secs = config.check_interval.as_secs(),
        command = %collector.program(),
        "Starting GPU monitor",
    );

    let watchdog = Watchdog::new(
        collector,
        notifier,
        SystemClock,
        config.thresholds,
        config.webhook_url.clone(),
    );
    let mut gate = AlertGate::new(config.alert_cooldown);

    if config.run_once() {
        let report = watchdog.run_cycle(&mut gate).await;
        tracing::info!(
            samples = report.samples,
            conditions = report.conditions,
            sent = report.sent,
            suppressed = report.suppressed,
            failed = report.failed,
            "Poll cycle complete",
        );
        return;
    }

    watchdog.run(&mut gate, config.check_interval).await;
}
