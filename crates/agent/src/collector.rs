//! GPU telemetry collection via the `nvidia-smi` subprocess.
//!
//! [`MetricsSource`] is the capability the poll cycle depends on;
//! [`SmiCollector`] is the real implementation. It runs the diagnostic
//! program with the core crate's CSV query, enforces a timeout, and parses
//! stdout into [`MetricSample`]s.

use std::future::Future;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;

use gpuwatch_core::error::TelemetryParseError;
use gpuwatch_core::telemetry::{parse_smi_csv, MetricSample, SMI_QUERY_ARGS};

/// Diagnostic program used when `GPU_SMI_COMMAND` is not set.
pub const DEFAULT_SMI_COMMAND: &str = "nvidia-smi";

/// Timeout for a single diagnostic invocation.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Why telemetry could not be read.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The program does not exist on `PATH`.
    #[error("{0} not found - is the NVIDIA driver installed?")]
    NotFound(String),

    /// Spawning or waiting on the process failed.
    #[error("failed to execute {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran but exited non-zero.
    #[error("{program} exited with code {exit_code}: {output}")]
    Failed {
        program: String,
        exit_code: i32,
        output: String,
    },

    /// The process did not finish in time and was killed.
    #[error("{program} timed out after {elapsed_ms}ms")]
    Timeout { program: String, elapsed_ms: u64 },

    /// The process succeeded but its output was unreadable.
    #[error("unparsable output: {0}")]
    Parse(#[from] TelemetryParseError),
}

// ---------------------------------------------------------------------------
// MetricsSource
// ---------------------------------------------------------------------------

/// Anything that can produce one round of GPU samples.
pub trait MetricsSource: Send + Sync {
    fn read(&self) -> impl Future<Output = Result<Vec<MetricSample>, CommandError>> + Send;
}

// ---------------------------------------------------------------------------
// SmiCollector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SmiCollector {
    program: String,
    leading_args: Vec<String>,
    timeout: Duration,
}

impl SmiCollector {
    /// `leading_args` go between the program and the query arguments, so a
    /// wrapper such as `sudo nvidia-smi` can be expressed.
    pub fn new(program: impl Into<String>, leading_args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            leading_args,
            timeout,
        }
    }

    /// Build from a whitespace-split command line (first word is the program).
    ///
    /// An empty command line falls back to [`DEFAULT_SMI_COMMAND`].
    pub fn from_command_line(words: &[String], timeout: Duration) -> Self {
        match words.split_first() {
            Some((program, rest)) => Self::new(program.clone(), rest.to_vec(), timeout),
            None => Self::new(DEFAULT_SMI_COMMAND, Vec::new(), timeout),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    async fn run(&self) -> Result<String, CommandError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .args(SMI_QUERY_ARGS)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let start = Instant::now();

        // On timeout the `output()` future is dropped, which kills the child.
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CommandError::NotFound(self.program.clone()));
            }
            Ok(Err(source)) => {
                return Err(CommandError::Io {
                    program: self.program.clone(),
                    source,
                });
            }
            Err(_elapsed) => {
                return Err(CommandError::Timeout {
                    program: self.program.clone(),
                    elapsed_ms: start.elapsed().as_millis() as u64,
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

        if !output.status.success() {
            // nvidia-smi reports driver problems on stdout, not stderr.
            let stderr = String::from_utf8_lossy(&output.stderr);
            let text = if stderr.trim().is_empty() {
                stdout.trim()
            } else {
                stderr.trim()
            };
            return Err(CommandError::Failed {
                program: self.program.clone(),
                exit_code: output.status.code().unwrap_or(-1),
                output: text.to_string(),
            });
        }

        tracing::debug!(
            program = %self.program,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Diagnostic command finished",
        );
        Ok(stdout)
    }
}

impl MetricsSource for SmiCollector {
    async fn read(&self) -> Result<Vec<MetricSample>, CommandError> {
        let stdout = self.run().await?;
        Ok(parse_smi_csv(&stdout)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
