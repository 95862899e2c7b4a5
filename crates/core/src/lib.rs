//! `gpuwatch-core` -- pure domain logic for the GPU watchdog.
//!
//! Nothing in this crate performs I/O. The agent crate collects raw
//! telemetry, hands it to [`telemetry::parse_smi_csv`], runs the result
//! through [`hardware::thresholds::evaluate`], and consults
//! [`hardware::gate::AlertGate`] before delivering anything.

pub mod alert;
pub mod error;
pub mod hardware;
pub mod telemetry;
pub mod types;
