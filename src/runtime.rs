//! Runtime glue that wires configs, the injected operation contract,
//! per-run progress tracking, and telemetry.

pub mod config;
pub mod operation;
pub mod progress;
pub mod telemetry;
