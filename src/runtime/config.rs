use crate::runtime::telemetry;
use anyhow::{bail, Context, Result};
use std::time::Duration;

/// Runtime configuration for the batch engine.
///
/// All instances must be constructed via [`EngineConfig::builder`] or
/// [`EngineConfig::new`] so invariants are validated before any consumer
/// observes the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    concurrency: usize,
    metrics_interval: Duration,
}

pub struct EngineConfigParams {
    pub concurrency: usize,
    pub metrics_interval: Duration,
}

impl EngineConfig {
    /// Returns a builder to incrementally construct and validate a configuration.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Constructs a configuration directly from the provided values.
    ///
    /// Prefer [`EngineConfig::builder`] when values use defaults.
    pub fn new(params: EngineConfigParams) -> Result<Self> {
        let EngineConfigParams {
            concurrency,
            metrics_interval,
        } = params;

        let config = Self {
            concurrency,
            metrics_interval,
        };

        config.validate()?;
        Ok(config)
    }

    /// Default number of concurrent workers a submission runs with.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Interval used by the per-run metrics reporter.
    pub fn metrics_interval(&self) -> Duration {
        self.metrics_interval
    }

    /// Performs validation on an existing configuration instance.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            bail!("concurrency must be greater than 0");
        }

        if self.metrics_interval.is_zero() {
            bail!("metrics_interval must be greater than 0");
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct EngineConfigBuilder {
    concurrency: Option<usize>,
    metrics_interval: Option<Duration>,
}

impl EngineConfigBuilder {
    pub fn concurrency(mut self, workers: usize) -> Self {
        self.concurrency = Some(workers);
        self
    }

    pub fn metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = Some(interval);
        self
    }

    pub fn build(self) -> Result<EngineConfig> {
        let params = EngineConfigParams {
            concurrency: self.concurrency.context("concurrency is required")?,
            metrics_interval: self
                .metrics_interval
                .unwrap_or(telemetry::DEFAULT_METRICS_INTERVAL),
        };

        EngineConfig::new(params)
    }
}
