//! Observability and telemetry.
//!
//! Logging goes through `tracing` with an env-driven filter; metrics go
//! through the `metrics` facade with an optional Prometheus exporter.
//! Service code records counters, gauges, and histograms unconditionally;
//! whether they land anywhere is decided once at process startup by
//! [`init`].
//!
//! # Example
//!
//! ```rust,ignore
//! use qonduit::observability::{self, ObservabilityConfig};
//!
//! let handle = observability::init(&ObservabilityConfig::from_env())?;
//! tracing::info!("services starting");
//! ```

mod logging;
mod metrics;

pub use logging::{LogFormat, LoggingConfig, init_logging};
pub use metrics::{MetricsConfig, install_prometheus, render_global};

use metrics_exporter_prometheus::PrometheusHandle;

use crate::Result;

/// Full observability configuration.
#[derive(Debug, Clone, Default)]
pub struct ObservabilityConfig {
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Metrics configuration.
    pub metrics: MetricsConfig,
    /// Whether to expose metrics via an HTTP scrape listener.
    pub metrics_expose: bool,
}

impl ObservabilityConfig {
    /// Builds the full configuration from environment variables.
    ///
    /// `QONDUIT_METRICS_EXPOSE` controls the HTTP scrape listener; the
    /// rest of the variables are documented on [`LoggingConfig`] and
    /// [`MetricsConfig`].
    #[must_use]
    pub fn from_env() -> Self {
        let metrics_expose = std::env::var("QONDUIT_METRICS_EXPOSE")
            .map(|value| {
                let value = value.to_lowercase();
                value == "true" || value == "1" || value == "yes"
            })
            .unwrap_or(false);

        Self {
            logging: LoggingConfig::from_env(),
            metrics: MetricsConfig::from_env(),
            metrics_expose,
        }
    }
}

/// Initializes logging and metrics for the process.
///
/// Returns the Prometheus handle when metrics are enabled, for
/// render-on-demand access.
///
/// # Errors
///
/// Returns an error if logging or the metrics recorder was already
/// initialized, or if the exporter cannot be built.
pub fn init(config: &ObservabilityConfig) -> Result<Option<PrometheusHandle>> {
    init_logging(&config.logging)?;
    install_prometheus(&config.metrics, config.metrics_expose)
}

/// Initializes observability from environment variables.
///
/// # Errors
///
/// Same failure modes as [`init`].
pub fn init_from_env() -> Result<Option<PrometheusHandle>> {
    init(&ObservabilityConfig::from_env())
}
