//! Error types for telemetry initialization.

use thiserror::Error;

/// Failure while building the OTLP export pipelines.
///
/// These never escape the facade: [`Telemetry::init`](crate::Telemetry::init)
/// logs them and falls back to the disabled backend, so instrumented code
/// cannot be faulted by a broken collector setup.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The span exporter or tracer provider could not be built.
    #[error("failed to build OTLP trace pipeline: {0}")]
    Trace(#[from] opentelemetry::trace::TraceError),

    /// The metrics exporter pipeline could not be built.
    #[error("failed to build OTLP metrics pipeline: {0}")]
    Metrics(#[from] opentelemetry::metrics::MetricsError),
}
