//! Telemetry backend abstraction.
//!
//! The facade talks to one of two backend variants selected at startup:
//! - [`OtlpBackend`]: real OpenTelemetry SDK providers exporting via OTLP
//! - [`NoopBackend`]: every operation is a no-op
//!
//! Custom implementations (e.g. in-memory recorders for tests) can be
//! injected via [`Telemetry::with_backend`](crate::Telemetry::with_backend).

mod noop;
mod otlp;

pub use noop::NoopBackend;
pub use otlp::OtlpBackend;

use std::sync::Arc;

use opentelemetry::global::BoxedTracer;
use opentelemetry::metrics::Meter;
use opentelemetry::trace::SpanContext;

/// One live span, owned by a [`ScopedSpan`](crate::ScopedSpan).
pub trait SpanHandle: Send {
    /// Span context used to parent child spans.
    fn span_context(&self) -> SpanContext;

    /// Set or overwrite one string attribute.
    fn set_attribute(&mut self, key: &str, value: &str);

    /// Append a named event to the span timeline.
    fn add_event(&mut self, name: &str);

    /// Mark the span status as errored. Does not end the span.
    fn set_error(&mut self, message: &str);

    /// End the span. Called at most once by the owning `ScopedSpan`.
    fn end(&mut self);
}

/// Capability interface between the facade and the telemetry SDK.
///
/// Measurements may arrive concurrently from any thread; implementations
/// must not block the caller on export.
pub trait TelemetryBackend: Send + Sync {
    /// Whether this backend forwards measurements anywhere.
    fn enabled(&self) -> bool;

    /// Start a span, optionally parented to `parent`.
    ///
    /// Returns `None` when the backend cannot produce spans; the caller
    /// treats that as an inactive handle.
    fn start_span(
        &self,
        name: &str,
        attributes: &[(String, String)],
        parent: Option<&SpanContext>,
    ) -> Option<Box<dyn SpanHandle>>;

    /// Look up or lazily create the named tracer.
    fn tracer(&self, name: &str) -> Option<Arc<BoxedTracer>>;

    /// Look up or lazily create the named meter.
    fn meter(&self, name: &str) -> Option<Arc<Meter>>;

    /// Add to the generated-token counter.
    fn add_tokens(&self, count: u64);

    /// Record one token generation time in milliseconds.
    fn record_token_time(&self, milliseconds: f64);

    /// Record a model load time in milliseconds.
    fn record_model_load_time(&self, milliseconds: f64);

    /// Adjust the memory-usage up/down counter by a byte delta.
    fn add_memory_usage(&self, delta_bytes: i64);

    /// Record a token batch size.
    fn record_batch_size(&self, size: u64);

    /// Adjust the active-requests up/down counter by a delta.
    fn add_active_requests(&self, delta: i64);

    /// Flush and release exporter resources.
    fn shutdown(&self);
}
