//! Null backend: telemetry compiled in but switched off.

use std::sync::Arc;

use opentelemetry::global::BoxedTracer;
use opentelemetry::metrics::Meter;
use opentelemetry::trace::SpanContext;

use super::{SpanHandle, TelemetryBackend};

/// Backend that drops everything.
///
/// Selected when telemetry is disabled by configuration or when the OTLP
/// backend fails to build. Spans started on top of it come back inactive,
/// so instrumented code behaves identically in both modes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBackend;

impl TelemetryBackend for NoopBackend {
    fn enabled(&self) -> bool {
        false
    }

    fn start_span(
        &self,
        _name: &str,
        _attributes: &[(String, String)],
        _parent: Option<&SpanContext>,
    ) -> Option<Box<dyn SpanHandle>> {
        None
    }

    fn tracer(&self, _name: &str) -> Option<Arc<BoxedTracer>> {
        None
    }

    fn meter(&self, _name: &str) -> Option<Arc<Meter>> {
        None
    }

    fn add_tokens(&self, _count: u64) {}

    fn record_token_time(&self, _milliseconds: f64) {}

    fn record_model_load_time(&self, _milliseconds: f64) {}

    fn add_memory_usage(&self, _delta_bytes: i64) {}

    fn record_batch_size(&self, _size: u64) {}

    fn add_active_requests(&self, _delta: i64) {}

    fn shutdown(&self) {}
}
