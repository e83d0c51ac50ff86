//! OpenTelemetry SDK backend with OTLP/gRPC export.
//!
//! Fixed instruments:
//! - `tokens.count`: Counter for generated tokens
//! - `token.time`: Histogram of per-token generation time (ms)
//! - `model.load.time`: Histogram of model load time (ms)
//! - `memory.usage`: UpDownCounter for memory usage (bytes)
//! - `batch.size`: Histogram of token batch sizes
//! - `requests.active`: UpDownCounter for in-flight requests
//!
//! Tracer and meter handles are cached by name: at most one instance exists
//! per distinct name for the lifetime of the backend, and the first caller
//! pays the creation cost.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use opentelemetry::global::{BoxedSpan, BoxedTracer};
use opentelemetry::metrics::{Counter, Histogram, Meter, MeterProvider as _, UpDownCounter};
use opentelemetry::trace::{
    Span as _, SpanContext, Status, TraceContextExt, Tracer as _, TracerProvider as _,
};
use opentelemetry::{Context, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace as sdktrace;
use opentelemetry_sdk::{runtime, Resource};

use super::{SpanHandle, TelemetryBackend};
use crate::config::TelemetryConfig;
use crate::error::TelemetryError;
use crate::DEFAULT_SCOPE;

/// Interval between metric exports to the collector.
const EXPORT_PERIOD: Duration = Duration::from_secs(10);

/// The six fixed instruments.
///
/// Names, descriptions, and units are wire constants; dashboards and alerts
/// key on them.
#[derive(Debug)]
struct Instruments {
    tokens: Counter<u64>,
    token_time: Histogram<f64>,
    model_load_time: Histogram<f64>,
    memory_usage: UpDownCounter<i64>,
    batch_size: Histogram<u64>,
    active_requests: UpDownCounter<i64>,
}

impl Instruments {
    fn new(meter: &Meter) -> Self {
        Self {
            tokens: meter
                .u64_counter("tokens.count")
                .with_description("Number of tokens generated")
                .with_unit("tokens")
                .init(),
            token_time: meter
                .f64_histogram("token.time")
                .with_description("Time to generate each token")
                .with_unit("ms")
                .init(),
            model_load_time: meter
                .f64_histogram("model.load.time")
                .with_description("Time to load a model")
                .with_unit("ms")
                .init(),
            memory_usage: meter
                .i64_up_down_counter("memory.usage")
                .with_description("Memory usage")
                .with_unit("bytes")
                .init(),
            batch_size: meter
                .u64_histogram("batch.size")
                .with_description("Token batch size")
                .with_unit("tokens")
                .init(),
            active_requests: meter
                .i64_up_down_counter("requests.active")
                .with_description("Number of active requests")
                .with_unit("requests")
                .init(),
        }
    }
}

/// Real backend: owns the SDK providers and the named-handle caches.
pub struct OtlpBackend {
    tracer_provider: sdktrace::TracerProvider,
    meter_provider: SdkMeterProvider,
    instruments: Instruments,
    /// Named tracer cache. Locked only for lookup-or-insert.
    tracers: Mutex<HashMap<String, Arc<BoxedTracer>>>,
    /// Named meter cache. Locked only for lookup-or-insert.
    meters: Mutex<HashMap<String, Arc<Meter>>>,
}

impl OtlpBackend {
    /// Build the trace and metrics pipelines against the collector endpoint.
    ///
    /// The endpoint is passed through to the exporter factories unvalidated.
    /// Must run inside a tokio runtime: both batch workers spawn onto it.
    pub fn connect(config: &TelemetryConfig) -> Result<Self, TelemetryError> {
        let resource = Resource::new(vec![
            KeyValue::new("service.name", config.service_name.clone()),
            KeyValue::new("service.version", config.service_version.clone()),
        ]);

        let span_exporter = opentelemetry_otlp::new_exporter()
            .tonic()
            .with_endpoint(&config.endpoint)
            .build_span_exporter()?;
        let processor =
            sdktrace::BatchSpanProcessor::builder(span_exporter, runtime::Tokio).build();
        let tracer_provider = sdktrace::TracerProvider::builder()
            .with_span_processor(processor)
            .with_config(sdktrace::Config::default().with_resource(resource.clone()))
            .build();

        let meter_provider = match opentelemetry_otlp::new_pipeline()
            .metrics(runtime::Tokio)
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .tonic()
                    .with_endpoint(&config.endpoint),
            )
            .with_resource(resource)
            .with_period(EXPORT_PERIOD)
            .build()
        {
            Ok(provider) => provider,
            Err(e) => {
                // Tear down the half-built trace side before reporting failure.
                let _ = tracer_provider.shutdown();
                return Err(e.into());
            }
        };

        Ok(Self::from_providers(tracer_provider, meter_provider))
    }

    /// Assemble a backend from already-built providers.
    ///
    /// The six instruments are created here, all together: either every
    /// handle is valid or the backend does not exist.
    pub fn from_providers(
        tracer_provider: sdktrace::TracerProvider,
        meter_provider: SdkMeterProvider,
    ) -> Self {
        let instruments = Instruments::new(&meter_provider.meter(DEFAULT_SCOPE));
        Self {
            tracer_provider,
            meter_provider,
            instruments,
            tracers: Mutex::new(HashMap::new()),
            meters: Mutex::new(HashMap::new()),
        }
    }
}

impl TelemetryBackend for OtlpBackend {
    fn enabled(&self) -> bool {
        true
    }

    fn start_span(
        &self,
        name: &str,
        attributes: &[(String, String)],
        parent: Option<&SpanContext>,
    ) -> Option<Box<dyn SpanHandle>> {
        let tracer = self.tracer(DEFAULT_SCOPE)?;
        let mut builder = tracer.span_builder(name.to_string());
        if !attributes.is_empty() {
            let attrs: Vec<KeyValue> = attributes
                .iter()
                .map(|(k, v)| KeyValue::new(k.clone(), v.clone()))
                .collect();
            builder = builder.with_attributes(attrs);
        }
        // An empty context forces a new root; the ambient context is never
        // consulted.
        let parent_cx = match parent {
            Some(ctx) => Context::new().with_remote_span_context(ctx.clone()),
            None => Context::new(),
        };
        let span = tracer.build_with_context(builder, &parent_cx);
        Some(Box::new(OtlpSpan { span }))
    }

    fn tracer(&self, name: &str) -> Option<Arc<BoxedTracer>> {
        let mut tracers = self.tracers.lock().unwrap();
        let tracer = tracers.entry(name.to_string()).or_insert_with(|| {
            Arc::new(BoxedTracer::new(Box::new(
                self.tracer_provider.tracer(name.to_string()),
            )))
        });
        Some(Arc::clone(tracer))
    }

    fn meter(&self, name: &str) -> Option<Arc<Meter>> {
        let mut meters = self.meters.lock().unwrap();
        let meter = meters.entry(name.to_string()).or_insert_with(|| {
            let static_name: &'static str = Box::leak(name.to_string().into_boxed_str());
            Arc::new(self.meter_provider.meter(static_name))
        });
        Some(Arc::clone(meter))
    }

    fn add_tokens(&self, count: u64) {
        self.instruments.tokens.add(count, &[]);
    }

    fn record_token_time(&self, milliseconds: f64) {
        self.instruments.token_time.record(milliseconds, &[]);
    }

    fn record_model_load_time(&self, milliseconds: f64) {
        self.instruments.model_load_time.record(milliseconds, &[]);
    }

    fn add_memory_usage(&self, delta_bytes: i64) {
        self.instruments.memory_usage.add(delta_bytes, &[]);
    }

    fn record_batch_size(&self, size: u64) {
        self.instruments.batch_size.record(size, &[]);
    }

    fn add_active_requests(&self, delta: i64) {
        self.instruments.active_requests.add(delta, &[]);
    }

    fn shutdown(&self) {
        if let Err(e) = self.tracer_provider.shutdown() {
            tracing::warn!(error = %e, "Tracer provider shutdown reported an error");
        }
        if let Err(e) = self.meter_provider.shutdown() {
            tracing::warn!(error = %e, "Meter provider shutdown reported an error");
        }
    }
}

/// SDK-backed span handle.
struct OtlpSpan {
    span: BoxedSpan,
}

impl SpanHandle for OtlpSpan {
    fn span_context(&self) -> SpanContext {
        self.span.span_context().clone()
    }

    fn set_attribute(&mut self, key: &str, value: &str) {
        self.span
            .set_attribute(KeyValue::new(key.to_string(), value.to_string()));
    }

    fn add_event(&mut self, name: &str) {
        self.span.add_event(name.to_string(), Vec::new());
    }

    fn set_error(&mut self, message: &str) {
        self.span.set_status(Status::error(message.to_string()));
    }

    fn end(&mut self) {
        self.span.end();
    }
}
