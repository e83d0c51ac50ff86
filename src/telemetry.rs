//! The telemetry context: lifecycle, span constructors, and the fixed
//! recording surface.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use opentelemetry::global::BoxedTracer;
use opentelemetry::metrics::Meter;

use crate::backend::{NoopBackend, OtlpBackend, TelemetryBackend};
use crate::config::TelemetryConfig;
use crate::span::ScopedSpan;

/// Handle to one telemetry instance.
///
/// Cloning is cheap; clones share the same providers, caches, and shutdown
/// state. Built by [`Telemetry::init`], torn down by
/// [`Telemetry::shutdown`]. No process-wide globals are registered: isolated
/// instances can coexist, which is what the tests rely on.
///
/// Every method is infallible from the caller's perspective. A disabled or
/// shut-down context turns each call into a silent no-op; instrumentation
/// can never fault the host.
#[derive(Clone)]
pub struct Telemetry {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Box<dyn TelemetryBackend>,
    /// Set once by `shutdown`; afterwards every operation is a no-op.
    closed: AtomicBool,
    /// Last absolute active-request count forwarded to the backend.
    last_active_requests: Mutex<i64>,
}

impl Telemetry {
    /// Build a telemetry context from configuration.
    ///
    /// Never fails from the caller's view: when export is disabled, or the
    /// OTLP pipelines cannot be built, the error is logged and the returned
    /// context is inactive. Check [`is_enabled`](Self::is_enabled) for the
    /// outcome.
    ///
    /// Must be called from within a tokio runtime when export is enabled;
    /// the batch exporters spawn their workers onto it.
    pub fn init(config: &TelemetryConfig) -> Self {
        if !config.enabled {
            tracing::info!("Telemetry disabled by configuration");
            return Self::disabled();
        }

        match OtlpBackend::connect(config) {
            Ok(backend) => {
                tracing::info!(
                    endpoint = %config.endpoint,
                    service = %config.service_name,
                    "OpenTelemetry initialized"
                );
                Self::from_backend(Box::new(backend))
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize OpenTelemetry, telemetry disabled");
                Self::disabled()
            }
        }
    }

    /// A context that records nothing.
    pub fn disabled() -> Self {
        Self::from_backend(Box::new(NoopBackend))
    }

    /// Build a context on top of a custom backend.
    ///
    /// Intended for tests and embedders that bring their own sink.
    pub fn with_backend(backend: Box<dyn TelemetryBackend>) -> Self {
        Self::from_backend(backend)
    }

    fn from_backend(backend: Box<dyn TelemetryBackend>) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                closed: AtomicBool::new(false),
                last_active_requests: Mutex::new(0),
            }),
        }
    }

    /// Whether measurements are currently forwarded anywhere.
    pub fn is_enabled(&self) -> bool {
        !self.inner.closed.load(Ordering::Relaxed) && self.inner.backend.enabled()
    }

    /// Flush and release the export pipelines.
    ///
    /// Safe to call on a disabled context or more than once; only the first
    /// call reaches the backend. Afterwards every span constructor and
    /// recording call degrades to a no-op.
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.backend.shutdown();
        tracing::debug!("Telemetry shut down");
    }

    fn backend(&self) -> Option<&dyn TelemetryBackend> {
        if self.inner.closed.load(Ordering::Relaxed) {
            None
        } else {
            Some(self.inner.backend.as_ref())
        }
    }

    /// Start a new root span.
    pub fn span(&self, name: &str) -> ScopedSpan {
        self.span_with_attributes(name, &[])
    }

    /// Start a new root span with initial attributes.
    pub fn span_with_attributes(&self, name: &str, attributes: &[(&str, &str)]) -> ScopedSpan {
        match self.backend() {
            Some(backend) => {
                ScopedSpan::new(backend.start_span(name, &owned_attrs(attributes), None))
            }
            None => ScopedSpan::inactive(),
        }
    }

    /// Start a span as a child of `parent`.
    ///
    /// An inactive parent always yields an inactive child: descendants of a
    /// span that was never started must not surface as new roots.
    pub fn child_span(&self, parent: &ScopedSpan, name: &str) -> ScopedSpan {
        self.child_span_with_attributes(parent, name, &[])
    }

    /// Start a child span with initial attributes.
    pub fn child_span_with_attributes(
        &self,
        parent: &ScopedSpan,
        name: &str,
        attributes: &[(&str, &str)],
    ) -> ScopedSpan {
        let Some(parent_cx) = parent.span_context() else {
            return ScopedSpan::inactive();
        };
        match self.backend() {
            Some(backend) => ScopedSpan::new(backend.start_span(
                name,
                &owned_attrs(attributes),
                Some(&parent_cx),
            )),
            None => ScopedSpan::inactive(),
        }
    }

    /// Cached named tracer; `None` when disabled or shut down.
    ///
    /// Repeated calls with the same name return the identical handle.
    pub fn tracer(&self, name: &str) -> Option<Arc<BoxedTracer>> {
        self.backend()?.tracer(name)
    }

    /// Cached named meter; `None` when disabled or shut down.
    ///
    /// Repeated calls with the same name return the identical handle.
    pub fn meter(&self, name: &str) -> Option<Arc<Meter>> {
        self.backend()?.meter(name)
    }

    /// Add to the generated-token counter (`tokens.count`).
    pub fn increment_tokens(&self, count: u64) {
        if let Some(backend) = self.backend() {
            backend.add_tokens(count);
        }
    }

    /// Record one token generation time in milliseconds (`token.time`).
    pub fn record_token_time(&self, milliseconds: f64) {
        if let Some(backend) = self.backend() {
            backend.record_token_time(milliseconds);
        }
    }

    /// Record a model load time in milliseconds (`model.load.time`).
    pub fn record_model_load_time(&self, milliseconds: f64) {
        if let Some(backend) = self.backend() {
            backend.record_model_load_time(milliseconds);
        }
    }

    /// Adjust the memory-usage counter by a byte delta (`memory.usage`).
    pub fn record_memory_usage(&self, delta_bytes: i64) {
        if let Some(backend) = self.backend() {
            backend.add_memory_usage(delta_bytes);
        }
    }

    /// Record a token batch size (`batch.size`).
    pub fn record_batch_size(&self, size: u64) {
        if let Some(backend) = self.backend() {
            backend.record_batch_size(size);
        }
    }

    /// Report the absolute number of in-flight requests (`requests.active`).
    ///
    /// The facade converts absolute counts into deltas for the up/down
    /// counter, serialized under one lock so concurrent reporters cannot
    /// lose updates. An unchanged count never reaches the backend.
    pub fn set_active_requests(&self, count: i64) {
        let Some(backend) = self.backend() else {
            return;
        };
        if !backend.enabled() {
            return;
        }
        let mut last = self.inner.last_active_requests.lock().unwrap();
        let delta = count - *last;
        if delta != 0 {
            backend.add_active_requests(delta);
            *last = count;
        }
    }
}

impl fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Telemetry")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

fn owned_attrs(attributes: &[(&str, &str)]) -> Vec<(String, String)> {
    attributes
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}
