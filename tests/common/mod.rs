//! Shared test backend that records every call the facade makes.
//!
//! Stands in for a real collector: spans, measurements, and shutdown all
//! land in an in-memory event log the tests can assert against.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Instant;

use kiln_telemetry::backend::{SpanHandle, TelemetryBackend};
use kiln_telemetry::Telemetry;
use opentelemetry::global::BoxedTracer;
use opentelemetry::metrics::Meter;
use opentelemetry::trace::SpanContext;

/// One observed backend interaction.
#[derive(Debug, Clone)]
pub enum BackendEvent {
    SpanStarted {
        name: String,
        parented: bool,
        at: Instant,
    },
    SpanEnded {
        name: String,
        at: Instant,
    },
    AttributeSet {
        key: String,
        value: String,
    },
    EventAdded {
        name: String,
    },
    ErrorSet {
        message: String,
    },
    Tokens(u64),
    TokenTime(f64),
    ModelLoadTime(f64),
    MemoryUsage(i64),
    BatchSize(u64),
    ActiveRequestsDelta(i64),
    Shutdown,
}

pub type EventLog = Arc<Mutex<Vec<BackendEvent>>>;

/// Backend that appends every interaction to a shared log.
pub struct RecordingBackend {
    events: EventLog,
}

struct RecordingSpan {
    name: String,
    events: EventLog,
}

impl SpanHandle for RecordingSpan {
    fn span_context(&self) -> SpanContext {
        SpanContext::empty_context()
    }

    fn set_attribute(&mut self, key: &str, value: &str) {
        self.events.lock().unwrap().push(BackendEvent::AttributeSet {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    fn add_event(&mut self, name: &str) {
        self.events.lock().unwrap().push(BackendEvent::EventAdded {
            name: name.to_string(),
        });
    }

    fn set_error(&mut self, message: &str) {
        self.events.lock().unwrap().push(BackendEvent::ErrorSet {
            message: message.to_string(),
        });
    }

    fn end(&mut self) {
        self.events.lock().unwrap().push(BackendEvent::SpanEnded {
            name: self.name.clone(),
            at: Instant::now(),
        });
    }
}

impl TelemetryBackend for RecordingBackend {
    fn enabled(&self) -> bool {
        true
    }

    fn start_span(
        &self,
        name: &str,
        attributes: &[(String, String)],
        parent: Option<&SpanContext>,
    ) -> Option<Box<dyn SpanHandle>> {
        let mut events = self.events.lock().unwrap();
        events.push(BackendEvent::SpanStarted {
            name: name.to_string(),
            parented: parent.is_some(),
            at: Instant::now(),
        });
        for (key, value) in attributes {
            events.push(BackendEvent::AttributeSet {
                key: key.clone(),
                value: value.clone(),
            });
        }
        Some(Box::new(RecordingSpan {
            name: name.to_string(),
            events: Arc::clone(&self.events),
        }))
    }

    fn tracer(&self, _name: &str) -> Option<Arc<BoxedTracer>> {
        None
    }

    fn meter(&self, _name: &str) -> Option<Arc<Meter>> {
        None
    }

    fn add_tokens(&self, count: u64) {
        self.events.lock().unwrap().push(BackendEvent::Tokens(count));
    }

    fn record_token_time(&self, milliseconds: f64) {
        self.events
            .lock()
            .unwrap()
            .push(BackendEvent::TokenTime(milliseconds));
    }

    fn record_model_load_time(&self, milliseconds: f64) {
        self.events
            .lock()
            .unwrap()
            .push(BackendEvent::ModelLoadTime(milliseconds));
    }

    fn add_memory_usage(&self, delta_bytes: i64) {
        self.events
            .lock()
            .unwrap()
            .push(BackendEvent::MemoryUsage(delta_bytes));
    }

    fn record_batch_size(&self, size: u64) {
        self.events
            .lock()
            .unwrap()
            .push(BackendEvent::BatchSize(size));
    }

    fn add_active_requests(&self, delta: i64) {
        self.events
            .lock()
            .unwrap()
            .push(BackendEvent::ActiveRequestsDelta(delta));
    }

    fn shutdown(&self) {
        self.events.lock().unwrap().push(BackendEvent::Shutdown);
    }
}

/// Build a telemetry context wired to an in-memory event log.
pub fn recording_telemetry() -> (Telemetry, EventLog) {
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let telemetry = Telemetry::with_backend(Box::new(RecordingBackend {
        events: Arc::clone(&events),
    }));
    (telemetry, events)
}

/// Count span-end events carrying `name`.
pub fn ended_count(events: &[BackendEvent], name: &str) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, BackendEvent::SpanEnded { name: n, .. } if n == name))
        .count()
}
