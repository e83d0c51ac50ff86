//! RAII trace spans.

use std::fmt;

use opentelemetry::trace::SpanContext;

use crate::backend::SpanHandle;

/// A scoped trace span.
///
/// Started by [`Telemetry::span`](crate::Telemetry::span) or one of its
/// variants, and ended exactly once: explicitly via [`end`](Self::end) or
/// automatically when the value is dropped.
///
/// When telemetry is disabled, spans come back inactive and every operation
/// on them is a guaranteed no-op. Instrumented code never has to check
/// whether telemetry is on, and no span operation can fail or panic.
///
/// A span belongs to one logical unit of work; it is `Send` but not `Sync`,
/// so it cannot be mutated from two threads at once.
pub struct ScopedSpan {
    handle: Option<Box<dyn SpanHandle>>,
}

impl ScopedSpan {
    pub(crate) fn new(handle: Option<Box<dyn SpanHandle>>) -> Self {
        Self { handle }
    }

    /// A span that records nothing.
    pub fn inactive() -> Self {
        Self { handle: None }
    }

    /// Whether this span is backed by a live backend span.
    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// Set or overwrite one string attribute.
    pub fn set_attribute(&mut self, key: &str, value: &str) {
        if let Some(handle) = self.handle.as_mut() {
            handle.set_attribute(key, value);
        }
    }

    /// Append a timestamped named event to the span timeline.
    ///
    /// Event attributes are accepted but not forwarded to the backend;
    /// existing dashboards expect attribute-less events from this facade.
    pub fn add_event(&mut self, name: &str, attributes: &[(&str, &str)]) {
        let _ = attributes;
        if let Some(handle) = self.handle.as_mut() {
            handle.add_event(name);
        }
    }

    /// Mark the span as errored, taking the message from `error`.
    ///
    /// The span stays open; repeated calls overwrite the status.
    pub fn record_error(&mut self, error: &(dyn std::error::Error + 'static)) {
        self.set_error(&error.to_string());
    }

    /// Mark the span as errored with a message.
    ///
    /// The span stays open; repeated calls overwrite the status.
    pub fn set_error(&mut self, message: &str) {
        if let Some(handle) = self.handle.as_mut() {
            handle.set_error(message);
        }
    }

    /// End the span.
    ///
    /// Idempotent: repeated calls, and the automatic end on drop after an
    /// explicit call, do nothing.
    pub fn end(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.end();
        }
    }

    /// Context for parenting child spans. `None` when inactive or ended.
    pub(crate) fn span_context(&self) -> Option<SpanContext> {
        self.handle.as_ref().map(|h| h.span_context())
    }
}

impl Drop for ScopedSpan {
    fn drop(&mut self) {
        self.end();
    }
}

impl fmt::Debug for ScopedSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedSpan")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inactive_span_ignores_every_operation() {
        let mut span = ScopedSpan::inactive();
        assert!(!span.is_active());

        span.set_attribute("model", "7B");
        span.add_event("started", &[("phase", "warmup")]);
        span.set_error("boom");
        span.end();
        span.end();

        assert!(!span.is_active());
        assert!(span.span_context().is_none());
    }

    #[test]
    fn test_record_error_accepts_error_values() {
        let mut span = ScopedSpan::inactive();
        let err = std::io::Error::new(std::io::ErrorKind::Other, "mmap failed");
        span.record_error(&err);
        assert!(!span.is_active());
    }

    #[test]
    fn test_end_clears_activity() {
        // Inactive from the start; end must stay a no-op on the second call.
        let mut span = ScopedSpan::inactive();
        span.end();
        drop(span);
    }
}
