//! Contract tests for the telemetry facade against a recording backend.
//!
//! Tests:
//! - Span lifecycle: one end event per span, attributes delivered
//! - Child spans: parented when active, contained when inactive
//! - Active-requests delta tracking under concurrency

mod common;

use common::BackendEvent;
use kiln_telemetry::ScopedSpan;
use std::time::Instant;

/// Full scenario: a `load_model` span with one attribute reaches the
/// backend exactly once, with end time at or after start time.
#[test]
fn test_load_model_span_reaches_backend_once() {
    let (telemetry, events) = common::recording_telemetry();

    {
        let mut span = telemetry.span_with_attributes("load_model", &[("model", "7B")]);
        span.add_event("weights_mapped", &[]);
    }

    let events = events.lock().unwrap();

    let started_at: Vec<Instant> = events
        .iter()
        .filter_map(|e| match e {
            BackendEvent::SpanStarted { name, at, .. } if name == "load_model" => Some(*at),
            _ => None,
        })
        .collect();
    assert_eq!(started_at.len(), 1, "exactly one span should start");

    let ended_at: Vec<Instant> = events
        .iter()
        .filter_map(|e| match e {
            BackendEvent::SpanEnded { name, at } if name == "load_model" => Some(*at),
            _ => None,
        })
        .collect();
    assert_eq!(ended_at.len(), 1, "exactly one end should reach the backend");
    assert!(ended_at[0] >= started_at[0]);

    assert!(events.iter().any(|e| matches!(
        e,
        BackendEvent::AttributeSet { key, value } if key == "model" && value == "7B"
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        BackendEvent::EventAdded { name } if name == "weights_mapped"
    )));
}

#[test]
fn test_explicit_close_then_drop_ends_once() {
    let (telemetry, events) = common::recording_telemetry();

    let mut span = telemetry.span("completion_request");
    span.end();
    drop(span);

    assert_eq!(
        common::ended_count(&events.lock().unwrap(), "completion_request"),
        1
    );
}

#[test]
fn test_child_span_is_parented() {
    let (telemetry, events) = common::recording_telemetry();

    let parent = telemetry.span("completion_request");
    let child = telemetry.child_span(&parent, "token_generation");
    assert!(child.is_active());

    let events = events.lock().unwrap();
    assert!(events.iter().any(|e| matches!(
        e,
        BackendEvent::SpanStarted { name, parented: true, .. } if name == "token_generation"
    )));
}

#[test]
fn test_inactive_parent_contains_descendants() {
    let (telemetry, events) = common::recording_telemetry();

    let parent = ScopedSpan::inactive();
    let child = telemetry.child_span(&parent, "token_generation");
    let grandchild = telemetry.child_span(&child, "sampling");

    assert!(!child.is_active());
    assert!(!grandchild.is_active());
    assert!(
        events.lock().unwrap().is_empty(),
        "no span from an inactive lineage may reach the backend"
    );
}

#[test]
fn test_repeated_active_request_count_emits_one_delta() {
    let (telemetry, events) = common::recording_telemetry();

    telemetry.set_active_requests(5);
    telemetry.set_active_requests(5);

    let deltas: Vec<i64> = events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            BackendEvent::ActiveRequestsDelta(d) => Some(*d),
            _ => None,
        })
        .collect();
    assert_eq!(deltas, vec![5], "unchanged counts must not reach the backend");
}

/// Concurrent reporters cannot lose updates: after every thread has
/// reported and the count returns to zero, the deltas sum to zero.
#[test]
fn test_concurrent_active_request_deltas_stay_consistent() {
    let (telemetry, events) = common::recording_telemetry();

    let handles: Vec<_> = (1..=8i64)
        .map(|count| {
            let telemetry = telemetry.clone();
            std::thread::spawn(move || {
                telemetry.set_active_requests(count);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    telemetry.set_active_requests(0);

    let sum: i64 = events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            BackendEvent::ActiveRequestsDelta(d) => Some(*d),
            _ => None,
        })
        .sum();
    assert_eq!(sum, 0, "deltas must reconcile to the final reported count");
}

#[test]
fn test_recording_functions_forward_measurements() {
    let (telemetry, events) = common::recording_telemetry();

    telemetry.increment_tokens(3);
    telemetry.record_token_time(1.25);
    telemetry.record_model_load_time(980.0);
    telemetry.record_memory_usage(4096);
    telemetry.record_batch_size(16);

    let events = events.lock().unwrap();
    assert!(events.iter().any(|e| matches!(e, BackendEvent::Tokens(3))));
    assert!(events
        .iter()
        .any(|e| matches!(e, BackendEvent::BatchSize(16))));
    assert!(events
        .iter()
        .any(|e| matches!(e, BackendEvent::MemoryUsage(4096))));
}

#[test]
fn test_shutdown_silences_the_facade() {
    let (telemetry, events) = common::recording_telemetry();

    telemetry.shutdown();
    telemetry.shutdown();

    telemetry.increment_tokens(1);
    telemetry.set_active_requests(4);
    let span = telemetry.span("late");
    assert!(!span.is_active());

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1, "only the first shutdown may reach the backend");
    assert!(matches!(events[0], BackendEvent::Shutdown));
}
