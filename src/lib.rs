//! Kiln telemetry: OpenTelemetry tracing and metrics for the Kiln
//! inference server.
//!
//! The crate wraps the OpenTelemetry SDK behind a small facade so engine
//! code can be instrumented unconditionally:
//!
//! - **Scoped spans**: started at the top of a logical operation, ended
//!   exactly once at scope exit
//! - **Fixed instruments**: token counts, per-token and model-load
//!   latencies, memory usage, batch sizes, in-flight requests
//! - **Graceful degradation**: with telemetry disabled, or after a failed
//!   collector setup, every operation is a silent no-op
//!
//! # Modules
//!
//! - [`backend`]: backend capability trait and its real/null variants
//! - [`config`]: telemetry configuration
//! - [`error`]: initialization errors
//! - [`logging`]: log subscriber setup for embedding binaries
//! - [`span`]: RAII scoped spans
//! - [`telemetry`]: the context handle and recording surface
//!
//! # Example
//!
//! ```no_run
//! use kiln_telemetry::{Telemetry, TelemetryConfig};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let telemetry = Telemetry::init(&TelemetryConfig::with_endpoint(
//!     "kiln-server",
//!     env!("CARGO_PKG_VERSION"),
//!     "http://localhost:4317",
//! ));
//!
//! let mut span = telemetry.span("load_model");
//! span.set_attribute("model", "7B");
//! telemetry.record_model_load_time(1250.0);
//! drop(span);
//!
//! telemetry.shutdown();
//! # }
//! ```

// Lint configuration
#![warn(clippy::all)]
#![allow(
    clippy::must_use_candidate,  // Not all functions need #[must_use]
    clippy::missing_errors_doc,  // Error docs can be verbose
    clippy::missing_panics_doc   // Panic docs can be verbose
)]

pub mod backend;
pub mod config;
pub mod error;
pub mod logging;
pub mod span;
pub mod telemetry;

pub use config::TelemetryConfig;
pub use error::TelemetryError;
pub use span::ScopedSpan;
pub use telemetry::Telemetry;

/// Instrumentation scope name under which this crate creates its tracers,
/// meters, and instruments.
pub const DEFAULT_SCOPE: &str = "kiln";
