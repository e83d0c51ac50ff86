//! kilnprobe: smoke-test a collector endpoint with simulated inference
//! telemetry.
//!
//! Drives the full facade surface against a running OTLP collector: one
//! simulated model load followed by waves of completion requests, each
//! emitting spans, token counters, and latency histograms. Useful for
//! verifying collector wiring and dashboards before deploying the server.

use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use kiln_telemetry::{logging, Telemetry, TelemetryConfig};
use serde::Serialize;
use uuid::Uuid;

/// Model name reported on simulated spans.
const MODEL_NAME: &str = "kiln-7b-q4";

/// Bytes "allocated" by the simulated model load.
const MODEL_BYTES: i64 = 4 * 1024 * 1024 * 1024;

/// Smoke-test tool for Kiln telemetry export.
#[derive(Parser, Debug)]
#[command(name = "kilnprobe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// OTLP collector endpoint
    #[arg(
        short,
        long,
        env = "OTEL_EXPORTER_OTLP_ENDPOINT",
        default_value = "http://localhost:4317"
    )]
    endpoint: String,

    /// Service name reported to the collector
    #[arg(long, default_value = "kiln-server")]
    service_name: String,

    /// Number of simulated completion requests
    #[arg(short, long, default_value_t = 5)]
    requests: u32,

    /// Number of requests run concurrently
    #[arg(short, long, default_value_t = 1)]
    parallel: u32,

    /// Tokens generated per simulated request
    #[arg(short, long, default_value_t = 32)]
    tokens: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    output: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

/// Run summary printed after the probe completes.
#[derive(Debug, Serialize)]
struct ProbeSummary {
    endpoint: String,
    requests: u32,
    tokens_generated: u64,
    elapsed_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level);

    let config = TelemetryConfig::with_endpoint(
        &cli.service_name,
        env!("CARGO_PKG_VERSION"),
        &cli.endpoint,
    );
    let telemetry = Telemetry::init(&config);
    if !telemetry.is_enabled() {
        anyhow::bail!("telemetry setup failed for endpoint {}", cli.endpoint);
    }

    let summary = run_probe(&telemetry, &cli).await;

    telemetry.shutdown();

    match cli.output {
        OutputFormat::Text => {
            println!(
                "probe complete: {} requests, {} tokens in {} ms against {}",
                summary.requests, summary.tokens_generated, summary.elapsed_ms, summary.endpoint
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

async fn run_probe(telemetry: &Telemetry, cli: &Cli) -> ProbeSummary {
    let started = Instant::now();

    simulate_model_load(telemetry).await;

    let mut total_tokens = 0u64;
    let mut remaining = cli.requests;
    while remaining > 0 {
        let wave = remaining.min(cli.parallel.max(1));
        telemetry.set_active_requests(i64::from(wave));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..wave {
            let telemetry = telemetry.clone();
            let tokens = cli.tokens;
            tasks.spawn(async move { simulate_completion(&telemetry, tokens).await });
        }
        while let Some(result) = tasks.join_next().await {
            total_tokens += result.unwrap_or(0);
        }

        telemetry.set_active_requests(0);
        remaining -= wave;
    }

    telemetry.record_memory_usage(-MODEL_BYTES);

    ProbeSummary {
        endpoint: cli.endpoint.clone(),
        requests: cli.requests,
        tokens_generated: total_tokens,
        elapsed_ms: started.elapsed().as_millis() as u64,
    }
}

/// Simulate loading model weights and record the load time.
async fn simulate_model_load(telemetry: &Telemetry) {
    let mut span = telemetry.span_with_attributes("load_model", &[("model", MODEL_NAME)]);
    let started = Instant::now();

    tokio::time::sleep(Duration::from_millis(120)).await;
    span.add_event("weights_mapped", &[]);
    telemetry.record_memory_usage(MODEL_BYTES);

    telemetry.record_model_load_time(elapsed_ms(started));
    span.end();

    tracing::info!(model = MODEL_NAME, "Simulated model load");
}

/// Simulate one completion request; returns the number of tokens generated.
async fn simulate_completion(telemetry: &Telemetry, tokens: u32) -> u64 {
    let request_id = Uuid::now_v7().to_string();
    let mut span = telemetry.span_with_attributes(
        "completion_request",
        &[("request.id", request_id.as_str()), ("model", MODEL_NAME)],
    );

    let mut prompt_span = telemetry.child_span(&span, "prompt_eval");
    tokio::time::sleep(Duration::from_millis(15)).await;
    prompt_span.end();

    let mut generated = 0u64;
    let mut gen_span = telemetry.child_span(&span, "token_generation");
    for _ in 0..tokens {
        let token_started = Instant::now();
        tokio::time::sleep(Duration::from_millis(2)).await;
        telemetry.record_token_time(elapsed_ms(token_started));
        telemetry.increment_tokens(1);
        generated += 1;
    }
    telemetry.record_batch_size(u64::from(tokens));
    gen_span.end();

    span.add_event("completion_finished", &[]);
    generated
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
