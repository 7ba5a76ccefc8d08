//! Tracing subscriber setup for the engine and its transport.
//!
//! One call at process start wires a structured `fmt` layer, an env-driven
//! filter, and (optionally) an OpenTelemetry bridge with a stdout span
//! exporter. The exporter is meant for local inspection; a deployment that
//! ships traces elsewhere swaps it for OTLP without touching call sites.

use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Provider kept for the shutdown flush. Set at most once.
static OTEL_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber.
///
/// The filter honors `RUST_LOG` and defaults to `info`. With `enable_otel`
/// set, tracing spans are additionally bridged to an OpenTelemetry stdout
/// exporter whose provider is flushed by [`shutdown_tracing`].
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(enable_otel: bool) -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE);

    let registry = tracing_subscriber::registry().with(filter).with(fmt_layer);

    if enable_otel {
        registry.with(otel_layer()).try_init()?;
    } else {
        registry.try_init()?;
    }
    Ok(())
}

/// Build the OpenTelemetry bridge layer and stash its provider for shutdown.
fn otel_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
        .build();
    let tracer = provider.tracer("handrail");

    let _ = OTEL_PROVIDER.set(provider.clone());
    opentelemetry::global::set_tracer_provider(provider);

    tracing_opentelemetry::layer().with_tracer(tracer)
}

/// Flush buffered spans before process exit. No-op when OTel was not enabled.
pub fn shutdown_tracing() {
    if let Some(provider) = OTEL_PROVIDER.get() {
        if let Err(err) = provider.shutdown() {
            eprintln!("otel provider shutdown failed: {err}");
        }
    }
}
