//! Tracing subscriber initialization with structured logging and optional
//! OpenTelemetry trace export.
//!
//! This subsystem runs embedded in a host service rather than as its own
//! daemon, so shutdown is tied to a guard value instead of a global: the
//! host initializes once, holds the guard for its lifetime, and dropping
//! it flushes any buffered spans.
//!
//! # Usage
//!
//! ```no_run
//! // Basic structured logging only
//! let _guard = scambait_observe::tracing_setup::init_tracing(false).unwrap();
//!
//! // With OpenTelemetry export to stdout (for local development)
//! let _guard = scambait_observe::tracing_setup::init_tracing(true).unwrap();
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Keeps the OTel tracer provider alive; dropping it flushes pending
/// spans and shuts the provider down. Holds nothing when OTel is off.
pub struct TracingGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("Warning: OTel tracer provider shutdown error: {e}");
            }
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// Installs a structured `fmt` layer with target visibility and span close
/// timing, filtered by `RUST_LOG` (default `info`). When `enable_otel` is
/// true, additionally bridges tracing spans to OpenTelemetry with a stdout
/// exporter; swap the exporter for OTLP in production.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been set.
pub fn init_tracing(enable_otel: bool) -> Result<TracingGuard, Box<dyn std::error::Error>> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter).with(fmt_layer);

    if enable_otel {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("scambait");

        opentelemetry::global::set_tracer_provider(provider.clone());
        registry
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .try_init()?;

        Ok(TracingGuard {
            provider: Some(provider),
        })
    } else {
        registry.try_init()?;
        Ok(TracingGuard { provider: None })
    }
}
