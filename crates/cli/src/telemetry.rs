//! Tracing subscriber and OpenTelemetry wiring.
//!
//! Always installs a JSON `fmt` layer filtered by `RUST_LOG` (default
//! `info`). When `[telemetry] otlp_endpoint` is set, spans are also exported
//! over OTLP/gRPC; a broken exporter falls back to JSON-only logging instead
//! of stopping the connector.

use std::time::Duration;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::runtime;
use opentelemetry_sdk::trace::span_processor_with_async_runtime::BatchSpanProcessor;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::TelemetryConfig;

/// Flushes pending spans on [`TelemetryGuard::shutdown`].
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    /// Flushes and stops the exporter.
    ///
    /// The provider blocks until the batch task on the runtime has drained, so
    /// the wait happens off the async worker threads.
    pub async fn shutdown(mut self) {
        let Some(provider) = self.provider.take() else {
            return;
        };
        match tokio::task::spawn_blocking(move || provider.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "OpenTelemetry tracer provider shutdown failed");
            }
            Err(e) => {
                tracing::warn!(error = %e, "OpenTelemetry shutdown task failed");
            }
        }
    }
}

/// Installs the global subscriber.
pub fn init(config: &TelemetryConfig) -> TelemetryGuard {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().json();

    let (provider, export_error) = match config.otlp_endpoint.as_deref() {
        None => (None, None),
        Some(endpoint) => match build_provider(config, endpoint) {
            Ok(provider) => (Some(provider), None),
            Err(e) => (None, Some(e)),
        },
    };

    let otel_layer = provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer("asana-connector"))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .init();

    match (&provider, export_error) {
        (Some(_), _) => tracing::info!(
            endpoint = config.otlp_endpoint.as_deref().unwrap_or_default(),
            "OpenTelemetry tracing enabled"
        ),
        (None, Some(e)) => tracing::error!(
            error = %e,
            endpoint = config.otlp_endpoint.as_deref().unwrap_or_default(),
            "failed to build OTLP exporter, falling back to log-only tracing"
        ),
        (None, None) => {}
    }

    TelemetryGuard { provider }
}

fn build_provider(config: &TelemetryConfig, endpoint: &str) -> anyhow::Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_timeout(Duration::from_secs(config.timeout_seconds))
        .build()?;

    let resource = Resource::builder()
        .with_attributes([
            KeyValue::new("service.name", config.service_name.clone()),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ])
        .build();

    // The tonic exporter needs a tokio reactor, so batches are flushed on the
    // runtime rather than on the SDK's own background thread.
    Ok(SdkTracerProvider::builder()
        .with_span_processor(BatchSpanProcessor::builder(exporter, runtime::Tokio).build())
        .with_resource(resource)
        .build())
}
