//! Logging and OpenTelemetry tracing for the bookstore server

use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime,
    trace::{self, RandomIdGenerator, Sampler},
    Resource,
};
use std::time::Duration;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info,amana=debug";

/// Initialize OpenTelemetry with OTLP exporter
pub fn init_telemetry(service_name: &str) -> anyhow::Result<opentelemetry_sdk::trace::Tracer> {
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string());

    let resource = Resource::new(vec![
        KeyValue::new("service.name", service_name.to_string()),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
    ]);

    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint)
        .with_timeout(Duration::from_secs(3));

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(
            trace::config()
                .with_sampler(get_sampler())
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(resource),
        )
        .install_batch(runtime::Tokio)?;

    Ok(tracer)
}

/// Get sampler configuration from environment
fn get_sampler() -> Sampler {
    let sample_rate = std::env::var("OTEL_TRACES_SAMPLER_ARG")
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(1.0);

    if sample_rate >= 1.0 {
        Sampler::AlwaysOn
    } else if sample_rate <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(sample_rate)
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize the complete tracing stack (console + OpenTelemetry)
pub fn init_tracing_stack(service_name: &str) -> anyhow::Result<()> {
    let tracer = init_telemetry(service_name)?;
    let otel_layer = OpenTelemetryLayer::new(tracer);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_thread_ids(true)
        .with_thread_names(true);

    Registry::default()
        .with(env_filter())
        .with(fmt_layer)
        .with(otel_layer)
        .init();

    Ok(())
}

/// Initialize console-only logging
pub fn init_console() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(env_filter())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Shutdown OpenTelemetry provider
pub fn shutdown_telemetry() {
    opentelemetry::global::shutdown_tracer_provider();
}

/// Span wrapping one catalogue write
pub fn mutation_span(operation: &'static str) -> tracing::Span {
    tracing::info_span!(
        "catalogue_mutation",
        operation = operation,
        otel.kind = "server",
        otel.status_code = tracing::field::Empty,
        entity_id = tracing::field::Empty,
        error = tracing::field::Empty,
    )
}

/// Record the id of the entity a write produced
pub fn record_created(span: &tracing::Span, entity_id: &str) {
    span.record("entity_id", entity_id);
    span.record("otel.status_code", "OK");
}

/// Record error in current span
pub fn record_error(error: &str) {
    tracing::Span::current().record("otel.status_code", "ERROR");
    tracing::Span::current().record("error", error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::subscriber::with_default;

    #[test]
    fn test_get_sampler_bounds() {
        std::env::set_var("OTEL_TRACES_SAMPLER_ARG", "1.0");
        assert!(matches!(get_sampler(), Sampler::AlwaysOn));

        std::env::set_var("OTEL_TRACES_SAMPLER_ARG", "0.0");
        assert!(matches!(get_sampler(), Sampler::AlwaysOff));

        std::env::set_var("OTEL_TRACES_SAMPLER_ARG", "0.25");
        assert!(matches!(get_sampler(), Sampler::TraceIdRatioBased(_)));

        std::env::set_var("OTEL_TRACES_SAMPLER_ARG", "invalid");
        assert!(matches!(get_sampler(), Sampler::AlwaysOn));

        std::env::remove_var("OTEL_TRACES_SAMPLER_ARG");
        assert!(matches!(get_sampler(), Sampler::AlwaysOn));
    }

    #[test]
    fn test_mutation_span() {
        let subscriber = Registry::default();
        with_default(subscriber, || {
            let span = mutation_span("add_book");
            assert_eq!(span.metadata().unwrap().name(), "catalogue_mutation");

            let _guard = span.enter();
            record_created(&span, "13");
            record_error("disk full");
        });
    }

    #[test]
    fn test_shutdown_telemetry() {
        shutdown_telemetry();
    }
}
