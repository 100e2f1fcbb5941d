use opentelemetry::KeyValue;
use opentelemetry::trace::TraceError;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, runtime, trace as sdktrace};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// Logs are written as flattened JSON to stdout. `RUST_LOG` takes precedence
/// over `log_level`. When `otlp_endpoint` is set, spans are additionally
/// exported over OTLP/gRPC; if the exporter cannot be built the service keeps
/// running with stdout logging only and says so once the subscriber is up.
pub fn init_tracing(service_name: &str, log_level: &str, otlp_endpoint: Option<&str>) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let otlp = otlp_endpoint.map(|endpoint| (endpoint, otlp_tracer(service_name, endpoint)));

    let (telemetry, export_failure) = match otlp {
        Some((_, Ok(tracer))) => (Some(tracing_opentelemetry::layer().with_tracer(tracer)), None),
        Some((endpoint, Err(e))) => (None, Some((endpoint, e))),
        None => (None, None),
    };

    let json_logs = tracing_subscriber::fmt::layer()
        .json()
        .flatten_event(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(telemetry)
        .with(json_logs)
        .init();

    match export_failure {
        Some((endpoint, e)) => tracing::warn!(
            service = service_name,
            endpoint,
            error = %e,
            "OTLP export disabled, logging to stdout only"
        ),
        None => tracing::debug!(
            service = service_name,
            otlp = otlp_endpoint.is_some(),
            "Tracing initialized"
        ),
    }
}

fn otlp_tracer(service_name: &str, endpoint: &str) -> Result<sdktrace::Tracer, TraceError> {
    let resource = Resource::new(vec![KeyValue::new(
        "service.name",
        service_name.to_string(),
    )]);

    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .with_trace_config(sdktrace::config().with_resource(resource))
        .install_batch(runtime::Tokio)
}
