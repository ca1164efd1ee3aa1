//! Process-wide logging for roomscan binaries.
//!
//! [`init_tracing`] installs one `tracing` subscriber made of three layers:
//!
//! * a console formatter, compact by default or one JSON object per line;
//! * an `EnvFilter` driven by `RUST_LOG`;
//! * span export to an OpenTelemetry collector, only when an endpoint is
//!   configured.
//!
//! | Variable | Read by | Default |
//! |---|---|---|
//! | `RUST_LOG` | log filter | `info` |
//! | `ROOMSCAN_LOG_FORMAT` | console formatter (`json` or anything else) | compact |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | OTLP/HTTP span export | disabled |
//!
//! ```rust,no_run
//! let _telemetry = roomscan_runtime::telemetry::init_tracing("roomscan");
//! // ... run the calibration; exported spans are flushed when `_telemetry` drops.
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Selects JSON log output when set to `json`.
pub const LOG_FORMAT_ENV: &str = "ROOMSCAN_LOG_FORMAT";

const ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
const DEFAULT_FILTER: &str = "info";
const TRACER_NAME: &str = "roomscan";

/// Install the global subscriber for `service_name`.
///
/// Call once, before the Tokio runtime is built.  Keep the returned guard
/// alive until the process exits.
pub fn init_tracing(service_name: &str) -> TracerProviderGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let console = if json_logs_requested() {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().compact().boxed()
    };

    let provider = otlp_endpoint(std::env::var(ENDPOINT_ENV).ok())
        .and_then(|endpoint| span_exporter(service_name, endpoint));
    let export = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer(TRACER_NAME)));

    tracing_subscriber::registry()
        .with(console)
        .with(export)
        .with(filter)
        .init();

    TracerProviderGuard(provider)
}

/// `true` when `ROOMSCAN_LOG_FORMAT` asks for JSON lines.
pub fn json_logs_requested() -> bool {
    std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| is_json_format(&v))
}

fn is_json_format(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("json")
}

/// A blank endpoint counts as unset.
fn otlp_endpoint(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Exporting tracer provider for `endpoint`, or `None` if the exporter
/// cannot be built.
fn span_exporter(service_name: &str, endpoint: String) -> Option<SdkTracerProvider> {
    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint.as_str())
        .build()
    {
        Ok(exporter) => exporter,
        Err(e) => {
            eprintln!("[roomscan] span export to {endpoint} disabled: {e}");
            return None;
        }
    };

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    // Simple exporter: the batch one spawns onto a runtime that does not exist yet.
    Some(
        SdkTracerProvider::builder()
            .with_resource(resource)
            .with_simple_exporter(exporter)
            .build(),
    )
}

/// Flushes exported spans when dropped.  Holds nothing when export is off.
pub struct TracerProviderGuard(Option<SdkTracerProvider>);

impl TracerProviderGuard {
    /// `true` when spans are being sent to a collector.
    pub fn is_exporting(&self) -> bool {
        self.0.is_some()
    }
}

impl Drop for TracerProviderGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.0.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("[roomscan] span flush on exit failed: {e}");
        }
    }
}
