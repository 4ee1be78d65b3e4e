//! Tracing initialization: a compact stdout layer plus optional OTLP span export.
use std::env;

use opentelemetry::{trace::TracerProvider, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{trace::SdkTracerProvider, Resource};
use tracing::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable holding the OTLP collector endpoint.
pub const OTLP_URL_ENVVAR: &str = "RGBPP_OTLP_URL";

/// Environment variable holding an instance label appended to the service name.
pub const SVC_LABEL_ENVVAR: &str = "RGBPP_SVC_LABEL";

/// Set to `1` to include source file names in log lines.
pub const LOG_FILE_ENVVAR: &str = "LOG_FILE";

/// Set to `1` to include line numbers in log lines.
pub const LOG_LINE_NUM_ENVVAR: &str = "LOG_LINE_NUM";

/// Name of the tracer registered with the OTLP provider.
const TRACER_NAME: &str = "rgbpp";

/// Logger settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    /// Identifies this process in logs and exported spans.
    whoami: String,

    /// OTLP collector endpoint, if spans should be exported.
    otlp_url: Option<String>,

    /// Include source file names.
    with_file: bool,

    /// Include line numbers.
    with_line_number: bool,
}

impl LoggerConfig {
    /// Creates a stdout-only config for `whoami`.
    pub const fn new(whoami: String) -> Self {
        Self {
            whoami,
            otlp_url: None,
            with_file: false,
            with_line_number: false,
        }
    }

    /// Builds a config for `base`, reading the label, OTLP endpoint and source location toggles
    /// from the environment.
    pub fn from_env(base: &str) -> Self {
        let label = env::var(SVC_LABEL_ENVVAR).ok();

        Self {
            whoami: whoami_string(base, label.as_deref()),
            otlp_url: env::var(OTLP_URL_ENVVAR).ok(),
            with_file: env_flag(LOG_FILE_ENVVAR),
            with_line_number: env_flag(LOG_LINE_NUM_ENVVAR),
        }
    }

    /// Exports spans to the given OTLP endpoint.
    pub fn with_otlp_url(mut self, url: impl Into<String>) -> Self {
        self.otlp_url = Some(url.into());
        self
    }

    /// Toggles source file and line number output.
    pub const fn with_source_location(mut self, file: bool, line_number: bool) -> Self {
        self.with_file = file;
        self.with_line_number = line_number;
        self
    }

    /// The service name.
    pub fn whoami(&self) -> &str {
        &self.whoami
    }

    /// The OTLP endpoint, if any.
    pub fn otlp_url(&self) -> Option<&str> {
        self.otlp_url.as_deref()
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::from_env("(rgbpp)")
    }
}

/// Installs the global subscriber.
///
/// The filter comes from `RUST_LOG`. If the OTLP exporter cannot be built, logging falls back to
/// stdout only and the failure is reported once the subscriber is up.
pub fn init(config: LoggerConfig) {
    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .event_format(
            tracing_subscriber::fmt::format()
                .with_file(config.with_file)
                .with_line_number(config.with_line_number),
        )
        .with_filter(EnvFilter::from_default_env());

    let exporter = config.otlp_url.as_deref().map(|url| {
        opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(url)
            .build()
    });

    match exporter {
        Some(Ok(exporter)) => {
            let resource = Resource::builder()
                .with_attribute(KeyValue::new("service.name", config.whoami.clone()))
                .build();

            let provider = SdkTracerProvider::builder()
                .with_resource(resource)
                .with_batch_exporter(exporter)
                .build();

            let otel_layer = tracing_opentelemetry::layer().with_tracer(provider.tracer(TRACER_NAME));

            tracing_subscriber::registry()
                .with(stdout_layer)
                .with(otel_layer)
                .init();
        }
        Some(Err(err)) => {
            tracing_subscriber::registry().with(stdout_layer).init();
            warn!(%err, "could not build OTLP exporter, exporting to stdout only");
        }
        None => tracing_subscriber::registry().with(stdout_layer).init(),
    }

    info!(whoami = %config.whoami, otlp = config.otlp_url.is_some(), "logging started");
}

/// Appends the instance label, if any, to the base service name.
pub fn whoami_string(base: &str, label: Option<&str>) -> String {
    match label {
        Some(label) => format!("{base}%{label}"),
        None => base.to_owned(),
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name).is_ok_and(|v| v == "1")
}
