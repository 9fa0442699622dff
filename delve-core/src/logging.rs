//! Logging bootstrap built on tracing
//!
//! One [`init_logging`] call wires the subscriber for the whole process;
//! binaries decide format and verbosity through [`LoggingConfig`].

use crate::{DelveError, DelveResult, ErrorContext};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{
    fmt, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

/// Subscriber configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base log level when RUST_LOG is not set
    pub level: String,
    pub format: LogFormat,
    /// Include file and line number of the call site
    pub include_location: bool,
    pub include_thread: bool,
    /// Write to a file instead of stdout
    pub log_to_file: bool,
    pub log_file_path: Option<String>,
    /// Emit span-close events with timings
    pub enable_performance_monitoring: bool,
    /// Extra filter directives appended to the env filter
    pub filter_directives: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            include_location: true,
            include_thread: false,
            log_to_file: false,
            log_file_path: None,
            enable_performance_monitoring: true,
            filter_directives: vec!["delve=debug".to_string()],
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// RUST_LOG takes precedence over the configured level; the configured
/// directives are appended either way. Calling this twice fails, so tests
/// should guard it behind a `LazyLock`.
pub fn init_logging(config: &LoggingConfig) -> DelveResult<()> {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    for directive in &config.filter_directives {
        let parsed = directive.parse().map_err(|e| DelveError::Config {
            message: format!("Invalid log filter directive '{}'", directive),
            source: Some(Box::new(e)),
            context: ErrorContext::new("logging")
                .with_operation("init_logging")
                .with_suggestion("Use directives like 'delve=debug' or 'tower_http=info'"),
        })?;
        filter = filter.add_directive(parsed);
    }

    let span_events = if config.enable_performance_monitoring {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let registry = tracing_subscriber::registry().with(filter);

    macro_rules! build_layer {
        ($layer:expr) => {{
            let layer = $layer
                .with_span_events(span_events)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_thread_ids(config.include_thread)
                .with_thread_names(config.include_thread);
            if config.log_to_file {
                let path = config.log_file_path.as_deref().unwrap_or("delve.log");
                let file = std::fs::File::create(path)?;
                registry.with(layer.with_writer(std::sync::Arc::new(file))).init();
            } else {
                registry.with(layer).init();
            }
        }};
    }

    match config.format {
        LogFormat::Json => build_layer!(fmt::layer().json()),
        LogFormat::Pretty => build_layer!(fmt::layer().pretty()),
        LogFormat::Compact => build_layer!(fmt::layer().compact()),
    }

    tracing::info!(
        level = %config.level,
        format = ?config.format,
        "Logging initialized"
    );
    Ok(())
}

/// Timing helpers for named operations
pub mod performance {
    use tracing::Instrument;

    /// Run a future inside a performance span and log its duration.
    pub async fn measure_async<F, T>(operation: &str, future: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        let span = tracing::info_span!("performance", operation = operation);
        let start = std::time::Instant::now();
        let result = future.instrument(span).await;
        tracing::info!(
            target: "performance",
            operation = operation,
            duration_ms = start.elapsed().as_millis() as u64,
            "Operation completed"
        );
        result
    }
}

/// Log the start of a named operation
#[macro_export]
macro_rules! log_operation_start {
    ($operation:expr) => {
        tracing::info!(operation = $operation, "Operation started")
    };
    ($operation:expr, $($fields:tt)+) => {
        tracing::info!(operation = $operation, $($fields)+, "Operation started")
    };
}

/// Log the successful completion of a named operation
#[macro_export]
macro_rules! log_operation_success {
    ($operation:expr) => {
        tracing::info!(operation = $operation, "Operation completed")
    };
    ($operation:expr, $($fields:tt)+) => {
        tracing::info!(operation = $operation, $($fields)+, "Operation completed")
    };
}

/// Log the failure of a named operation
#[macro_export]
macro_rules! log_operation_error {
    ($operation:expr, $error:expr) => {
        tracing::error!(operation = $operation, error = %$error, "Operation failed")
    };
}
