//! Tracing configuration module for structured logging and observability
//!
//! The binary configures the subscriber; the library only emits spans and
//! events through the helpers in [`spans`] and [`events`].

#[cfg(feature = "cli")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Configuration for tracing output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable console output (default for CLI)
    Console,
    /// Compact console output without colors, for CI logs
    Compact,
    /// JSON structured logging
    #[cfg(feature = "tracing-json")]
    Json,
}

/// Configuration for tracing output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TracingOutput {
    /// Output to stderr (default)
    Console,
    /// Output to a file
    #[cfg(feature = "tracing-files")]
    File(std::path::PathBuf),
    /// Output to both console and file
    #[cfg(feature = "tracing-files")]
    Both(std::path::PathBuf),
}

/// Tracing configuration builder
#[derive(Debug)]
pub struct TracingConfig {
    /// Verbosity level (maps to log levels)
    pub verbosity: u8,
    pub format: TracingFormat,
    pub output: TracingOutput,
    /// Environment filter string (overrides verbosity if set)
    pub env_filter: Option<String>,
    /// Session ID for correlation
    pub session_id: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            format: TracingFormat::Console,
            output: TracingOutput::Console,
            env_filter: None,
            session_id: None,
        }
    }
}

impl TracingConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity level (0-2+)
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_output(mut self, output: TracingOutput) -> Self {
        self.output = output;
        self
    }

    /// Set custom environment filter
    #[must_use]
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    #[must_use]
    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Convert verbosity level to tracing filter string
    #[must_use]
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "info",  // Default: queue and batch milestones
            1 => "debug", // -v: per-record transitions and requests
            _ => "trace", // -vv+: every state update
        }
    }

    /// Initialize the global tracing subscriber
    #[cfg(feature = "cli")]
    pub fn init(self) -> anyhow::Result<()> {
        use tracing_subscriber::fmt;

        let filter = if let Some(env_filter) = &self.env_filter {
            EnvFilter::try_new(env_filter)?
        } else {
            EnvFilter::try_new(self.verbosity_to_filter())?
        };

        let registry = Registry::default().with(filter);

        match (&self.format, &self.output) {
            (TracingFormat::Console, TracingOutput::Console) => {
                let fmt_layer = fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(false)
                    .with_level(true)
                    .compact();

                registry.with(fmt_layer).init();
            },

            (TracingFormat::Compact, TracingOutput::Console) => {
                let fmt_layer = fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false)
                    .with_target(false)
                    .compact();

                registry.with(fmt_layer).init();
            },

            #[cfg(feature = "tracing-json")]
            (TracingFormat::Json, TracingOutput::Console) => {
                let fmt_layer = fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_span_list(true);

                registry.with(fmt_layer).init();
            },

            #[cfg(feature = "tracing-files")]
            (format, TracingOutput::File(path)) => {
                use tracing_appender::rolling;

                // Blocking writer: the guard of a non-blocking one would not outlive this call
                let file_appender = rolling::never(
                    path.parent().unwrap_or_else(|| std::path::Path::new(".")),
                    path.file_name()
                        .unwrap_or_else(|| std::ffi::OsStr::new("bgremove-studio.log")),
                );

                match format {
                    TracingFormat::Console | TracingFormat::Compact => registry
                        .with(
                            fmt::layer()
                                .with_ansi(false)
                                .with_writer(file_appender)
                                .compact(),
                        )
                        .init(),
                    #[cfg(feature = "tracing-json")]
                    TracingFormat::Json => registry
                        .with(
                            fmt::layer()
                                .json()
                                .with_writer(file_appender)
                                .with_current_span(true)
                                .with_span_list(true),
                        )
                        .init(),
                }
            },

            #[cfg(feature = "tracing-files")]
            (_, TracingOutput::Both(path)) => {
                use tracing_appender::rolling;

                let console_layer = fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(self.format == TracingFormat::Console)
                    .with_target(false)
                    .compact();

                let file_appender = rolling::daily(
                    path.parent().unwrap_or_else(|| std::path::Path::new(".")),
                    path.file_stem()
                        .unwrap_or_else(|| std::ffi::OsStr::new("bgremove-studio")),
                );
                let file_layer = fmt::layer()
                    .with_ansi(false)
                    .with_writer(file_appender)
                    .compact();

                registry.with(console_layer).with(file_layer).init();
            },
        }

        if let Some(session_id) = &self.session_id {
            tracing::debug!(session_id = %session_id, "Studio session started");
        }

        Ok(())
    }
}

/// Initialize tracing with CLI-friendly defaults
#[cfg(feature = "cli")]
pub fn init_cli_tracing(verbosity: u8) -> anyhow::Result<()> {
    TracingConfig::new()
        .with_verbosity(verbosity)
        .with_format(TracingFormat::Console)
        .with_session_id(uuid::Uuid::new_v4().to_string())
        .init()
}

/// Span creation helpers for common operations
pub mod spans {
    use tracing::{Level, Span};

    /// Span for a whole batch run
    pub fn batch_processing(record_count: usize) -> Span {
        tracing::span!(
            Level::INFO,
            "batch_processing",
            record_count = %record_count
        )
    }

    /// Span for one record moving through the remote call
    pub fn record_processing(record_id: &str, file_name: &str) -> Span {
        tracing::span!(
            Level::DEBUG,
            "record_processing",
            record_id = %record_id,
            file_name = %file_name
        )
    }

    /// Span for a single HTTP request to the removal service
    pub fn remote_call(file_name: &str, endpoint: &str) -> Span {
        tracing::span!(
            Level::DEBUG,
            "remote_call",
            file_name = %file_name,
            endpoint = %endpoint
        )
    }

    /// Span for single or bulk export
    pub fn export(kind: &str, item_count: usize) -> Span {
        tracing::span!(
            Level::INFO,
            "export",
            kind = %kind,
            item_count = %item_count
        )
    }
}

/// Event helpers for common logging patterns
pub mod events {
    use tracing::{debug, error, info, warn};

    /// Log a user-facing progress update
    pub fn progress(message: &str, emoji: &str) {
        info!("{} {}", emoji, message);
    }

    /// Log an error with context
    pub fn error_with_context(error: &dyn std::error::Error, context: &str) {
        error!(
            error = %error,
            context = %context,
            "Operation failed"
        );
    }

    /// Log a warning with recommendation
    pub fn warning_with_recommendation(message: &str, recommendation: &str) {
        warn!(
            message = %message,
            recommendation = %recommendation,
            "Warning"
        );
    }

    /// Log a record status change
    pub fn status_change(file_name: &str, from: &str, to: &str) {
        debug!(
            file_name = %file_name,
            from = %from,
            to = %to,
            "Status changed"
        );
    }

    /// Log the duration of an operation
    pub fn performance_metric(operation: &str, duration_ms: u64) {
        debug!(
            operation = %operation,
            duration_ms = %duration_ms,
            "Performance metric"
        );
    }
}
