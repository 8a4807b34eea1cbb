//! Logger builder implementation

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::TestWriter;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, Format, Writer};
use crate::error::{LogError, LogResult};

/// Logger builder
#[derive(Debug)]
pub struct LoggerBuilder {
    config: Config,
}

/// Helper macro to apply the shared display options to a fmt layer.
macro_rules! configure_fmt_layer {
    ($layer:expr, $config:expr) => {
        $layer
            .with_ansi($config.ansi)
            .with_target($config.with_target)
            .with_writer(make_writer($config.writer))
    };
}

impl LoggerBuilder {
    /// Create builder from config
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Build the filter without installing anything.
    pub fn filter(&self) -> LogResult<EnvFilter> {
        EnvFilter::try_new(&self.config.level)
            .map_err(|e| LogError::Filter(format!("{}: {e}", self.config.level)))
    }

    /// Build and install the global subscriber
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Filter string cannot be parsed
    /// - A global subscriber is already installed
    pub fn build(self) -> LogResult<()> {
        let filter = self.filter()?;
        let registry = Registry::default().with(filter);
        let config = &self.config;

        let installed = match config.format {
            Format::Pretty => registry
                .with(configure_fmt_layer!(fmt::layer().pretty(), config))
                .try_init(),
            Format::Compact => registry
                .with(configure_fmt_layer!(fmt::layer().compact(), config))
                .try_init(),
            Format::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .flatten_event(true)
                        .with_current_span(true)
                        .with_span_list(false)
                        .with_target(config.with_target)
                        .with_writer(make_writer(config.writer)),
                )
                .try_init(),
        };

        installed.map_err(|_| LogError::AlreadyInitialized)?;
        tracing::debug!(level = %config.level, format = ?config.format, "logger initialized");
        Ok(())
    }
}

fn make_writer(writer: Writer) -> BoxMakeWriter {
    match writer {
        Writer::Stderr => BoxMakeWriter::new(std::io::stderr),
        Writer::Stdout => BoxMakeWriter::new(std::io::stdout),
        Writer::Test => BoxMakeWriter::new(TestWriter::default()),
    }
}
