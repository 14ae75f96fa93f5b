//! Log subscriber set-up for the replay tool.
//!
//! Replay records own stdout, so every log line goes to stderr. The
//! subscriber is installed once per process; later calls keep the first one.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::Subscriber;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, MakeWriter};

use probewire_config::{Config, LogFormat};

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Errors raised while setting up logging.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// `log_filter` is not a valid filter directive list.
    #[error("invalid log filter '{filter}': {reason}")]
    Filter {
        /// The rejected expression.
        filter: String,
        /// Parser message.
        reason: String,
    },
    /// Some other subscriber already owns the global slot.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the stderr subscriber described by `config`.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for a bad filter expression and
/// [`TelemetryError::Subscriber`] when a foreign global subscriber exists.
pub fn initialise(config: &Config) -> Result<(), TelemetryError> {
    INSTALLED
        .get_or_try_init(|| {
            let ansi = !config.log_format().is_structured() && io::stderr().is_terminal();
            let subscriber = build_subscriber(config, io::stderr, ansi)?;
            tracing::subscriber::set_global_default(subscriber)
                .map_err(TelemetryError::Subscriber)
        })
        .map(|_| ())
}

fn parse_filter(expression: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(expression).map_err(|error| TelemetryError::Filter {
        filter: expression.to_owned(),
        reason: error.to_string(),
    })
}

/// Builds, without installing, a subscriber writing to `writer`.
fn build_subscriber<W>(
    config: &Config,
    writer: W,
    ansi: bool,
) -> Result<Box<dyn Subscriber + Send + Sync>, TelemetryError>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let builder = fmt::Subscriber::builder()
        .with_env_filter(parse_filter(config.log_filter())?)
        .with_target(true)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    Ok(match config.log_format() {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
        LogFormat::Pretty => Box::new(builder.pretty().finish()),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use rstest::rstest;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            let bytes = self.0.lock().expect("capture lock").clone();
            String::from_utf8(bytes).expect("log output should be utf-8")
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("capture lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'writer> MakeWriter<'writer> for Captured {
        type Writer = Self;

        fn make_writer(&'writer self) -> Self::Writer {
            self.clone()
        }
    }

    fn config(format: LogFormat, filter: &str) -> Config {
        Config {
            log_filter: Some(filter.to_owned()),
            log_format: Some(format),
            ..Config::default()
        }
    }

    #[rstest]
    fn rejects_malformed_filters() {
        let bad = config(LogFormat::Json, "probewire=notalevel");
        let error = build_subscriber(&bad, Captured::default(), false)
            .err()
            .expect("filter should be rejected");
        assert!(matches!(
            error,
            TelemetryError::Filter { ref filter, .. } if filter == "probewire=notalevel"
        ));
    }

    #[rstest]
    fn json_records_flatten_event_fields() {
        let captured = Captured::default();
        let subscriber = build_subscriber(&config(LogFormat::Json, "info"), captured.clone(), false)
            .expect("subscriber should build");
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "probewire::replay", method = "Page.loaded", "event recorded");
        });

        let line = captured.text();
        let record: serde_json::Value =
            serde_json::from_str(line.trim()).expect("record should be JSON");
        assert_eq!(record["method"], "Page.loaded");
        assert_eq!(record["message"], "event recorded");
        assert_eq!(record["target"], "probewire::replay");
    }

    #[rstest]
    #[case(LogFormat::Compact)]
    #[case(LogFormat::Pretty)]
    fn text_formats_honour_the_filter(#[case] format: LogFormat) {
        let captured = Captured::default();
        let subscriber = build_subscriber(&config(format, "warn"), captured.clone(), false)
            .expect("subscriber should build");
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("hidden");
            tracing::warn!("shown");
        });

        let text = captured.text();
        assert!(text.contains("shown"));
        assert!(!text.contains("hidden"));
    }
}
