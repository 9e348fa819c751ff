//! Log subscriber for the server binary.

use std::io::{self, IsTerminal};

use shared::config::server::{LogFormat, LoggingConfig};
use tracing::{Subscriber, level_filters::LevelFilter, warn};
use tracing_subscriber::{EnvFilter, fmt::MakeWriter};

/// `RUST_LOG` when set, otherwise the configured level.
fn env_filter(logging: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = logging.level.parse().unwrap_or(LevelFilter::INFO);
        EnvFilter::builder()
            .with_default_directive(level.into())
            .parse_lossy("")
    })
}

/// Builds the subscriber described by `logging`, writing through `writer`.
pub fn subscriber<W>(logging: &LoggingConfig, writer: W, ansi: bool) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(logging))
        .with_target(false)
        .with_writer(writer);

    match logging.format {
        LogFormat::Json => Box::new(builder.json().with_ansi(false).finish()),
        LogFormat::Text => Box::new(builder.with_ansi(ansi).finish()),
    }
}

/// Installs the global subscriber on stdout. A second call keeps the first subscriber.
pub fn init(logging: &LoggingConfig) {
    let ansi = io::stdout().is_terminal();
    if tracing::subscriber::set_global_default(subscriber(logging, io::stdout, ansi)).is_err() {
        warn!("tracing subscriber already installed; keeping the existing one");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};
    use tracing::info;

    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(logging: &LoggingConfig, emit: impl FnOnce()) -> String {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);
        let writer = move || Captured(Arc::clone(&sink));
        let dispatch = tracing::Dispatch::new(subscriber(logging, writer, false));
        tracing::dispatcher::with_default(&dispatch, emit);
        let bytes = buffer.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    fn first_line(output: &str) -> &str {
        output.lines().find(|line| !line.trim().is_empty()).unwrap()
    }

    #[test]
    fn json_format_emits_structured_fields() {
        let logging = LoggingConfig {
            level: "debug".into(),
            format: LogFormat::Json,
        };

        let output = capture(&logging, || info!(principal_id = "p-1", "stream opened"));

        let value: Value = serde_json::from_str(first_line(&output)).unwrap();
        assert_eq!(value["fields"]["message"], "stream opened");
        assert_eq!(value["fields"]["principal_id"], "p-1");
    }

    #[test]
    fn text_format_is_not_json() {
        let logging = LoggingConfig {
            level: "info".into(),
            format: LogFormat::Text,
        };

        let output = capture(&logging, || info!(connection_id = 7, "tick delivered"));

        let line = first_line(&output);
        assert!(serde_json::from_str::<Value>(line).is_err());
        assert!(line.contains("tick delivered"));
        assert!(line.contains("connection_id=7"));
    }
}
