//! Log subscriber setup for the binary.
//!
//! The terminal belongs to the sign-in prompt, so records go to a daily file
//! under `LOG_DIR`. Standard error is used only when that directory is unusable.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::PRODUCT_CODE;

/// Keeps the non-blocking writer flushing until dropped.
#[derive(Debug)]
pub struct TelemetryGuard {
    _guard: Option<WorkerGuard>,
}

impl TelemetryGuard {
    fn disabled() -> Self {
        Self { _guard: None }
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `LOG_LEVEL`.
///
/// Calling this twice is harmless; the second call returns a no-op guard.
pub fn init_tracing(settings: &Settings) -> TelemetryGuard {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (writer, guard, ansi) = match std::fs::create_dir_all(&settings.log_dir) {
        Ok(()) => {
            let appender =
                tracing_appender::rolling::daily(&settings.log_dir, format!("{PRODUCT_CODE}.log"));
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard), false)
        }
        Err(err) => {
            eprintln!(
                "Warning: failed to create log directory {}: {}",
                settings.log_dir.display(),
                err
            );
            (BoxMakeWriter::new(std::io::stderr), None, true)
        }
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_ansi(ansi)
        .with_writer(writer);

    if subscriber.try_init().is_err() {
        return TelemetryGuard::disabled();
    }

    TelemetryGuard { _guard: guard }
}
