//! Tracing setup: console on stderr plus an optional JSON log file.

use std::path::Path;

use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::rolling;
use tracing_subscriber::fmt::format::{Format, Json, JsonFields};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::FILE_GUARD;

type FileLayer<S> = fmt::Layer<S, JsonFields, Format<Json>, NonBlocking>;

/// File sink from `[logging]`, or `None` when no file is configured.
fn file_layer<S>(logging: &kegmon_config::Logging) -> Option<FileLayer<S>>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let path = Path::new(logging.file.as_deref()?);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path.file_name()?;
    let appender = match logging.rotation.as_deref() {
        Some("daily") => rolling::daily(dir, name),
        Some("hourly") => rolling::hourly(dir, name),
        _ => rolling::never(dir, name),
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    // Flushes on drop; must live for the whole process.
    let _ = FILE_GUARD.set(guard);
    Some(fmt::layer().json().with_ansi(false).with_writer(writer))
}

/// Install the global subscriber. `RUST_LOG` overrides `level`; the config
/// file's `logging.level` is used when the CLI level is left at its default.
pub fn init(json: bool, level: &str, logging: &kegmon_config::Logging) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(file_layer(logging))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .with(file_layer(logging))
            .try_init()
    };
    if let Err(e) = res {
        eprintln!("logging already initialized: {e}");
    }
}
