//! Tracing infrastructure for development diagnostics
//!
//! Configure via `RUST_LOG`:
//! - `RUST_LOG=debug` - all debug logs
//! - `RUST_LOG=inkpad::mux=trace` - module-level filtering
//!
//! File logging (daily rotation under `~/.config/inkpad/logs/`) is always
//! at debug level for troubleshooting switch sequencing after the fact.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the tracing subscriber with console and file layers.
/// Safe to call once per process; hosts embedding the engine may install
/// their own subscriber instead.
pub fn init() {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_filter(console_filter);

    let file_layer = match logs_dir() {
        Some(logs_dir) => {
            let file_appender = tracing_appender::rolling::daily(logs_dir, "inkpad.log");
            Some(
                fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_filter(EnvFilter::new("debug")),
            )
        }
        None => {
            eprintln!("Warning: could not initialize file logging");
            None
        }
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}

fn logs_dir() -> Option<std::path::PathBuf> {
    let dir = dirs::config_dir()?.join("inkpad").join("logs");
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}
