//! Tracing subscriber setup for binaries.

/// Initializes the tracing subscriber for logging.
///
/// This should be called once at application startup. `RUST_LOG` takes
/// precedence over `level` when set.
///
/// # Arguments
///
/// * `level` - The log level (error, warn, info, debug, trace)
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("danak_persistence={}", level)));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
