//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system
///
/// Honours `RUST_LOG`; falls back to `default_level` when it is unset.
pub fn init(default_level: log::LevelFilter) {
    let mut builder = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(default_level);
    }
    if builder.try_init().is_err() {
        log::debug!("Logger already initialized, keeping the existing one");
    }
}
