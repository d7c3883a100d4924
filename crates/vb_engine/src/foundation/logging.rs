//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system from `RUST_LOG`
///
/// Safe to call more than once; later calls are ignored.
pub fn init() {
    let _ = env_logger::try_init();
}

/// Initialize the logging system with a default filter such as `"info"` or
/// `"vb_engine=debug"`
///
/// `RUST_LOG` still takes precedence when set.
pub fn init_with_level(level: &str) {
    let result = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .try_init();

    if result.is_ok() {
        debug!("Logging initialized with default filter '{level}'");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_with_level("warn");
        init_with_level("debug");
        init();
    }
}
