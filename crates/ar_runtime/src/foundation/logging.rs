//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    // A second init (tests, embedding hosts) is not an error for us.
    let _ = env_logger::try_init();
}

/// Initialize the logging system with a default level filter
///
/// `level` uses the `env_logger` filter syntax (`"info"`, `"ar_runtime=debug"`).
/// `RUST_LOG`, when set, still wins.
pub fn init_with_level(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}
