//! Logging setup.
//!
//! Diagnostics go to stderr through `tracing`. The filter is read from
//! [`LOG_ENV`] and defaults to `warn`, which keeps ordinary runs silent apart
//! from the test framework's own output.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the tracing filter directive.
pub const LOG_ENV: &str = "ARCHIVER_CI_LOG";

const DEFAULT_DIRECTIVE: &str = "warn";

/// Builds the filter from [`LOG_ENV`], falling back to `warn` when the
/// variable is unset or unparsable.
#[must_use]
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Installs the global stderr subscriber. Calling it again is a no-op.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}
