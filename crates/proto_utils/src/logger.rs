//! Process-wide `tracing` subscriber setup.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (e.g. `protolang=debug`).
pub const LOG_ENV: &str = "PROTOLANG_LOG";

static INIT: Once = Once::new();

/// Install the stderr subscriber using `PROTOLANG_LOG`, falling back to `warn`.
pub fn init_logging() {
    init_with_default("warn");
}

/// Install the stderr subscriber with `default_directive` when `PROTOLANG_LOG`
/// is unset. Only the first call in a process has any effect.
pub fn init_with_default(default_directive: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(default_directive));
        // A subscriber installed by an embedding application wins.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialisation_is_harmless() {
        init_logging();
        init_with_default("debug");
        init_logging();
    }
}
