//! Tracing subscriber setup.
//!
//! The library only emits `tracing` events; installing a subscriber is the
//! host's call. `init` is a convenience for hosts and tests that have none.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directive, e.g. `cipherlite_driver=debug`.
pub const LOG_ENV: &str = "CIPHERLITE_LOG";

/// Install a global fmt subscriber filtered by `CIPHERLITE_LOG` (default `warn`).
/// Returns false when a global subscriber was already set.
pub fn init() -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_refused() {
        let _ = init();
        assert!(!init());
    }
}
