use std::sync::Once;

static INIT: Once = Once::new();

/// Installs the `tracing` subscriber for the test process.
///
/// Reads `RUST_LOG`, defaulting to `warn`. Output goes through the test
/// writer so it is captured per test. Safe to call from every scenario; only
/// the first call does anything, and a subscriber installed elsewhere wins.
pub fn init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}
