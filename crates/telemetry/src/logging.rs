//! Tracing subscriber setup for hosts that embed the engine.

/// Initialize a global fmt subscriber. `RUST_LOG` wins over `verbose`.
///
/// Safe to call once per process; later calls are ignored.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .try_init();
}
