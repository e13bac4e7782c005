//! Tracing setup shared by the library tests and the participant binary.

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;

/// Install a thread-local subscriber.
///
/// Respects `RUST_LOG` (defaults to "info") and prints compact lines
/// without targets. Keep the returned guard alive for as long as logging
/// is wanted.
///
/// ```no_run
/// let _guard = biped_lib::init_tracing();
/// ```
pub fn init_tracing() -> DefaultGuard {
    init_tracing_with("info")
}

/// Same as [`init_tracing`] with a caller-chosen fallback filter.
pub fn init_tracing_with(default_filter: &str) -> DefaultGuard {
    use tracing_subscriber::layer::SubscriberExt;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false);

    let subscriber = tracing_subscriber::Registry::default()
        .with(env_filter)
        .with(fmt_layer);

    tracing::subscriber::set_default(subscriber)
}
