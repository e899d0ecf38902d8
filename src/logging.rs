use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Filter directives for diagnostics, e.g. `RENDERBENCH_LOG=debug`.
pub const LOG_ENV: &str = "RENDERBENCH_LOG";
const DEFAULT_FILTER: &str = "warn";

/// `RENDERBENCH_LOG`, then `RUST_LOG`, then `warn`.
pub fn env_filter() -> EnvFilter {
    std::env::var(LOG_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()
        .and_then(|expr| EnvFilter::try_new(expr).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Human-readable diagnostics on stderr, filtered by [`env_filter`].
///
/// The filter applies to this layer only, so other layers stacked on the same
/// registry still see every span.
pub fn stderr_layer<S>() -> impl Layer<S> + Send + Sync
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter())
}

/// Install the process-wide subscriber. Safe to call more than once.
pub fn init() {
    let _ = tracing_subscriber::registry().with(stderr_layer()).try_init();
}
