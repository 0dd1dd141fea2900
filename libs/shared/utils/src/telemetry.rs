use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shared_config::SchedulingConfig;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `fallback_filter`. Returns `false` when a subscriber
/// was already installed, which makes repeated calls harmless.
pub fn init_tracing(fallback_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
    {
        Ok(()) => true,
        Err(e) => {
            debug!("Tracing subscriber already installed: {}", e);
            false
        }
    }
}

pub fn init_tracing_from_config(config: &SchedulingConfig) -> bool {
    init_tracing(&config.log_filter)
}
