use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{env::env_bool, sentry::sentry_layer};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` is used. `LOG_JSON=1`
/// switches the formatter to newline-delimited JSON.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if env_bool("LOG_JSON", false) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .with(sentry_layer())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .with(sentry_layer())
            .init();
    }
}
