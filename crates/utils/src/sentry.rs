use sentry::ClientInitGuard;
use tracing::info;

use crate::env::env_non_empty;

/// Initialise error reporting when `SENTRY_DSN` is configured.
///
/// The returned guard must be held for the lifetime of the process so that
/// pending events are flushed on shutdown.
pub fn init_once(service: &'static str) -> Option<ClientInitGuard> {
    let dsn = env_non_empty("SENTRY_DSN")?;
    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: env_non_empty("SENTRY_ENVIRONMENT").map(Into::into),
            server_name: Some(service.into()),
            ..Default::default()
        },
    ));
    info!(service, "sentry error reporting enabled");
    Some(guard)
}

pub fn sentry_layer<S>() -> sentry_tracing::SentryLayer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    sentry_tracing::layer()
}
