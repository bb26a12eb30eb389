pub mod env;
pub mod logging;
pub mod response;
pub mod sentry;
