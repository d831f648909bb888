//! Shared test doubles for the funsize integration tests.
//!
//! - [`builders`]: events, configs and key material.
//! - [`fakes`]: in-memory resolver, submitters, encryptor and event source.
//! - [`http`]: axum servers standing in for the update-metadata service and
//!   the scheduler.

pub mod builders;
pub mod fakes;
pub mod http;

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// Logs are captured per test and only shown for failures (unless run with
/// `-- --nocapture`). The filter comes from `FUNSIZE_LOG`, then `RUST_LOG`,
/// then defaults to `info`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("FUNSIZE_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}
