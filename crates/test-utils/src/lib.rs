pub mod builders;
pub mod fake_stage;

use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Set up tracing once for the whole test binary.
///
/// Output goes through the test writer, so the harness only shows it for
/// failing tests (or with `-- --nocapture`). Levels come from `RUST_LOG`,
/// defaulting to `info`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Bound a future at five seconds so a wedged controller fails the test
/// instead of hanging the run. Under a paused clock the deadline still
/// applies: a forever-pending future lets the clock auto-advance to it.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("future did not complete within 5s")
}
