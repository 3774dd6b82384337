//! Test logging bootstrap shared by unit and integration tests.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Default filter when neither `TEST_LOG` nor `RUST_LOG` is set: quiet,
/// with SQL chatter suppressed even when a caller widens the level.
const DEFAULT_FILTER: &str = "warn,sqlx=error,sea_orm=error";

/// Initialize structured logging for tests.
///
/// Idempotent and race-safe; the first caller wins. Level precedence:
/// `TEST_LOG`, then `RUST_LOG`, then [`DEFAULT_FILTER`]. Output goes through
/// `with_test_writer()` so cargo captures it per test.
pub fn init() {
    INITIALIZED.get_or_init(|| {
        let filter = std::env::var("TEST_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .map(EnvFilter::new)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .without_time()
            .with_target(true)
            .try_init()
            .ok();
    });
}
