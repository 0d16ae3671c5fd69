pub mod listener;
pub mod manual;

use std::sync::Once;

use anyhow::bail;
use taskdriver::{Progress, TaskDriver};
use tracing_subscriber::{fmt, EnvFilter};

pub use listener::RecordingListener;
pub use manual::ManualTasks;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=taskdriver=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

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

/// Assert all three driver counters at once.
#[track_caller]
pub fn assert_progress(driver: &TaskDriver, queued: usize, running: usize, finished: usize) {
    assert_eq!(
        driver.progress(),
        Progress::new(queued, running, finished),
        "expected queued={queued} running={running} finished={finished}"
    );
}

/// Release `manual` completions one at a time until the driver has nothing
/// left to run. Returns the number of completions released.
///
/// Fails fast instead of hanging when:
/// - the driver is still busy after `max_steps` completions, or
/// - tasks are running but none of them is waiting in `manual`, i.e. some
///   task never signalled completion.
pub fn drive_until_idle(
    driver: &TaskDriver,
    manual: &ManualTasks,
    max_steps: usize,
) -> anyhow::Result<usize> {
    let mut steps = 0;
    loop {
        let progress = driver.progress();
        let idle = progress.running == 0 && (progress.queued == 0 || driver.is_suspended());
        if idle {
            return Ok(steps);
        }
        if steps == max_steps {
            bail!("driver still busy after {max_steps} steps ({progress})");
        }
        if !manual.finish_next()? {
            bail!(
                "{} task(s) running but none is waiting for a manual completion; \
                 a task never signalled completion ({progress})",
                progress.running
            );
        }
        steps += 1;
    }
}
