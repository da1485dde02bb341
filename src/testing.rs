//! Helpers shared by the unit tests.

use std::thread;
use std::time::{Duration, Instant};

/// Rotation runs on a background thread, so tests poll for its results.
pub const ROTATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Poll `cond` until it holds or `timeout` elapses. Returns the last result.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(20));
    }
}
