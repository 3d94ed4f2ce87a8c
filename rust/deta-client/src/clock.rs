//! Signing timestamps.

use std::fmt::Debug;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::warn;

/// Source of signing timestamps, in whole seconds since the Unix epoch.
///
/// The dispatcher reads the clock once per send, so every attempt is bound to
/// its own timestamp.
pub trait Clock: Debug + Send + Sync {
    /// The current time.
    fn now(&self) -> u64;
}

/// Wall clock.
///
/// A system clock set before the Unix epoch reads as `0` and logs a warning;
/// the server will then reject the signature as stale.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        seconds_since_epoch(SystemTime::now())
    }
}

fn seconds_since_epoch(time: SystemTime) -> u64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs(),
        Err(error) => {
            warn!(%error, "system clock is before the Unix epoch, signing with timestamp 0");
            0
        }
    }
}
