use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{error, info};

use crate::config::Schedule;
use crate::Organizer;

const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Token for cooperative cancellation of the polling loop.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns Ok(()) to continue, Err if cancelled.
    pub fn check(&self) -> Result<(), CancelledError> {
        if self.is_cancelled() {
            return Err(CancelledError);
        }
        Ok(())
    }

    /// Sleep for `duration`, waking early if cancelled.
    pub fn sleep(&self, duration: Duration) -> Result<(), CancelledError> {
        let deadline = Instant::now() + duration;
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}

/// Error indicating the operation was cancelled.
#[derive(Debug, Clone)]
pub struct CancelledError;

impl std::fmt::Display for CancelledError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Operation cancelled")
    }
}

impl std::error::Error for CancelledError {}

/// Run cycles until cancelled (or once, if the schedule says so).
///
/// `on_tick(i, ticks)` is called after each slice of the inter-cycle sleep.
/// A scan directory that cannot be read is logged and retried next cycle.
/// Returns the number of cycles run.
pub fn run<F>(organizer: &Organizer, schedule: &Schedule, token: &CancellationToken, mut on_tick: F) -> u64
where
    F: FnMut(u32, u32),
{
    let mut cycles = 0u64;
    while !token.is_cancelled() {
        match organizer.run_cycle_until(Some(token)) {
            Ok(report) => info!("{}", report.summary()),
            Err(e) => error!("{}; retrying next cycle", e),
        }
        cycles += 1;

        if schedule.once || token.is_cancelled() {
            break;
        }

        info!("Sleeping for {} second(s)", schedule.interval.as_secs());
        let tick = schedule.tick_length();
        for i in 0..schedule.ticks.max(1) {
            if token.sleep(tick).is_err() {
                return cycles;
            }
            on_tick(i, schedule.ticks.max(1));
        }
    }
    cycles
}
