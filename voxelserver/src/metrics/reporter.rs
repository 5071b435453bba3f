//! Background thread that periodically logs and resets the runtime counters.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{CounterSnapshot, RuntimeCounters};

/// How often the loop checks for shutdown.
const CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Periodic counter reporter.
///
/// Every `interval` the reporter takes a resetting snapshot of the counters
/// and logs it at `info`. Dropping the reporter stops and joins the thread.
pub struct StatsReporter {
    thread_handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl StatsReporter {
    /// Start the reporter thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn start(counters: Arc<RuntimeCounters>, interval: Duration) -> io::Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);

        let thread_handle = thread::Builder::new()
            .name("stats-reporter".to_string())
            .spawn(move || Self::run_loop(counters, interval, shutdown_clone))?;

        info!(interval_secs = interval.as_secs(), "Stats reporter started");

        Ok(Self {
            thread_handle: Some(thread_handle),
            shutdown,
        })
    }

    fn run_loop(counters: Arc<RuntimeCounters>, interval: Duration, shutdown: Arc<AtomicBool>) {
        let mut elapsed = Duration::ZERO;
        loop {
            if shutdown.load(Ordering::Relaxed) {
                debug!("Stats reporter received shutdown signal");
                break;
            }

            thread::sleep(CHECK_INTERVAL);
            elapsed += CHECK_INTERVAL;

            if elapsed >= interval {
                elapsed = Duration::ZERO;
                log_snapshot(&counters.snapshot_and_reset(), interval);
            }
        }
        debug!("Stats reporter stopped");
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                warn!("Stats reporter thread panicked: {:?}", e);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for StatsReporter {
    fn drop(&mut self) {
        self.shutdown();
        self.join();
    }
}

fn log_snapshot(snapshot: &CounterSnapshot, interval: Duration) {
    info!(
        requests = snapshot.requests_served,
        sent = snapshot.boxes_sent,
        created = snapshot.boxes_created,
        points = snapshot.points_loaded,
        hit_rate = format!("{:.1}%", snapshot.hit_rate() * 100.0),
        collisions = snapshot.cache_collisions,
        invalid = snapshot.invalid_requests,
        tiles_loaded = snapshot.tiles_loaded,
        tiles_evicted = snapshot.tiles_evicted,
        tiles_resident = snapshot.tiles_resident,
        raster_mb = snapshot.raster_bytes / (1024 * 1024),
        cached_kb = snapshot.cached_bytes / 1024,
        "Stats for last {}s",
        interval.as_secs()
    );
}
