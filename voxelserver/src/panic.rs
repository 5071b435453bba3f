//! Panic hook that records server state before the default handler runs.
//!
//! Cache corruption and reference-count violations are reported by
//! panicking. The hook logs where it happened, together with the latest
//! counter snapshot, through `tracing` so it lands in the log file.

use std::panic::{self, PanicHookInfo};
use std::sync::{Arc, Once, OnceLock};

use parking_lot::Mutex;
use tracing::error;

use crate::metrics::RuntimeCounters;

static INSTALL: Once = Once::new();
static COUNTERS: OnceLock<Mutex<Option<Arc<RuntimeCounters>>>> = OnceLock::new();

fn counters_slot() -> &'static Mutex<Option<Arc<RuntimeCounters>>> {
    COUNTERS.get_or_init(|| Mutex::new(None))
}

/// Install the hook. Later calls do nothing.
pub fn init() {
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
            report(info);
            previous(info);
        }));
    });
}

/// Counters to include in panic reports.
pub fn set_counters(counters: Arc<RuntimeCounters>) {
    *counters_slot().lock() = Some(counters);
}

/// Stop including counters in panic reports.
pub fn clear_counters() {
    *counters_slot().lock() = None;
}

fn report(info: &PanicHookInfo<'_>) {
    let location = info
        .location()
        .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
        .unwrap_or_else(|| "unknown".to_string());
    let message = panic_message(info);
    let thread = std::thread::current();
    let thread = thread.name().unwrap_or("unnamed");

    // A panic while the slot is held must not deadlock the hook.
    let counters = counters_slot().try_lock().and_then(|slot| slot.clone());
    match counters {
        Some(counters) => {
            let s = counters.snapshot();
            error!(
                location = %location,
                thread,
                requests_served = s.requests_served,
                boxes_created = s.boxes_created,
                cache_hits = s.cache_hits,
                cache_misses = s.cache_misses,
                tiles_resident = s.tiles_resident,
                raster_bytes = s.raster_bytes,
                "Panic: {}",
                message
            );
        }
        None => error!(location = %location, thread, "Panic: {}", message),
    }
}

fn panic_message<'a>(info: &'a PanicHookInfo<'_>) -> &'a str {
    if let Some(s) = info.payload().downcast_ref::<&str>() {
        s
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s
    } else {
        "<non-string payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_survives_panicking_thread() {
        init();
        init();
        let counters = Arc::new(RuntimeCounters::new());
        counters.box_created();
        set_counters(Arc::clone(&counters));

        let result = std::thread::Builder::new()
            .name("doomed".to_string())
            .spawn(|| panic!("cached box payload is corrupt"))
            .unwrap()
            .join();
        assert!(result.is_err());

        clear_counters();
        assert!(counters_slot().lock().is_none());
    }
}
