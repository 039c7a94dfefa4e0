//! Bridges per-object progress callbacks onto a shared meter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use lakehub_core::ProgressMeter;
use lakehub_storage::ProgressHook;

use crate::ProgressFn;

/// One hook per transferred object. Callbacks report absolute bytes written
/// for that object; the shared meter wants deltas, so the previous absolute
/// value is tracked here. An optional observer sees the aggregated totals
/// after every meter update.
pub(crate) struct MeterHook<'a> {
    meter: &'a Mutex<ProgressMeter>,
    observer: Option<&'a ProgressFn>,
    prev: AtomicU64,
    adopt_total: bool,
}

impl<'a> MeterHook<'a> {
    pub(crate) fn new(meter: &'a Mutex<ProgressMeter>, observer: Option<&'a ProgressFn>) -> Self {
        MeterHook {
            meter,
            observer,
            prev: AtomicU64::new(0),
            adopt_total: false,
        }
    }

    /// Variant for single-object transfers where the total is discovered
    /// from the object itself (e.g. a response content length).
    pub(crate) fn adopting_total(
        meter: &'a Mutex<ProgressMeter>,
        observer: Option<&'a ProgressFn>,
    ) -> Self {
        MeterHook {
            adopt_total: true,
            ..Self::new(meter, observer)
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ProgressMeter> {
        self.meter.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn notify(&self) {
        if let Some(observer) = self.observer {
            let (done, total) = {
                let meter = self.lock();
                (meter.done_bytes(), meter.total())
            };
            observer(done, total);
        }
    }
}

impl ProgressHook for MeterHook<'_> {
    fn on_start(&self, _key: &str, total: u64) {
        if self.adopt_total {
            let mut meter = self.lock();
            if meter.total().is_none() {
                meter.set_total(total);
            }
        }
    }

    fn on_progress(&self, _key: &str, written: u64, _total: Option<u64>) {
        let prev = self.prev.swap(written, Ordering::Relaxed);
        if written > prev {
            {
                let mut meter = self.lock();
                meter.add(written - prev);
                meter.render(false);
            }
            self.notify();
        }
    }

    fn on_done(&self, _key: &str, total: Option<u64>, _elapsed: Duration) {
        // Top up in case the final write callback was coalesced away.
        if let Some(total) = total {
            let prev = self.prev.swap(total, Ordering::Relaxed);
            if total > prev {
                self.lock().add(total - prev);
            }
        }
        self.lock().render(true);
        self.notify();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_deltas_across_objects() {
        let meter = Mutex::new(ProgressMeter::with_total(300));

        let first = MeterHook::new(&meter, None);
        first.on_progress("a", 50, Some(100));
        first.on_progress("a", 100, Some(100));
        first.on_done("a", Some(100), Duration::ZERO);

        let second = MeterHook::new(&meter, None);
        second.on_progress("b", 200, Some(200));
        second.on_done("b", Some(200), Duration::ZERO);

        assert_eq!(meter.lock().unwrap().done_bytes(), 300);
    }

    #[test]
    fn done_tops_up_missing_tail() {
        let meter = Mutex::new(ProgressMeter::with_total(100));
        let hook = MeterHook::new(&meter, None);
        hook.on_progress("a", 40, Some(100));
        hook.on_done("a", Some(100), Duration::ZERO);
        assert_eq!(meter.lock().unwrap().done_bytes(), 100);
    }

    #[test]
    fn adopts_total_on_start() {
        let meter = Mutex::new(ProgressMeter::new());
        let hook = MeterHook::adopting_total(&meter, None);
        hook.on_start("a", 500);
        assert_eq!(meter.lock().unwrap().total(), Some(500));
    }

    #[test]
    fn observer_sees_aggregated_totals() {
        let meter = Mutex::new(ProgressMeter::with_total(100));
        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observer = move |done: u64, total: Option<u64>| {
            sink.lock().unwrap().push((done, total));
        };

        let hook = MeterHook::new(&meter, Some(&observer));
        hook.on_progress("a", 40, Some(100));
        hook.on_done("a", Some(100), Duration::ZERO);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.first(), Some(&(40, Some(100))));
        assert_eq!(seen.last(), Some(&(100, Some(100))));
    }
}
