//! Per-row progress markers between histogram and interpolation work.
//!
//! Each tile row publishes how many of its tile columns have a finished
//! mapping. Interpolation of the next block row waits on that count before it
//! reads those mappings or overwrites the pixels the histograms were built from.

use std::hint;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use parking_lot::{Condvar, Mutex};

/// Busy-poll iterations before a spinning waiter starts yielding.
const SPIN_LIMIT: u32 = 64;

/// Progress signalling between the two phases of a tile row.
///
/// `publish` must be called with a non-decreasing column count per row. Every
/// write made before `publish(row, n)` is visible after a matching
/// `wait(row, m)` with `m <= n` returns.
pub(crate) trait RowSync: Sync {
    fn publish(&self, row: usize, completed_columns: usize);
    fn wait(&self, row: usize, needed_columns: usize);
}

/// No-op marker for schedules whose ordering is structural (serial loop,
/// fork-join barrier).
pub(crate) struct Unsynchronized;

impl RowSync for Unsynchronized {
    #[inline]
    fn publish(&self, _row: usize, _completed_columns: usize) {}

    #[inline]
    fn wait(&self, _row: usize, _needed_columns: usize) {}
}

struct RowEvent {
    completed: Mutex<usize>,
    ready: Condvar,
}

/// Blocking marker: one mutex and condition variable per row.
pub(crate) struct EventSync {
    rows: Vec<RowEvent>,
}

impl EventSync {
    pub(crate) fn new(rows: usize) -> Self {
        Self {
            rows: (0..rows)
                .map(|_| RowEvent {
                    completed: Mutex::new(0),
                    ready: Condvar::new(),
                })
                .collect(),
        }
    }
}

impl RowSync for EventSync {
    fn publish(&self, row: usize, completed_columns: usize) {
        let event = &self.rows[row];
        *event.completed.lock() = completed_columns;
        event.ready.notify_all();
    }

    fn wait(&self, row: usize, needed_columns: usize) {
        let event = &self.rows[row];
        let mut completed = event.completed.lock();
        while *completed < needed_columns {
            event.ready.wait(&mut completed);
        }
    }
}

/// Polling marker: one atomic counter per row, spin then yield.
pub(crate) struct SpinSync {
    rows: Vec<AtomicUsize>,
}

impl SpinSync {
    pub(crate) fn new(rows: usize) -> Self {
        Self {
            rows: (0..rows).map(|_| AtomicUsize::new(0)).collect(),
        }
    }
}

impl RowSync for SpinSync {
    #[inline]
    fn publish(&self, row: usize, completed_columns: usize) {
        self.rows[row].store(completed_columns, Ordering::Release);
    }

    fn wait(&self, row: usize, needed_columns: usize) {
        let counter = &self.rows[row];
        let mut spins = 0;
        while counter.load(Ordering::Acquire) < needed_columns {
            if spins < SPIN_LIMIT {
                hint::spin_loop();
                spins += 1;
            } else {
                thread::yield_now();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn waiter_sees_published_progress<S: RowSync>(sync: &S) {
        let data = AtomicUsize::new(0);
        thread::scope(|scope| {
            scope.spawn(|| {
                sync.wait(1, 3);
                assert_eq!(data.load(Ordering::Relaxed), 42);
            });
            scope.spawn(|| {
                thread::sleep(Duration::from_millis(20));
                sync.publish(1, 1);
                sync.publish(1, 2);
                data.store(42, Ordering::Relaxed);
                sync.publish(1, 3);
            });
        });
    }

    #[test]
    fn test_event_sync_wakes_waiter() {
        waiter_sees_published_progress(&EventSync::new(2));
    }

    #[test]
    fn test_spin_sync_wakes_waiter() {
        waiter_sees_published_progress(&SpinSync::new(2));
    }

    #[test]
    fn test_wait_returns_when_already_complete() {
        let event = EventSync::new(1);
        event.publish(0, 5);
        event.wait(0, 5);
        event.wait(0, 0);

        let spin = SpinSync::new(1);
        spin.publish(0, 5);
        spin.wait(0, 2);
    }

    #[test]
    fn test_rows_are_independent() {
        let spin = SpinSync::new(3);
        spin.publish(2, 4);
        assert_eq!(spin.rows[0].load(Ordering::Relaxed), 0);
        assert_eq!(spin.rows[2].load(Ordering::Relaxed), 4);
    }

    #[test]
    fn test_unsynchronized_never_blocks() {
        let sync = Unsynchronized;
        sync.wait(10, usize::MAX);
        sync.publish(10, 1);
    }
}
