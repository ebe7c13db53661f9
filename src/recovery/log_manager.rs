//! Log manager hook for the write-ahead rule.

use std::sync::atomic::{AtomicU64, Ordering};

use log::trace;

/// Flush point for write-ahead log records.
///
/// Before the buffer pool writes a dirty page to disk it calls
/// [`flush_until`](LogManager::flush_until) with the page's header LSN,
/// guaranteeing the write-ahead rule: log records describing a change are
/// durable before the changed page is.
///
/// This crate only maintains the flushed-LSN watermark; appending records,
/// buffering, and group commit belong to the full log manager that embeds
/// this hook.
#[derive(Debug, Default)]
pub struct LogManager {
    /// Highest LSN known to be durable in the log.
    flushed_lsn: AtomicU64,
}

impl LogManager {
    /// Create a log manager with nothing flushed yet.
    pub fn new() -> Self {
        Self {
            flushed_lsn: AtomicU64::new(0),
        }
    }

    /// Ensure all log records up to and including `lsn` are durable.
    ///
    /// Monotonic: calls with an LSN at or below the watermark are no-ops.
    pub fn flush_until(&self, lsn: u64) {
        let mut current = self.flushed_lsn.load(Ordering::Acquire);
        while lsn > current {
            match self.flushed_lsn.compare_exchange_weak(
                current,
                lsn,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    trace!("log flushed through lsn {}", lsn);
                    break;
                }
                Err(observed) => current = observed,
            }
        }
    }

    /// Highest LSN known to be durable.
    #[inline]
    pub fn flushed_lsn(&self) -> u64 {
        self.flushed_lsn.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_zero() {
        let lm = LogManager::new();
        assert_eq!(lm.flushed_lsn(), 0);
    }

    #[test]
    fn test_flush_advances_watermark() {
        let lm = LogManager::new();

        lm.flush_until(10);
        assert_eq!(lm.flushed_lsn(), 10);

        lm.flush_until(25);
        assert_eq!(lm.flushed_lsn(), 25);
    }

    #[test]
    fn test_flush_is_monotonic() {
        let lm = LogManager::new();

        lm.flush_until(25);
        lm.flush_until(10); // lower than the watermark, must not regress
        assert_eq!(lm.flushed_lsn(), 25);
    }

    #[test]
    fn test_concurrent_flushes() {
        use std::sync::Arc;
        use std::thread;

        let lm = Arc::new(LogManager::new());
        let mut handles = vec![];

        for i in 1..=8u64 {
            let lm = Arc::clone(&lm);
            handles.push(thread::spawn(move || {
                for lsn in 0..100 {
                    lm.flush_until(i * 100 + lsn);
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(lm.flushed_lsn(), 899);
    }
}
