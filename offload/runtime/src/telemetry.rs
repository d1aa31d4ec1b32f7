//! Batch timing.
//!
//! A batch is one busy interval of the pool: it starts when the first unit
//! is admitted to an idle pool and ends when the pool is idle again, with
//! nothing running and nothing queued.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Timing of the current or most recent batch.
///
/// While a batch runs only `start` is set. All fields are unset before the
/// pool has ever been busy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Batch {
    pub start: Option<SystemTime>,
    pub end: Option<SystemTime>,
    pub elapsed: Option<Duration>,
}

impl Batch {
    pub fn is_running(&self) -> bool {
        self.start.is_some() && self.end.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.end.is_some()
    }
}

/// Tracks batch boundaries for a scheduler.
pub struct BatchTimer {
    clock: Arc<dyn Clock>,
    current: Batch,
}

impl BatchTimer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            current: Batch::default(),
        }
    }

    /// Idle to busy: open a fresh batch.
    pub fn start(&mut self) {
        self.current = Batch {
            start: Some(self.clock.now()),
            end: None,
            elapsed: None,
        };
    }

    /// Busy to idle: close the open batch and return it.
    pub fn finish(&mut self) -> Option<Batch> {
        let start = self.current.start?;
        if self.current.end.is_some() {
            return None;
        }

        let end = self.clock.now();
        self.current.end = Some(end);
        self.current.elapsed = Some(end.duration_since(start).unwrap_or_default());
        Some(self.current)
    }

    pub fn snapshot(&self) -> Batch {
        self.current
    }
}

impl Default for BatchTimer {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}


#[cfg(test)]
mod tests {
    use super::manual::ManualClock;
    use super::*;

    #[test]
    fn unset_before_first_batch() {
        let timer = BatchTimer::default();
        assert_eq!(timer.snapshot(), Batch::default());
        assert!(!timer.snapshot().is_running());
    }

    #[test]
    fn start_then_finish() {
        let clock = Arc::new(ManualClock::new());
        let mut timer = BatchTimer::new(clock.clone());

        timer.start();
        assert!(timer.snapshot().is_running());
        assert_eq!(timer.snapshot().end, None);
        assert_eq!(timer.snapshot().elapsed, None);

        clock.advance(Duration::from_millis(250));
        let batch = timer.finish().unwrap();
        assert_eq!(batch.elapsed, Some(Duration::from_millis(250)));
        assert!(batch.is_complete());
        assert_eq!(timer.snapshot(), batch);
    }

    #[test]
    fn finish_without_start_is_none() {
        let mut timer = BatchTimer::default();
        assert_eq!(timer.finish(), None);
    }

    #[test]
    fn finish_is_idempotent() {
        let mut timer = BatchTimer::default();
        timer.start();
        assert!(timer.finish().is_some());
        assert!(timer.finish().is_none());
    }

    #[test]
    fn restart_clears_end() {
        let clock = Arc::new(ManualClock::new());
        let mut timer = BatchTimer::new(clock.clone());
        timer.start();
        timer.finish();

        clock.advance(Duration::from_secs(1));
        timer.start();
        let batch = timer.snapshot();
        assert!(batch.is_running());
        assert_eq!(batch.elapsed, None);
    }
}
