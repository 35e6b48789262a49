use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Utc};

/// Time source for services. Game records store epoch milliseconds.
#[derive(Debug, Clone, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
    /// A hand-driven clock whose clones share one reading; used by tests and replays.
    Manual(Arc<AtomicI64>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns a manual clock starting at `start_ms`.
    #[must_use]
    pub fn manual(start_ms: i64) -> Self {
        Self::Manual(Arc::new(AtomicI64::new(start_ms)))
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(t) => *t,
            Clock::Manual(ms) => {
                DateTime::<Utc>::from_timestamp_millis(ms.load(Ordering::Acquire))
                    .unwrap_or_default()
            }
        }
    }

    /// Current time as epoch milliseconds.
    #[must_use]
    pub fn now_ms(&self) -> i64 {
        match self {
            Clock::Manual(ms) => ms.load(Ordering::Acquire),
            _ => self.now().timestamp_millis(),
        }
    }

    /// Move a fixed or manual clock forward. Has no effect on the system clock.
    ///
    /// Advancing a manual clock is visible through every clone.
    pub fn advance(&mut self, delta: Duration) {
        match self {
            Clock::System => {}
            Clock::Fixed(t) => *t += delta,
            Clock::Manual(ms) => {
                ms.fetch_add(delta.num_milliseconds(), Ordering::AcqRel);
            }
        }
    }

    #[must_use]
    pub fn is_system(&self) -> bool {
        matches!(self, Clock::System)
    }
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Deterministic epoch milliseconds matching `fixed_now`.
#[must_use]
pub fn fixed_now_ms() -> i64 {
    FIXED_TEST_TIMESTAMP * 1_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_is_shared_between_clones() {
        let mut clock = Clock::manual(fixed_now_ms());
        let observer = clock.clone();
        clock.advance(Duration::minutes(2));
        assert_eq!(observer.now_ms(), fixed_now_ms() + 120_000);
        assert_eq!(observer.now().timestamp(), FIXED_TEST_TIMESTAMP + 120);
    }
}
