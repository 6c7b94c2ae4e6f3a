//! Time primitives for Postura sessions
//!
//! Every timestamp the phase machine sees is a [`SessionTime`]: microseconds
//! since the session clock started. Clocks are injected so that hold timers
//! and audio-gated delays can be driven deterministically in tests.

use std::ops::{Add, Sub};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Session time - monotonic offset from session start
/// Represented as microseconds since the session epoch
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SessionTime(pub i64);

impl SessionTime {
    pub const ZERO: SessionTime = SessionTime(0);

    #[inline]
    pub fn from_micros(micros: i64) -> Self {
        SessionTime(micros)
    }

    #[inline]
    pub fn from_millis(millis: i64) -> Self {
        SessionTime(millis * 1000)
    }

    #[inline]
    pub fn from_duration(duration: Duration) -> Self {
        SessionTime(duration.as_micros() as i64)
    }

    #[inline]
    pub fn as_micros(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn as_millis(self) -> i64 {
        self.0 / 1000
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    /// Time elapsed since `earlier`, zero if `earlier` is in the future
    #[inline]
    pub fn since(self, earlier: SessionTime) -> Duration {
        self - earlier
    }

    #[inline]
    pub fn saturating_add(self, duration: Duration) -> Self {
        SessionTime(self.0.saturating_add(duration.as_micros() as i64))
    }

    #[inline]
    pub fn saturating_sub(self, duration: Duration) -> Self {
        SessionTime(self.0.saturating_sub(duration.as_micros() as i64))
    }
}

impl Add<Duration> for SessionTime {
    type Output = SessionTime;

    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        SessionTime(self.0 + rhs.as_micros() as i64)
    }
}

impl Sub<Duration> for SessionTime {
    type Output = SessionTime;

    #[inline]
    fn sub(self, rhs: Duration) -> Self::Output {
        SessionTime(self.0 - rhs.as_micros() as i64)
    }
}

impl Sub<SessionTime> for SessionTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: SessionTime) -> Self::Output {
        let diff = self.0 - rhs.0;
        if diff >= 0 {
            Duration::from_micros(diff as u64)
        } else {
            Duration::ZERO
        }
    }
}

impl std::fmt::Debug for SessionTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t({:.3}ms)", self.0 as f64 / 1000.0)
    }
}

/// Source of session time
pub trait Clock: Send + Sync {
    fn now(&self) -> SessionTime;
}

/// Wall clock anchored at construction
/// INVARIANT: never goes backwards
pub struct MonotonicClock {
    reference: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            reference: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> SessionTime {
        SessionTime::from_duration(self.reference.elapsed())
    }
}

/// Manually driven clock for replays and tests
///
/// Clones share the same underlying time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    value: Arc<Mutex<SessionTime>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(time: SessionTime) -> Self {
        ManualClock {
            value: Arc::new(Mutex::new(time)),
        }
    }

    /// Advance by a duration, returning the new time
    pub fn advance(&self, dt: Duration) -> SessionTime {
        let mut value = self.value.lock();
        *value = value.saturating_add(dt);
        *value
    }

    /// Jump to a time. Only moves forward.
    pub fn set(&self, time: SessionTime) {
        let mut value = self.value.lock();
        if time > *value {
            *value = time;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SessionTime {
        *self.value.lock()
    }
}
