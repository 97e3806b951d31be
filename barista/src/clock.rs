//! Time sources for validating `exp` and `nbf`
//!
//! Token lifetimes are compared against a [`Clock`]. Production code uses
//! [`System`]; tests pin time with [`TestClock`].

use std::{
    fmt,
    ops::{Add, Sub},
    time::{Duration, SystemTime},
};

use serde::{Deserialize, Serialize};

/// Seconds since the Unix epoch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnixTime(pub u64);

impl From<SystemTime> for UnixTime {
    #[inline]
    fn from(t: SystemTime) -> Self {
        // Times before the epoch collapse to the epoch itself
        let secs = t
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        Self(secs)
    }
}

impl Add<Duration> for UnixTime {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Duration) -> Self {
        Self(self.0.saturating_add(rhs.as_secs()))
    }
}

impl Sub<Duration> for UnixTime {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Duration) -> Self {
        Self(self.0.saturating_sub(rhs.as_secs()))
    }
}

impl fmt::Display for UnixTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A source of the current time
pub trait Clock {
    /// The current time
    fn now(&self) -> UnixTime;
}

impl<T: Clock + ?Sized> Clock for &T {
    #[inline]
    fn now(&self) -> UnixTime {
        T::now(self)
    }
}

/// The system wall clock
#[derive(Clone, Copy, Debug, Default)]
pub struct System;

impl Clock for System {
    #[inline]
    fn now(&self) -> UnixTime {
        UnixTime::from(SystemTime::now())
    }
}

/// A manually driven clock for tests
#[derive(Clone, Copy, Debug, Default)]
pub struct TestClock(UnixTime);

impl Clock for TestClock {
    #[inline]
    fn now(&self) -> UnixTime {
        self.0
    }
}

impl TestClock {
    /// A clock stopped at `time`
    #[must_use]
    pub const fn new(time: UnixTime) -> Self {
        Self(time)
    }

    /// Jumps to `time`
    pub fn set(&mut self, time: UnixTime) {
        self.0 = time;
    }

    /// Moves forward by `secs`
    pub fn advance(&mut self, secs: u64) {
        self.0 .0 += secs;
    }
}
