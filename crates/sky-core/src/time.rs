use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

/// A point in continuous simulated time, in seconds.
///
/// Unlike a tick counter, emission instants are real-valued: the scheduler
/// orders sources by their next-emission time, and "never fires again" is
/// represented by [`SimTime::FAR_FUTURE`]. Total ordering is defined via
/// `f64::total_cmp` so the type can key ordered collections.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimTime(f64);

impl SimTime {
    /// The start of every simulation.
    pub const ZERO: Self = Self(0.0);

    /// A time later than any reachable emission; marks exhausted sources.
    pub const FAR_FUTURE: Self = Self(f64::INFINITY);

    /// Create a time from seconds.
    pub const fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    /// The time as seconds.
    pub const fn as_secs(self) -> f64 {
        self.0
    }

    /// True if this time is finite (a real emission instant).
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    /// The larger of two times.
    pub fn max(self, other: Self) -> Self {
        if self >= other { self } else { other }
    }
}

impl Eq for SimTime {}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add<f64> for SimTime {
    type Output = Self;

    fn add(self, secs: f64) -> Self {
        Self(self.0 + secs)
    }
}

impl AddAssign<f64> for SimTime {
    fn add_assign(&mut self, secs: f64) {
        self.0 += secs;
    }
}

impl Sub for SimTime {
    type Output = f64;

    fn sub(self, other: Self) -> f64 {
        self.0 - other.0
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.9}s", self.0)
    }
}
