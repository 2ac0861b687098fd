//! # Clock
//!
//! Monotonic time source and the pacing arithmetic used by the loop check.

use std::time::{Duration, Instant};

/// Point in monotonic time.
pub type Time = Instant;

/// Default loop period of a node that does not configure one.
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(100);

/// Current monotonic time.
#[must_use]
pub fn now() -> Time {
    Instant::now()
}

/// What the loop check should do after an iteration took `elapsed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// The iteration finished early; sleep for the remainder of the period.
    Sleep(Duration),
    /// The iteration took at least a full period; carry on immediately.
    Overrun(Duration),
}

/// Compare an iteration's duration against the period.
///
/// There is no catch-up: an overrun is reported by how much the period was
/// exceeded and the next iteration simply starts late.
#[must_use]
pub fn pacing(period: Duration, elapsed: Duration) -> Pacing {
    match period.checked_sub(elapsed) {
        Some(remaining) if !remaining.is_zero() => Pacing::Sleep(remaining),
        _ => Pacing::Overrun(elapsed.saturating_sub(period)),
    }
}

/// Period of a loop running at `hz` iterations per second.
///
/// Returns `None` for non-positive or non-finite rates.
#[must_use]
pub fn period_from_hz(hz: f64) -> Option<Duration> {
    if !hz.is_finite() || hz <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / hz).ok()
}

/// Period from a number of seconds, rejecting non-positive or non-finite
/// values.
#[must_use]
pub fn period_from_secs(secs: f64) -> Option<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok()
}
