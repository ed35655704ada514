//! Call deadlines.

use std::time::{Duration, Instant};

use crate::error::{DbError, Result};

/// The instant after which a unit of work gives up.
///
/// `Deadline::none()` never expires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    /// A deadline `timeout` from now. Overflowing timeouts never expire.
    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now().checked_add(timeout))
    }

    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map_or_else(Self::none, Self::after)
    }

    /// Time left, or `None` when unbounded. Expired deadlines report zero.
    pub fn remaining(&self) -> Option<Duration> {
        self.0
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_some_and(|left| left.is_zero())
    }

    /// Clamps `timeout` to the time left.
    pub fn cap(&self, timeout: Duration) -> Duration {
        match self.remaining() {
            Some(left) => timeout.min(left),
            None => timeout,
        }
    }

    pub fn check(&self, stage: &'static str) -> Result<()> {
        if self.is_expired() {
            Err(DbError::DeadlineExceeded(stage))
        } else {
            Ok(())
        }
    }
}
