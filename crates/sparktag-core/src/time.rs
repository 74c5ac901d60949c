//! Time primitives for tag observations
//!
//! Timestamps are epoch milliseconds. Zero is reserved as the "never
//! observed" sentinel: a snapshot carrying it has not been read yet.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Observation timestamp (epoch milliseconds)
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Sentinel for a snapshot that has never been observed
    pub const NEVER: Timestamp = Timestamp(0);

    #[inline]
    pub fn from_millis(millis: u64) -> Self {
        Timestamp(millis)
    }

    #[inline]
    pub fn as_millis(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn is_never(self) -> bool {
        self == Timestamp::NEVER
    }

    /// Wall-clock now, saturating to `NEVER` if the clock is before the epoch
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis().min(u64::MAX as u128) as u64)
            .unwrap_or(0);
        Timestamp(millis)
    }

    #[inline]
    pub fn saturating_add(self, duration: Duration) -> Self {
        Timestamp(self.0.saturating_add(duration.as_millis() as u64))
    }
}

impl From<u64> for Timestamp {
    fn from(millis: u64) -> Self {
        Timestamp(millis)
    }
}

impl std::fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_never() {
            write!(f, "t(never)")
        } else {
            write!(f, "t({}ms)", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_sentinel() {
        assert!(Timestamp::NEVER.is_never());
        assert!(Timestamp::default().is_never());
        assert!(!Timestamp::from_millis(1).is_never());
    }

    #[test]
    fn test_saturating_add() {
        let a = Timestamp::from_millis(1000);
        assert_eq!(a.saturating_add(Duration::from_millis(500)), Timestamp(1500));
        assert_eq!(
            Timestamp(u64::MAX - 1).saturating_add(Duration::from_secs(1)),
            Timestamp(u64::MAX)
        );
    }

    #[test]
    fn test_now_is_observed() {
        assert!(!Timestamp::now().is_never());
    }
}
