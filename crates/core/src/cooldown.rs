//! Per-user download cooldown policy.
//!
//! Pure time arithmetic over the user's last successful completion; the
//! lookup and fail-open behavior live in the server crate.

use time::{Duration, OffsetDateTime};

/// Minimum spacing between two successful downloads by the same user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CooldownPolicy {
    window: Duration,
}

impl CooldownPolicy {
    /// Create a policy with the given window.
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Create a policy from a whole number of seconds.
    pub fn from_secs(secs: u64) -> Self {
        // Saturate so absurd config values cannot wrap negative.
        let secs = i64::try_from(secs).unwrap_or(i64::MAX);
        Self::new(Duration::seconds(secs))
    }

    /// The configured window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Remaining wait before the user may start a new session.
    ///
    /// Zero for a user who has never completed a download, and zero once
    /// the window has fully elapsed (the boundary is inclusive).
    pub fn remaining(
        &self,
        last_completed_at: Option<OffsetDateTime>,
        now: OffsetDateTime,
    ) -> Duration {
        match last_completed_at {
            None => Duration::ZERO,
            Some(last) => {
                let elapsed = now - last;
                if elapsed >= self.window {
                    Duration::ZERO
                } else {
                    self.window - elapsed
                }
            }
        }
    }

    /// Whether the user may start a new session now.
    pub fn can_start(
        &self,
        last_completed_at: Option<OffsetDateTime>,
        now: OffsetDateTime,
    ) -> bool {
        self.remaining(last_completed_at, now).is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CooldownPolicy {
        CooldownPolicy::from_secs(300)
    }

    #[test]
    fn test_never_completed_is_eligible() {
        let now = OffsetDateTime::now_utc();
        assert!(policy().can_start(None, now));
        assert_eq!(policy().remaining(None, now), Duration::ZERO);
    }

    #[test]
    fn test_mid_window_remaining() {
        let now = OffsetDateTime::now_utc();
        let last = now - Duration::minutes(4);
        assert!(!policy().can_start(Some(last), now));
        assert_eq!(policy().remaining(Some(last), now), Duration::minutes(1));
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let now = OffsetDateTime::now_utc();
        let last = now - Duration::minutes(5);
        assert!(policy().can_start(Some(last), now));
        assert_eq!(policy().remaining(Some(last), now), Duration::ZERO);
    }

    #[test]
    fn test_elapsed_window_is_eligible() {
        let now = OffsetDateTime::now_utc();
        let last = now - Duration::hours(2);
        assert!(policy().can_start(Some(last), now));
    }

    #[test]
    fn test_future_timestamp_extends_remaining() {
        // Clock skew can stamp a completion in the future; the wait is
        // simply measured from that stamp.
        let now = OffsetDateTime::now_utc();
        let last = now + Duration::seconds(30);
        let remaining = policy().remaining(Some(last), now);
        assert_eq!(remaining, Duration::minutes(5) + Duration::seconds(30));
    }

    #[test]
    fn test_from_secs_saturates() {
        let p = CooldownPolicy::from_secs(u64::MAX);
        assert_eq!(p.window(), Duration::seconds(i64::MAX));
    }
}
