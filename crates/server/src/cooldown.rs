//! Fail-open cooldown gate over the user profile store.

use hangar_core::CooldownPolicy;
use hangar_metadata::repos::ProfileRepo;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Cooldown state for one user at one point in time.
#[derive(Debug, Clone, Copy)]
pub struct CooldownStatus {
    /// Whether the user may open a new session now.
    pub eligible: bool,
    /// Remaining wait; zero when eligible.
    pub remaining: Duration,
}

impl CooldownStatus {
    /// Remaining wait in whole seconds, rounded up so a client that
    /// sleeps exactly this long lands past the boundary.
    pub fn remaining_secs(&self) -> u64 {
        let secs = self.remaining.whole_seconds().max(0) as u64;
        if self.remaining.subsec_nanoseconds() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}

/// Read-only gate deriving cooldown state from the profile store.
///
/// Lookup failures FAIL OPEN: a user is treated as eligible rather than
/// locked out by unrelated infrastructure trouble. This is a deliberate,
/// documented trade-off of availability over strictness, and the single
/// exception to strict error propagation in this crate.
#[derive(Clone)]
pub struct CooldownGate {
    profiles: Arc<dyn ProfileRepo>,
    policy: CooldownPolicy,
}

impl CooldownGate {
    /// Create a gate over a profile repository.
    pub fn new(profiles: Arc<dyn ProfileRepo>, policy: CooldownPolicy) -> Self {
        Self { profiles, policy }
    }

    /// The configured policy.
    pub fn policy(&self) -> CooldownPolicy {
        self.policy
    }

    /// Derive the user's current cooldown state.
    pub async fn status(&self, user_id: Uuid) -> CooldownStatus {
        let now = OffsetDateTime::now_utc();
        let last_completed_at = match self.profiles.get_profile(user_id).await {
            Ok(profile) => profile.and_then(|p| p.last_completed_at),
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    error = %e,
                    "profile lookup failed, treating user as eligible"
                );
                None
            }
        };

        let remaining = self.policy.remaining(last_completed_at, now);
        CooldownStatus {
            eligible: remaining.is_zero(),
            remaining,
        }
    }
}
