//! Caller identity as resolved by the identity collaborator.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The identity view consumed by the lifecycle engine.
///
/// The engine never inspects credentials. The transport layer resolves
/// whatever credential the caller presented into this value and passes it
/// explicitly into every operation; there is no ambient request state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable user identifier.
    pub user_id: Uuid,
    /// Whether the account finished email verification.
    pub verified: bool,
    /// Whether the account may manage the release catalog.
    pub is_admin: bool,
}

impl Identity {
    /// Build an identity value.
    pub fn new(user_id: Uuid, verified: bool, is_admin: bool) -> Self {
        Self {
            user_id,
            verified,
            is_admin,
        }
    }
}
