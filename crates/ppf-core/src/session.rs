//! Caller identity passed explicitly into every engine call.

use jiff::{SignedDuration, Timestamp};
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkflowError};

/// Authenticated technician on whose behalf an engine call runs.
///
/// Sessions are issued upstream; the engine only checks that an identity is
/// present and not past its expiry before acting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct Session {
    /// Technician identifier recorded on interventions and approvals
    pub user_id: String,

    /// Opaque token forwarded by the transport, never inspected here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// RFC 3339 expiry instant; sessions without one do not expire
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "schema", schemars(with = "Option<String>"))]
    pub expires_at: Option<Timestamp>,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: None,
            expires_at: None,
        }
    }

    /// Session valid for `ttl` from now.
    pub fn with_ttl(user_id: impl Into<String>, ttl: SignedDuration) -> Self {
        Self {
            user_id: user_id.into(),
            token: None,
            expires_at: Timestamp::now().checked_add(ttl).ok(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Timestamp::now())
    }

    /// Returns the caller identity or `SessionExpired`.
    pub fn require(&self) -> Result<&str> {
        let user = self.user_id.trim();
        if user.is_empty() || self.is_expired() {
            return Err(WorkflowError::SessionExpired);
        }
        Ok(user)
    }
}
