//! Authenticated caller identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::UserId;

/// The two roles known to the live session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Conductor: may mutate the live session.
    Admin,
    /// Read-only subscriber.
    Musician,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Musician => "musician",
        }
    }

    /// Whether this role may issue live-session commands.
    pub fn can_conduct(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of credential verification, trusted by the core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Stable user identifier.
    pub user_id: UserId,
    /// Role granted by the identity provider.
    pub role: Role,
    /// Human-readable name (name or email) used for `changedBy`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Identity {
    /// Build an identity without a display name.
    pub fn new(user_id: impl Into<UserId>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            display_name: None,
        }
    }

    /// Attach a display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Shorthand for an admin identity.
    pub fn admin(user_id: impl Into<UserId>) -> Self {
        Self::new(user_id, Role::Admin)
    }

    /// Shorthand for a musician identity.
    pub fn musician(user_id: impl Into<UserId>) -> Self {
        Self::new(user_id, Role::Musician)
    }

    /// Name shown to other clients; falls back to the user ID.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(self.user_id.as_str())
    }
}
