//! Acting-user context
//!
//! Every lifecycle operation receives the caller explicitly; nothing is read
//! from ambient state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::id::{ShelterId, UserId};

/// Role of the acting user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "USER" => Ok(Role::User),
            _ => Err(format!("Unknown role: '{}' (expected admin or user)", s)),
        }
    }
}

/// The user on whose behalf an operation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub requester_id: UserId,

    pub role: Role,

    /// Admins may be limited to the animals of one shelter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shelter_scope: Option<ShelterId>,
}

impl Actor {
    /// A regular requester
    pub fn user(requester_id: UserId) -> Self {
        Self {
            requester_id,
            role: Role::User,
            shelter_scope: None,
        }
    }

    /// An unscoped admin
    pub fn admin(requester_id: UserId) -> Self {
        Self {
            requester_id,
            role: Role::Admin,
            shelter_scope: None,
        }
    }

    /// Restricts this actor to one shelter
    pub fn scoped_to(mut self, shelter_id: ShelterId) -> Self {
        self.shelter_scope = Some(shelter_id);
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Returns true if this actor is an admin whose scope covers the shelter
    pub fn administers(&self, shelter_id: ShelterId) -> bool {
        self.is_admin() && self.shelter_scope.map_or(true, |scope| scope == shelter_id)
    }
}
