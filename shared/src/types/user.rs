use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use super::null_as_default;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Backend user identifier.
///
/// The backend is inconsistent about id encoding: the admin endpoints emit
/// JSON strings while comments and shifts emit numbers. Both forms
/// deserialize into the same string so `42` and `"42"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Self(s),
            Raw::Number(n) => Self(n.to_string()),
        })
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<i64> for UserId {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Privilege level attached to an account.
///
/// Declaration order is privilege order, so `Role::Worker < Role::Creator`.
/// Some backend call sites still emit `"admin"`; it is read as `Creator`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Guest,
    Worker,
    Manager,
    #[serde(alias = "admin")]
    Creator,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Guest, Role::Worker, Role::Manager, Role::Creator];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Worker => "worker",
            Self::Manager => "manager",
            Self::Creator => "creator",
        }
    }

    /// Human-facing title shown on profile cards.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Guest => "Guest",
            Self::Worker => "Barista",
            Self::Manager => "Coffee-shop manager",
            Self::Creator => "Creator",
        }
    }

    /// Worker and above.
    pub fn is_staff(&self) -> bool {
        *self >= Self::Worker
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guest" => Ok(Self::Guest),
            "worker" => Ok(Self::Worker),
            "manager" => Ok(Self::Manager),
            "creator" | "admin" => Ok(Self::Creator),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// User record
// ---------------------------------------------------------------------------

/// Identity record as returned by the auth and admin endpoints, and as kept
/// in durable storage next to the token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reputation: i64,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl User {
    pub fn new(id: impl Into<UserId>, username: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            email: None,
            role,
            reputation: 0,
            avatar: None,
            created_at: None,
        }
    }

    /// Merge a partial update in place. Fields left as `None` are untouched.
    pub fn apply(&mut self, patch: &UserPatch) {
        if let Some(username) = &patch.username {
            self.username = username.clone();
        }
        if let Some(email) = &patch.email {
            self.email = email.clone();
        }
        if let Some(avatar) = &patch.avatar {
            self.avatar = avatar.clone();
        }
        if let Some(reputation) = patch.reputation {
            self.reputation = reputation;
        }
    }
}

/// Partial identity update for self-service profile edits.
///
/// No role field: a role change reaches the session on the next login.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<Option<String>>,
    pub avatar: Option<Option<String>>,
    pub reputation: Option<i64>,
}

impl UserPatch {
    pub fn avatar(path: Option<String>) -> Self {
        Self {
            avatar: Some(path),
            ..Self::default()
        }
    }

    pub fn reputation(value: i64) -> Self {
        Self {
            reputation: Some(value),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.avatar.is_none()
            && self.reputation.is_none()
    }
}
