use std::fmt;

use serde::{Deserialize, Serialize};

use super::null_as_default;
use super::user::{Role, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Up,
    Down,
}

impl fmt::Display for VoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => f.write_str("up"),
            Self::Down => f.write_str("down"),
        }
    }
}

/// Body of `POST /api/user/:id/reputation`. Voting the same way twice
/// withdraws the vote server-side.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub vote_type: VoteKind,
}

/// Vote state as reported by both the vote and the status endpoints.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStatus {
    #[serde(default)]
    pub reputation: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_voted: bool,
    #[serde(default)]
    pub vote_type: Option<VoteKind>,
}

/// Public profile card, `GET /api/user/:id`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PublicProfile {
    pub id: UserId,
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: Role,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reputation: i64,
    #[serde(default)]
    pub created_at: Option<String>,
}
