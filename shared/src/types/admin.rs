use serde::{Deserialize, Serialize};

use super::user::Role;

/// Body of `PATCH /api/admin/users/:id/role`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleChange {
    pub role: Role,
}

/// Body of `PATCH /api/admin/users/:id/reputation`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationChange {
    pub reputation: i64,
}
