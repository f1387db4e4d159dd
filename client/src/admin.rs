//! Creator-only user management: the admin users table.
//!
//! Role and reputation changes go through a [`Coordinator`], so the last
//! one can be undone for a short while. Deletes are confirmed and final.

use std::time::Duration;

use shared::types::{ReputationChange, Role, RoleChange, User, UserId};
use tracing::{info, warn};

use crate::confirm::{Confirm, Deletion, delete_confirmed};
use crate::coordinator::{Coordinator, PendingUndo, Phase, UndoOutcome};
use crate::error::{ApiError, ApiResult};
use crate::gateway::ApiClient;
use crate::guard;
use crate::view::ViewList;

/// The field a reversible admin action changed, holding its old value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserEdit {
    Role(Role),
    Reputation(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoReport {
    /// Nothing to undo.
    Nothing,
    /// The server accepted the reversal; the row shows its answer.
    Reverted(UserId),
    /// The reversal request failed; the old value is shown anyway.
    RevertedLocally(UserId),
}

pub struct UserDirectory {
    api: ApiClient,
    primary_creator: String,
    rows: ViewList<User>,
    edits: Coordinator<UserId, UserEdit>,
}

impl UserDirectory {
    pub fn new(api: ApiClient, primary_creator: impl Into<String>, undo_window: Duration) -> Self {
        Self {
            api,
            primary_creator: primary_creator.into(),
            rows: ViewList::new("admin users"),
            edits: Coordinator::new(undo_window),
        }
    }

    pub fn rows(&self) -> Vec<User> {
        self.rows.snapshot()
    }

    pub fn pending_undo(&self) -> Option<PendingUndo<UserId, UserEdit>> {
        self.edits.pending()
    }

    pub fn phase(&self) -> Phase {
        self.edits.phase()
    }

    /// Tear down the table. Requests still in flight complete but no longer
    /// change it or arm an undo, and any undo already armed is dropped.
    pub fn dispose(&self) {
        self.rows.dispose();
        self.edits.dispose();
    }

    /// Load the table, optionally filtered. A failed load empties it.
    pub async fn fetch(&self, search: &str) -> ApiResult<Vec<User>> {
        guard::can_manage_users(&self.api.session().snapshot())?;

        let result = async {
            let payload = self
                .api
                .get_query("/api/admin/users", &[("search", search.trim())])
                .await?;
            Ok::<_, ApiError>(payload.optional::<Vec<User>>("users")?.unwrap_or_default())
        }
        .await;

        match result {
            Ok(users) => {
                info!("Loaded {} users", users.len());
                self.rows.replace(users.clone());
                Ok(users)
            }
            Err(e) => {
                self.rows.replace(Vec::new());
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Reversible edits
    // -----------------------------------------------------------------------

    pub async fn set_role(&self, id: &UserId, role: Role) -> ApiResult<User> {
        guard::can_manage_users(&self.api.session().snapshot())?;

        self.edits
            .mutate(id.clone(), || {
                let row = self.row(id)?;
                Ok((UserEdit::Role(row.role), async move {
                    let user = patch_role(&self.api, id, role).await?;
                    info!("Role of {} changed {} -> {}", row.username, row.role, user.role);
                    self.apply_server(id, UserEdit::Role(role), &user);
                    Ok::<_, ApiError>(user)
                }))
            })
            .await
    }

    pub async fn set_reputation(&self, id: &UserId, reputation: i64) -> ApiResult<User> {
        guard::can_adjust_reputation(&self.api.session().snapshot(), id)?;
        self.edit_reputation(id, |_| reputation).await
    }

    /// The table's +1 / -1 buttons.
    pub async fn adjust_reputation(&self, id: &UserId, delta: i64) -> ApiResult<User> {
        guard::can_adjust_reputation(&self.api.session().snapshot(), id)?;
        self.edit_reputation(id, |current| current + delta).await
    }

    /// Reverse the most recent role or reputation change, if its window is
    /// still open.
    pub async fn undo(&self) -> ApiResult<UndoReport> {
        guard::can_manage_users(&self.api.session().snapshot())?;

        let outcome = self
            .edits
            .undo(|id, previous| async move {
                let sent = match previous {
                    UserEdit::Role(role) => patch_role(&self.api, &id, role).await,
                    UserEdit::Reputation(value) => patch_reputation(&self.api, &id, value).await,
                };
                match &sent {
                    Ok(user) => self.apply_server(&id, previous, user),
                    Err(_) => self.apply_local(&id, previous),
                }
                sent
            })
            .await;

        Ok(match outcome {
            UndoOutcome::Nothing => UndoReport::Nothing,
            UndoOutcome::Reverted { target, .. } => UndoReport::Reverted(target),
            UndoOutcome::Fallback { target, .. } => UndoReport::RevertedLocally(target),
        })
    }

    /// The row is read only once earlier edits have landed, so the value
    /// sent and the value kept for undo both start from it.
    async fn edit_reputation(&self, id: &UserId, next: impl FnOnce(i64) -> i64) -> ApiResult<User> {
        self.edits
            .mutate(id.clone(), || {
                let row = self.row(id)?;
                let reputation = next(row.reputation);
                Ok((UserEdit::Reputation(row.reputation), async move {
                    let user = patch_reputation(&self.api, id, reputation).await?;
                    info!(
                        "Reputation of {} changed {} -> {}",
                        row.username, row.reputation, user.reputation
                    );
                    self.apply_server(id, UserEdit::Reputation(reputation), &user);
                    Ok::<_, ApiError>(user)
                }))
            })
            .await
    }

    // -----------------------------------------------------------------------
    // Deletion
    // -----------------------------------------------------------------------

    /// Delete an account after confirmation. The primary creator and the
    /// caller's own account are refused before anything is sent.
    pub async fn delete_user<C: Confirm + ?Sized>(&self, id: &UserId, confirm: &C) -> ApiResult<Deletion> {
        let target = self.row(id)?;
        guard::can_delete_user(&self.api.session().snapshot(), &target, &self.primary_creator)?;

        let prompt = format!(
            "Delete user \"{}\"? This cannot be undone.",
            target.username
        );
        let path = format!("/api/admin/users/{}", id);
        let outcome = delete_confirmed(confirm, &prompt, || self.api.delete(&path)).await?;

        if outcome == Deletion::Deleted {
            info!("Deleted user {} ({})", target.username, id);
            self.rows.update(|rows| rows.retain(|u| &u.id != id));
        }
        Ok(outcome)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn row(&self, id: &UserId) -> ApiResult<User> {
        self.rows
            .find(|u| &u.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("user {}", id)))
    }

    /// Role answers replace the whole row; reputation answers only the
    /// number.
    fn apply_server(&self, id: &UserId, kind: UserEdit, user: &User) {
        self.rows.update(|rows| {
            if let Some(row) = rows.iter_mut().find(|u| &u.id == id) {
                match kind {
                    UserEdit::Role(_) => *row = user.clone(),
                    UserEdit::Reputation(_) => row.reputation = user.reputation,
                }
            }
        });
    }

    fn apply_local(&self, id: &UserId, previous: UserEdit) {
        warn!("Showing {:?} for {} without server confirmation", previous, id);
        self.rows.update(|rows| {
            if let Some(row) = rows.iter_mut().find(|u| &u.id == id) {
                match previous {
                    UserEdit::Role(role) => row.role = role,
                    UserEdit::Reputation(value) => row.reputation = value,
                }
            }
        });
    }
}

async fn patch_role(api: &ApiClient, id: &UserId, role: Role) -> ApiResult<User> {
    let payload = api
        .patch_json(&format!("/api/admin/users/{}/role", id), &RoleChange { role })
        .await?;
    Ok(payload.field("user")?)
}

async fn patch_reputation(api: &ApiClient, id: &UserId, reputation: i64) -> ApiResult<User> {
    let payload = api
        .patch_json(
            &format!("/api/admin/users/{}/reputation", id),
            &ReputationChange { reputation },
        )
        .await?;
    Ok(payload.field("user")?)
}
