//! Role-based access decisions.
//!
//! Everything here is a pure function of a [`SessionSnapshot`] and the
//! target. Callers check before sending a request so known-denied actions
//! never reach the network; the backend still has the final word.

use std::fmt;

use shared::types::{Role, User, UserId};
use thiserror::Error;

use crate::session::SessionSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Denied {
    #[error("sign in required")]
    NotAuthenticated,

    #[error("requires role {required}, signed in as {actual}")]
    InsufficientRole { required: RoleSet, actual: Role },

    #[error("you cannot vote on your own reputation")]
    SelfVote,

    #[error("you cannot delete your own account")]
    SelfDelete,

    #[error("the primary creator account cannot be deleted")]
    PrimaryCreator,

    #[error("only the author or staff can remove this")]
    NotAuthor,
}

/// Allowed roles for an action, printed as `manager|creator`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSet(pub Vec<Role>);

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(Role::as_str).collect();
        f.write_str(&names.join("|"))
    }
}

pub const STAFF: &[Role] = &[Role::Worker, Role::Manager, Role::Creator];
pub const SCHEDULERS: &[Role] = &[Role::Manager, Role::Creator];
pub const CREATOR_ONLY: &[Role] = &[Role::Creator];

pub fn require_authenticated(session: &SessionSnapshot) -> Result<&User, Denied> {
    session.user().ok_or(Denied::NotAuthenticated)
}

/// Allow iff signed in with a role from `allowed`.
pub fn require_role<'a>(session: &'a SessionSnapshot, allowed: &[Role]) -> Result<&'a User, Denied> {
    let user = require_authenticated(session)?;
    if allowed.contains(&user.role) {
        Ok(user)
    } else {
        Err(Denied::InsufficientRole {
            required: RoleSet(allowed.to_vec()),
            actual: user.role,
        })
    }
}

/// Role elevation and demotion.
pub fn can_manage_users(session: &SessionSnapshot) -> Result<&User, Denied> {
    require_role(session, CREATOR_ONLY)
}

/// Creator-side reputation adjustment. Adjusting your own counts as a
/// self-vote.
pub fn can_adjust_reputation<'a>(
    session: &'a SessionSnapshot,
    target: &UserId,
) -> Result<&'a User, Denied> {
    let actor = require_role(session, CREATOR_ONLY)?;
    if &actor.id == target {
        return Err(Denied::SelfVote);
    }
    Ok(actor)
}

/// Peer reputation vote: any signed-in user, never on themselves.
pub fn can_vote<'a>(session: &'a SessionSnapshot, target: &UserId) -> Result<&'a User, Denied> {
    let actor = require_authenticated(session)?;
    if &actor.id == target {
        return Err(Denied::SelfVote);
    }
    Ok(actor)
}

/// Account deletion. The primary creator and the actor's own account are
/// off limits for everyone.
pub fn can_delete_user<'a>(
    session: &'a SessionSnapshot,
    target: &User,
    primary_creator: &str,
) -> Result<&'a User, Denied> {
    let actor = require_role(session, CREATOR_ONLY)?;
    if target.username == primary_creator {
        return Err(Denied::PrimaryCreator);
    }
    if actor.id == target.id {
        return Err(Denied::SelfDelete);
    }
    Ok(actor)
}

/// Creating and editing drinks and news.
pub fn can_author_content(session: &SessionSnapshot) -> Result<&User, Denied> {
    require_role(session, CREATOR_ONLY)
}

/// Posting reviews and comments, liking news.
pub fn can_participate(session: &SessionSnapshot) -> Result<&User, Denied> {
    require_authenticated(session)
}

/// Removing a review or comment: its author, or any staff member.
pub fn can_moderate<'a>(
    session: &'a SessionSnapshot,
    author_id: Option<&UserId>,
    author_name: Option<&str>,
) -> Result<&'a User, Denied> {
    let actor = require_authenticated(session)?;
    let is_author = author_id.is_some_and(|id| id == &actor.id)
        || author_name.is_some_and(|name| name == actor.username);

    if is_author || actor.role.is_staff() {
        Ok(actor)
    } else {
        Err(Denied::NotAuthor)
    }
}

/// The shift schedule is for staff only.
pub fn can_view_schedule(session: &SessionSnapshot) -> Result<&User, Denied> {
    require_role(session, STAFF)
}

/// Adding shifts and listing employees.
pub fn can_edit_schedule(session: &SessionSnapshot) -> Result<&User, Denied> {
    require_role(session, SCHEDULERS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AuthState;

    fn signed_in(id: &str, name: &str, role: Role) -> SessionSnapshot {
        SessionSnapshot {
            auth: AuthState::Authenticated {
                user: User::new(id, name, role),
                token: "tok".into(),
            },
            loading: false,
        }
    }

    fn signed_out() -> SessionSnapshot {
        SessionSnapshot {
            auth: AuthState::Unauthenticated,
            loading: false,
        }
    }

    #[test]
    fn signed_out_is_denied_everything() {
        let s = signed_out();
        assert_eq!(require_role(&s, STAFF), Err(Denied::NotAuthenticated));
        assert_eq!(can_vote(&s, &"2".into()), Err(Denied::NotAuthenticated));
        assert_eq!(can_view_schedule(&s).unwrap_err(), Denied::NotAuthenticated);
    }

    #[test]
    fn role_membership_decides() {
        let manager = signed_in("3", "mia", Role::Manager);
        assert!(can_edit_schedule(&manager).is_ok());
        assert!(can_view_schedule(&manager).is_ok());
        assert!(matches!(
            can_manage_users(&manager),
            Err(Denied::InsufficientRole { actual: Role::Manager, .. })
        ));

        let guest = signed_in("4", "gus", Role::Guest);
        assert!(can_view_schedule(&guest).is_err());
        assert!(can_participate(&guest).is_ok());
    }

    #[test]
    fn self_vote_is_denied() {
        let s = signed_in("7", "kim", Role::Worker);
        assert_eq!(can_vote(&s, &"7".into()), Err(Denied::SelfVote));
        assert!(can_vote(&s, &"8".into()).is_ok());
    }

    #[test]
    fn creator_cannot_adjust_own_reputation() {
        let s = signed_in("7", "kim", Role::Creator);
        assert_eq!(can_adjust_reputation(&s, &"7".into()), Err(Denied::SelfVote));
        assert!(can_adjust_reputation(&s, &"8".into()).is_ok());
    }

    #[test]
    fn primary_creator_and_self_cannot_be_deleted() {
        let s = signed_in("1", "root", Role::Creator);
        let primary = User::new("99", "founder", Role::Creator);
        let me = User::new("1", "root", Role::Creator);
        let other = User::new("5", "ann", Role::Worker);

        assert_eq!(can_delete_user(&s, &primary, "founder"), Err(Denied::PrimaryCreator));
        assert_eq!(can_delete_user(&s, &me, "founder"), Err(Denied::SelfDelete));
        assert!(can_delete_user(&s, &other, "founder").is_ok());
    }

    #[test]
    fn moderation_allows_author_or_staff() {
        let guest = signed_in("10", "gus", Role::Guest);
        assert!(can_moderate(&guest, Some(&"10".into()), None).is_ok());
        assert!(can_moderate(&guest, None, Some("gus")).is_ok());
        assert_eq!(
            can_moderate(&guest, Some(&"11".into()), Some("other")),
            Err(Denied::NotAuthor)
        );

        let worker = signed_in("12", "wes", Role::Worker);
        assert!(can_moderate(&worker, Some(&"11".into()), None).is_ok());
    }

    #[test]
    fn role_set_displays_pipe_separated() {
        assert_eq!(RoleSet(SCHEDULERS.to_vec()).to_string(), "manager|creator");
    }
}
