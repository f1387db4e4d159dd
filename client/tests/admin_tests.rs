mod common;

use std::time::Duration;

use cafe_client::admin::{UndoReport, UserEdit};
use cafe_client::confirm::{AssumeYes, Deletion};
use cafe_client::coordinator::Phase;
use cafe_client::error::ApiError;
use cafe_client::guard::Denied;
use common::{signed_in_app, user_json};
use hyper::Method;
use serde_json::json;
use shared::types::{Role, UserId};

fn table() -> serde_json::Value {
    json!({
        "success": true,
        "users": [
            user_json("1", "root", "creator", 10),
            user_json("7", "kim", "worker", 5),
            user_json("42", "lee", "worker", 3),
            user_json("99", "founder", "creator", 50),
        ]
    })
}

fn id(s: &str) -> UserId {
    UserId::from(s)
}

#[tokio::test(start_paused = true)]
async fn role_change_applies_server_value_and_undo_restores_it() {
    let (app, transport) = signed_in_app("1", "root", Role::Creator);
    let dir = app.user_directory();

    transport.reply(200, table());
    dir.fetch("").await.unwrap();

    transport.reply(200, json!({"success": true, "user": user_json("42", "lee", "manager", 3)}));
    let user = dir.set_role(&id("42"), Role::Manager).await.unwrap();
    assert_eq!(user.role, Role::Manager);

    let req = transport.last();
    assert_eq!(req.method, Method::PATCH);
    assert_eq!(req.path, "/api/admin/users/42/role");
    assert_eq!(req.json(), json!({"role": "manager"}));
    assert_eq!(req.authorization.as_deref(), Some("Bearer tok123"));

    let row = dir.rows().into_iter().find(|u| u.id == id("42")).unwrap();
    assert_eq!(row.role, Role::Manager);

    let pending = dir.pending_undo().unwrap();
    assert_eq!(pending.target, id("42"));
    assert_eq!(pending.previous, UserEdit::Role(Role::Worker));

    tokio::time::sleep(Duration::from_secs(5)).await;
    transport.reply(200, json!({"success": true, "user": user_json("42", "lee", "worker", 3)}));
    assert_eq!(dir.undo().await.unwrap(), UndoReport::Reverted(id("42")));

    let req = transport.last();
    assert_eq!(req.path, "/api/admin/users/42/role");
    assert_eq!(req.json(), json!({"role": "worker"}));

    let row = dir.rows().into_iter().find(|u| u.id == id("42")).unwrap();
    assert_eq!(row.role, Role::Worker);
    assert!(dir.pending_undo().is_none());
}

#[tokio::test(start_paused = true)]
async fn second_mutation_replaces_the_first_undo() {
    let (app, transport) = signed_in_app("1", "root", Role::Creator);
    let dir = app.user_directory();
    transport.reply(200, table());
    dir.fetch("").await.unwrap();

    transport.reply(200, json!({"success": true, "user": user_json("42", "lee", "manager", 3)}));
    dir.set_role(&id("42"), Role::Manager).await.unwrap();

    transport.reply(200, json!({"success": true, "user": user_json("7", "kim", "worker", 6)}));
    dir.adjust_reputation(&id("7"), 1).await.unwrap();

    let pending = dir.pending_undo().unwrap();
    assert_eq!(pending.target, id("7"));
    assert_eq!(pending.previous, UserEdit::Reputation(5));

    transport.reply(200, json!({"success": true, "user": user_json("7", "kim", "worker", 5)}));
    assert_eq!(dir.undo().await.unwrap(), UndoReport::Reverted(id("7")));

    let req = transport.last();
    assert_eq!(req.path, "/api/admin/users/7/reputation");
    assert_eq!(req.json(), json!({"reputation": 5}));

    // The role change on 42 stays.
    let rows = dir.rows();
    assert_eq!(rows.iter().find(|u| u.id == id("42")).unwrap().role, Role::Manager);
    assert_eq!(rows.iter().find(|u| u.id == id("7")).unwrap().reputation, 5);
    assert_eq!(dir.undo().await.unwrap(), UndoReport::Nothing);
}

#[tokio::test(start_paused = true)]
async fn undo_after_window_sends_nothing() {
    let (app, transport) = signed_in_app("1", "root", Role::Creator);
    let dir = app.user_directory();
    transport.reply(200, table());
    dir.fetch("").await.unwrap();

    transport.reply(200, json!({"success": true, "user": user_json("42", "lee", "manager", 3)}));
    dir.set_role(&id("42"), Role::Manager).await.unwrap();
    let sent = transport.count();
    let before = dir.rows();

    tokio::time::sleep(Duration::from_secs(9)).await;
    assert_eq!(dir.phase(), Phase::Expired);
    assert_eq!(dir.undo().await.unwrap(), UndoReport::Nothing);
    assert_eq!(transport.count(), sent);
    assert_eq!(dir.rows(), before);
}

#[tokio::test(start_paused = true)]
async fn failed_undo_falls_back_to_previous_value_locally() {
    let (app, transport) = signed_in_app("1", "root", Role::Creator);
    let dir = app.user_directory();
    transport.reply(200, table());
    dir.fetch("").await.unwrap();

    transport.reply(200, json!({"success": true, "user": user_json("42", "lee", "manager", 3)}));
    dir.set_role(&id("42"), Role::Manager).await.unwrap();

    transport.fail(ApiError::Transport("connection refused".into()));
    assert_eq!(dir.undo().await.unwrap(), UndoReport::RevertedLocally(id("42")));

    let row = dir.rows().into_iter().find(|u| u.id == id("42")).unwrap();
    assert_eq!(row.role, Role::Worker);
}

#[tokio::test]
async fn rejected_mutation_leaves_table_untouched() {
    let (app, transport) = signed_in_app("1", "root", Role::Creator);
    let dir = app.user_directory();
    transport.reply(200, table());
    dir.fetch("").await.unwrap();
    let before = dir.rows();

    transport.reply(400, json!({"success": false, "error": "Invalid role"}));
    let err = dir.set_role(&id("42"), Role::Manager).await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid role");

    transport.reply(200, json!({"success": false}));
    assert!(dir.set_reputation(&id("7"), 100).await.is_err());

    assert_eq!(dir.rows(), before);
    assert!(dir.pending_undo().is_none());
}

#[tokio::test]
async fn creator_cannot_vote_on_self_from_the_table() {
    let (app, transport) = signed_in_app("7", "kim", Role::Creator);
    let dir = app.user_directory();
    transport.reply(200, table());
    dir.fetch("").await.unwrap();
    let sent = transport.count();

    let err = dir.adjust_reputation(&id("7"), 1).await.unwrap_err();
    assert!(matches!(err, ApiError::Denied(Denied::SelfVote)));
    assert_eq!(transport.count(), sent);
    assert_eq!(
        dir.rows().iter().find(|u| u.id == id("7")).unwrap().reputation,
        5
    );
}

#[tokio::test]
async fn primary_creator_and_self_are_never_deleted() {
    let (app, transport) = signed_in_app("1", "root", Role::Creator);
    let dir = app.user_directory();
    transport.reply(200, table());
    dir.fetch("").await.unwrap();
    let sent = transport.count();

    let err = dir.delete_user(&id("99"), &AssumeYes).await.unwrap_err();
    assert!(matches!(err, ApiError::Denied(Denied::PrimaryCreator)));

    let err = dir.delete_user(&id("1"), &AssumeYes).await.unwrap_err();
    assert!(matches!(err, ApiError::Denied(Denied::SelfDelete)));

    assert_eq!(transport.count(), sent);
    assert_eq!(dir.rows().len(), 4);
}

#[tokio::test]
async fn confirmed_delete_removes_the_row() {
    let (app, transport) = signed_in_app("1", "root", Role::Creator);
    let dir = app.user_directory();
    transport.reply(200, table());
    dir.fetch("").await.unwrap();

    let declined = dir.delete_user(&id("42"), &|_: &str| false).await.unwrap();
    assert_eq!(declined, Deletion::Declined);
    assert_eq!(dir.rows().len(), 4);

    transport.reply(200, json!({"success": true}));
    let done = dir.delete_user(&id("42"), &AssumeYes).await.unwrap();
    assert_eq!(done, Deletion::Deleted);
    assert_eq!(transport.last().method, Method::DELETE);
    assert_eq!(transport.last().path, "/api/admin/users/42");
    assert!(dir.rows().iter().all(|u| u.id != id("42")));
}

#[tokio::test]
async fn non_creators_are_refused_before_any_request() {
    let (app, transport) = signed_in_app("3", "mia", Role::Manager);
    let dir = app.user_directory();

    let err = dir.fetch("").await.unwrap_err();
    assert!(matches!(err, ApiError::Denied(Denied::InsufficientRole { .. })));
    assert_eq!(transport.count(), 0);
}

#[tokio::test]
async fn search_is_sent_as_query_and_failure_clears_table() {
    let (app, transport) = signed_in_app("1", "root", Role::Creator);
    let dir = app.user_directory();

    transport.reply(200, table());
    dir.fetch("ki m").await.unwrap();
    assert_eq!(transport.last().path, "/api/admin/users?search=ki+m");

    transport.reply(500, json!({"success": false, "message": "db down"}));
    assert!(dir.fetch("").await.is_err());
    assert!(dir.rows().is_empty());
}

#[tokio::test(start_paused = true)]
async fn fetch_finishing_after_dispose_leaves_table_empty() {
    let (app, transport) = signed_in_app("1", "root", Role::Creator);
    let dir = app.user_directory();
    transport.delay_replies(Duration::from_millis(50));

    transport.reply(200, table());
    let (users, _) = tokio::join!(dir.fetch(""), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        dir.dispose();
    });
    assert_eq!(users.unwrap().len(), 4);
    assert!(dir.rows().is_empty());
}

#[tokio::test(start_paused = true)]
async fn edit_finishing_after_dispose_arms_no_undo() {
    let (app, transport) = signed_in_app("1", "root", Role::Creator);
    let dir = app.user_directory();

    transport.reply(200, table());
    dir.fetch("").await.unwrap();
    transport.delay_replies(Duration::from_millis(50));

    transport.reply(200, json!({"success": true, "user": user_json("42", "lee", "manager", 3)}));
    let lee = id("42");
    let (user, _) = tokio::join!(dir.set_role(&lee, Role::Manager), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        dir.dispose();
    });
    assert_eq!(user.unwrap().role, Role::Manager);

    let row = dir.rows().into_iter().find(|u| u.id == id("42")).unwrap();
    assert_eq!(row.role, Role::Worker);
    assert!(dir.pending_undo().is_none());

    assert_eq!(dir.undo().await.unwrap(), UndoReport::Nothing);
    assert_eq!(transport.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn overlapping_role_changes_undo_only_the_last() {
    let (app, transport) = signed_in_app("1", "root", Role::Creator);
    let dir = app.user_directory();

    transport.reply(200, table());
    dir.fetch("").await.unwrap();
    transport.delay_replies(Duration::from_millis(50));

    transport.reply(200, json!({"success": true, "user": user_json("42", "lee", "manager", 3)}));
    transport.reply(200, json!({"success": true, "user": user_json("42", "lee", "creator", 3)}));
    let lee = id("42");
    let (first, second) = tokio::join!(
        dir.set_role(&lee, Role::Manager),
        dir.set_role(&lee, Role::Creator)
    );
    assert_eq!(first.unwrap().role, Role::Manager);
    assert_eq!(second.unwrap().role, Role::Creator);

    let row = dir.rows().into_iter().find(|u| u.id == id("42")).unwrap();
    assert_eq!(row.role, Role::Creator);
    assert_eq!(dir.pending_undo().unwrap().previous, UserEdit::Role(Role::Manager));

    transport.reply(200, json!({"success": true, "user": user_json("42", "lee", "manager", 3)}));
    assert_eq!(dir.undo().await.unwrap(), UndoReport::Reverted(id("42")));
    assert_eq!(transport.last().json(), json!({"role": "manager"}));

    let row = dir.rows().into_iter().find(|u| u.id == id("42")).unwrap();
    assert_eq!(row.role, Role::Manager);
}

#[tokio::test(start_paused = true)]
async fn quick_double_increment_sends_successive_values() {
    let (app, transport) = signed_in_app("1", "root", Role::Creator);
    let dir = app.user_directory();

    transport.reply(200, table());
    dir.fetch("").await.unwrap();
    transport.delay_replies(Duration::from_millis(50));

    transport.reply(200, json!({"success": true, "user": user_json("7", "kim", "worker", 6)}));
    transport.reply(200, json!({"success": true, "user": user_json("7", "kim", "worker", 7)}));
    let kim = id("7");
    let (first, second) = tokio::join!(
        dir.adjust_reputation(&kim, 1),
        dir.adjust_reputation(&kim, 1)
    );
    assert_eq!(first.unwrap().reputation, 6);
    assert_eq!(second.unwrap().reputation, 7);

    let bodies: Vec<_> = transport.requests()[1..].iter().map(|r| r.json()).collect();
    assert_eq!(bodies, vec![json!({"reputation": 6}), json!({"reputation": 7})]);

    let row = dir.rows().into_iter().find(|u| u.id == id("7")).unwrap();
    assert_eq!(row.reputation, 7);
    assert_eq!(dir.pending_undo().unwrap().previous, UserEdit::Reputation(6));
}
