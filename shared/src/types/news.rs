use serde::{Deserialize, Serialize};

use super::null_as_default;
use super::user::UserId;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewsPost {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub likes_count: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comments_count: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_has_liked: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Comment {
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub user_name: Option<String>,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body of `POST /api/news/:id/comments`.
#[derive(Debug, Clone, Serialize)]
pub struct NewComment {
    pub content: String,
}

/// Like counters after `POST /api/news/:id/like`. Older backends nest them
/// under `data`; the client looks in both places.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct LikeStatus {
    #[serde(default)]
    pub likes_count: Option<i64>,
    #[serde(default)]
    pub user_has_liked: Option<bool>,
}
