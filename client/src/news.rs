//! News posts, likes and comments.

use shared::types::{Comment, LikeStatus, NewComment, NewsPost, Payload};
use tracing::{debug, info};

use crate::confirm::{Confirm, Deletion, delete_confirmed};
use crate::error::{ApiError, ApiResult};
use crate::gateway::{ApiClient, Multipart, Upload};
use crate::guard;
use crate::view::ViewList;

#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub image: Option<Upload>,
}

pub struct NewsFeed {
    api: ApiClient,
    posts: ViewList<NewsPost>,
}

impl NewsFeed {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            posts: ViewList::new("news"),
        }
    }

    pub fn posts(&self) -> Vec<NewsPost> {
        self.posts.snapshot()
    }

    pub fn dispose(&self) {
        self.posts.dispose();
    }

    pub async fn list(&self) -> ApiResult<Vec<NewsPost>> {
        let payload = self.api.get("/api/news").await?;
        let posts: Vec<NewsPost> = payload.first_of(&["news", "posts", "data"])?;
        self.posts.replace(posts.clone());
        Ok(posts)
    }

    pub async fn get(&self, id: i64) -> ApiResult<NewsPost> {
        let payload = self.api.get(&format!("/api/news/{}", id)).await?;
        match payload.first_of::<NewsPost>(&["data", "news"]) {
            Ok(post) => Ok(post),
            Err(_) => payload
                .decode()
                .map_err(|_| ApiError::NotFound(format!("news post {}", id))),
        }
    }

    pub async fn create(&self, post: NewPost) -> ApiResult<Option<NewsPost>> {
        guard::can_author_content(&self.api.session().snapshot())?;

        let title = post.title.trim();
        let content = post.content.trim();
        if title.is_empty() || content.is_empty() {
            return Err(ApiError::Validation("Title and text are required".to_string()));
        }

        let mut form = Multipart::new().text("title", title).text("content", content);
        if let Some(image) = post.image {
            if !image.is_image() {
                return Err(ApiError::Validation("Please choose an image file".to_string()));
            }
            form = form.file("image", image);
        }

        let payload = self.api.post_multipart("/api/news/upload", form).await?;
        let created: Option<NewsPost> = payload
            .optional("news")?
            .or(payload.optional("data")?);

        if let Some(p) = &created {
            info!("Published news post {} ({})", p.title, p.id);
            let p = p.clone();
            self.posts.update(|list| list.insert(0, p));
        }
        Ok(created)
    }

    /// Like or unlike. The counters shown afterwards are the server's, not a
    /// local guess.
    pub async fn toggle_like(&self, id: i64) -> ApiResult<LikeStatus> {
        guard::can_participate(&self.api.session().snapshot())?;

        let payload = self.api.post_empty(&format!("/api/news/{}/like", id)).await?;
        let status = like_status(&payload)?;
        debug!("Post {} likes now {:?}", id, status.likes_count);

        self.posts.update(|list| {
            if let Some(post) = list.iter_mut().find(|p| p.id == id) {
                if let Some(count) = status.likes_count {
                    post.likes_count = count;
                }
                if let Some(liked) = status.user_has_liked {
                    post.user_has_liked = liked;
                }
            }
        });
        Ok(status)
    }
}

/// Counters sit at the top level or inside `data`.
fn like_status(payload: &Payload) -> ApiResult<LikeStatus> {
    let top: LikeStatus = payload.decode()?;
    let nested: LikeStatus = payload.optional("data").ok().flatten().unwrap_or_default();
    Ok(LikeStatus {
        likes_count: top.likes_count.or(nested.likes_count),
        user_has_liked: top.user_has_liked.or(nested.user_has_liked),
    })
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

pub struct CommentThread {
    api: ApiClient,
    post_id: i64,
    comments: ViewList<Comment>,
}

impl CommentThread {
    pub fn new(api: ApiClient, post_id: i64) -> Self {
        Self {
            api,
            post_id,
            comments: ViewList::new("comments"),
        }
    }

    pub fn comments(&self) -> Vec<Comment> {
        self.comments.snapshot()
    }

    pub fn dispose(&self) {
        self.comments.dispose();
    }

    pub async fn load(&self) -> ApiResult<Vec<Comment>> {
        let payload = self.api.get(&self.path()).await?;
        let comments: Vec<Comment> = payload
            .optional::<Vec<Comment>>("comments")?
            .or(payload.optional::<Vec<Comment>>("data")?)
            .unwrap_or_default();
        self.comments.replace(comments.clone());
        Ok(comments)
    }

    pub async fn add(&self, content: &str) -> ApiResult<Vec<Comment>> {
        guard::can_participate(&self.api.session().snapshot())?;
        let content = content.trim();
        if content.is_empty() {
            return Err(ApiError::Validation("Comment text is required".to_string()));
        }

        self.api
            .post_json(
                &self.path(),
                &NewComment {
                    content: content.to_string(),
                },
            )
            .await?;
        self.load().await
    }

    pub async fn delete<C: Confirm + ?Sized>(&self, comment_id: i64, confirm: &C) -> ApiResult<Deletion> {
        let comment = self
            .comments
            .find(|c| c.id == comment_id)
            .ok_or_else(|| ApiError::NotFound(format!("comment {}", comment_id)))?;
        guard::can_moderate(
            &self.api.session().snapshot(),
            comment.user_id.as_ref(),
            comment.user_name.as_deref(),
        )?;

        let path = format!("{}/{}", self.path(), comment_id);
        let outcome = delete_confirmed(confirm, "Delete this comment?", || self.api.delete(&path)).await?;

        if outcome == Deletion::Deleted {
            self.comments.update(|list| list.retain(|c| c.id != comment_id));
        }
        Ok(outcome)
    }

    fn path(&self) -> String {
        format!("/api/news/{}/comments", self.post_id)
    }
}
