use shared::types::{User, UserPatch};
use tracing::info;

use crate::confirm::{Confirm, Deletion, delete_confirmed};
use crate::error::{ApiError, ApiResult};
use crate::gateway::{ApiClient, Multipart, Upload};
use crate::guard;

pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// The signed-in user's own profile.
#[derive(Debug, Clone)]
pub struct Profile {
    api: ApiClient,
}

impl Profile {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Replace the avatar. Only images up to 5 MiB are sent.
    pub async fn upload_avatar(&self, upload: Upload) -> ApiResult<User> {
        guard::require_authenticated(&self.api.session().snapshot())?;
        check_avatar(&upload)?;

        let form = Multipart::new().file("avatar", upload);
        let payload = self.api.post_multipart("/api/user/avatar", form).await?;
        let stored: User = payload.field("user")?;

        let user = self.api.session().set_user(&UserPatch::avatar(stored.avatar))?;
        info!("Avatar updated for {}", user.username);
        Ok(user)
    }

    pub async fn delete_avatar<C: Confirm + ?Sized>(&self, confirm: &C) -> ApiResult<Deletion> {
        guard::require_authenticated(&self.api.session().snapshot())?;

        let outcome = delete_confirmed(confirm, "Delete your avatar?", || {
            self.api.delete("/api/user/avatar")
        })
        .await?;

        if outcome == Deletion::Deleted {
            self.api.session().set_user(&UserPatch::avatar(None))?;
        }
        Ok(outcome)
    }
}

fn check_avatar(upload: &Upload) -> ApiResult<()> {
    if !upload.is_image() {
        return Err(ApiError::Validation("Please choose an image file".to_string()));
    }
    if upload.is_empty() {
        return Err(ApiError::Validation("The image file is empty".to_string()));
    }
    if upload.len() > MAX_AVATAR_BYTES {
        return Err(ApiError::Validation("The image must be 5 MB or smaller".to_string()));
    }
    Ok(())
}
