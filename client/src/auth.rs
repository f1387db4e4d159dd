use shared::types::{AuthGrant, LoginData, RegistrationData, User};
use tracing::info;

use crate::error::ApiResult;
use crate::gateway::ApiClient;

/// Sign-in, sign-up and sign-out against `/api/auth`.
#[derive(Debug, Clone)]
pub struct Auth {
    api: ApiClient,
}

impl Auth {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn login(&self, form: &LoginData) -> ApiResult<User> {
        form.validate()?;

        let grant: AuthGrant = self.api.post_json("/api/auth/login", form).await?.decode()?;
        let user = grant.user.clone();
        self.api.session().login(grant.user, grant.token)?;
        Ok(user)
    }

    /// Create an account. When the backend hands back a token the new user
    /// is signed in straight away; otherwise `None` and they log in next.
    pub async fn register(&self, form: &RegistrationData) -> ApiResult<Option<User>> {
        form.validate()?;

        let payload = self.api.post_json("/api/auth/register", form).await?;
        if !payload.contains("token") {
            info!("Registered {}, no session issued", form.username);
            return Ok(None);
        }

        let grant: AuthGrant = payload.decode()?;
        let user = grant.user.clone();
        self.api.session().login(grant.user, grant.token)?;
        Ok(Some(user))
    }

    pub fn logout(&self) {
        self.api.session().logout();
    }
}
