use shared::types::{PublicProfile, UserId, VoteKind, VoteRequest, VoteStatus};
use tracing::{debug, info};

use crate::error::ApiResult;
use crate::gateway::ApiClient;
use crate::guard;

/// Public profiles and peer reputation votes.
#[derive(Debug, Clone)]
pub struct Reputation {
    api: ApiClient,
}

impl Reputation {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn profile(&self, id: &UserId) -> ApiResult<PublicProfile> {
        let payload = self.api.get(&format!("/api/user/{}", id)).await?;
        Ok(payload.field("user")?)
    }

    /// How the signed-in user has voted on `id`. Signed out, this is the
    /// empty status and no request is made.
    pub async fn vote_status(&self, id: &UserId) -> ApiResult<VoteStatus> {
        if !self.api.session().snapshot().is_authenticated() {
            debug!("Skipping vote status for {}, not signed in", id);
            return Ok(VoteStatus::default());
        }

        let payload = self
            .api
            .get(&format!("/api/user/{}/reputation-status", id))
            .await?;
        Ok(payload.decode()?)
    }

    /// Vote on someone else's reputation. Voting the same way twice takes
    /// the vote back; the server's counters are returned as-is.
    pub async fn vote(&self, id: &UserId, kind: VoteKind) -> ApiResult<VoteStatus> {
        guard::can_vote(&self.api.session().snapshot(), id)?;

        let payload = self
            .api
            .post_json(
                &format!("/api/user/{}/reputation", id),
                &VoteRequest { vote_type: kind },
            )
            .await?;
        let status: VoteStatus = payload.decode()?;

        info!("Voted {} on {} (reputation now {:?})", kind, id, status.reputation);
        Ok(status)
    }
}
