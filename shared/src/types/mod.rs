pub mod admin;
pub mod auth;
pub mod client_config;
pub mod envelope;
pub mod menu;
pub mod news;
pub mod reputation;
pub mod schedule;
pub mod user;

pub use self::admin::{ReputationChange, RoleChange};
pub use self::auth::{AuthFormError, AuthGrant, LoginData, RegistrationData};
pub use self::client_config::{AdminConfig, ApiConfig, AppConfig, ConfigError, StorageConfig};
pub use self::envelope::{Envelope, ErrorResponse, Payload, PayloadError};
pub use self::menu::{Drink, DrinkUpdate, NewReview, Review};
pub use self::news::{Comment, LikeStatus, NewComment, NewsPost};
pub use self::reputation::{PublicProfile, VoteKind, VoteRequest, VoteStatus};
pub use self::schedule::{Employee, NewShift, Shift};
pub use self::user::{Role, UnknownRole, User, UserId, UserPatch};

use serde::{Deserialize, Deserializer};

/// Read `null` as the type's default. The backend sends `null` for unset
/// counters and flags.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
