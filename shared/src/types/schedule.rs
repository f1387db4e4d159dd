use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::user::UserId;

/// Staff member that can be put on a shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// One shift row from `GET /api/schedule`. Times are `HH:MM` or `HH:MM:SS`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Shift {
    pub id: i64,
    pub user_id: UserId,
    pub shift_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub hours: f64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl Shift {
    /// Who works this shift, as far as the row tells.
    pub fn employee(&self) -> Employee {
        Employee {
            id: self.user_id.clone(),
            username: self.username.clone().unwrap_or_else(|| self.user_id.to_string()),
            avatar: self.avatar.clone(),
        }
    }
}

/// Body of `POST /api/schedule`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewShift {
    pub user_id: UserId,
    pub shift_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub hours: f64,
    pub notes: Option<String>,
}
