use serde::{Deserialize, Deserializer, Serialize};

use super::null_as_default;
use super::user::{Role, UserId};

/// A drink on the menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drink {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient_rating")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reviews_count: i64,
}

/// Ratings arrive either as numbers or as decimal strings (`"4.50"`).
fn lenient_rating<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// Partial drink edit, `PATCH /api/drinks/:id`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DrinkUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// A review under a drink.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Review {
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rating: u8,
    #[serde(default, alias = "comment")]
    pub content: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body of `POST /api/drinks/:id/reviews`.
#[derive(Debug, Clone, Serialize)]
pub struct NewReview {
    pub rating: u8,
    pub content: String,
}
