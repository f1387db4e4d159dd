//! Drinks and their reviews.

use shared::types::{Drink, DrinkUpdate, NewReview, Review};
use tracing::info;

use crate::confirm::{Confirm, Deletion, delete_confirmed};
use crate::error::{ApiError, ApiResult};
use crate::gateway::{ApiClient, Multipart, Upload};
use crate::guard;
use crate::view::ViewList;

/// Category filter value meaning "everything".
pub const ALL_CATEGORIES: &str = "all";

/// Form for a new drink. `price` is the text as typed.
#[derive(Debug, Clone, Default)]
pub struct NewDrink {
    pub name: String,
    pub description: String,
    pub price: String,
    pub category: String,
    pub image: Option<Upload>,
}

impl NewDrink {
    fn into_form(self) -> ApiResult<Multipart> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ApiError::Validation("Drink name is required".to_string()));
        }

        let mut form = Multipart::new().text("name", name);
        if !self.description.trim().is_empty() {
            form = form.text("description", self.description.trim());
        }
        let price = self.price.trim();
        if !price.is_empty() {
            match price.parse::<f64>() {
                Ok(p) if p.is_finite() && p >= 0.0 => form = form.text("price", price),
                _ => return Err(ApiError::Validation("Price must be a number".to_string())),
            }
        }
        if !self.category.trim().is_empty() {
            form = form.text("category", self.category.trim());
        }
        if let Some(image) = self.image {
            if !image.is_image() {
                return Err(ApiError::Validation("Please choose an image file".to_string()));
            }
            form = form.file("image", image);
        }
        Ok(form)
    }
}

// ---------------------------------------------------------------------------
// Menu
// ---------------------------------------------------------------------------

pub struct Menu {
    api: ApiClient,
    drinks: ViewList<Drink>,
}

impl Menu {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            drinks: ViewList::new("menu"),
        }
    }

    pub fn drinks(&self) -> Vec<Drink> {
        self.drinks.snapshot()
    }

    pub fn dispose(&self) {
        self.drinks.dispose();
    }

    pub async fn load(&self) -> ApiResult<Vec<Drink>> {
        let payload = self.api.get("/api/drinks").await?;
        let drinks: Vec<Drink> = payload.first_of(&["drinks", "data"])?;
        info!("Loaded {} drinks", drinks.len());
        self.drinks.replace(drinks.clone());
        Ok(drinks)
    }

    /// Loaded drinks in `category`, or all of them for [`ALL_CATEGORIES`].
    pub fn by_category(&self, category: &str) -> Vec<Drink> {
        let mut drinks = self.drinks.snapshot();
        if category != ALL_CATEGORIES {
            drinks.retain(|d| d.category.as_deref() == Some(category));
        }
        drinks
    }

    pub async fn get(&self, id: i64) -> ApiResult<Drink> {
        let payload = self.api.get(&format!("/api/drinks/{}", id)).await?;
        let drink = match payload.first_of::<Drink>(&["drink", "data"]) {
            Ok(drink) => drink,
            Err(_) => payload
                .decode::<Drink>()
                .map_err(|_| ApiError::NotFound(format!("drink {}", id)))?,
        };
        Ok(drink)
    }

    /// Add a drink. Returns it when the backend echoes it back.
    pub async fn create(&self, drink: NewDrink) -> ApiResult<Option<Drink>> {
        guard::can_author_content(&self.api.session().snapshot())?;
        let form = drink.into_form()?;

        let payload = self.api.post_multipart("/api/drinks/upload", form).await?;
        let created = match payload.get("drink").or_else(|| payload.get("data")) {
            Some(_) => Some(payload.first_of::<Drink>(&["drink", "data"])?),
            None => None,
        };

        if let Some(d) = &created {
            info!("Created drink {} ({})", d.name, d.id);
            let d = d.clone();
            self.drinks.update(|list| list.push(d));
        }
        Ok(created)
    }

    pub async fn update(&self, id: i64, changes: &DrinkUpdate) -> ApiResult<Drink> {
        guard::can_author_content(&self.api.session().snapshot())?;
        if changes.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ApiError::Validation("Drink name is required".to_string()));
        }

        let payload = self.api.patch_json(&format!("/api/drinks/{}", id), changes).await?;
        let drink: Drink = payload.first_of(&["drink", "data"])?;

        let updated = drink.clone();
        self.drinks.update(|list| {
            if let Some(row) = list.iter_mut().find(|d| d.id == id) {
                *row = updated;
            }
        });
        Ok(drink)
    }

    pub async fn delete<C: Confirm + ?Sized>(&self, id: i64, confirm: &C) -> ApiResult<Deletion> {
        guard::can_author_content(&self.api.session().snapshot())?;
        let drink = self
            .drinks
            .find(|d| d.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("drink {}", id)))?;

        let prompt = format!("Delete \"{}\" from the menu?", drink.name);
        let path = format!("/api/drinks/{}", id);
        let outcome = delete_confirmed(confirm, &prompt, || self.api.delete(&path)).await?;

        if outcome == Deletion::Deleted {
            self.drinks.update(|list| list.retain(|d| d.id != id));
        }
        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------------------

pub struct DrinkReviews {
    api: ApiClient,
    drink_id: i64,
    reviews: ViewList<Review>,
}

impl DrinkReviews {
    pub fn new(api: ApiClient, drink_id: i64) -> Self {
        Self {
            api,
            drink_id,
            reviews: ViewList::new("reviews"),
        }
    }

    pub fn reviews(&self) -> Vec<Review> {
        self.reviews.snapshot()
    }

    pub fn dispose(&self) {
        self.reviews.dispose();
    }

    pub async fn load(&self) -> ApiResult<Vec<Review>> {
        let payload = self.api.get(&self.path()).await?;
        let reviews: Vec<Review> = payload
            .optional::<Vec<Review>>("reviews")?
            .or(payload.optional::<Vec<Review>>("data")?)
            .unwrap_or_default();
        self.reviews.replace(reviews.clone());
        Ok(reviews)
    }

    /// Post a review, then reload so the list shows the server's copy.
    pub async fn add(&self, rating: u8, content: &str) -> ApiResult<Vec<Review>> {
        guard::can_participate(&self.api.session().snapshot())?;
        if !(1..=5).contains(&rating) {
            return Err(ApiError::Validation("Rating must be between 1 and 5".to_string()));
        }
        let content = content.trim();
        if content.is_empty() {
            return Err(ApiError::Validation("Review text is required".to_string()));
        }

        self.api
            .post_json(
                &self.path(),
                &NewReview {
                    rating,
                    content: content.to_string(),
                },
            )
            .await?;
        self.load().await
    }

    pub async fn delete<C: Confirm + ?Sized>(&self, review_id: i64, confirm: &C) -> ApiResult<Deletion> {
        let review = self
            .reviews
            .find(|r| r.id == review_id)
            .ok_or_else(|| ApiError::NotFound(format!("review {}", review_id)))?;
        guard::can_moderate(
            &self.api.session().snapshot(),
            review.user_id.as_ref(),
            review.user_name.as_deref(),
        )?;

        let path = format!("{}/{}", self.path(), review_id);
        let outcome = delete_confirmed(confirm, "Delete this review?", || self.api.delete(&path)).await?;

        if outcome == Deletion::Deleted {
            self.reviews.update(|list| list.retain(|r| r.id != review_id));
        }
        Ok(outcome)
    }

    /// Mean rating to one decimal place, `None` with no reviews.
    pub fn average_rating(&self) -> Option<f64> {
        average_rating(&self.reviews.snapshot())
    }

    fn path(&self) -> String {
        format!("/api/drinks/{}/reviews", self.drink_id)
    }
}

pub fn average_rating(reviews: &[Review]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let sum: f64 = reviews.iter().map(|r| f64::from(r.rating)).sum();
    Some((sum / reviews.len() as f64 * 10.0).round() / 10.0)
}
