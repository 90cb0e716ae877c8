use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::LazyLock;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;

// Same email shape the signup form enforces client-side; re-checked here so
// the database never sees a malformed address.
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The local identity record in the `users` table. Created exactly once at
/// signup from an externally-verified identity; `auth_id` is the stable
/// subject id issued by the identity provider and is the lookup key used by
/// the `AuthUser` extractor.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    // Subject id from the external auth provider (unique).
    pub auth_id: Uuid,
    pub email: String,
    pub name: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Category
///
/// A named tag from the `categories` table. Independently owned; referenced
/// by zero or many posts through `post_categories`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Post
///
/// A raw post row from the `posts` table, without its category set attached.
/// Used internally by the repository; the wire type is `PostResponse`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub cover_image_url: String,
    // FK to users.id (Owner).
    pub author_id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// PostResponse
///
/// A post enriched with its associated categories (loaded through the
/// `post_categories` join). This is what every post-returning endpoint emits,
/// so clients never have to issue a second request for tags.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub cover_image_url: String,
    pub author_id: Uuid,
    pub categories: Vec<Category>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl PostResponse {
    /// Attaches a category set to a raw row.
    pub fn from_post(post: Post, categories: Vec<Category>) -> Self {
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            cover_image_url: post.cover_image_url,
            author_id: post.author_id,
            categories,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

/// --- Request Payloads (Input Schemas) ---

/// PostPayload
///
/// Input payload for both POST /admin/posts and PUT /admin/posts/{id}.
/// Updates are full replacements: every field, including the category id
/// list, overwrites the stored state (the association set is replaced, not
/// merged).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostPayload {
    pub title: String,
    pub content: String,
    pub cover_image_url: String,
    // Ids of existing categories to associate. Duplicates are deduplicated;
    // an id with no matching category rejects the whole request.
    #[serde(default)]
    pub category_ids: Vec<Uuid>,
}

impl PostPayload {
    /// Boundary validation mirroring the authoring form's rules.
    /// Runs before any identity-gated handler touches the store.
    pub fn validate(&self) -> Result<(), ApiError> {
        let title_len = self.title.chars().count();
        if !(2..=16).contains(&title_len) {
            return Err(ApiError::Validation(
                "title must be between 2 and 16 characters".to_string(),
            ));
        }
        let content_len = self.content.chars().count();
        if !(3..=255).contains(&content_len) {
            return Err(ApiError::Validation(
                "content must be between 3 and 255 characters".to_string(),
            ));
        }
        let url_len = self.cover_image_url.chars().count();
        if !(6..=255).contains(&url_len) {
            return Err(ApiError::Validation(
                "cover_image_url must be between 6 and 255 characters".to_string(),
            ));
        }
        Ok(())
    }
}

/// CreateCategoryRequest
///
/// Input payload for POST /admin/categories.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCategoryRequest {
    pub name: String,
}

/// RenameCategoryRequest
///
/// Input payload for PUT /admin/categories/{id}.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RenameCategoryRequest {
    pub name: String,
}

/// Shared rule for category names (create and rename).
pub fn validate_category_name(name: &str) -> Result<(), ApiError> {
    let len = name.chars().count();
    if !(2..=16).contains(&len) {
        return Err(ApiError::Validation(
            "category name must be between 2 and 16 characters".to_string(),
        ));
    }
    Ok(())
}

/// SignupRequest
///
/// Input payload for POST /signup. The caller has already completed the
/// out-of-band signup with the identity provider; `auth_id` is the subject id
/// that provider returned. No credential material ever reaches this API.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SignupRequest {
    pub email: String,
    pub name: String,
    pub auth_id: Uuid,
}

impl SignupRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if !EMAIL_RE.is_match(&self.email) {
            return Err(ApiError::Validation(
                "email is not a valid address".to_string(),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("name must not be empty".to_string()));
        }
        Ok(())
    }
}

/// --- Output Schemas ---

/// AvailabilityResponse
///
/// Output of the signup pre-check (GET /signup/check-availability).
/// A field the caller did not ask about reports `true`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AvailabilityResponse {
    pub name_available: bool,
    pub email_available: bool,
}

/// DeleteConfirmation
///
/// Output of the delete endpoints, echoing the name/title of what was removed.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DeleteConfirmation {
    pub msg: String,
}
