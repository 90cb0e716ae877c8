use crate::error::ApiError;
use crate::models::{
    AvailabilityResponse, Category, Post, PostPayload, PostResponse, SignupRequest, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations. This is the core
/// of the Repository Abstraction pattern, allowing the handlers to interact with
/// the data layer without knowing the specific implementation (Postgres, Mock, etc.).
///
/// **Send + Sync + async_trait** are required to make the trait object (`Arc<dyn Repository>`)
/// safely shareable and usable across Axum's asynchronous task boundaries.
///
/// Every method may block on a database round-trip and surfaces failures as
/// `ApiError`; validation-class errors are raised before any row is mutated.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Identity ---
    // Lookup by local primary key (used by the Env::Local auth bypass).
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, ApiError>;
    // Lookup by the external provider's subject id (the token's `sub` claim).
    async fn get_user_by_auth_id(&self, auth_id: Uuid) -> Result<Option<User>, ApiError>;
    // Provisions the local row for an externally-verified identity.
    // Duplicate name/email surfaces as `Conflict`.
    async fn create_user(&self, req: SignupRequest) -> Result<User, ApiError>;
    // Signup pre-check: are this name and/or email still free?
    async fn check_availability(
        &self,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<AvailabilityResponse, ApiError>;

    // --- Categories ---
    async fn list_categories(&self) -> Result<Vec<Category>, ApiError>;
    async fn create_category(&self, name: String) -> Result<Category, ApiError>;
    async fn rename_category(&self, id: Uuid, name: String) -> Result<Category, ApiError>;
    // Returns the deleted row so the handler can echo its name.
    // Association rows are removed by the FK cascade.
    async fn delete_category(&self, id: Uuid) -> Result<Category, ApiError>;

    // --- Posts ---
    // Newest first, with category sets eagerly attached.
    async fn list_posts(&self) -> Result<Vec<PostResponse>, ApiError>;
    async fn list_posts_by_author(&self, author_id: Uuid) -> Result<Vec<PostResponse>, ApiError>;
    async fn get_post(&self, id: Uuid) -> Result<PostResponse, ApiError>;
    // Post insert + category association in one transaction. The category id
    // list is validated before anything is written.
    async fn create_post(
        &self,
        author_id: Uuid,
        payload: PostPayload,
    ) -> Result<PostResponse, ApiError>;
    // Full replacement of the post fields and of its association set, again
    // as a single transaction.
    async fn update_post(&self, id: Uuid, payload: PostPayload) -> Result<PostResponse, ApiError>;
    async fn delete_post(&self, id: Uuid) -> Result<Post, ApiError>;

    // --- Association Manager ---
    // Replaces the post's category set with exactly the given ids.
    // No-op on failure: an unknown id aborts before the delete+insert runs.
    async fn set_post_categories(
        &self,
        post_id: Uuid,
        category_ids: Vec<Uuid>,
    ) -> Result<(), ApiError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the PostgreSQL database.
pub struct PostgresRepository {
    pool: PgPool,
}

const POST_COLUMNS: &str = "id, title, content, cover_image_url, author_id, created_at, updated_at";
const CATEGORY_COLUMNS: &str = "id, name, created_at, updated_at";

/// Join row used when bulk-loading the category sets of several posts.
#[derive(sqlx::FromRow)]
struct PostCategoryRow {
    post_id: Uuid,
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Sorts and deduplicates a submitted category id list. Association identity
/// is the (post_id, category_id) pair, so duplicates in the input must not
/// become duplicate rows, and the existence check in `require_categories`
/// must count distinct ids.
fn distinct_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut distinct = ids.to_vec();
    distinct.sort();
    distinct.dedup();
    distinct
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads the categories matching `ids` inside the given transaction and
    /// enforces the validate-before-write policy: if any id has no matching
    /// row, the whole operation is rejected with `UnknownCategory` before a
    /// single mutation has run. `ids` must already be deduplicated.
    async fn require_categories(
        tx: &mut Transaction<'_, Postgres>,
        ids: &[Uuid],
    ) -> Result<Vec<Category>, ApiError> {
        let query = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ANY($1) ORDER BY created_at DESC"
        );
        let categories = sqlx::query_as::<_, Category>(&query)
            .bind(ids.to_vec())
            .fetch_all(&mut **tx)
            .await?;

        if categories.len() != ids.len() {
            return Err(ApiError::UnknownCategory);
        }
        Ok(categories)
    }

    /// Inserts one association row per id for `post_id`. Runs inside the
    /// caller's transaction so readers never observe a partially-written set.
    async fn insert_associations(
        tx: &mut Transaction<'_, Postgres>,
        post_id: Uuid,
        ids: &[Uuid],
    ) -> Result<(), ApiError> {
        if ids.is_empty() {
            return Ok(());
        }
        sqlx::query(
            "INSERT INTO post_categories (post_id, category_id) SELECT $1, unnest($2::uuid[])",
        )
        .bind(post_id)
        .bind(ids.to_vec())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Replaces the association set of `post_id` with exactly `ids`:
    /// delete the old rows, insert the new ones, both inside the caller's
    /// transaction. Update and set-categories share this path so the
    /// replace semantics cannot drift between them.
    async fn replace_associations(
        tx: &mut Transaction<'_, Postgres>,
        post_id: Uuid,
        ids: &[Uuid],
    ) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM post_categories WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut **tx)
            .await?;
        Self::insert_associations(tx, post_id, ids).await
    }

    /// Bulk-attaches category sets to raw post rows, preserving the order of
    /// `posts`. One query regardless of how many posts are being decorated.
    async fn attach_categories(&self, posts: Vec<Post>) -> Result<Vec<PostResponse>, ApiError> {
        if posts.is_empty() {
            return Ok(vec![]);
        }

        let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let rows = sqlx::query_as::<_, PostCategoryRow>(
            "SELECT pc.post_id, c.id, c.name, c.created_at, c.updated_at
             FROM post_categories pc
             JOIN categories c ON c.id = pc.category_id
             WHERE pc.post_id = ANY($1)
             ORDER BY c.created_at DESC",
        )
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_post: HashMap<Uuid, Vec<Category>> = HashMap::new();
        for row in rows {
            by_post.entry(row.post_id).or_default().push(Category {
                id: row.id,
                name: row.name,
                created_at: row.created_at,
                updated_at: row.updated_at,
            });
        }

        Ok(posts
            .into_iter()
            .map(|post| {
                let categories = by_post.remove(&post.id).unwrap_or_default();
                PostResponse::from_post(post, categories)
            })
            .collect())
    }
}

/// Maps an insert failure to `Conflict` when a uniqueness rule was violated
/// (duplicate name/email), passing every other database error through.
fn map_unique_violation(e: sqlx::Error, message: &str) -> ApiError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::Conflict(message.to_string())
        }
        _ => ApiError::Store(e),
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, auth_id, email, name, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user_by_auth_id(&self, auth_id: Uuid) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, auth_id, email, name, created_at, updated_at FROM users WHERE auth_id = $1",
        )
        .bind(auth_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, req: SignupRequest) -> Result<User, ApiError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (auth_id, email, name)
             VALUES ($1, $2, $3)
             RETURNING id, auth_id, email, name, created_at, updated_at",
        )
        .bind(req.auth_id)
        .bind(req.email)
        .bind(req.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "name or email is already registered"))
    }

    async fn check_availability(
        &self,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<AvailabilityResponse, ApiError> {
        // A field the caller did not ask about counts as available.
        let name_taken = match name {
            Some(n) => {
                sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE name = $1)")
                    .bind(n)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => false,
        };
        let email_taken = match email {
            Some(e) => {
                sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                    .bind(e)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => false,
        };

        Ok(AvailabilityResponse {
            name_available: !name_taken,
            email_available: !email_taken,
        })
    }

    async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        let query = format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY created_at DESC");
        let categories = sqlx::query_as::<_, Category>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    async fn create_category(&self, name: String) -> Result<Category, ApiError> {
        let query =
            format!("INSERT INTO categories (name) VALUES ($1) RETURNING {CATEGORY_COLUMNS}");
        let category = sqlx::query_as::<_, Category>(&query)
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(category)
    }

    async fn rename_category(&self, id: Uuid, name: String) -> Result<Category, ApiError> {
        let query = format!(
            "UPDATE categories SET name = $2, updated_at = now()
             WHERE id = $1 RETURNING {CATEGORY_COLUMNS}"
        );
        sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ApiError::NotFound("category"))
    }

    async fn delete_category(&self, id: Uuid) -> Result<Category, ApiError> {
        // The ON DELETE CASCADE on post_categories.category_id removes every
        // association row referencing this category in the same statement.
        let query = format!("DELETE FROM categories WHERE id = $1 RETURNING {CATEGORY_COLUMNS}");
        sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ApiError::NotFound("category"))
    }

    async fn list_posts(&self) -> Result<Vec<PostResponse>, ApiError> {
        let query = format!("SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC");
        let posts = sqlx::query_as::<_, Post>(&query)
            .fetch_all(&self.pool)
            .await?;
        self.attach_categories(posts).await
    }

    async fn list_posts_by_author(&self, author_id: Uuid) -> Result<Vec<PostResponse>, ApiError> {
        let query =
            format!("SELECT {POST_COLUMNS} FROM posts WHERE author_id = $1 ORDER BY created_at DESC");
        let posts = sqlx::query_as::<_, Post>(&query)
            .bind(author_id)
            .fetch_all(&self.pool)
            .await?;
        self.attach_categories(posts).await
    }

    async fn get_post(&self, id: Uuid) -> Result<PostResponse, ApiError> {
        let query = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        let post = sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ApiError::NotFound("post"))?;

        let mut with_categories = self.attach_categories(vec![post]).await?;
        // attach_categories returns exactly one element for one input post.
        Ok(with_categories.remove(0))
    }

    async fn create_post(
        &self,
        author_id: Uuid,
        payload: PostPayload,
    ) -> Result<PostResponse, ApiError> {
        let mut tx = self.pool.begin().await?;

        // Validate-before-write: no post row is created if any category id is unknown.
        let ids = distinct_ids(&payload.category_ids);
        let categories = Self::require_categories(&mut tx, &ids).await?;

        let query = format!(
            "INSERT INTO posts (title, content, cover_image_url, author_id)
             VALUES ($1, $2, $3, $4) RETURNING {POST_COLUMNS}"
        );
        let post = sqlx::query_as::<_, Post>(&query)
            .bind(payload.title)
            .bind(payload.content)
            .bind(payload.cover_image_url)
            .bind(author_id)
            .fetch_one(&mut *tx)
            .await?;

        // Creation has no prior associations, so this is insert-only.
        Self::insert_associations(&mut tx, post.id, &ids).await?;
        tx.commit().await?;

        Ok(PostResponse::from_post(post, categories))
    }

    async fn update_post(&self, id: Uuid, payload: PostPayload) -> Result<PostResponse, ApiError> {
        let mut tx = self.pool.begin().await?;

        let ids = distinct_ids(&payload.category_ids);
        let categories = Self::require_categories(&mut tx, &ids).await?;

        let query = format!(
            "UPDATE posts SET title = $2, content = $3, cover_image_url = $4, updated_at = now()
             WHERE id = $1 RETURNING {POST_COLUMNS}"
        );
        let post = sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .bind(payload.title)
            .bind(payload.content)
            .bind(payload.cover_image_url)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ApiError::NotFound("post"))?;

        // Replace, not merge. Delete and insert run in this transaction, so
        // a concurrent reader sees either the full old set or the full new
        // set, never the empty window in between.
        Self::replace_associations(&mut tx, id, &ids).await?;
        tx.commit().await?;

        Ok(PostResponse::from_post(post, categories))
    }

    async fn delete_post(&self, id: Uuid) -> Result<Post, ApiError> {
        // Association rows go with the post via the FK cascade.
        let query = format!("DELETE FROM posts WHERE id = $1 RETURNING {POST_COLUMNS}");
        sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ApiError::NotFound("post"))
    }

    async fn set_post_categories(
        &self,
        post_id: Uuid,
        category_ids: Vec<Uuid>,
    ) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await?;

        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
                .bind(post_id)
                .fetch_one(&mut *tx)
                .await?;
        if !exists {
            return Err(ApiError::NotFound("post"));
        }

        let ids = distinct_ids(&category_ids);
        Self::require_categories(&mut tx, &ids).await?;

        Self::replace_associations(&mut tx, post_id, &ids).await?;
        tx.commit().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::distinct_ids;
    use uuid::Uuid;

    #[test]
    fn distinct_ids_removes_duplicates() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let ids = distinct_ids(&[a, b, a, a, b]);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&a));
        assert!(ids.contains(&b));
    }

    #[test]
    fn distinct_ids_keeps_empty_input_empty() {
        assert!(distinct_ids(&[]).is_empty());
    }
}
