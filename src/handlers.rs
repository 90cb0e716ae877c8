use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    models::{
        self, AvailabilityResponse, Category, CreateCategoryRequest, DeleteConfirmation,
        PostPayload, PostResponse, RenameCategoryRequest, SignupRequest, User,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

// --- Filter Structs ---

/// AvailabilityQuery
///
/// Query parameters for the signup pre-check (GET /signup/check-availability).
/// At least one of the two must be provided.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct AvailabilityQuery {
    /// Account name to test for uniqueness.
    pub name: Option<String>,
    /// Email address to test for uniqueness.
    pub email: Option<String>,
}

// --- Public Handlers ---

/// get_posts
///
/// [Public Route] Lists every post, newest first, with its category set
/// eagerly attached so the reader UI never needs a follow-up request.
#[utoipa::path(
    get,
    path = "/posts",
    responses((status = 200, description = "All posts", body = [PostResponse]))
)]
pub async fn get_posts(
    State(state): State<AppState>,
) -> Result<Json<Vec<models::PostResponse>>, ApiError> {
    let posts = state.repo.list_posts().await?;
    Ok(Json(posts))
}

/// get_post_details
///
/// [Public Route] Retrieves a single post by ID, categories included.
#[utoipa::path(
    get,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = PostResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_post_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<models::PostResponse>, ApiError> {
    let post = state.repo.get_post(id).await?;
    Ok(Json(post))
}

/// get_categories
///
/// [Public Route] Lists all categories, newest first. Category reads are
/// public; only mutations sit behind the identity gate.
#[utoipa::path(
    get,
    path = "/categories",
    responses((status = 200, description = "All categories", body = [Category]))
)]
pub async fn get_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<models::Category>>, ApiError> {
    let categories = state.repo.list_categories().await?;
    Ok(Json(categories))
}

/// signup
///
/// [Public Route] Provisions the local user row for an identity the external
/// provider has already created. The payload carries the provider's subject id
/// (`auth_id`); no credential material ever reaches this endpoint.
///
/// *Conflict handling*: duplicate name or email yields 409, backed by the
/// unique constraints on the `users` table; the availability pre-check below
/// is advisory, the constraint is authoritative.
#[utoipa::path(
    post,
    path = "/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Provisioned", body = User),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Name or email taken")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    payload.validate()?;
    let user = state.repo.create_user(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// check_availability
///
/// [Public Route] Signup pre-check: reports whether the given name and/or
/// email are still free. Requires at least one parameter.
#[utoipa::path(
    get,
    path = "/signup/check-availability",
    params(AvailabilityQuery),
    responses(
        (status = 200, description = "Availability", body = AvailabilityResponse),
        (status = 400, description = "No parameter given")
    )
)]
pub async fn check_availability(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    if query.name.is_none() && query.email.is_none() {
        return Err(ApiError::Validation(
            "provide a name and/or an email to check".to_string(),
        ));
    }
    let availability = state
        .repo
        .check_availability(query.name, query.email)
        .await?;
    Ok(Json(availability))
}

// --- Authoring Handlers (identity-gated) ---

/// get_my_posts
///
/// [Authenticated Route] Lists the posts authored by the requesting user,
/// newest first, categories attached.
///
/// *Note*: The user identity (`id`) is resolved securely via the `AuthUser` extractor.
#[utoipa::path(
    get,
    path = "/admin/posts",
    responses((status = 200, description = "My posts", body = [PostResponse]))
)]
pub async fn get_my_posts(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<models::PostResponse>>, ApiError> {
    let posts = state.repo.list_posts_by_author(id).await?;
    Ok(Json(posts))
}

/// create_post
///
/// [Authenticated Route] Submits a new post. Authorship is taken from the
/// resolved identity, never from the payload.
///
/// *Atomicity*: the repository validates every submitted category id and then
/// writes the post row and its association rows in a single transaction, so a
/// bad category id leaves nothing behind.
#[utoipa::path(
    post,
    path = "/admin/posts",
    request_body = PostPayload,
    responses(
        (status = 201, description = "Created", body = PostResponse),
        (status = 400, description = "Validation failure / unknown category")
    )
)]
pub async fn create_post(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<models::PostPayload>,
) -> Result<(StatusCode, Json<models::PostResponse>), ApiError> {
    payload.validate()?;
    let post = state.repo.create_post(id, payload).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// update_post
///
/// [Authenticated Route] Replaces a post's fields and its category set.
/// The association list in the payload is the complete new set: anything
/// not listed is dropped.
#[utoipa::path(
    put,
    path = "/admin/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = PostPayload,
    responses(
        (status = 200, description = "Updated", body = PostResponse),
        (status = 400, description = "Validation failure / unknown category"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_post(
    AuthUser { .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<models::PostPayload>,
) -> Result<Json<models::PostResponse>, ApiError> {
    payload.validate()?;
    let post = state.repo.update_post(id, payload).await?;
    Ok(Json(post))
}

/// delete_post
///
/// [Authenticated Route] Deletes a post. Its association rows disappear with
/// it (FK cascade); the response echoes the removed title.
#[utoipa::path(
    delete,
    path = "/admin/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Deleted", body = DeleteConfirmation),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_post(
    AuthUser { .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteConfirmation>, ApiError> {
    let post = state.repo.delete_post(id).await?;
    Ok(Json(DeleteConfirmation {
        msg: format!("deleted post \"{}\"", post.title),
    }))
}

/// create_category
///
/// [Authenticated Route] Creates a new category.
#[utoipa::path(
    post,
    path = "/admin/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Created", body = Category),
        (status = 400, description = "Invalid name")
    )
)]
pub async fn create_category(
    AuthUser { .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<models::Category>), ApiError> {
    models::validate_category_name(&payload.name)?;
    let category = state.repo.create_category(payload.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// rename_category
///
/// [Authenticated Route] Renames an existing category.
#[utoipa::path(
    put,
    path = "/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = RenameCategoryRequest,
    responses(
        (status = 200, description = "Renamed", body = Category),
        (status = 404, description = "Not Found")
    )
)]
pub async fn rename_category(
    AuthUser { .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RenameCategoryRequest>,
) -> Result<Json<models::Category>, ApiError> {
    models::validate_category_name(&payload.name)?;
    let category = state.repo.rename_category(id, payload.name).await?;
    Ok(Json(category))
}

/// delete_category
///
/// [Authenticated Route] Deletes a category. Every post referencing it loses
/// that tag via the FK cascade on the association table; posts themselves are
/// untouched.
#[utoipa::path(
    delete,
    path = "/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Deleted", body = DeleteConfirmation),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_category(
    AuthUser { .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteConfirmation>, ApiError> {
    let category = state.repo.delete_category(id).await?;
    Ok(Json(DeleteConfirmation {
        msg: format!("deleted category \"{}\"", category.name),
    }))
}
