use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Admin Router Module
///
/// Defines the authoring area: creating, editing and deleting posts and
/// categories. This router is nested under `/admin` and wrapped, once, at
/// the layer above, in the `AuthUser` extractor middleware, so every handler
/// here receives an already-resolved local identity. No handler performs its
/// own token check.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/posts
        // Lists the posts authored by the resolved user, newest first.
        // POST /admin/posts
        // Submits a new post; the category id list is validated against the
        // store and the post + association rows are written in one transaction.
        .route(
            "/posts",
            get(handlers::get_my_posts).post(handlers::create_post),
        )
        // PUT /admin/posts/{id}
        // Full replacement of the post's fields and of its category set.
        // DELETE /admin/posts/{id}
        // Removes the post; association rows follow via the FK cascade.
        .route(
            "/posts/{id}",
            put(handlers::update_post).delete(handlers::delete_post),
        )
        // POST /admin/categories
        .route("/categories", post(handlers::create_category))
        // PUT/DELETE /admin/categories/{id}
        // Renaming and deletion; deleting a category strips it from every
        // post through the association-table cascade.
        .route(
            "/categories/{id}",
            put(handlers::rename_category).delete(handlers::delete_category),
        )
}
