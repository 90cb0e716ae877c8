use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any client
/// (anonymous or logged-in). These routes handle the read-only blog surface
/// and the signup flow that provisions a local user for an identity the
/// external provider has already verified.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load balancer checks.
        // Returns "ok" immediately to verify the service is running and responsive.
        .route("/health", get(|| async { "ok" }))
        // POST /signup
        // Creates the local user row from an externally-verified identity
        // (email, name, provider subject id). 409 on duplicate name/email.
        .route("/signup", post(handlers::signup))
        // GET /signup/check-availability?name=...&email=...
        // Advisory pre-check used by the signup form before it contacts the
        // identity provider.
        .route(
            "/signup/check-availability",
            get(handlers::check_availability),
        )
        // GET /posts
        // Lists every post, newest first, categories eagerly attached.
        .route("/posts", get(handlers::get_posts))
        // GET /posts/{id}
        // Retrieves the detailed view of a single post.
        .route("/posts/{id}", get(handlers::get_post_details))
        // GET /categories
        // Lists all categories, newest first. Reads are public; mutations
        // live under /admin behind the identity gate.
        .route("/categories", get(handlers::get_categories))
}
