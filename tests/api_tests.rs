use blog_portal::{
    AppConfig, AppState, create_router,
    models::{Category, PostResponse, User},
    repository::{PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

// End-to-end tests over a real HTTP server and a live Postgres instance.
// They are ignored by default; run with `cargo test -- --ignored` once
// DATABASE_URL points at a database the suite may write to.

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
    pub pool: sqlx::PgPool,
}

async fn spawn_app() -> TestApp {
    dotenv::dotenv().ok();

    let db_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set to run API tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .expect("Failed to connect to Postgres in tests");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations in tests");

    let repo = Arc::new(PostgresRepository::new(pool.clone())) as RepositoryState;
    let config = AppConfig::default();

    let state = AppState { repo, config };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address, pool }
}

/// Registers a fresh author through the public signup endpoint.
async fn signup(app: &TestApp, client: &reqwest::Client) -> User {
    let tag = Uuid::new_v4().simple().to_string();
    let response = client
        .post(format!("{}/signup", app.address))
        .json(&serde_json::json!({
            "email": format!("{}@test.com", &tag[..12]),
            "name": format!("api-{}", &tag[..8]),
            "auth_id": Uuid::new_v4(),
        }))
        .send()
        .await
        .expect("signup request failed");
    assert_eq!(response.status(), 201);
    response.json().await.unwrap()
}

async fn create_category(
    app: &TestApp,
    client: &reqwest::Client,
    user: &User,
    name: &str,
) -> Category {
    let response = client
        .post(format!("{}/admin/categories", app.address))
        .header("x-user-id", user.id.to_string())
        .json(&serde_json::json!({ "name": name }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    response.json().await.unwrap()
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_health_check() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_mutations_require_identity() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // No bearer token and no local bypass header.
    let response = client
        .post(format!("{}/admin/posts", app.address))
        .json(&serde_json::json!({
            "title": "Nope", "content": "No token here", "cover_image_url": "http://a.io/x.png"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].is_string());

    // Public reads still work without identity.
    let response = client
        .get(format!("{}/posts", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_post_lifecycle() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let user = signup(&app, &client).await;

    let tech = create_category(&app, &client, &user, "tech").await;
    let life = create_category(&app, &client, &user, "life").await;

    // Create
    let response = client
        .post(format!("{}/admin/posts", app.address))
        .header("x-user-id", user.id.to_string())
        .json(&serde_json::json!({
            "title": "Hello Axum",
            "content": "First post body",
            "cover_image_url": "http://example.com/cover.png",
            "category_ids": [tech.id, life.id],
        }))
        .send()
        .await
        .expect("post fail");
    assert_eq!(response.status(), 201);
    let created: PostResponse = response.json().await.unwrap();
    assert_eq!(created.title, "Hello Axum");
    assert_eq!(created.author_id, user.id);
    assert_eq!(created.categories.len(), 2);

    // Public detail read
    let response = client
        .get(format!("{}/posts/{}", app.address, created.id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Update replaces the category set wholesale.
    let response = client
        .put(format!("{}/admin/posts/{}", app.address, created.id))
        .header("x-user-id", user.id.to_string())
        .json(&serde_json::json!({
            "title": "Hello Again",
            "content": "Edited post body",
            "cover_image_url": "http://example.com/cover2.png",
            "category_ids": [tech.id],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let updated: PostResponse = response.json().await.unwrap();
    assert_eq!(updated.title, "Hello Again");
    assert_eq!(updated.categories.len(), 1);
    assert_eq!(updated.categories[0].id, tech.id);

    // Unknown category id is rejected and leaves the post untouched.
    let response = client
        .put(format!("{}/admin/posts/{}", app.address, created.id))
        .header("x-user-id", user.id.to_string())
        .json(&serde_json::json!({
            "title": "Hello Again",
            "content": "Edited post body",
            "cover_image_url": "http://example.com/cover2.png",
            "category_ids": [Uuid::new_v4()],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM post_categories WHERE post_id = $1")
            .bind(created.id)
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(count, 1, "failed update must not drop prior associations");

    // Delete, then verify 404.
    let response = client
        .delete(format!("{}/admin/posts/{}", app.address, created.id))
        .header("x-user-id", user.id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let confirmation: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        confirmation["msg"],
        format!("deleted post \"{}\"", "Hello Again")
    );

    let response = client
        .get(format!("{}/posts/{}", app.address, created.id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_rejects_invalid_post_payload() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let user = signup(&app, &client).await;

    // One-character title fails validation before anything is written.
    let response = client
        .post(format!("{}/admin/posts", app.address))
        .header("x-user-id", user.id.to_string())
        .json(&serde_json::json!({
            "title": "x",
            "content": "Valid content",
            "cover_image_url": "http://example.com/c.png",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("title"));
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_signup_conflict_and_availability() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let user = signup(&app, &client).await;

    // Same name again conflicts.
    let response = client
        .post(format!("{}/signup", app.address))
        .json(&serde_json::json!({
            "email": format!("{}@test.com", Uuid::new_v4().simple()),
            "name": user.name,
            "auth_id": Uuid::new_v4(),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    let response = client
        .get(format!(
            "{}/signup/check-availability?email={}",
            app.address, user.email
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["email_available"], false);

    // At least one of name/email must be supplied.
    let response = client
        .get(format!("{}/signup/check-availability", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_category_lifecycle() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let user = signup(&app, &client).await;
    let category = create_category(&app, &client, &user, "drafts").await;

    // Public listing includes it.
    let response = client
        .get(format!("{}/categories", app.address))
        .send()
        .await
        .unwrap();
    let listed: Vec<Category> = response.json().await.unwrap();
    assert!(listed.iter().any(|c| c.id == category.id));

    // Rename
    let response = client
        .put(format!("{}/admin/categories/{}", app.address, category.id))
        .header("x-user-id", user.id.to_string())
        .json(&serde_json::json!({ "name": "published" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let renamed: Category = response.json().await.unwrap();
    assert_eq!(renamed.name, "published");

    // Delete
    let response = client
        .delete(format!("{}/admin/categories/{}", app.address, category.id))
        .header("x-user-id", user.id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let confirmation: serde_json::Value = response.json().await.unwrap();
    assert_eq!(confirmation["msg"], "deleted category \"published\"");

    // Gone from the public listing.
    let response = client
        .get(format!("{}/categories", app.address))
        .send()
        .await
        .unwrap();
    let listed: Vec<Category> = response.json().await.unwrap();
    assert!(listed.iter().all(|c| c.id != category.id));
}
