// tests/common/mod.rs

#![allow(dead_code)]

use classifieds::{
    bootstrap,
    config::Config,
    routes,
    state::AppState,
};
use serde_json::{Value, json};
use sqlx::{PgPool, postgres::PgPoolOptions};

pub const PASSWORD: &str = "Str0ng!Pass";

pub struct TestApp {
    pub address: String,
    pub pool: PgPool,
    pub config: Config,
    pub client: reqwest::Client,
}

/// A registered user and the token from registration.
pub struct TestUser {
    pub id: i64,
    pub username: String,
    pub token: String,
}

/// Spawns the app on a random port against `DATABASE_URL`.
/// Returns `None` (and the test passes vacuously) when no database is configured.
pub async fn spawn_app() -> Option<TestApp> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping integration test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    bootstrap::seed_categories(&pool)
        .await
        .expect("Failed to seed categories");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        port: 0,
        cors_origins: vec![],
        admin_username: None,
        admin_password: None,
        login_rate_limit: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Some(TestApp {
        address,
        pool,
        config,
        client: reqwest::Client::new(),
    })
}

pub fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..8])
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn register(&self, password: &str) -> TestUser {
        let username = unique_name("u");
        let response = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": password,
                "date_of_birth": "1990-05-17",
                "first_name": "Test",
                "last_name": "User"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201);

        let body: Value = response.json().await.unwrap();
        TestUser {
            id: body["user"]["id"].as_i64().unwrap(),
            username,
            token: body["token"].as_str().unwrap().to_string(),
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap()
    }

    /// Registers a user and grants the moderator role directly in the database.
    pub async fn register_moderator(&self) -> TestUser {
        let user = self.register(PASSWORD).await;
        sqlx::query("UPDATE users SET is_moderator = TRUE WHERE id = $1")
            .bind(user.id)
            .execute(&self.pool)
            .await
            .unwrap();
        user
    }

    /// Registers a user and grants the admin role directly in the database.
    pub async fn register_admin(&self) -> TestUser {
        let user = self.register(PASSWORD).await;
        sqlx::query("UPDATE users SET is_admin = TRUE WHERE id = $1")
            .bind(user.id)
            .execute(&self.pool)
            .await
            .unwrap();
        user
    }

    /// A fresh category, so listing assertions are not disturbed by other tests.
    pub async fn create_category(&self) -> (i64, String) {
        let slug = unique_name("t");
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO categories (name, slug, type) VALUES ($1, $1, 'wts') RETURNING id",
        )
        .bind(&slug)
        .fetch_one(&self.pool)
        .await
        .unwrap();
        (id, slug)
    }

    pub async fn create_post(&self, token: &str, category_id: i64, title: &str) -> Value {
        let response = self
            .client
            .post(self.url("/api/posts"))
            .bearer_auth(token)
            .json(&json!({
                "title": title,
                "content": "Lightly used, <b>great</b> condition",
                "category_id": category_id,
                "price": 450,
                "location": "Sacramento"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.unwrap()
    }
}
