use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod auth;
mod comments;
mod config;
mod error;
mod extract;
mod follows;
mod likes;
mod posts;
mod profiles;
mod resolver;
mod response;
mod store;
mod validation;

#[cfg(test)]
mod test_support;

use config::settings::Settings;
use store::{memory::MemoryStore, postgres::PgStore, DynStore};

#[derive(Clone)]
pub struct AppState {
    store: DynStore,
    settings: Settings,
}

impl FromRef<AppState> for DynStore {
    fn from_ref(app_state: &AppState) -> DynStore {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for Settings {
    fn from_ref(app_state: &AppState) -> Settings {
        app_state.settings.clone()
    }
}

fn router(app_state: AppState) -> Router {
    let api = Router::new()
        .route("/register", post(auth::handler::register))
        .route("/login", post(auth::handler::login))
        .route("/logout", post(auth::handler::logout))
        .route(
            "/posts",
            get(posts::handler::list_posts).post(posts::handler::create_post),
        )
        .route(
            "/posts/:id",
            get(posts::handler::get_post)
                .put(posts::handler::update_post)
                .delete(posts::handler::delete_post),
        )
        .route(
            "/comments",
            get(comments::handler::list_comments).post(comments::handler::create_comment),
        )
        .route(
            "/comments/:id",
            get(comments::handler::get_comment)
                .put(comments::handler::update_comment)
                .delete(comments::handler::delete_comment),
        )
        .route(
            "/profiles",
            get(profiles::handler::list_profiles).post(profiles::handler::create_profile),
        )
        .route(
            "/profiles/:id",
            get(profiles::handler::get_profile)
                .put(profiles::handler::update_profile)
                .delete(profiles::handler::delete_profile),
        )
        .route("/profiles/:id/posts", get(profiles::handler::get_profile_posts))
        .route("/profiles/:id/followers", get(profiles::handler::get_followers))
        .route("/profiles/:id/following", get(profiles::handler::get_following))
        .route(
            "/likes",
            post(likes::handler::like_post).delete(likes::handler::unlike_post),
        )
        .route(
            "/followers",
            post(follows::handler::follow_profile).delete(follows::handler::unfollow_profile),
        );

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = Settings::from_env()?;

    let store: DynStore = match &settings.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(settings.db_max_connections)
                .connect(url)
                .await
                .context("failed to connect to the database")?;

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("failed to run migrations")?;

            info!("database connected");
            Arc::new(PgStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let app = router(AppState {
        store,
        settings: settings.clone(),
    });

    info!("Server running on http://localhost:{}", settings.port);

    let listener = tokio::net::TcpListener::bind(settings.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{body_of, memory_store};
    use axum::{
        body::Body,
        http::{
            header::{AUTHORIZATION, CONTENT_TYPE},
            Method, Request, StatusCode,
        },
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        router(AppState {
            store: memory_store(),
            settings: Settings::for_tests(),
        })
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        authorization: Option<String>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }
        let request = match body {
            Some(body) => request
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        body_of(app.clone().oneshot(request).await.unwrap()).await
    }

    fn bearer(token: &str) -> Option<String> {
        Some(format!("Bearer {token}"))
    }

    #[tokio::test]
    async fn mutations_need_a_valid_bearer_token() {
        let app = app();
        let post = json!({ "profile_id": 1, "content": "hi" });

        for authorization in [
            None,
            Some("Token abc".to_string()),
            Some("Bearer".to_string()),
            bearer("not-a-jwt"),
        ] {
            let (status, body) =
                call(&app, Method::POST, "/api/posts", authorization, Some(post.clone())).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(
                body,
                json!({ "success": false, "message": "Unauthenticated.", "data": null })
            );
        }

        let (status, _) = call(&app, Method::GET, "/api/posts", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn logout_revokes_the_token_over_http() {
        let app = app();

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/register",
            None,
            Some(json!({ "name": "ann", "email": "a@x.com", "password": "abcdef" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "abcdef" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["data"]["token"].as_str().unwrap().to_string();

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/profiles",
            bearer(&token),
            Some(json!({ "username": "ann", "email": "ann@x.com", "password": "password1" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let profile_id = body["data"]["profile"]["id"].as_i64().unwrap();

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/posts",
            bearer(&token),
            Some(json!({ "profile_id": profile_id, "content": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let post_id = body["data"]["id"].as_i64().unwrap();

        let (status, body) =
            call(&app, Method::GET, &format!("/api/profiles/{profile_id}/posts"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["id"], post_id);

        let (status, body) = call(
            &app,
            Method::DELETE,
            "/api/likes",
            bearer(&token),
            Some(json!({ "post_id": post_id, "profile_id": profile_id })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Like not found");

        let (status, _) = call(&app, Method::POST, "/api/logout", bearer(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/posts",
            bearer(&token),
            Some(json!({ "profile_id": profile_id, "content": "again" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn bad_ids_and_bodies_use_the_error_envelope() {
        let app = app();

        let (status, body) = call(&app, Method::GET, "/api/posts/abc", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("abc"));

        let (status, body) = call(&app, Method::GET, "/api/posts/77", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Post not found");

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/register",
            None,
            Some(json!({ "name": "ann" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }
}
