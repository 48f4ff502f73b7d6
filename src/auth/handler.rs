use axum::{extract::State, response::IntoResponse};
use validator::Validate;

use crate::{
    auth::{
        gate::{self, Actor},
        utils, AuthResponse, LoginUser, NewUser, RegisterResponse, RegisterUser, UserResponse,
    },
    config::settings::Settings,
    error::AppError,
    extract::AppJson,
    response::ApiResponse,
    store::DynStore,
};

/// POST /api/register
pub async fn register(
    State(store): State<DynStore>,
    AppJson(payload): AppJson<RegisterUser>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if store.find_user_by_email(&payload.email).await?.is_some() {
        return Err(AppError::field(
            "email",
            "unique",
            "The email has already been taken.",
        ));
    }

    let password_hash = utils::hash_password(&payload.password).map_err(|e| {
        tracing::error!("Password hashing failed: {:?}", e);
        AppError::InternalServerError
    })?;

    let user = store
        .create_user(NewUser {
            name: payload.name,
            email: payload.email,
            password_hash,
        })
        .await?;

    tracing::info!(user_id = user.id, "user registered");

    Ok(ApiResponse::success(RegisterResponse {
        user: UserResponse::from(user),
    })
    .created())
}

/// POST /api/login
pub async fn login(
    State(store): State<DynStore>,
    State(settings): State<Settings>,
    AppJson(payload): AppJson<LoginUser>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = store
        .find_user_by_email(&payload.email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    utils::verify_password(&user.password_hash, &payload.password)
        .map_err(|_| AppError::InvalidCredentials)?;

    let token = gate::issue_token(store.as_ref(), &settings, user.id).await?;

    Ok(ApiResponse::success(AuthResponse {
        token,
        user: UserResponse::from(user),
    }))
}

/// POST /api/logout
/// Revokes every token of the caller, not just the one presented.
pub async fn logout(
    State(store): State<DynStore>,
    actor: Actor,
) -> Result<impl IntoResponse, AppError> {
    let revoked = store.revoke_tokens(actor.user_id).await?;
    tracing::info!(
        user_id = actor.user_id,
        token_id = %actor.token_id,
        revoked,
        "user logged out"
    );

    Ok(ApiResponse::ok("Logged out successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{from_json, memory_store, respond};
    use axum::http::StatusCode;
    use serde_json::json;

    async fn register_as(store: &DynStore, email: &str, password: &str) -> (StatusCode, serde_json::Value) {
        let payload = from_json(json!({
            "name": email.split('@').next().unwrap(),
            "email": email,
            "password": password,
        }));
        respond(register(State(store.clone()), AppJson(payload)).await).await
    }

    async fn login_as(store: &DynStore, email: &str, password: &str) -> (StatusCode, serde_json::Value) {
        let payload = from_json(json!({ "email": email, "password": password }));
        respond(login(State(store.clone()), State(Settings::for_tests()), AppJson(payload)).await).await
    }

    #[tokio::test]
    async fn register_login_logout_revokes_the_token() {
        let store = memory_store();
        let settings = Settings::for_tests();

        let (status, body) = register_as(&store, "a@x.com", "abcdef").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["user"]["email"], "a@x.com");
        assert!(body["data"]["user"].get("password_hash").is_none());

        let (status, body) = login_as(&store, "a@x.com", "abcdef").await;
        assert_eq!(status, StatusCode::OK);
        let token = body["data"]["token"].as_str().unwrap().to_string();

        let actor = gate::authenticate(store.as_ref(), &settings, &token).await.unwrap();
        let (status, body) = respond(logout(State(store.clone()), actor).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Logged out successfully");

        let err = gate::authenticate(store.as_ref(), &settings, &token)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn duplicate_email_fails_validation_and_login_needs_the_right_password() {
        let store = memory_store();
        register_as(&store, "a@x.com", "abcdef").await;

        let (status, body) = register_as(&store, "a@x.com", "other-password").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"]["email"][0], "The email has already been taken.");

        let (status, body) = login_as(&store, "a@x.com", "other-password").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "The provided credentials are incorrect.");

        let (status, _) = login_as(&store, "a@x.com", "abcdef").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn short_passwords_are_rejected() {
        let store = memory_store();
        let (status, body) = register_as(&store, "b@x.com", "abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"]["password"].is_array());
    }

    #[tokio::test]
    async fn blank_and_overlong_names_get_their_own_messages() {
        let store = memory_store();

        let payload = from_json(json!({ "name": "   ", "email": "c@x.com", "password": "abcdef" }));
        let (status, body) = respond(register(State(store.clone()), AppJson(payload)).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"]["name"][0], "The name field is required.");

        let payload = from_json(json!({
            "name": "n".repeat(256),
            "email": "c@x.com",
            "password": "abcdef",
        }));
        let (status, body) = respond(register(State(store.clone()), AppJson(payload)).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["errors"]["name"][0],
            "The name field must not be greater than 255 characters."
        );
    }
}
