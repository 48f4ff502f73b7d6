use axum::{extract::State, response::IntoResponse};
use validator::Validate;

use crate::{
    auth::{
        gate::{Action, Actor, Resource},
        utils,
    },
    error::AppError,
    extract::{AppJson, AppPath},
    profiles::{CreateProfile, NewProfile, ProfileChanges, ProfileEnvelope, UpdateProfile},
    resolver,
    response::ApiResponse,
    store::DynStore,
};

fn not_found() -> AppError {
    AppError::NotFound("Profile not found".to_string())
}

fn hash(password: &str) -> Result<String, AppError> {
    utils::hash_password(password).map_err(|e| {
        tracing::error!("Password hashing failed: {:?}", e);
        AppError::InternalServerError
    })
}

/// GET /api/profiles
pub async fn list_profiles(State(store): State<DynStore>) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::success(store.list_profiles().await?))
}

/// POST /api/profiles
pub async fn create_profile(
    State(store): State<DynStore>,
    actor: Actor,
    AppJson(payload): AppJson<CreateProfile>,
) -> Result<impl IntoResponse, AppError> {
    actor.authorize(Action::Create, Resource::Profile, None)?;
    payload.validate()?;

    let profile = store
        .create_profile(NewProfile {
            username: payload.username,
            email: payload.email,
            password_hash: hash(&payload.password)?,
            profile_picture: payload.profile_picture,
        })
        .await?;

    Ok(
        ApiResponse::success_with_message("Profile created successfully", ProfileEnvelope {
            profile,
        })
        .created(),
    )
}

/// GET /api/profiles/:id
pub async fn get_profile(
    State(store): State<DynStore>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let view = resolver::profile_view(store.as_ref(), id)
        .await?
        .ok_or_else(not_found)?;

    Ok(ApiResponse::success(view))
}

/// PUT /api/profiles/:id
/// Only supplied fields change; a new password is re-hashed.
pub async fn update_profile(
    State(store): State<DynStore>,
    actor: Actor,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateProfile>,
) -> Result<impl IntoResponse, AppError> {
    actor.authorize(Action::Update, Resource::Profile, Some(id))?;
    store.find_profile(id).await?.ok_or_else(not_found)?;
    payload.validate()?;

    let password_hash = match payload.password.as_deref() {
        Some(password) => Some(hash(password)?),
        None => None,
    };

    let profile = store
        .update_profile(
            id,
            ProfileChanges {
                username: payload.username,
                email: payload.email,
                password_hash,
                profile_picture: payload.profile_picture,
            },
        )
        .await?
        .ok_or_else(not_found)?;

    Ok(ApiResponse::success_with_message(
        "Profile updated successfully",
        ProfileEnvelope { profile },
    ))
}

/// DELETE /api/profiles/:id
/// Removes the profile's posts, comments, likes and follower edges too.
pub async fn delete_profile(
    State(store): State<DynStore>,
    actor: Actor,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    actor.authorize(Action::Delete, Resource::Profile, Some(id))?;

    if !store.delete_profile(id).await? {
        return Err(not_found());
    }

    Ok(ApiResponse::ok("Profile deleted successfully"))
}

/// GET /api/profiles/:id/posts
pub async fn get_profile_posts(
    State(store): State<DynStore>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    store.find_profile(id).await?.ok_or_else(not_found)?;
    Ok(ApiResponse::success(store.posts_by(id).await?))
}

/// GET /api/profiles/:id/followers
pub async fn get_followers(
    State(store): State<DynStore>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    store.find_profile(id).await?.ok_or_else(not_found)?;
    Ok(ApiResponse::success(store.followers_of(id).await?))
}

/// GET /api/profiles/:id/following
pub async fn get_following(
    State(store): State<DynStore>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    store.find_profile(id).await?.ok_or_else(not_found)?;
    Ok(ApiResponse::success(store.following_of(id).await?))
}
