use axum::{extract::State, response::IntoResponse};
use validator::Validate;

use crate::{
    auth::gate::{Action, Actor, Resource},
    error::AppError,
    extract::{AppJson, AppPath},
    posts::{CreatePost, NewPost, UpdatePost},
    resolver,
    response::ApiResponse,
    store::DynStore,
    validation,
};

fn not_found() -> AppError {
    AppError::NotFound("Post not found".to_string())
}

/// GET /api/posts
pub async fn list_posts(State(store): State<DynStore>) -> Result<impl IntoResponse, AppError> {
    let posts = store.list_posts().await?;
    let posts = resolver::posts_with_authors(store.as_ref(), posts).await?;

    Ok(ApiResponse::success(posts))
}

/// POST /api/posts
pub async fn create_post(
    State(store): State<DynStore>,
    actor: Actor,
    AppJson(payload): AppJson<CreatePost>,
) -> Result<impl IntoResponse, AppError> {
    actor.authorize(Action::Create, Resource::Post, None)?;
    payload.validate()?;
    validation::profile_exists(store.as_ref(), payload.profile_id, "profile_id").await?;

    let post = store
        .create_post(NewPost {
            profile_id: payload.profile_id,
            content: payload.content,
            image_url: payload.image_url,
        })
        .await?;

    Ok(ApiResponse::success(post).created())
}

/// GET /api/posts/:id
pub async fn get_post(
    State(store): State<DynStore>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let view = resolver::post_view(store.as_ref(), id)
        .await?
        .ok_or_else(not_found)?;

    Ok(ApiResponse::success(view))
}

/// PUT /api/posts/:id
pub async fn update_post(
    State(store): State<DynStore>,
    actor: Actor,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<UpdatePost>,
) -> Result<impl IntoResponse, AppError> {
    actor.authorize(Action::Update, Resource::Post, Some(id))?;
    store.find_post(id).await?.ok_or_else(not_found)?;
    payload.validate()?;

    let post = store
        .update_post(id, payload)
        .await?
        .ok_or_else(not_found)?;

    Ok(ApiResponse::success(post))
}

/// DELETE /api/posts/:id
/// Comments and likes on the post go with it.
pub async fn delete_post(
    State(store): State<DynStore>,
    actor: Actor,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    actor.authorize(Action::Delete, Resource::Post, Some(id))?;

    if !store.delete_post(id).await? {
        return Err(not_found());
    }

    Ok(ApiResponse::ok("Post deleted successfully"))
}
