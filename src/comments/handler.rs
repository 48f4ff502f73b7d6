use axum::{extract::State, response::IntoResponse};
use validator::Validate;

use crate::{
    auth::gate::{Action, Actor, Resource},
    comments::{CreateComment, NewComment, UpdateComment},
    error::AppError,
    extract::{AppJson, AppPath},
    resolver,
    response::ApiResponse,
    store::DynStore,
    validation,
};

fn not_found() -> AppError {
    AppError::NotFound("Comment not found".to_string())
}

/// GET /api/comments
pub async fn list_comments(State(store): State<DynStore>) -> Result<impl IntoResponse, AppError> {
    let comments = store.list_comments().await?;
    let views = resolver::comment_views(store.as_ref(), comments).await?;

    Ok(ApiResponse::success(views))
}

/// POST /api/comments
pub async fn create_comment(
    State(store): State<DynStore>,
    actor: Actor,
    AppJson(payload): AppJson<CreateComment>,
) -> Result<impl IntoResponse, AppError> {
    actor.authorize(Action::Create, Resource::Comment, None)?;
    payload.validate()?;
    validation::profile_exists(store.as_ref(), payload.profile_id, "profile_id").await?;
    validation::post_exists(store.as_ref(), payload.post_id).await?;

    let comment = store
        .create_comment(NewComment {
            post_id: payload.post_id,
            profile_id: payload.profile_id,
            content: payload.content,
        })
        .await?;

    Ok(ApiResponse::success(comment).created())
}

/// GET /api/comments/:id
pub async fn get_comment(
    State(store): State<DynStore>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let view = resolver::comment_view(store.as_ref(), id)
        .await?
        .ok_or_else(not_found)?;

    Ok(ApiResponse::success(view))
}

/// PUT /api/comments/:id
pub async fn update_comment(
    State(store): State<DynStore>,
    actor: Actor,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateComment>,
) -> Result<impl IntoResponse, AppError> {
    actor.authorize(Action::Update, Resource::Comment, Some(id))?;
    store.find_comment(id).await?.ok_or_else(not_found)?;
    payload.validate()?;

    let comment = store
        .update_comment(id, payload.content)
        .await?
        .ok_or_else(not_found)?;

    Ok(ApiResponse::success(comment))
}

/// DELETE /api/comments/:id
pub async fn delete_comment(
    State(store): State<DynStore>,
    actor: Actor,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    actor.authorize(Action::Delete, Resource::Comment, Some(id))?;

    if !store.delete_comment(id).await? {
        return Err(not_found());
    }

    Ok(ApiResponse::ok("Comment deleted"))
}
