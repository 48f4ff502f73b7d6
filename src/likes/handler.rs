use axum::{extract::State, response::IntoResponse};

use crate::{
    auth::gate::{Action, Actor, Resource},
    error::AppError,
    extract::AppJson,
    likes::LikeRequest,
    response::ApiResponse,
    store::DynStore,
    validation,
};

/// POST /api/likes
/// 201 with the new like, or 200 with the one that already existed.
pub async fn like_post(
    State(store): State<DynStore>,
    actor: Actor,
    AppJson(payload): AppJson<LikeRequest>,
) -> Result<impl IntoResponse, AppError> {
    actor.authorize(Action::Create, Resource::Like, Some(payload.post_id))?;
    validation::post_exists(store.as_ref(), payload.post_id).await?;
    validation::profile_exists(store.as_ref(), payload.profile_id, "profile_id").await?;

    let (like, created) = store.like(payload.profile_id, payload.post_id).await?;

    Ok(ApiResponse::success(like).created_if(created))
}

/// DELETE /api/likes
pub async fn unlike_post(
    State(store): State<DynStore>,
    actor: Actor,
    AppJson(payload): AppJson<LikeRequest>,
) -> Result<impl IntoResponse, AppError> {
    actor.authorize(Action::Delete, Resource::Like, Some(payload.post_id))?;
    validation::post_exists(store.as_ref(), payload.post_id).await?;
    validation::profile_exists(store.as_ref(), payload.profile_id, "profile_id").await?;

    if !store.unlike(payload.profile_id, payload.post_id).await? {
        return Err(AppError::RelationNotFound("Like not found".to_string()));
    }

    Ok(ApiResponse::ok("Like removed successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        extract::AppPath,
        posts::NewPost,
        profiles::NewProfile,
        test_support::{actor, from_json, memory_store, respond},
    };
    use axum::http::StatusCode;
    use serde_json::json;

    async fn with_post() -> (DynStore, i64, i64) {
        let store = memory_store();
        let profile = store
            .create_profile(NewProfile {
                username: "carol".into(),
                email: "carol@x.com".into(),
                password_hash: "hash".into(),
                profile_picture: None,
            })
            .await
            .unwrap();
        let post = store
            .create_post(NewPost {
                profile_id: profile.id,
                content: "like me".into(),
                image_url: None,
            })
            .await
            .unwrap();
        (store, profile.id, post.id)
    }

    #[tokio::test]
    async fn liking_twice_keeps_one_row() {
        let (store, profile_id, post_id) = with_post().await;
        let body = json!({ "post_id": post_id, "profile_id": profile_id });

        let (status, first) =
            respond(like_post(State(store.clone()), actor(), AppJson(from_json(body.clone()))).await)
                .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, second) =
            respond(like_post(State(store.clone()), actor(), AppJson(from_json(body))).await)
                .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["data"]["id"], second["data"]["id"]);
        assert_eq!(store.count_likes(post_id).await.unwrap(), 1);

        let (_, view) =
            respond(crate::posts::handler::get_post(State(store.clone()), AppPath(post_id)).await)
                .await;
        assert_eq!(view["data"]["likes_count"], 1);
    }

    #[tokio::test]
    async fn unliking_an_absent_pair_is_forbidden_not_ok() {
        let (store, profile_id, post_id) = with_post().await;
        let body = json!({ "post_id": post_id, "profile_id": profile_id });

        let (status, resp) =
            respond(unlike_post(State(store.clone()), actor(), AppJson(from_json(body.clone()))).await)
                .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(resp["message"], "Like not found");

        respond(like_post(State(store.clone()), actor(), AppJson(from_json(body.clone()))).await)
            .await;
        let (status, resp) =
            respond(unlike_post(State(store.clone()), actor(), AppJson(from_json(body))).await)
                .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["message"], "Like removed successfully");
    }

    #[tokio::test]
    async fn unknown_ids_fail_validation() {
        let (store, profile_id, _) = with_post().await;
        let body = json!({ "post_id": 404, "profile_id": profile_id });

        let (status, resp) =
            respond(unlike_post(State(store.clone()), actor(), AppJson(from_json(body))).await)
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["errors"]["post_id"][0], "The selected post_id is invalid.");
    }
}
