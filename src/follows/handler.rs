use axum::{extract::State, response::IntoResponse};

use crate::{
    auth::gate::{Action, Actor, Resource},
    error::AppError,
    extract::AppJson,
    follows::FollowRequest,
    response::ApiResponse,
    store::DynStore,
    validation,
};

/// POST /api/followers
/// 201 with the new edge, or 200 with the one that already existed.
pub async fn follow_profile(
    State(store): State<DynStore>,
    actor: Actor,
    AppJson(payload): AppJson<FollowRequest>,
) -> Result<impl IntoResponse, AppError> {
    actor.authorize(Action::Create, Resource::Follower, Some(payload.followed_id))?;
    validation::profile_exists(store.as_ref(), payload.follower_id, "follower_id").await?;
    validation::profile_exists(store.as_ref(), payload.followed_id, "followed_id").await?;

    if payload.follower_id == payload.followed_id {
        return Err(AppError::field(
            "followed_id",
            "different",
            "A profile cannot follow itself.",
        ));
    }

    let (edge, created) = store
        .follow(payload.follower_id, payload.followed_id)
        .await?;

    Ok(ApiResponse::success(edge).created_if(created))
}

/// DELETE /api/followers
pub async fn unfollow_profile(
    State(store): State<DynStore>,
    actor: Actor,
    AppJson(payload): AppJson<FollowRequest>,
) -> Result<impl IntoResponse, AppError> {
    actor.authorize(Action::Delete, Resource::Follower, Some(payload.followed_id))?;
    validation::profile_exists(store.as_ref(), payload.follower_id, "follower_id").await?;
    validation::profile_exists(store.as_ref(), payload.followed_id, "followed_id").await?;

    if !store
        .unfollow(payload.follower_id, payload.followed_id)
        .await?
    {
        return Err(AppError::RelationNotFound(
            "Follow relation not found".to_string(),
        ));
    }

    Ok(ApiResponse::ok("Unfollowed successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        profiles::NewProfile,
        test_support::{actor, from_json, memory_store, respond},
    };
    use axum::http::StatusCode;
    use serde_json::json;

    async fn two_profiles() -> (DynStore, i64, i64) {
        let store = memory_store();
        let mut ids = Vec::new();
        for name in ["dave", "erin"] {
            let profile = store
                .create_profile(NewProfile {
                    username: name.into(),
                    email: format!("{name}@x.com"),
                    password_hash: "hash".into(),
                    profile_picture: None,
                })
                .await
                .unwrap();
            ids.push(profile.id);
        }
        (store, ids[0], ids[1])
    }

    #[tokio::test]
    async fn following_twice_keeps_one_edge() {
        let (store, dave, erin) = two_profiles().await;
        let body = json!({ "follower_id": dave, "followed_id": erin });

        let (status, first) = respond(
            follow_profile(State(store.clone()), actor(), AppJson(from_json(body.clone()))).await,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, second) =
            respond(follow_profile(State(store.clone()), actor(), AppJson(from_json(body))).await)
                .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["data"]["id"], second["data"]["id"]);
        assert_eq!(store.followers_of(erin).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unfollowing_an_absent_edge_is_forbidden() {
        let (store, dave, erin) = two_profiles().await;
        let body = json!({ "follower_id": dave, "followed_id": erin });

        let (status, resp) = respond(
            unfollow_profile(State(store.clone()), actor(), AppJson(from_json(body.clone()))).await,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(resp["message"], "Follow relation not found");

        respond(follow_profile(State(store.clone()), actor(), AppJson(from_json(body.clone()))).await)
            .await;
        let (status, _) =
            respond(unfollow_profile(State(store.clone()), actor(), AppJson(from_json(body))).await)
                .await;
        assert_eq!(status, StatusCode::OK);
        assert!(store.following_of(dave).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn self_follow_and_unknown_profiles_fail_validation() {
        let (store, dave, _) = two_profiles().await;

        let body = json!({ "follower_id": dave, "followed_id": dave });
        let (status, resp) =
            respond(follow_profile(State(store.clone()), actor(), AppJson(from_json(body))).await)
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["errors"]["followed_id"][0], "A profile cannot follow itself.");

        let body = json!({ "follower_id": 404, "followed_id": dave });
        let (status, resp) =
            respond(follow_profile(State(store.clone()), actor(), AppJson(from_json(body))).await)
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["errors"]["follower_id"][0], "The selected follower_id is invalid.");
    }
}
