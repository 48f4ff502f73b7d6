//! Access gate: bearer token -> `Actor`, plus the per-mutation permission check.
//!
//! A handler that takes an `Actor` argument can only run for an authenticated
//! caller, so "anonymous" vs "authenticated-as-user-X" is decided by the
//! extractor before the handler body runs.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    RequestPartsExt,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use uuid::Uuid;

use crate::{
    auth::{jwt, AccessToken},
    config::settings::Settings,
    error::AppError,
    store::{DynStore, Store},
};

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub token_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Profile,
    Post,
    Comment,
    Like,
    Follower,
}

impl Actor {
    /// Decide whether this actor may apply `action` to `resource`.
    ///
    /// Ownership is not compared: users and profiles are unlinked, so every
    /// authenticated actor is granted. This is the single place an owner
    /// check belongs once profiles carry an owning user.
    pub fn authorize(
        &self,
        action: Action,
        resource: Resource,
        target: Option<i64>,
    ) -> Result<(), AppError> {
        tracing::debug!(
            user_id = self.user_id,
            ?action,
            ?resource,
            ?target,
            "mutation granted"
        );
        Ok(())
    }
}

/// Sign a token for `user_id` and record it so it can later be revoked.
pub async fn issue_token(
    store: &dyn Store,
    settings: &Settings,
    user_id: i64,
) -> Result<String, AppError> {
    let (token, claims) =
        jwt::create_token(user_id, &settings.jwt_secret, settings.token_ttl_minutes).map_err(
            |e| {
                tracing::error!("Failed to sign token: {:?}", e);
                AppError::InternalServerError
            },
        )?;

    store
        .record_token(AccessToken {
            id: claims.jti,
            user_id,
            created_at: claims.issued_at(),
            expires_at: claims.expires_at(),
        })
        .await?;

    Ok(token)
}

/// Resolve a raw bearer token to an `Actor`. Fails for bad signatures,
/// expired tokens and tokens revoked by logout.
pub async fn authenticate(
    store: &dyn Store,
    settings: &Settings,
    token: &str,
) -> Result<Actor, AppError> {
    let claims = jwt::decode_token(token, &settings.jwt_secret).map_err(|e| {
        tracing::debug!("Rejected bearer token: {}", e);
        AppError::Unauthorized
    })?;

    match store.token_owner(claims.jti).await? {
        Some(user_id) if user_id == claims.sub => Ok(Actor {
            user_id,
            token_id: claims.jti,
        }),
        _ => Err(AppError::Unauthorized),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
    Settings: FromRef<S>,
    DynStore: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Unauthorized)?;

        let settings = Settings::from_ref(state);
        let store = DynStore::from_ref(state);

        authenticate(store.as_ref(), &settings, bearer.token()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::NewUser, store::memory::MemoryStore};

    async fn seeded() -> (MemoryStore, Settings, i64) {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                name: "alice".into(),
                email: "a@x.com".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap();
        (store, Settings::for_tests(), user.id)
    }

    #[tokio::test]
    async fn issued_tokens_authenticate_until_revoked() {
        let (store, settings, user_id) = seeded().await;
        let token = issue_token(&store, &settings, user_id).await.unwrap();

        let actor = authenticate(&store, &settings, &token).await.unwrap();
        assert_eq!(actor.user_id, user_id);

        assert_eq!(store.revoke_tokens(user_id).await.unwrap(), 1);
        let err = authenticate(&store, &settings, &token).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn unrecorded_or_forged_tokens_are_rejected() {
        let (store, settings, user_id) = seeded().await;

        let (unrecorded, _) = jwt::create_token(user_id, &settings.jwt_secret, 60).unwrap();
        assert!(matches!(
            authenticate(&store, &settings, &unrecorded).await,
            Err(AppError::Unauthorized)
        ));

        assert!(matches!(
            authenticate(&store, &settings, "garbage").await,
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn authenticated_actors_are_granted_every_mutation() {
        let actor = Actor {
            user_id: 1,
            token_id: Uuid::new_v4(),
        };
        for action in [Action::Create, Action::Update, Action::Delete] {
            assert!(actor.authorize(action, Resource::Post, Some(42)).is_ok());
        }
    }
}
