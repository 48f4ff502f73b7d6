//! Entity store: persisted profiles, posts, comments, likes, follower edges
//! and the auth records behind them.
//!
//! Handlers only see the `Store` trait. `PgStore` is the production backend;
//! `MemoryStore` serves local runs without a database and the test suite.
//! Both enforce uniqueness and cascade deletes themselves, so handlers never
//! have to.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    auth::{AccessToken, NewUser, User},
    comments::{Comment, NewComment},
    follows::Follower,
    likes::Like,
    posts::{NewPost, Post, UpdatePost},
    profiles::{NewProfile, Profile, ProfileChanges, ProfileCounts},
};

mod error;
pub mod memory;
pub mod postgres;

pub use error::StoreError;

pub type DynStore = Arc<dyn Store>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn record_token(&self, token: AccessToken) -> Result<(), StoreError>;
    /// Owner of an unexpired, unrevoked token.
    async fn token_owner(&self, token_id: Uuid) -> Result<Option<i64>, StoreError>;
    /// Deletes every token of the user, returning how many were removed.
    async fn revoke_tokens(&self, user_id: i64) -> Result<u64, StoreError>;

    async fn list_profiles(&self) -> Result<Vec<Profile>, StoreError>;
    async fn find_profile(&self, id: i64) -> Result<Option<Profile>, StoreError>;
    async fn find_profiles(&self, ids: &[i64]) -> Result<Vec<Profile>, StoreError>;
    async fn create_profile(&self, profile: NewProfile) -> Result<Profile, StoreError>;
    async fn update_profile(
        &self,
        id: i64,
        changes: ProfileChanges,
    ) -> Result<Option<Profile>, StoreError>;
    /// Cascades to the profile's posts, comments, likes and follower edges.
    async fn delete_profile(&self, id: i64) -> Result<bool, StoreError>;
    async fn profile_counts(&self, id: i64) -> Result<ProfileCounts, StoreError>;
    async fn followers_of(&self, id: i64) -> Result<Vec<Profile>, StoreError>;
    async fn following_of(&self, id: i64) -> Result<Vec<Profile>, StoreError>;

    async fn list_posts(&self) -> Result<Vec<Post>, StoreError>;
    async fn posts_by(&self, profile_id: i64) -> Result<Vec<Post>, StoreError>;
    async fn find_post(&self, id: i64) -> Result<Option<Post>, StoreError>;
    async fn find_posts(&self, ids: &[i64]) -> Result<Vec<Post>, StoreError>;
    async fn create_post(&self, post: NewPost) -> Result<Post, StoreError>;
    async fn update_post(&self, id: i64, changes: UpdatePost) -> Result<Option<Post>, StoreError>;
    /// Cascades to the post's comments and likes.
    async fn delete_post(&self, id: i64) -> Result<bool, StoreError>;
    async fn count_likes(&self, post_id: i64) -> Result<i64, StoreError>;

    async fn list_comments(&self) -> Result<Vec<Comment>, StoreError>;
    async fn comments_on(&self, post_id: i64) -> Result<Vec<Comment>, StoreError>;
    async fn find_comment(&self, id: i64) -> Result<Option<Comment>, StoreError>;
    async fn create_comment(&self, comment: NewComment) -> Result<Comment, StoreError>;
    async fn update_comment(&self, id: i64, content: String)
        -> Result<Option<Comment>, StoreError>;
    async fn delete_comment(&self, id: i64) -> Result<bool, StoreError>;

    /// First-or-create. The flag is true when this call inserted the row.
    async fn like(&self, profile_id: i64, post_id: i64) -> Result<(Like, bool), StoreError>;
    async fn unlike(&self, profile_id: i64, post_id: i64) -> Result<bool, StoreError>;

    /// First-or-create. The flag is true when this call inserted the row.
    async fn follow(
        &self,
        follower_id: i64,
        followed_id: i64,
    ) -> Result<(Follower, bool), StoreError>;
    async fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<bool, StoreError>;
}
