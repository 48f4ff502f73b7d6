use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod handler;

/// Directed edge: `follower_id` follows `followed_id`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Follower {
    pub id: i64,
    pub follower_id: i64,
    pub followed_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Body of both follow and unfollow.
#[derive(Debug, Deserialize)]
pub struct FollowRequest {
    pub follower_id: i64,
    pub followed_id: i64,
}
