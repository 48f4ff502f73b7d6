use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod handler;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Like {
    pub id: i64,
    pub profile_id: i64,
    pub post_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Body of both like and unlike.
#[derive(Debug, Deserialize)]
pub struct LikeRequest {
    pub post_id: i64,
    pub profile_id: i64,
}
