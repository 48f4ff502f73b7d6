use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{posts::PostSummary, profiles::AuthorSummary};

pub mod handler;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub profile_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewComment {
    pub post_id: i64,
    pub profile_id: i64,
    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateComment {
    pub profile_id: i64,
    pub post_id: i64,
    #[validate(custom(function = "crate::validation::not_blank", message = "The content field is required."))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateComment {
    #[validate(custom(function = "crate::validation::not_blank", message = "The content field is required."))]
    pub content: String,
}

/// Comment with its author and post, either of which may be gone.
#[derive(Debug, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub profile: Option<AuthorSummary>,
    pub post: Option<PostSummary>,
}
