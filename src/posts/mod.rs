use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{comments::Comment, profiles::AuthorSummary};

pub mod handler;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub profile_id: i64,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewPost {
    pub profile_id: i64,
    pub content: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePost {
    pub profile_id: i64,
    #[validate(custom(function = "crate::validation::not_blank", message = "The content field is required."))]
    pub content: String,
    /// Path of an already-stored image.
    pub image_url: Option<String>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePost {
    #[validate(custom(function = "crate::validation::not_blank", message = "The content field must not be empty."))]
    pub content: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostSummary {
    pub id: i64,
    pub profile_id: i64,
    pub content: String,
}

impl From<&Post> for PostSummary {
    fn from(p: &Post) -> Self {
        PostSummary {
            id: p.id,
            profile_id: p.profile_id,
            content: p.content.clone(),
        }
    }
}

/// Post as listed: the row plus its author, if the author still exists.
#[derive(Debug, Serialize)]
pub struct PostWithAuthor {
    #[serde(flatten)]
    pub post: Post,
    pub profile: Option<AuthorSummary>,
}

/// Single-post view.
#[derive(Debug, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub profile: Option<AuthorSummary>,
    pub comments: Vec<Comment>,
    pub likes_count: i64,
}
