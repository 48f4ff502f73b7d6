use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub mod handler;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewProfile {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub profile_picture: Option<String>,
}

/// Fields left as `None` keep their stored value.
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProfile {
    #[validate(
        custom(function = "crate::validation::not_blank", message = "The username field is required."),
        length(max = 255, message = "The username field must not be greater than 255 characters.")
    )]
    pub username: String,
    #[validate(
        email(message = "The email field must be a valid email address."),
        length(max = 255, message = "The email field must not be greater than 255 characters.")
    )]
    pub email: String,
    #[validate(length(min = 8, message = "The password field must be at least 8 characters."))]
    pub password: String,
    /// Path of an already-stored image.
    pub profile_picture: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfile {
    #[validate(
        custom(function = "crate::validation::not_blank", message = "The username field is required."),
        length(max = 255, message = "The username field must not be greater than 255 characters.")
    )]
    pub username: Option<String>,
    #[validate(
        email(message = "The email field must be a valid email address."),
        length(max = 255, message = "The email field must not be greater than 255 characters.")
    )]
    pub email: Option<String>,
    #[validate(length(min = 8, message = "The password field must be at least 8 characters."))]
    pub password: Option<String>,
    pub profile_picture: Option<String>,
}

/// Post/follower/following totals for one profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProfileCounts {
    pub posts: i64,
    pub followers: i64,
    pub following: i64,
}

/// Compact author block embedded in post and comment views.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorSummary {
    pub id: i64,
    pub username: String,
    pub profile_picture: Option<String>,
}

impl From<&Profile> for AuthorSummary {
    fn from(p: &Profile) -> Self {
        AuthorSummary {
            id: p.id,
            username: p.username.clone(),
            profile_picture: p.profile_picture.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub profile: Profile,
    pub posts_count: i64,
    pub followers_count: i64,
    pub following_count: i64,
}

#[derive(Debug, Serialize)]
pub struct ProfileEnvelope {
    pub profile: Profile,
}
