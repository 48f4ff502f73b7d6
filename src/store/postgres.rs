//! PostgreSQL backend. Schema lives in `migrations/`; foreign keys are
//! `ON DELETE CASCADE` and pair uniqueness is a table constraint, so both
//! cascade and first-or-create are settled by the database.

use async_trait::async_trait;
use sqlx::{error::ErrorKind, PgPool, Row};
use uuid::Uuid;

use crate::{
    auth::{AccessToken, NewUser, User},
    comments::{Comment, NewComment},
    follows::Follower,
    likes::Like,
    posts::{NewPost, Post, UpdatePost},
    profiles::{NewProfile, Profile, ProfileChanges, ProfileCounts},
    store::{Store, StoreError},
};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Translate constraint violations into store errors that name the field.
fn write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        let constraint = db.constraint().unwrap_or_default();
        match db.kind() {
            ErrorKind::UniqueViolation => {
                let field = if constraint.ends_with("_email_key") {
                    "email"
                } else if constraint.ends_with("_username_key") {
                    "username"
                } else if constraint.ends_with("_name_key") {
                    "name"
                } else if constraint.starts_with("likes_") {
                    "post_id"
                } else {
                    "followed_id"
                };
                return StoreError::taken(field);
            }
            ErrorKind::ForeignKeyViolation => {
                let field = if constraint.contains("post_id") {
                    "post_id"
                } else if constraint.contains("follower_id") {
                    "follower_id"
                } else if constraint.contains("followed_id") {
                    "followed_id"
                } else {
                    "profile_id"
                };
                return StoreError::MissingReference { field };
            }
            ErrorKind::CheckViolation if constraint.starts_with("followers_") => {
                return StoreError::Conflict {
                    field: "followed_id",
                    message: "A profile cannot follow itself.".to_string(),
                };
            }
            _ => {}
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn record_token(&self, token: AccessToken) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM access_tokens WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "INSERT INTO access_tokens (id, user_id, created_at, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(token.created_at)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn token_owner(&self, token_id: Uuid) -> Result<Option<i64>, StoreError> {
        Ok(sqlx::query_scalar::<_, i64>(
            "SELECT user_id FROM access_tokens WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(token_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn revoke_tokens(&self, user_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM access_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        Ok(sqlx::query_as::<_, Profile>("SELECT * FROM profiles ORDER BY id")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_profile(&self, id: i64) -> Result<Option<Profile>, StoreError> {
        Ok(sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_profiles(&self, ids: &[i64]) -> Result<Vec<Profile>, StoreError> {
        Ok(
            sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = ANY($1) ORDER BY id")
                .bind(ids)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn create_profile(&self, profile: NewProfile) -> Result<Profile, StoreError> {
        sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (username, email, password_hash, profile_picture)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&profile.username)
        .bind(&profile.email)
        .bind(&profile.password_hash)
        .bind(&profile.profile_picture)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)
    }

    async fn update_profile(
        &self,
        id: i64,
        changes: ProfileChanges,
    ) -> Result<Option<Profile>, StoreError> {
        sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles SET
                username = COALESCE($1, username),
                email = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash),
                profile_picture = COALESCE($4, profile_picture),
                updated_at = NOW()
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(&changes.username)
        .bind(&changes.email)
        .bind(&changes.password_hash)
        .bind(&changes.profile_picture)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(write_error)
    }

    async fn delete_profile(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn profile_counts(&self, id: i64) -> Result<ProfileCounts, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM posts WHERE profile_id = $1) AS posts,
                (SELECT COUNT(*) FROM followers WHERE followed_id = $1) AS followers,
                (SELECT COUNT(*) FROM followers WHERE follower_id = $1) AS following
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(ProfileCounts {
            posts: row.get("posts"),
            followers: row.get("followers"),
            following: row.get("following"),
        })
    }

    async fn followers_of(&self, id: i64) -> Result<Vec<Profile>, StoreError> {
        Ok(sqlx::query_as::<_, Profile>(
            r#"
            SELECT p.*
            FROM followers f
            JOIN profiles p ON f.follower_id = p.id
            WHERE f.followed_id = $1
            ORDER BY f.id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn following_of(&self, id: i64) -> Result<Vec<Profile>, StoreError> {
        Ok(sqlx::query_as::<_, Profile>(
            r#"
            SELECT p.*
            FROM followers f
            JOIN profiles p ON f.followed_id = p.id
            WHERE f.follower_id = $1
            ORDER BY f.id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        Ok(sqlx::query_as::<_, Post>("SELECT * FROM posts ORDER BY id")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn posts_by(&self, profile_id: i64) -> Result<Vec<Post>, StoreError> {
        Ok(
            sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE profile_id = $1 ORDER BY id")
                .bind(profile_id)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn find_post(&self, id: i64) -> Result<Option<Post>, StoreError> {
        Ok(sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_posts(&self, ids: &[i64]) -> Result<Vec<Post>, StoreError> {
        Ok(
            sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ANY($1) ORDER BY id")
                .bind(ids)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, StoreError> {
        sqlx::query_as::<_, Post>(
            "INSERT INTO posts (profile_id, content, image_url) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(post.profile_id)
        .bind(&post.content)
        .bind(&post.image_url)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)
    }

    async fn update_post(&self, id: i64, changes: UpdatePost) -> Result<Option<Post>, StoreError> {
        Ok(sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts SET
                content = COALESCE($1, content),
                image_url = COALESCE($2, image_url),
                updated_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(&changes.content)
        .bind(&changes.image_url)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_post(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_likes(&self, post_id: i64) -> Result<i64, StoreError> {
        Ok(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM likes WHERE post_id = $1")
                .bind(post_id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn list_comments(&self) -> Result<Vec<Comment>, StoreError> {
        Ok(sqlx::query_as::<_, Comment>("SELECT * FROM comments ORDER BY id")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn comments_on(&self, post_id: i64) -> Result<Vec<Comment>, StoreError> {
        Ok(
            sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE post_id = $1 ORDER BY id")
                .bind(post_id)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn find_comment(&self, id: i64) -> Result<Option<Comment>, StoreError> {
        Ok(sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment, StoreError> {
        sqlx::query_as::<_, Comment>(
            "INSERT INTO comments (post_id, profile_id, content) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(comment.post_id)
        .bind(comment.profile_id)
        .bind(&comment.content)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)
    }

    async fn update_comment(
        &self,
        id: i64,
        content: String,
    ) -> Result<Option<Comment>, StoreError> {
        Ok(sqlx::query_as::<_, Comment>(
            "UPDATE comments SET content = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(&content)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_comment(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn like(&self, profile_id: i64, post_id: i64) -> Result<(Like, bool), StoreError> {
        // Insert-or-nothing keeps concurrent likes from both creating a row
        let inserted = sqlx::query_as::<_, Like>(
            r#"
            INSERT INTO likes (profile_id, post_id)
            VALUES ($1, $2)
            ON CONFLICT (profile_id, post_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(profile_id)
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(write_error)?;

        if let Some(like) = inserted {
            return Ok((like, true));
        }

        let existing =
            sqlx::query_as::<_, Like>("SELECT * FROM likes WHERE profile_id = $1 AND post_id = $2")
                .bind(profile_id)
                .bind(post_id)
                .fetch_one(&self.pool)
                .await?;
        Ok((existing, false))
    }

    async fn unlike(&self, profile_id: i64, post_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM likes WHERE profile_id = $1 AND post_id = $2")
            .bind(profile_id)
            .bind(post_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn follow(
        &self,
        follower_id: i64,
        followed_id: i64,
    ) -> Result<(Follower, bool), StoreError> {
        let inserted = sqlx::query_as::<_, Follower>(
            r#"
            INSERT INTO followers (follower_id, followed_id)
            VALUES ($1, $2)
            ON CONFLICT (follower_id, followed_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(follower_id)
        .bind(followed_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(write_error)?;

        if let Some(edge) = inserted {
            return Ok((edge, true));
        }

        let existing = sqlx::query_as::<_, Follower>(
            "SELECT * FROM followers WHERE follower_id = $1 AND followed_id = $2",
        )
        .bind(follower_id)
        .bind(followed_id)
        .fetch_one(&self.pool)
        .await?;
        Ok((existing, false))
    }

    async fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<bool, StoreError> {
        let result =
            sqlx::query("DELETE FROM followers WHERE follower_id = $1 AND followed_id = $2")
                .bind(follower_id)
                .bind(followed_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
