//! In-process backend. Every write runs under one write lock, which gives
//! the same per-row atomicity and uniqueness guarantees the database does.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
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

#[derive(Default)]
struct Tables {
    sequences: HashMap<&'static str, i64>,
    users: BTreeMap<i64, User>,
    tokens: HashMap<Uuid, AccessToken>,
    profiles: BTreeMap<i64, Profile>,
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    likes: BTreeMap<i64, Like>,
    followers: BTreeMap<i64, Follower>,
}

impl Tables {
    fn next_id(&mut self, table: &'static str) -> i64 {
        let seq = self.sequences.entry(table).or_insert(0);
        *seq += 1;
        *seq
    }

    fn require_profile(&self, id: i64, field: &'static str) -> Result<(), StoreError> {
        if self.profiles.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::MissingReference { field })
        }
    }

    fn require_post(&self, id: i64) -> Result<(), StoreError> {
        if self.posts.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::MissingReference { field: "post_id" })
        }
    }

    fn remove_posts(&mut self, ids: &[i64]) {
        for id in ids {
            self.posts.remove(id);
        }
        self.comments.retain(|_, c| !ids.contains(&c.post_id));
        self.likes.retain(|_, l| !ids.contains(&l.post_id));
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables.write().map_err(|_| StoreError::Poisoned)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut t = self.write()?;
        if t.users.values().any(|u| u.name == user.name) {
            return Err(StoreError::taken("name"));
        }
        if t.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::taken("email"));
        }

        let now = Utc::now();
        let row = User {
            id: t.next_id("users"),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        t.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn record_token(&self, token: AccessToken) -> Result<(), StoreError> {
        let mut t = self.write()?;
        if !t.users.contains_key(&token.user_id) {
            return Err(StoreError::MissingReference { field: "user_id" });
        }
        let now = Utc::now();
        t.tokens.retain(|_, existing| existing.expires_at > now);
        t.tokens.insert(token.id, token);
        Ok(())
    }

    async fn token_owner(&self, token_id: Uuid) -> Result<Option<i64>, StoreError> {
        let now = Utc::now();
        Ok(self
            .read()?
            .tokens
            .get(&token_id)
            .filter(|token| token.expires_at > now)
            .map(|token| token.user_id))
    }

    async fn revoke_tokens(&self, user_id: i64) -> Result<u64, StoreError> {
        let mut t = self.write()?;
        let before = t.tokens.len();
        t.tokens.retain(|_, token| token.user_id != user_id);
        Ok((before - t.tokens.len()) as u64)
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        Ok(self.read()?.profiles.values().cloned().collect())
    }

    async fn find_profile(&self, id: i64) -> Result<Option<Profile>, StoreError> {
        Ok(self.read()?.profiles.get(&id).cloned())
    }

    async fn find_profiles(&self, ids: &[i64]) -> Result<Vec<Profile>, StoreError> {
        let t = self.read()?;
        Ok(t.profiles
            .values()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn create_profile(&self, profile: NewProfile) -> Result<Profile, StoreError> {
        let mut t = self.write()?;
        if t.profiles.values().any(|p| p.username == profile.username) {
            return Err(StoreError::taken("username"));
        }
        if t.profiles.values().any(|p| p.email == profile.email) {
            return Err(StoreError::taken("email"));
        }

        let now = Utc::now();
        let row = Profile {
            id: t.next_id("profiles"),
            username: profile.username,
            email: profile.email,
            password_hash: profile.password_hash,
            profile_picture: profile.profile_picture,
            created_at: now,
            updated_at: now,
        };
        t.profiles.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_profile(
        &self,
        id: i64,
        changes: ProfileChanges,
    ) -> Result<Option<Profile>, StoreError> {
        let mut t = self.write()?;
        if !t.profiles.contains_key(&id) {
            return Ok(None);
        }

        // Uniqueness ignores the row being updated
        if let Some(username) = &changes.username {
            if t.profiles.values().any(|p| p.id != id && &p.username == username) {
                return Err(StoreError::taken("username"));
            }
        }
        if let Some(email) = &changes.email {
            if t.profiles.values().any(|p| p.id != id && &p.email == email) {
                return Err(StoreError::taken("email"));
            }
        }

        let Some(profile) = t.profiles.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = changes.username {
            profile.username = username;
        }
        if let Some(email) = changes.email {
            profile.email = email;
        }
        if let Some(password_hash) = changes.password_hash {
            profile.password_hash = password_hash;
        }
        if let Some(picture) = changes.profile_picture {
            profile.profile_picture = Some(picture);
        }
        profile.updated_at = Utc::now();
        Ok(Some(profile.clone()))
    }

    async fn delete_profile(&self, id: i64) -> Result<bool, StoreError> {
        let mut t = self.write()?;
        if t.profiles.remove(&id).is_none() {
            return Ok(false);
        }

        let owned_posts: Vec<i64> = t
            .posts
            .values()
            .filter(|p| p.profile_id == id)
            .map(|p| p.id)
            .collect();
        t.remove_posts(&owned_posts);
        t.comments.retain(|_, c| c.profile_id != id);
        t.likes.retain(|_, l| l.profile_id != id);
        t.followers
            .retain(|_, f| f.follower_id != id && f.followed_id != id);
        Ok(true)
    }

    async fn profile_counts(&self, id: i64) -> Result<ProfileCounts, StoreError> {
        let t = self.read()?;
        let count = |n: usize| n as i64;
        Ok(ProfileCounts {
            posts: count(t.posts.values().filter(|p| p.profile_id == id).count()),
            followers: count(t.followers.values().filter(|f| f.followed_id == id).count()),
            following: count(t.followers.values().filter(|f| f.follower_id == id).count()),
        })
    }

    async fn followers_of(&self, id: i64) -> Result<Vec<Profile>, StoreError> {
        let t = self.read()?;
        Ok(t.followers
            .values()
            .filter(|f| f.followed_id == id)
            .filter_map(|f| t.profiles.get(&f.follower_id).cloned())
            .collect())
    }

    async fn following_of(&self, id: i64) -> Result<Vec<Profile>, StoreError> {
        let t = self.read()?;
        Ok(t.followers
            .values()
            .filter(|f| f.follower_id == id)
            .filter_map(|f| t.profiles.get(&f.followed_id).cloned())
            .collect())
    }

    async fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        Ok(self.read()?.posts.values().cloned().collect())
    }

    async fn posts_by(&self, profile_id: i64) -> Result<Vec<Post>, StoreError> {
        let t = self.read()?;
        Ok(t.posts
            .values()
            .filter(|p| p.profile_id == profile_id)
            .cloned()
            .collect())
    }

    async fn find_post(&self, id: i64) -> Result<Option<Post>, StoreError> {
        Ok(self.read()?.posts.get(&id).cloned())
    }

    async fn find_posts(&self, ids: &[i64]) -> Result<Vec<Post>, StoreError> {
        let t = self.read()?;
        Ok(t.posts
            .values()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, StoreError> {
        let mut t = self.write()?;
        t.require_profile(post.profile_id, "profile_id")?;

        let now = Utc::now();
        let row = Post {
            id: t.next_id("posts"),
            profile_id: post.profile_id,
            content: post.content,
            image_url: post.image_url,
            created_at: now,
            updated_at: now,
        };
        t.posts.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_post(&self, id: i64, changes: UpdatePost) -> Result<Option<Post>, StoreError> {
        let mut t = self.write()?;
        let Some(post) = t.posts.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(content) = changes.content {
            post.content = content;
        }
        if let Some(image_url) = changes.image_url {
            post.image_url = Some(image_url);
        }
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, id: i64) -> Result<bool, StoreError> {
        let mut t = self.write()?;
        if !t.posts.contains_key(&id) {
            return Ok(false);
        }
        t.remove_posts(&[id]);
        Ok(true)
    }

    async fn count_likes(&self, post_id: i64) -> Result<i64, StoreError> {
        let t = self.read()?;
        Ok(t.likes.values().filter(|l| l.post_id == post_id).count() as i64)
    }

    async fn list_comments(&self) -> Result<Vec<Comment>, StoreError> {
        Ok(self.read()?.comments.values().cloned().collect())
    }

    async fn comments_on(&self, post_id: i64) -> Result<Vec<Comment>, StoreError> {
        let t = self.read()?;
        Ok(t.comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn find_comment(&self, id: i64) -> Result<Option<Comment>, StoreError> {
        Ok(self.read()?.comments.get(&id).cloned())
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment, StoreError> {
        let mut t = self.write()?;
        t.require_post(comment.post_id)?;
        t.require_profile(comment.profile_id, "profile_id")?;

        let now = Utc::now();
        let row = Comment {
            id: t.next_id("comments"),
            post_id: comment.post_id,
            profile_id: comment.profile_id,
            content: comment.content,
            created_at: now,
            updated_at: now,
        };
        t.comments.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_comment(
        &self,
        id: i64,
        content: String,
    ) -> Result<Option<Comment>, StoreError> {
        let mut t = self.write()?;
        let Some(comment) = t.comments.get_mut(&id) else {
            return Ok(None);
        };
        comment.content = content;
        comment.updated_at = Utc::now();
        Ok(Some(comment.clone()))
    }

    async fn delete_comment(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.write()?.comments.remove(&id).is_some())
    }

    async fn like(&self, profile_id: i64, post_id: i64) -> Result<(Like, bool), StoreError> {
        let mut t = self.write()?;
        t.require_post(post_id)?;
        t.require_profile(profile_id, "profile_id")?;

        if let Some(existing) = t
            .likes
            .values()
            .find(|l| l.profile_id == profile_id && l.post_id == post_id)
        {
            return Ok((existing.clone(), false));
        }

        let row = Like {
            id: t.next_id("likes"),
            profile_id,
            post_id,
            created_at: Utc::now(),
        };
        t.likes.insert(row.id, row.clone());
        Ok((row, true))
    }

    async fn unlike(&self, profile_id: i64, post_id: i64) -> Result<bool, StoreError> {
        let mut t = self.write()?;
        let before = t.likes.len();
        t.likes
            .retain(|_, l| !(l.profile_id == profile_id && l.post_id == post_id));
        Ok(t.likes.len() < before)
    }

    async fn follow(
        &self,
        follower_id: i64,
        followed_id: i64,
    ) -> Result<(Follower, bool), StoreError> {
        let mut t = self.write()?;
        t.require_profile(follower_id, "follower_id")?;
        t.require_profile(followed_id, "followed_id")?;
        if follower_id == followed_id {
            return Err(StoreError::Conflict {
                field: "followed_id",
                message: "A profile cannot follow itself.".to_string(),
            });
        }

        if let Some(existing) = t
            .followers
            .values()
            .find(|f| f.follower_id == follower_id && f.followed_id == followed_id)
        {
            return Ok((existing.clone(), false));
        }

        let row = Follower {
            id: t.next_id("followers"),
            follower_id,
            followed_id,
            created_at: Utc::now(),
        };
        t.followers.insert(row.id, row.clone());
        Ok((row, true))
    }

    async fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<bool, StoreError> {
        let mut t = self.write()?;
        let before = t.followers.len();
        t.followers
            .retain(|_, f| !(f.follower_id == follower_id && f.followed_id == followed_id));
        Ok(t.followers.len() < before)
    }
}
