//! Read-only views assembled from several store reads.
//!
//! A parent that cannot be found (deleted between reads) resolves to `None`
//! or an empty list, never to an error.

use std::collections::HashMap;

use crate::{
    comments::{Comment, CommentView},
    posts::{Post, PostSummary, PostView, PostWithAuthor},
    profiles::{AuthorSummary, Profile, ProfileView},
    store::{Store, StoreError},
};

fn distinct(ids: impl Iterator<Item = i64>) -> Vec<i64> {
    let mut ids: Vec<i64> = ids.collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

async fn authors_by_id(
    store: &dyn Store,
    ids: impl Iterator<Item = i64>,
) -> Result<HashMap<i64, AuthorSummary>, StoreError> {
    let profiles = store.find_profiles(&distinct(ids)).await?;
    Ok(profiles
        .iter()
        .map(|p| (p.id, AuthorSummary::from(p)))
        .collect())
}

pub async fn post_view(store: &dyn Store, id: i64) -> Result<Option<PostView>, StoreError> {
    let Some(post) = store.find_post(id).await? else {
        return Ok(None);
    };

    let profile = store
        .find_profile(post.profile_id)
        .await?
        .as_ref()
        .map(AuthorSummary::from);
    let comments = store.comments_on(post.id).await?;
    let likes_count = store.count_likes(post.id).await?;

    Ok(Some(PostView {
        post,
        profile,
        comments,
        likes_count,
    }))
}

pub async fn posts_with_authors(
    store: &dyn Store,
    posts: Vec<Post>,
) -> Result<Vec<PostWithAuthor>, StoreError> {
    let authors = authors_by_id(store, posts.iter().map(|p| p.profile_id)).await?;

    Ok(posts
        .into_iter()
        .map(|post| PostWithAuthor {
            profile: authors.get(&post.profile_id).cloned(),
            post,
        })
        .collect())
}

pub async fn comment_view(store: &dyn Store, id: i64) -> Result<Option<CommentView>, StoreError> {
    let Some(comment) = store.find_comment(id).await? else {
        return Ok(None);
    };
    Ok(comment_views(store, vec![comment]).await?.pop())
}

pub async fn comment_views(
    store: &dyn Store,
    comments: Vec<Comment>,
) -> Result<Vec<CommentView>, StoreError> {
    let authors = authors_by_id(store, comments.iter().map(|c| c.profile_id)).await?;
    let posts: HashMap<i64, PostSummary> = store
        .find_posts(&distinct(comments.iter().map(|c| c.post_id)))
        .await?
        .iter()
        .map(|p| (p.id, PostSummary::from(p)))
        .collect();

    Ok(comments
        .into_iter()
        .map(|comment| CommentView {
            profile: authors.get(&comment.profile_id).cloned(),
            post: posts.get(&comment.post_id).cloned(),
            comment,
        })
        .collect())
}

pub async fn profile_view(store: &dyn Store, id: i64) -> Result<Option<ProfileView>, StoreError> {
    let Some(profile) = store.find_profile(id).await? else {
        return Ok(None);
    };
    Ok(Some(with_counts(store, profile).await?))
}

async fn with_counts(store: &dyn Store, profile: Profile) -> Result<ProfileView, StoreError> {
    let counts = store.profile_counts(profile.id).await?;
    Ok(ProfileView {
        profile,
        posts_count: counts.posts,
        followers_count: counts.followers,
        following_count: counts.following,
    })
}
