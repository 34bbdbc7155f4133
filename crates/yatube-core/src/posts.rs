//! Post authoring, comments and the post detail view.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Comment, Group, Post, PostCard, UserSummary};
use crate::error::DomainError;
use crate::feed::{FeedScope, FeedService};
use crate::policy;
use crate::ports::{CommentRepository, GroupRepository, PostRepository, UserRepository};

/// Submitted post form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDraft {
    #[serde(default)]
    pub text: String,
    /// Group slug; empty means "no group".
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl PostDraft {
    pub fn from_post(post: &Post, group: Option<&Group>) -> Self {
        Self {
            text: post.text.clone(),
            group: group.map(|g| g.slug.clone()),
            image: post.image.clone(),
        }
    }
}

/// Per-field validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }

    /// `Ok(())` when no field failed, otherwise the collected errors.
    pub fn into_result(self) -> Result<(), DomainError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DomainError::InvalidForm(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, msgs)| format!("{}: {}", field, msgs.join("; ")))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: UserSummary,
}

/// Everything shown on a post's own page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetail {
    pub post: PostCard,
    pub author_post_count: u64,
    pub comments: Vec<CommentView>,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
    groups: Arc<dyn GroupRepository>,
    comments: Arc<dyn CommentRepository>,
    feed: FeedService,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
        groups: Arc<dyn GroupRepository>,
        comments: Arc<dyn CommentRepository>,
    ) -> Self {
        let feed = FeedService::new(posts.clone(), users.clone(), groups.clone());
        Self {
            posts,
            users,
            groups,
            comments,
            feed,
        }
    }

    async fn find_post(&self, post_id: Uuid) -> Result<Post, DomainError> {
        self.posts
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", post_id))
    }

    /// Validate a draft and resolve its group.
    async fn validate(&self, draft: &PostDraft) -> Result<Option<Group>, DomainError> {
        let mut errors = FieldErrors::default();

        if draft.text.trim().is_empty() {
            errors.add("text", "This field is required.");
        }

        let slug = draft.group.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let group = match slug {
            Some(slug) => {
                let group = self.groups.find_by_slug(slug).await?;
                if group.is_none() {
                    errors.add("group", "Select a valid choice.");
                }
                group
            }
            None => None,
        };

        errors.into_result()?;
        Ok(group)
    }

    fn normalized_image(draft: &PostDraft) -> Option<String> {
        draft
            .image
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    pub async fn create(&self, author: Uuid, draft: PostDraft) -> Result<Post, DomainError> {
        let group = self.validate(&draft).await?;
        let post = Post::new(
            author,
            group.map(|g| g.id),
            draft.text.clone(),
            Self::normalized_image(&draft),
        );
        Ok(self.posts.insert(post).await?)
    }

    /// Load a post the actor is allowed to edit, with its current form values.
    pub async fn editable(
        &self,
        actor: Uuid,
        post_id: Uuid,
    ) -> Result<(Post, PostDraft), DomainError> {
        let post = self.find_post(post_id).await?;
        if !policy::can_modify_post(Some(actor), &post) {
            return Err(DomainError::Forbidden);
        }
        let group = match post.group_id {
            Some(id) => self.groups.find_by_id(id).await?,
            None => None,
        };
        let draft = PostDraft::from_post(&post, group.as_ref());
        Ok((post, draft))
    }

    pub async fn edit(
        &self,
        actor: Uuid,
        post_id: Uuid,
        draft: PostDraft,
    ) -> Result<Post, DomainError> {
        let mut post = self.find_post(post_id).await?;
        if !policy::can_modify_post(Some(actor), &post) {
            return Err(DomainError::Forbidden);
        }

        let group = self.validate(&draft).await?;
        post.text = draft.text.clone();
        post.group_id = group.map(|g| g.id);
        post.image = Self::normalized_image(&draft);
        post.updated_at = Utc::now();

        Ok(self.posts.update(post).await?)
    }

    pub async fn delete(&self, actor: Uuid, post_id: Uuid) -> Result<Post, DomainError> {
        let post = self.find_post(post_id).await?;
        if !policy::can_modify_post(Some(actor), &post) {
            return Err(DomainError::Forbidden);
        }
        self.posts.delete(post.id).await?;
        Ok(post)
    }

    /// Add a comment. Anonymous or blank submissions are dropped without error.
    pub async fn comment(
        &self,
        actor: Option<Uuid>,
        post_id: Uuid,
        text: &str,
    ) -> Result<Option<Comment>, DomainError> {
        let post = self.find_post(post_id).await?;
        let Some(author) = actor else {
            return Ok(None);
        };
        if text.trim().is_empty() {
            return Ok(None);
        }

        let comment = Comment::new(post.id, author, text.to_string());
        Ok(Some(self.comments.insert(comment).await?))
    }

    pub async fn detail(&self, post_id: Uuid) -> Result<PostDetail, DomainError> {
        let post = self.find_post(post_id).await?;
        let author_post_count = self
            .posts
            .count_feed(&FeedScope::Author(post.author_id))
            .await?;

        let comments = self.comments.find_by_post(post.id).await?;
        let mut commenter_ids: Vec<Uuid> = comments.iter().map(|c| c.author_id).collect();
        commenter_ids.sort();
        commenter_ids.dedup();
        let commenters: HashMap<Uuid, UserSummary> = self
            .users
            .find_by_ids(&commenter_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.summary()))
            .collect();

        let comments = comments
            .into_iter()
            .filter_map(|comment| {
                let author = commenters.get(&comment.author_id)?.clone();
                Some(CommentView { comment, author })
            })
            .collect();

        let card = self
            .feed
            .hydrate(vec![post])
            .await?
            .pop()
            .ok_or_else(|| DomainError::Internal("post vanished during hydration".to_string()))?;

        Ok(PostDetail {
            post: card,
            author_post_count,
            comments,
        })
    }
}
