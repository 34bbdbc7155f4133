//! Feed assembly: scope, order, paginate and hydrate posts for rendering.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{Post, PostCard};
use crate::error::DomainError;
use crate::pagination::{PAGE_SIZE, Page, Paginator, RequestedPage};
use crate::ports::{GroupRepository, PostRepository, UserRepository};

/// Which posts a feed is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope {
    /// Every post.
    Index,
    /// Posts filed under a group.
    Group(Uuid),
    /// Posts written by one author.
    Author(Uuid),
    /// Posts whose author is followed by the given viewer.
    Following(Uuid),
}

/// Total order used by every feed: newest first, then higher id first.
pub fn newest_first(a: &Post, b: &Post) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// Builds paginated feeds on top of the post, user and group stores.
#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
    groups: Arc<dyn GroupRepository>,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
        groups: Arc<dyn GroupRepository>,
    ) -> Self {
        Self {
            posts,
            users,
            groups,
        }
    }

    /// Build the requested page of a feed.
    pub async fn page(
        &self,
        scope: FeedScope,
        requested: RequestedPage,
    ) -> Result<Page<PostCard>, DomainError> {
        let count = self.posts.count_feed(&scope).await?;
        let meta = Paginator::new(count, PAGE_SIZE).resolve(requested);

        let posts = if count == 0 {
            Vec::new()
        } else {
            self.posts
                .find_feed(&scope, meta.offset(), meta.limit())
                .await?
        };

        let items = self.hydrate(posts).await?;
        Ok(Page { items, meta })
    }

    /// Attach author and group summaries, loading each referenced row once.
    pub async fn hydrate(&self, posts: Vec<Post>) -> Result<Vec<PostCard>, DomainError> {
        let author_ids: Vec<Uuid> = posts
            .iter()
            .map(|p| p.author_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let group_ids: Vec<Uuid> = posts
            .iter()
            .filter_map(|p| p.group_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let authors: HashMap<Uuid, _> = self
            .users
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.summary()))
            .collect();
        let groups: HashMap<Uuid, _> = if group_ids.is_empty() {
            HashMap::new()
        } else {
            self.groups
                .find_by_ids(&group_ids)
                .await?
                .into_iter()
                .map(|g| (g.id, g.summary()))
                .collect()
        };

        posts
            .into_iter()
            .map(|post| {
                let author = authors.get(&post.author_id).cloned().ok_or_else(|| {
                    DomainError::Internal(format!("post {} has no author row", post.id))
                })?;
                let group = post.group_id.and_then(|id| groups.get(&id).cloned());
                Ok(PostCard {
                    post,
                    author,
                    group,
                })
            })
            .collect()
    }
}
